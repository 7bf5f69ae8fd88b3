use serde::Deserialize;

/// Runtime configuration: where the frames go and how fast. Loaded from a
/// TOML file, overridden by command line flags, defaulting to the values a
/// bare lighting segment expects.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Art-Net node address, `host` or `host:port`. The default broadcasts
    /// to the local segment.
    pub node_address: String,
    /// Art-Net universe, passed through to the port-address untouched.
    pub universe: u16,
    /// Wire frame rate in frames per second.
    pub frame_rate: u32,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            node_address: "255.255.255.255".to_string(),
            universe: 0,
            frame_rate: 40,
        }
    }
}

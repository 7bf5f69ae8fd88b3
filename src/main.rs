use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;

use clap::Parser;
use config_file::FromConfigFile;

use lichtpult::{Config, DmxControl};

#[derive(Parser)]
struct Cli {
    /// TOML config file to load
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Art-Net node address, e.g. 192.168.2.128 or 255.255.255.255
    #[arg(short, long, value_name = "ADDR")]
    node: Option<String>,

    /// Art-Net universe
    #[arg(short, long, value_name = "UNIVERSE")]
    universe: Option<u16>,

    /// Frames per second on the wire
    #[arg(short, long, value_name = "FPS")]
    fps: Option<u32>,
}

enum Command {
    Line(String),
    Quit,
}

fn load_config(args: &Cli) -> Config {
    let mut config = match &args.config {
        Some(path) => match Config::from_config_file(path) {
            Ok(config) => config,
            Err(err) => panic!("Cannot read config file {}: {}", path.display(), err),
        },
        None => Config::default(),
    };

    if let Some(node) = &args.node {
        config.node_address = node.clone();
    }
    if let Some(universe) = args.universe {
        config.universe = universe;
    }
    if let Some(fps) = args.fps {
        config.frame_rate = fps;
    }

    config
}

fn dispatch(desk: &DmxControl, line: &str) -> bool {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    match tokens.as_slice() {
        [] => {}
        ["quit"] | ["exit"] => return false,
        ["set", channel, value] => match (channel.parse::<u16>(), value.parse::<u8>()) {
            (Ok(channel), Ok(value)) => report(desk.set_channel(channel, value)),
            _ => usage(),
        },
        ["fade", channel, target, ms] => {
            match (channel.parse::<u16>(), target.parse::<u8>(), ms.parse::<u64>()) {
                (Ok(channel), Ok(target), Ok(ms)) => report(desk.request_fade(channel, target, ms)),
                _ => usage(),
            }
        }
        ["get", channel] => match channel.parse::<u16>() {
            Ok(channel) => match desk.get_channel(channel) {
                Ok(value) => println!("channel {}: {}", channel, value),
                Err(err) => println!("{}", err),
            },
            _ => usage(),
        },
        ["active", channel] => match channel.parse::<u16>() {
            Ok(channel) => match desk.is_active(channel) {
                Ok(active) => println!("channel {}: {}", channel, if active { "fading" } else { "static" }),
                Err(err) => println!("{}", err),
            },
            _ => usage(),
        },
        ["cancel", channel] => match channel.parse::<u16>() {
            Ok(channel) => report(desk.cancel_fade(channel)),
            _ => usage(),
        },
        ["blackout"] => report(desk.blackout(0)),
        ["blackout", ms] => match ms.parse::<u64>() {
            Ok(ms) => report(desk.blackout(ms)),
            _ => usage(),
        },
        _ => usage(),
    }
    true
}

fn report(result: lichtpult::Result<()>) {
    if let Err(err) = result {
        println!("{}", err);
    }
}

fn usage() {
    println!("Commands: set <ch> <val> | fade <ch> <target> <ms> | get <ch> | active <ch> | cancel <ch> | blackout [ms] | quit");
}

fn main() {
    env_logger::init();

    let args = Cli::parse();
    let config = load_config(&args);

    let desk = match DmxControl::start(&config) {
        Ok(desk) => desk,
        Err(err) => panic!("Cannot start dimmer core: {}", err),
    };

    let (tx, rx) = mpsc::channel();

    let interrupt_tx = tx.clone();
    if let Err(err) = ctrlc::set_handler(move || {
        let _ = interrupt_tx.send(Command::Quit);
    }) {
        panic!("Cannot install interrupt handler: {}", err);
    }

    let res = thread::Builder::new()
        .name("console".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.send(Command::Line(line)).is_err() {
                            return;
                        }
                    }
                    Err(_) => break,
                }
            }
            let _ = tx.send(Command::Quit);
        });
    if let Err(error) = res {
        panic!("Failed to create thread: {}", error);
    }

    println!(
        "lichtpult on universe {} -> {} at {} fps",
        config.universe, config.node_address, config.frame_rate
    );
    usage();

    while let Ok(command) = rx.recv() {
        match command {
            Command::Quit => break,
            Command::Line(line) => {
                if !dispatch(&desk, line.trim()) {
                    break;
                }
            }
        }
    }

    desk.shutdown();
}

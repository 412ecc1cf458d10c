//! rover-ctl - one-shot command line control for the RoverIO daemon

use clap::{Parser, Subcommand, ValueEnum};
use rover_io::client::ControlClient;
use rover_io::{Headlight, Result};
use std::thread;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "rover-ctl", version, about = "Send a command to the rover")]
struct Args {
    /// Daemon address
    #[arg(short, long, default_value = "192.168.1.1:8081")]
    addr: String,

    /// Connect and write timeout in milliseconds
    #[arg(long, default_value_t = 3000, value_parser = clap::value_parser!(u64).range(1..))]
    timeout_ms: u64,

    /// Keep the connection open for this long after sending. The daemon stops
    /// the drivetrain when its client leaves unless `stop_on_disconnect` is off.
    #[arg(long, default_value_t = 0)]
    hold_ms: u64,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Stop the drivetrain
    Stop,
    /// Drive forward
    Forward,
    /// Drive backward
    Backward,
    /// Turn left in place
    Left,
    /// Turn right in place
    Right,
    /// Set motor duty cycle (0-100); right defaults to left
    Speed { left: u8, right: Option<u8> },
    /// Switch the headlight
    Light { state: LightArg },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LightArg {
    On,
    Off,
}

impl From<LightArg> for Headlight {
    fn from(arg: LightArg) -> Self {
        match arg {
            LightArg::On => Headlight::On,
            LightArg::Off => Headlight::Off,
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    let mut client = ControlClient::connect(
        args.addr.as_str(),
        Duration::from_millis(args.timeout_ms),
    )?;

    match args.command {
        Cmd::Stop => client.stop()?,
        Cmd::Forward => client.forward()?,
        Cmd::Backward => client.backward()?,
        Cmd::Left => client.turn_left()?,
        Cmd::Right => client.turn_right()?,
        Cmd::Speed { left, right } => client.set_speed(left, right.unwrap_or(left))?,
        Cmd::Light { state } => client.headlight(state.into())?,
    }
    client.flush()?;

    if args.hold_ms > 0 {
        thread::sleep(Duration::from_millis(args.hold_ms));
    }
    Ok(())
}

mod config;
mod simulation;
mod station;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use config::StationConfig;
use station::Station;

#[derive(Parser)]
#[command(name = "station")]
#[command(about = "DIS interoperability station")]
struct Args {
    #[arg(short, long, help = "Station configuration (TOML)")]
    config: Option<PathBuf>,

    #[arg(short, long)]
    bind: Option<String>,

    #[arg(short, long, help = "Destination for outgoing entity states")]
    peer: Option<String>,

    #[arg(short, long)]
    tick_rate: Option<u32>,

    #[arg(long, help = "Federate name override")]
    federate: Option<String>,

    #[arg(long, value_parser = parse_duration, help = "Stop after this many seconds")]
    duration: Option<Duration>,
}

fn parse_duration(arg: &str) -> Result<Duration, String> {
    let secs: f64 = arg.parse().map_err(|e| format!("{e}"))?;
    Duration::try_from_secs_f64(secs).map_err(|_| format!("`{arg}` is not a valid number of seconds"))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => StationConfig::load(path)?,
        None => StationConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.bind = bind;
    }
    if let Some(peer) = args.peer {
        config.peer = peer;
    }
    if let Some(tick_rate) = args.tick_rate {
        config.tick_rate = tick_rate;
    }
    if let Some(federate) = args.federate {
        config.netio.federate_name = federate;
    }

    let mut station = Station::new(config)?;
    log::info!(
        "station started on {} with {} local players",
        station.local_addr(),
        station.world().player_count()
    );

    station.run(args.duration);
    log::info!("station shutting down");

    Ok(())
}

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use tilenav_core::{EngineConfig, TraversalPreferences};
use tilenav_cli::{build_router, exit_status, load_world, parse_capability, parse_node, parse_target, route};

#[derive(Parser, Debug)]
#[command(name = "tilenav", version, about = "Route between tiles of a multi-map tile world")]
struct Args {
    /// World JSON file with `maps` and an optional `config`
    #[arg(long = "world", value_name = "PATH")]
    world: PathBuf,

    /// Start tile as MAP:X:Y
    #[arg(long = "from", value_name = "MAP:X:Y")]
    from: String,

    /// Goal tile as MAP:X:Y, or a bare MAP to stop on arrival
    #[arg(long = "to", value_name = "MAP[:X:Y]")]
    to: String,

    /// Unlocked capability; repeatable
    #[arg(long = "unlock", value_name = "CAP")]
    unlock: Vec<String>,

    #[arg(long = "avoid-grass", conflicts_with = "seek_grass")]
    avoid_grass: bool,

    #[arg(long = "seek-grass")]
    seek_grass: bool,

    #[arg(long = "avoid-observers", conflicts_with = "seek_observers")]
    avoid_observers: bool,

    #[arg(long = "seek-observers")]
    seek_observers: bool,

    /// Pretty-print the outcome JSON
    #[arg(long = "pretty")]
    pretty: bool,
}

fn run(args: &Args) -> Result<u8> {
    let from = parse_node(&args.from).context("invalid --from")?;
    let to = parse_target(&args.to).context("invalid --to")?;
    let mut prefs = TraversalPreferences {
        avoid_tall_grass: args.avoid_grass,
        seek_tall_grass: args.seek_grass,
        avoid_observers: args.avoid_observers,
        seek_observers: args.seek_observers,
        ..TraversalPreferences::default()
    };
    for cap in &args.unlock {
        prefs.unlocked_capabilities.insert(parse_capability(cap).context("invalid --unlock")?);
    }

    let world = load_world(&args.world)?;
    let router = build_router(world, EngineConfig::from_env())?;
    let outcome = route(&router, &from, &to, &prefs)?;

    let out = if args.pretty { serde_json::to_string_pretty(&outcome)? } else { serde_json::to_string(&outcome)? };
    println!("{}", out);
    Ok(exit_status(&outcome))
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).json().init();

    let args = Args::parse();
    info!(core_version = %tilenav_core::version(), ?args, "starting tilenav");
    match run(&args) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!(error = %format!("{:#}", e), "tilenav failed");
            eprintln!("error: {:#}", e);
            ExitCode::from(1)
        }
    }
}

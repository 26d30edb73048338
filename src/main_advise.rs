use anyhow::{bail, Context, Result};
use clap::Parser;
use poker_gto::config::EngineConfig;
use poker_gto::engine::Engine;
use poker_gto::game_state::{GameState, GameStateRequest};
use serde::Serialize;
use std::convert::TryFrom;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

/// Reads a game state as JSON and prints the engine's analysis.
#[derive(Parser, Debug)]
#[command(name = "advise", version)]
struct Args {
    /// Game state file; stdin when omitted or "-".
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Engine config file (JSON).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Overrides the request's CFR iterations.
    #[arg(long)]
    iterations: Option<usize>,

    /// Overrides the request's Monte Carlo trials.
    #[arg(long)]
    trials: Option<usize>,

    /// Overrides the request's seed.
    #[arg(long)]
    seed: Option<u64>,

    /// Input is a JSON array of game states, solved in parallel.
    #[arg(long)]
    batch: bool,

    #[arg(long)]
    pretty: bool,
}

impl Args {
    fn apply_overrides(&self, request: &mut GameStateRequest) {
        if self.iterations.is_some() {
            request.iterations = self.iterations;
        }
        if self.trials.is_some() {
            request.trials = self.trials;
        }
        if self.seed.is_some() {
            request.seed = self.seed;
        }
    }
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", json);
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => EngineConfig::from_path(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };

    let text = match &args.input {
        Some(path) if path.as_os_str() != "-" => fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        _ => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("failed to read stdin")?;
            text
        }
    };
    if text.trim().is_empty() {
        bail!("empty game state");
    }

    let engine = Engine::new(config);
    if args.batch {
        let requests: Vec<GameStateRequest> =
            serde_json::from_str(&text).context("malformed game state batch")?;
        let states = requests
            .into_iter()
            .enumerate()
            .map(|(i, mut request)| {
                args.apply_overrides(&mut request);
                GameState::try_from(request).with_context(|| format!("invalid game state #{}", i))
            })
            .collect::<Result<Vec<_>>>()?;
        return print_json(&engine.analyze_batch(&states), args.pretty);
    }

    let mut request: GameStateRequest =
        serde_json::from_str(&text).context("malformed game state")?;
    args.apply_overrides(&mut request);
    let analysis = engine
        .analyze_request(request)
        .context("analysis failed")?;
    print_json(&analysis, args.pretty)
}

use anyhow::{ensure, Context, Result};
use clap::Parser;
use poker_gto::card::parse_cards;
use poker_gto::equity::{EquityCalculator, DEFAULT_TRIALS};
use poker_gto::range::Range;

/// Monte Carlo equity of a hand against random hands or a range.
#[derive(Parser, Debug)]
#[command(name = "equity", version)]
struct Args {
    /// Hero's hole cards, e.g. "AsKd".
    hero: String,

    /// Board cards, e.g. "Qh7c2d".
    #[arg(short, long, default_value = "")]
    board: String,

    #[arg(short, long, default_value_t = 1)]
    opponents: usize,

    #[arg(short, long, default_value_t = DEFAULT_TRIALS)]
    trials: usize,

    #[arg(short, long)]
    seed: Option<u64>,

    /// Opponent range, e.g. "QQ+,AKs,AQo-ATo".
    #[arg(short, long)]
    range: Option<String>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let hero = parse_cards(&args.hero).context("invalid hole cards")?;
    ensure!(hero.len() == 2, "expected 2 hole cards, found {}", hero.len());
    let board = parse_cards(&args.board).context("invalid board")?;
    let seed = args.seed.unwrap_or_else(rand::random);
    let calculator = EquityCalculator::new();

    let result = match &args.range {
        Some(range) => {
            let range: Range = range.parse().context("invalid range")?;
            calculator.estimate_equity_vs_range(
                [hero[0], hero[1]],
                &board,
                &range,
                args.opponents,
                args.trials,
                seed,
            )?
        }
        None => calculator.estimate_equity(
            [hero[0], hero[1]],
            &board,
            args.opponents,
            args.trials,
            seed,
        )?,
    };

    println!("win:    {:6.2}%", result.win);
    println!("tie:    {:6.2}%", result.tie);
    println!("lose:   {:6.2}%", result.lose);
    println!(
        "equity: {:6.2}% +/- {:.2}% ({} trials, seed {})",
        100.0 * result.equity,
        100.0 * result.margin_of_error(),
        result.trials,
        seed
    );
    Ok(())
}

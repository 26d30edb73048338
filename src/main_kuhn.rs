use clap::Parser;
use poker_gto::cfr::{self, CfrVariant, TrainConfig};
use poker_gto::game_kuhn::KuhnNode;
use std::collections::BTreeMap;

/// Solves Kuhn poker and prints the averaged strategy.
#[derive(Parser, Debug)]
#[command(name = "kuhn", version)]
struct Args {
    /// Number of CFR iterations.
    #[arg(short = 'n', long, default_value_t = 100_000)]
    iterations: usize,

    /// Use vanilla CFR instead of CFR+.
    #[arg(long)]
    vanilla: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let variant = if args.vanilla {
        CfrVariant::Vanilla
    } else {
        CfrVariant::Plus
    };
    kuhn(args.iterations, variant);
}

fn kuhn(num_iter: usize, variant: CfrVariant) {
    let config = TrainConfig {
        iterations: num_iter,
        exploitability_threshold: 0.0,
        check_every: num_iter.max(1),
        variant,
        scale: 1.0,
    };
    let result = cfr::train(KuhnNode::new(), &config);
    let strategy = result
        .strategy
        .into_iter()
        .map(|(key, value)| (KuhnNode::public_info_set_str(&key), value))
        .collect::<BTreeMap<_, _>>();

    println!();
    println!("[Kuhn poker]");
    println!("- Iterations: {}", result.iterations);
    println!("- Exploitability: {:+.3e}", result.exploitability);
    println!("- EV of first player: {:+.4}", result.ev);
    println!("- EV of second player: {:+.4}", -result.ev);
    println!();
    println!("(left: check/fold%, right: bet/call%)");
    for (key, value) in strategy {
        println!("- {}", key);
        for (i, card) in ["J", "Q", "K"].iter().enumerate() {
            println!(
                "    {}: {:.2}%, {:.2}%",
                card,
                100.0 * value[0][i],
                100.0 * value[1][i],
            );
        }
    }
}

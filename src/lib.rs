//! Heads-up hold'em decision engine.
//!
//! A game state is answered with two independent estimates that run side by
//! side: Monte Carlo equity against random hands, and a CFR+ equilibrium of
//! a bucketed betting tree. The equilibrium frequencies at hero's decision
//! are turned into ranked recommendations with expected values.
//!
//! ```no_run
//! use poker_gto::config::EngineConfig;
//! use poker_gto::engine::Engine;
//! use poker_gto::game_state::GameStateRequest;
//!
//! let request: GameStateRequest = serde_json::from_str(
//!     r#"{"holeCards":["As","Kd"],"boardCards":[],"potSize":1.5,
//!         "amountToCall":0,"effectiveStack":100,"position":"UTG",
//!         "street":"preflop"}"#,
//! )?;
//! let analysis = Engine::new(EngineConfig::default()).analyze_request(request)?;
//! println!("{}", serde_json::to_string_pretty(&analysis)?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod abstraction;
pub mod action;
pub mod card;
pub mod cfr;
pub mod config;
pub mod deck;
pub mod engine;
pub mod equity;
pub mod error;
pub mod evaluator;
pub mod game_holdem;
pub mod game_kuhn;
pub mod game_node;
pub mod game_state;
pub mod range;
pub mod recommend;
pub mod solver;

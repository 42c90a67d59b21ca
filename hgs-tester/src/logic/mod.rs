pub mod reports;
pub mod runner;
pub mod seeds;
pub mod store;

pub use runner::{GameRecord, GameRunner, RunPlan, RunSummary, summarize};
pub use seeds::resolve_seed_inputs;
pub use store::{DirStore, NullStore};

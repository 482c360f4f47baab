pub mod invariants;
pub mod policy;
pub mod reports;
pub mod runner;
pub mod seeds;
pub mod storage;
pub mod tester;

pub use policy::BotStrategy;
pub use runner::QuestRunner;
pub use seeds::resolve_seed_inputs;
pub use storage::{ContentSource, JsonDirStorage};
pub use tester::*;

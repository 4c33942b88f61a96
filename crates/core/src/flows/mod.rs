pub mod engine;
pub mod states;

pub use engine::{FlowTransitionError, StrategyFlow};
pub use states::{StrategyAction, StrategyEvent, StrategyMode, TransitionOutcome};

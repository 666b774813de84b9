//! The registration workflow: a fixed step table (C6 data) driven by a
//! turn-processing engine (C6 algorithm).

pub mod engine;
pub mod steps;

pub use engine::{run_turn, TurnOutcome};
pub use steps::{step_table, StepDefinition, StepTable, Transition, RESERVED_STEPS};

//! Execution engine for roster
//!
//! The engine orchestrates:
//! 1. Planning - Load the account snapshot, bind resources, decide actions
//! 2. Diffing - Show observed vs desired state
//! 3. Executing - Run commands sequentially, acquiring sudo once

pub mod differ;
pub mod executor;
pub mod planner;

pub use executor::{ExecuteOptions, execute};
pub use planner::open_pass;

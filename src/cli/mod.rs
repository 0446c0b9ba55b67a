//! Command line interface module
//!
//! Argument parsing and the runner that turns a command into calls on the
//! metadata cache.

pub mod args;
pub mod runner;

pub use args::{Args, Command};
pub use runner::Runner;

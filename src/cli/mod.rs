//! Command-line interface module.

mod args;
pub mod common;
pub mod compile;
pub mod dev;
pub mod install;
pub mod start;

pub use args::{Cli, Commands};

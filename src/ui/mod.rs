//! User interface components

pub mod cli;

pub use cli::{format_seconds, read_plan, Args, Cli};

mod calendar;
mod commands;
pub mod output;
mod shell;
pub mod table;

pub use commands::{CliError, CliMode};
pub use shell::{run_cli, SCRIPT_ENV};

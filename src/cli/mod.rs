pub mod args;
pub mod run;

pub use args::Cli;
pub use run::{prepare, run};

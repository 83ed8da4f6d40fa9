pub mod cli;
pub mod config;
pub mod logging;
pub mod outlet;
pub mod pipeline;
pub mod shuttle;
pub mod source;
pub mod stats;

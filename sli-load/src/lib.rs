pub mod cli;
pub mod ftp;
pub mod http;
pub mod input;
pub mod load_config;

pub use cli::{run, Cli, Commands};

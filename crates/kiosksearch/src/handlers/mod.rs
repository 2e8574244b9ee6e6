//! One module per subcommand

pub mod config;
pub mod maintenance;
pub mod search;

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod page;
pub mod persist;

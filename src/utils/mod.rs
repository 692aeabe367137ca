pub mod cache;
pub mod cli;
pub mod config;
pub mod files;
pub mod input;
pub mod log;

pub mod config;
pub mod play;

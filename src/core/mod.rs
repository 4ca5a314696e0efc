pub mod activity;
pub mod client;
pub mod config;
pub mod lifecycle;
pub mod mirror;
pub mod monitor;
pub mod terminal;

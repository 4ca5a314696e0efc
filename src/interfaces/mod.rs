pub mod error;
pub(crate) mod http;
pub mod monitor;
pub mod tracker;

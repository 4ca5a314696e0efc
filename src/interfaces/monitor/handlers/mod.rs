pub mod board;
pub mod ws;

pub mod activities;
pub mod process;
pub mod system;

pub mod commands;
pub mod utils;

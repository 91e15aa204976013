pub mod app;
pub mod cli;
pub mod client;
pub mod consts;
pub mod formatter;
pub mod main_actions;
pub mod operator;
pub mod packager;
pub mod state;
pub mod triggers;
pub mod types;
pub mod utils;

#[cfg(test)]
mod testing;

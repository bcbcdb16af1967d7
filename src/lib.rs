pub mod app;
pub mod cache;
pub mod cli;
pub mod config;
pub mod loader;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod session;
pub mod store;
pub mod theme;
pub mod utils;

#[cfg(test)]
mod tests;

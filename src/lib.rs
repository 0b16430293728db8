pub mod api;
pub mod config;
pub mod crop;
pub mod data_collector;
pub mod export;
#[cfg(test)]
mod fixture_server;
pub mod lime;
pub mod parser;
pub mod query;
pub mod schema;

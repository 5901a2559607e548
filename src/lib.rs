pub mod api;
pub mod browser;
pub mod card;
pub mod chrome;
pub mod config;
pub mod crawler;
pub mod db;
pub mod dedup;
pub mod error;
pub mod session;
pub mod snapshot;
pub mod stats;
pub mod worker;

#[cfg(test)]
mod fake;

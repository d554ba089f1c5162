// src/lib.rs

pub mod assistant;
pub mod config;
pub mod error;
pub mod repl;
pub mod run_loop;
pub mod server;
pub mod tools;

#[cfg(test)]
mod test_support;

pub use error::{BridgeError, Result};

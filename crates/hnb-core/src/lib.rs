//! Core domain and application logic for the Hinata Telegram bot.
//!
//! This crate is framework-agnostic. Telegram, the third-party HTTP APIs and
//! SQLite live behind ports (traits) implemented in adapter crates.

pub mod actions;
pub mod config;
pub mod domain;
pub mod errors;
pub mod expiring;
pub mod extract;
pub mod formatting;
pub mod game;
pub mod intent;
pub mod logging;
pub mod messaging;
pub mod ports;
pub mod prompts;
pub mod security;
pub mod session;
pub mod settings;
pub mod sweeper;
pub mod utils;

pub use errors::{Error, Result};

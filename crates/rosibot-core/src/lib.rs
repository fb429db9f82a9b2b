//! Core domain + application logic for RosiBot, the Signal bot that organizes
//! the weekly maintenance of a volunteer-run boulder wall.
//!
//! This crate is transport-agnostic. The Signal REST API lives behind
//! [`messaging::port::MessagingPort`], implemented in `rosibot-signal`.

pub mod bot;
pub mod commands;
pub mod config;
pub mod domain;
pub mod errors;
pub mod logging;
pub mod messages;
pub mod messaging;
pub mod reminder;
pub mod state;

pub use errors::{Error, Result};

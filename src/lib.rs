//! roomd - a multi-party line-based chat relay daemon.
//!
//! Clients connect over TCP, negotiate a username, and exchange
//! newline-terminated messages that are relayed to every other joined
//! participant, with join/leave announcements.

pub mod config;
pub mod error;
pub mod network;
pub mod protocol;
pub mod state;

//! Integration test common infrastructure.
//!
//! Provides utilities for spawning in-process test servers, creating test
//! clients, and asserting on chat message flows.

#![allow(dead_code)]

pub mod client;
pub mod server;

pub use client::TestClient;
pub use server::TestServer;

/// Parse the usernames out of a roster line.
pub fn roster_names(line: &str) -> Vec<String> {
    let rest = line
        .strip_prefix("* The room contains: ")
        .unwrap_or_else(|| panic!("not a roster line: {line:?}"));
    if rest.is_empty() {
        Vec::new()
    } else {
        rest.split(", ").map(str::to_string).collect()
    }
}

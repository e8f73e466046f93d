//! Common test infrastructure: spawns the app on an ephemeral port against
//! the in-memory store and drives it over HTTP with reqwest.

// Not every test binary uses every helper.
#![allow(dead_code)]

mod client;
mod server;

#[allow(unused_imports)]
pub use client::{data, TestClient};
pub use server::TestServer;

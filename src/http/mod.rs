//! HTTP surface of the server
//!
//! Provides the protocol endpoints (`/mcp` and its `/http` alias) and the auxiliary
//! health, discovery, and tester pages.

pub mod handlers;

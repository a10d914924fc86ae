//! Model Context Protocol (MCP) server handling and JSON-RPC implementations
//!
//! Provides the per-request server instance, the factory that builds it from
//! resolved credentials, and the JSON-RPC envelope helpers both share.

pub mod factory;
pub mod peer;
pub mod rpc;
pub mod server;

//! SEO data tools exposed over the MCP protocol
//!
//! The static tool catalog, the module toggles that filter it, the optional
//! response field allowlists, and the `tools/call` handler.

pub mod catalog;
pub mod fields;
pub mod modules;
pub mod tools;

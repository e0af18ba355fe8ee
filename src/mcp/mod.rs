//! Model Context Protocol server.
//!
//! JSON-RPC 2.0 over stdio, exposing the warehouse tools to LLM clients.

pub mod protocol;
mod server;

pub use server::McpServer;

//! MCP server module

pub mod handler;

pub use handler::RandomNameHandler;

//! # mcp-homectl
//!
//! MCP (Model Context Protocol) server that exposes a smart-home
//! controller's HTTP API as agent tools. Runs as a stdio JSON-RPC server,
//! launched by an AI agent host.
//!
//! ## Architecture
//!
//! ```text
//! main.rs      — entry point, config loading, logging, MCP server launch
//! config.rs    — CLI / env-var / JSON file configuration
//! snapshot.rs  — status snapshot decoding (pure data)
//! command.rs   — command vocabulary and form encoding (pure data)
//! client.rs    — HTTP client for the controller endpoints
//! adapter.rs   — stateless operations over one controller
//! mcp.rs       — MCP JSON-RPC protocol handler (stdio)
//! tools.rs     — tool definitions and handlers
//! error.rs     — error types
//! ```

pub mod adapter;
pub mod client;
pub mod command;
pub mod config;
pub mod error;
pub mod mcp;
pub mod snapshot;
pub mod tools;

pub use adapter::{Adapter, Detail};
pub use command::{Action, CommandBatch};
pub use config::ControllerConfig;
pub use error::{CommandError, Error};
pub use snapshot::{Device, DeviceKind, SensorKind, SensorReading, Snapshot};

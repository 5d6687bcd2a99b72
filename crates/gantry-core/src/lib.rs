//! Core domain types shared across the gantry framework.
//!
//! This crate provides the fundamental types every other crate builds on:
//!
//! - [`AgentError`] and [`ErrorKind`] — the error taxonomy for pipeline,
//!   tool, and LLM operations
//! - [`Message`] and [`MessageRole`] — conversation message types
//! - [`ModelConfig`] — LLM model configuration
//! - [`ToolCall`], [`ToolResult`], [`ToolSchema`] — the tool-calling contract
//!
//! # Example
//!
//! ```rust
//! use gantry_core::{Message, ModelConfig};
//!
//! let msg = Message::user("Hello!");
//! let model = ModelConfig::new("gpt-4");
//! assert_eq!(model.temperature, 0.7);
//! ```

mod error;
mod message;
mod model;
mod tool;

pub use error::{AgentError, ErrorKind};
pub use message::{Message, MessageRole};
pub use model::ModelConfig;
pub use tool::{ToolCall, ToolResult, ToolSchema};

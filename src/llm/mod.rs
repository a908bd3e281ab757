//! Language-model fallback path
//!
//! Deterministic parsing handles the common commands; everything else goes
//! through here exactly once per turn. The client is a model-agnostic HTTP
//! client, the context bounds what the model sees, and the fallback adapter
//! turns a model response into a validated Intent or nothing.

pub mod client;
pub mod context;
pub mod fallback;

pub use client::LlmClient;
pub use context::HomeContext;
pub use fallback::{CommandModel, FallbackAdapter};

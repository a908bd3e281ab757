//! Deterministic language understanding
//!
//! Utterance -> Intent without any model call:
//! pattern rules (parser) + keyword domain inference (domains) + filler
//! stripping (normalize). The LLM fallback lives in `crate::llm` and is
//! only consulted when this layer produces nothing useful.

pub mod domains;
pub mod normalize;
pub mod parser;

pub use domains::infer_domain;
pub use normalize::clean_target;
pub use parser::IntentParser;

//! Natural-language query pipeline.
//!
//! This module provides:
//! - Lexical normalization and tokenization of questions
//! - Keyword intent classification and constraint extraction
//! - Read-only query synthesis and response composition
//! - The [`QueryEngine`] that runs the whole pipeline

pub mod classifier;
pub mod composer;
pub mod engine;
pub mod extractor;
pub mod normalizer;
pub mod policy;
pub mod synthesizer;
pub mod types;

pub use classifier::*;
pub use composer::*;
pub use engine::*;
pub use extractor::*;
pub use normalizer::*;
pub use policy::*;
pub use synthesizer::*;
pub use types::*;

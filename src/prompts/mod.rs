//! Prompt module for LLM-based operations.
//!
//! This module provides the prompt templates used by the report stage.

pub mod report;

pub use report::*;

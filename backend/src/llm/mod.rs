//! LLM-backed analysis.

mod openai;

pub use openai::{build_consolidation_prompt, AppCategory, ConsolidationAnalysis, OpenAiClient, OpenAiError};

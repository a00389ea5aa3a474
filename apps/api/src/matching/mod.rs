//! Resume-to-job matching pipeline.
//!
//! Flow: profile + jobs → prompt builder → LLM client (batched) →
//! orchestrator (normalize/filter/sort) → persistence → response.

pub mod handlers;
pub mod llm_match;
pub mod matcher;
pub mod models;
pub mod persistence;
pub mod prompts;
pub mod scoring;

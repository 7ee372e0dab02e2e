//! Unit tests for the LLM SDK
//!
//! This module contains tests for the client, the error taxonomy and the
//! resilience primitives.

pub mod config_tests;
pub mod openai_mock_tests;

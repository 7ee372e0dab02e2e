//! Service-specific client implementations
//!
//! This module contains the Responses API client and shared HTTP helpers.

pub mod openai;
mod common;

pub use common::UserAgent;

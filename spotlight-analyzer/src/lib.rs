//! spotlight-analyzer: HTTP client for the remote statement analyzer.

pub mod client;

pub use client::{AnalyzerClient, Health, ANALYZE_PATH, HEALTH_PATH};

//! The seam between the wizard and whatever classifies the statement.

use thiserror::Error;

use crate::category::SelectionSet;
use crate::results::AnalysisResult;
use crate::upload::UploadCandidate;

/// Shown whenever the analyzer gave no message of its own.
pub const UNREACHABLE_MESSAGE: &str =
    "Could not reach the analysis server. Make sure it is running and try again.";

#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error("analyzer unreachable: {0}")]
    Unreachable(String),

    #[error("analyzer returned {status}")]
    Server { status: u16, message: Option<String> },

    #[error("malformed analyzer response: {0}")]
    Malformed(String),

    #[error("analyzer reported {classified} classified of {total} transactions")]
    Inconsistent { total: u64, classified: u64 },
}

impl AnalyzeError {
    /// The one string the user sees. A server-supplied message wins.
    pub fn user_message(&self) -> String {
        match self {
            AnalyzeError::Server {
                message: Some(m), ..
            } if !m.trim().is_empty() => m.clone(),
            _ => UNREACHABLE_MESSAGE.to_string(),
        }
    }
}

/// Classifies a statement against the user's expected categories.
pub trait Analyzer {
    fn analyze(
        &self,
        statement: &UploadCandidate,
        categories: &SelectionSet,
    ) -> impl std::future::Future<Output = Result<AnalysisResult, AnalyzeError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_message_is_used_verbatim() {
        let e = AnalyzeError::Server {
            status: 400,
            message: Some("No transactions found in PDF.".to_string()),
        };
        assert_eq!(e.user_message(), "No transactions found in PDF.");
    }

    #[test]
    fn test_fallback_message() {
        let cases = [
            AnalyzeError::Unreachable("connection refused".to_string()),
            AnalyzeError::Server {
                status: 502,
                message: None,
            },
            AnalyzeError::Server {
                status: 500,
                message: Some("  ".to_string()),
            },
            AnalyzeError::Malformed("expected value".to_string()),
            AnalyzeError::Inconsistent {
                total: 1,
                classified: 2,
            },
        ];
        for e in cases {
            assert_eq!(e.user_message(), UNREACHABLE_MESSAGE);
        }
    }
}

//! `POST /api/analyze` and `GET /api/health` against the analyzer service.

use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::{debug, info, warn};

use spotlight_core::{AnalysisResult, AnalyzeError, Analyzer, SelectionSet, UploadCandidate};

pub const ANALYZE_PATH: &str = "/api/analyze";
pub const HEALTH_PATH: &str = "/api/health";

/// Body of `GET /api/health`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Health {
    pub status: String,
    #[serde(default)]
    pub version: Option<String>,
}

/// Failure body; every field is optional.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    details: Option<String>,
    suggestion: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AnalyzerClient {
    http: reqwest::Client,
    base_url: String,
}

impl AnalyzerClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn health(&self) -> Result<Health, AnalyzeError> {
        let resp = self
            .http
            .get(self.url(HEALTH_PATH))
            .send()
            .await
            .map_err(|e| AnalyzeError::Unreachable(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(server_error(resp).await);
        }
        resp.json::<Health>()
            .await
            .map_err(|e| AnalyzeError::Malformed(e.to_string()))
    }

    fn build_form(
        statement: &UploadCandidate,
        categories: &SelectionSet,
    ) -> Result<Form, AnalyzeError> {
        let pdf = Part::bytes(statement.bytes.clone())
            .file_name(statement.filename.clone())
            .mime_str(&statement.mime_type)
            .map_err(|e| AnalyzeError::Malformed(format!("bad mime type: {e}")))?;

        Ok(Form::new()
            .part("pdf", pdf)
            .text("categories", categories.to_json()))
    }
}

impl Analyzer for AnalyzerClient {
    async fn analyze(
        &self,
        statement: &UploadCandidate,
        categories: &SelectionSet,
    ) -> Result<AnalysisResult, AnalyzeError> {
        let form = Self::build_form(statement, categories)?;
        let url = self.url(ANALYZE_PATH);
        info!(%url, file = %statement.filename, "posting statement");

        let resp = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AnalyzeError::Unreachable(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(server_error(resp).await);
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| AnalyzeError::Unreachable(e.to_string()))?;
        let result: AnalysisResult = serde_json::from_slice(&body)
            .map_err(|e| AnalyzeError::Malformed(e.to_string()))?;

        debug!(
            total = result.total_transactions,
            classified = result.classified_count(),
            "decoded analysis"
        );
        Ok(result)
    }
}

async fn server_error(resp: reqwest::Response) -> AnalyzeError {
    let status = resp.status().as_u16();
    let txt = resp.text().await.unwrap_or_default();
    let body: ErrorBody = serde_json::from_str(&txt).unwrap_or_default();

    warn!(
        status,
        error = body.error.as_deref().unwrap_or(""),
        details = body.details.as_deref().unwrap_or(""),
        suggestion = body.suggestion.as_deref().unwrap_or(""),
        "analyzer request failed"
    );

    AnalyzeError::Server {
        status,
        message: body.error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash() {
        let c = AnalyzerClient::new("https://spotlight.example.com/");
        assert_eq!(c.base_url(), "https://spotlight.example.com");
        assert_eq!(c.url(ANALYZE_PATH), "https://spotlight.example.com/api/analyze");
    }

    #[test]
    fn test_error_body_tolerates_missing_fields() {
        let b: ErrorBody = serde_json::from_str(r#"{"error":"Failed to analyze PDF"}"#).unwrap();
        assert_eq!(b.error.as_deref(), Some("Failed to analyze PDF"));
        assert!(b.details.is_none());

        let b: ErrorBody = serde_json::from_str("<html>502</html>").unwrap_or_default();
        assert!(b.error.is_none());
    }

    #[test]
    fn test_health_decodes() {
        let h: Health =
            serde_json::from_str(r#"{"status":"Server is running!","version":"2.0.0"}"#).unwrap();
        assert_eq!(h.version.as_deref(), Some("2.0.0"));
    }
}

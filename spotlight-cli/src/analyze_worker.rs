use tokio::sync::mpsc;
use tracing::debug;

use spotlight_analyzer::AnalyzerClient;
use spotlight_core::{AnalysisResult, AnalyzeError, Analyzer, SelectionSet, UploadCandidate};

#[derive(Debug, Clone)]
pub struct AnalyzeRequest {
    pub request_id: u64,
    pub statement: UploadCandidate,
    pub categories: SelectionSet,
}

#[derive(Debug)]
pub struct AnalyzeEvent {
    pub request_id: u64,
    pub outcome: Result<AnalysisResult, AnalyzeError>,
}

/// Serves analyze requests one at a time for the wizard UI.
///
/// Requests are never cancelled; the UI stops listening if the user quits.
pub async fn run_worker(
    client: AnalyzerClient,
    mut rx: mpsc::UnboundedReceiver<AnalyzeRequest>,
    tx: std::sync::mpsc::Sender<AnalyzeEvent>,
) {
    while let Some(req) = rx.recv().await {
        debug!(request_id = req.request_id, "analyze request");
        let outcome = client.analyze(&req.statement, &req.categories).await;
        if tx
            .send(AnalyzeEvent {
                request_id: req.request_id,
                outcome,
            })
            .is_err()
        {
            break;
        }
    }
}

//! The wizard controller. It alone owns `WizardState`; views read it by
//! reference and report changes as `Action`s.

use thiserror::Error;
use tracing::{info, warn};

use crate::analyzer::{AnalyzeError, Analyzer};
use crate::category::SelectionSet;
use crate::results::AnalysisResult;
use crate::upload::FileUpload;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Step {
    #[default]
    SelectCategories = 1,
    Upload = 2,
    Results = 3,
}

impl Step {
    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn title(self) -> &'static str {
        match self {
            Step::SelectCategories => "Select Categories",
            Step::Upload => "Upload Statement",
            Step::Results => "View Results",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WizardState {
    step: Step,
    selected_categories: SelectionSet,
    results: Option<AnalysisResult>,
    loading: bool,
}

impl WizardState {
    pub fn step(&self) -> Step {
        self.step
    }

    pub fn selected_categories(&self) -> &SelectionSet {
        &self.selected_categories
    }

    pub fn results(&self) -> Option<&AnalysisResult> {
        self.results.as_ref()
    }

    pub fn loading(&self) -> bool {
        self.loading
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    CategoriesChosen(SelectionSet),
    /// Return from the upload step to adjust categories.
    Back,
    AnalysisStarted,
    AnalysisSucceeded(AnalysisResult),
    AnalysisFailed,
    Reset,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WizardError {
    #[error("Select at least one category to continue")]
    EmptySelection,

    #[error("An analysis is already running")]
    AlreadyLoading,

    #[error("not allowed at step {actual:?} (needs {expected:?})")]
    WrongStep { expected: Step, actual: Step },
}

/// What happened to an analyze request.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    /// No statement held; nothing was sent.
    NoFile,
    Completed,
    /// The user-facing message, also stored on the upload component.
    Failed(String),
}

#[derive(Debug, Default)]
pub struct Wizard {
    state: WizardState,
}

impl Wizard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    fn expect_step(&self, expected: Step) -> Result<(), WizardError> {
        if self.state.step != expected {
            return Err(WizardError::WrongStep {
                expected,
                actual: self.state.step,
            });
        }
        Ok(())
    }

    pub fn dispatch(&mut self, action: Action) -> Result<(), WizardError> {
        match action {
            Action::CategoriesChosen(set) => {
                self.expect_step(Step::SelectCategories)?;
                if set.is_empty() {
                    return Err(WizardError::EmptySelection);
                }
                info!(categories = %set.to_json(), "categories chosen");
                self.state.selected_categories = set;
                self.state.step = Step::Upload;
            }
            Action::Back => {
                self.expect_step(Step::Upload)?;
                if self.state.loading {
                    return Err(WizardError::AlreadyLoading);
                }
                self.state.step = Step::SelectCategories;
            }
            Action::AnalysisStarted => {
                self.expect_step(Step::Upload)?;
                if self.state.loading {
                    return Err(WizardError::AlreadyLoading);
                }
                self.state.loading = true;
            }
            Action::AnalysisSucceeded(result) => {
                self.expect_step(Step::Upload)?;
                self.state.results = Some(result);
                self.state.loading = false;
                self.state.step = Step::Results;
            }
            Action::AnalysisFailed => {
                self.state.loading = false;
            }
            Action::Reset => {
                self.state = WizardState::default();
            }
        }
        Ok(())
    }

    /// Settle an in-flight analysis. On failure the message lands on the
    /// upload component and its statement is kept for a retry.
    pub fn complete_analysis(
        &mut self,
        upload: &mut FileUpload,
        outcome: Result<AnalysisResult, AnalyzeError>,
    ) -> AnalysisOutcome {
        let outcome = outcome.and_then(|r| {
            if r.is_consistent() {
                Ok(r)
            } else {
                Err(AnalyzeError::Inconsistent {
                    total: r.total_transactions,
                    classified: r.classified_count(),
                })
            }
        });

        match outcome {
            Ok(result) => {
                info!(
                    total = result.total_transactions,
                    expected = result.expected.len(),
                    unexpected = result.unexpected.len(),
                    "analysis complete"
                );
                if let Err(e) = self.dispatch(Action::AnalysisSucceeded(result)) {
                    warn!(error = %e, "dropping late analysis result");
                    self.state.loading = false;
                    return AnalysisOutcome::Failed(e.to_string());
                }
                AnalysisOutcome::Completed
            }
            Err(e) => {
                warn!(error = %e, "analysis failed");
                let message = e.user_message();
                upload.set_error(message.clone());
                let _ = self.dispatch(Action::AnalysisFailed);
                AnalysisOutcome::Failed(message)
            }
        }
    }

    /// Send the held statement and the chosen categories to `analyzer`.
    pub async fn run_analysis<A: Analyzer>(
        &mut self,
        upload: &mut FileUpload,
        analyzer: &A,
    ) -> Result<AnalysisOutcome, WizardError> {
        let Some(candidate) = upload.candidate() else {
            return Ok(AnalysisOutcome::NoFile);
        };
        self.dispatch(Action::AnalysisStarted)?;

        info!(
            file = %candidate.filename,
            bytes = candidate.byte_size,
            "sending statement for analysis"
        );
        let outcome = analyzer
            .analyze(candidate, &self.state.selected_categories)
            .await;

        Ok(self.complete_analysis(upload, outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::TransactionRecord;
    use crate::upload::{UploadCandidate, PDF_MIME};
    use std::sync::Mutex;

    struct Canned {
        reply: Mutex<Option<Result<AnalysisResult, AnalyzeError>>>,
        seen: Mutex<Vec<(String, SelectionSet)>>,
    }

    impl Canned {
        fn new(reply: Result<AnalysisResult, AnalyzeError>) -> Self {
            Self {
                reply: Mutex::new(Some(reply)),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl Analyzer for Canned {
        async fn analyze(
            &self,
            statement: &UploadCandidate,
            categories: &SelectionSet,
        ) -> Result<AnalysisResult, AnalyzeError> {
            self.seen
                .lock()
                .unwrap()
                .push((statement.filename.clone(), categories.clone()));
            self.reply.lock().unwrap().take().expect("called once")
        }
    }

    fn chosen(ids: &[&str]) -> SelectionSet {
        ids.iter().copied().collect()
    }

    fn upload_with_pdf() -> FileUpload {
        let mut up = FileUpload::new();
        up.offer(UploadCandidate::from_bytes("march.pdf", PDF_MIME, b"%PDF-1.7".to_vec()))
            .unwrap();
        up
    }

    fn sample_result() -> AnalysisResult {
        AnalysisResult {
            total_transactions: 2,
            expected: vec![TransactionRecord::new("Safeway")],
            unexpected: vec![TransactionRecord::new("Casino")],
        }
    }

    #[test]
    fn test_starts_at_step_one() {
        let w = Wizard::new();
        assert_eq!(w.state().step(), Step::SelectCategories);
        assert_eq!(w.state().step().number(), 1);
        assert!(w.state().selected_categories().is_empty());
        assert!(w.state().results().is_none());
        assert!(!w.state().loading());
    }

    #[test]
    fn test_empty_selection_cannot_advance() {
        let mut w = Wizard::new();
        assert_eq!(
            w.dispatch(Action::CategoriesChosen(SelectionSet::new())),
            Err(WizardError::EmptySelection)
        );
        assert_eq!(w.state().step(), Step::SelectCategories);
    }

    #[test]
    fn test_only_one_analysis_in_flight() {
        let mut w = Wizard::new();
        w.dispatch(Action::CategoriesChosen(chosen(&["gas"]))).unwrap();
        w.dispatch(Action::AnalysisStarted).unwrap();
        assert!(w.state().loading());
        assert_eq!(
            w.dispatch(Action::AnalysisStarted),
            Err(WizardError::AlreadyLoading)
        );
        assert_eq!(w.dispatch(Action::Back), Err(WizardError::AlreadyLoading));
    }

    #[test]
    fn test_back_keeps_selection() {
        let mut w = Wizard::new();
        w.dispatch(Action::CategoriesChosen(chosen(&["gas", "bills"]))).unwrap();
        w.dispatch(Action::Back).unwrap();
        assert_eq!(w.state().step(), Step::SelectCategories);
        assert_eq!(w.state().selected_categories().len(), 2);
    }

    #[test]
    fn test_analysis_requires_upload_step() {
        let mut w = Wizard::new();
        assert!(matches!(
            w.dispatch(Action::AnalysisStarted),
            Err(WizardError::WrongStep { .. })
        ));
    }

    #[tokio::test]
    async fn test_run_analysis_without_file_is_noop() {
        let mut w = Wizard::new();
        w.dispatch(Action::CategoriesChosen(chosen(&["dining"]))).unwrap();
        let analyzer = Canned::new(Ok(sample_result()));
        let mut up = FileUpload::new();

        let out = w.run_analysis(&mut up, &analyzer).await.unwrap();
        assert_eq!(out, AnalysisOutcome::NoFile);
        assert!(analyzer.seen.lock().unwrap().is_empty());
        assert!(!w.state().loading());
    }

    #[tokio::test]
    async fn test_run_analysis_success_moves_to_results() {
        let mut w = Wizard::new();
        w.dispatch(Action::CategoriesChosen(chosen(&["dining", "groceries"])))
            .unwrap();
        let analyzer = Canned::new(Ok(sample_result()));
        let mut up = upload_with_pdf();

        let out = w.run_analysis(&mut up, &analyzer).await.unwrap();
        assert_eq!(out, AnalysisOutcome::Completed);
        assert_eq!(w.state().step(), Step::Results);
        assert!(!w.state().loading());
        assert_eq!(w.state().results(), Some(&sample_result()));

        let seen = analyzer.seen.lock().unwrap();
        assert_eq!(seen[0].0, "march.pdf");
        assert_eq!(seen[0].1.as_slice(), ["dining", "groceries"]);
    }

    #[tokio::test]
    async fn test_run_analysis_failure_keeps_file() {
        let mut w = Wizard::new();
        w.dispatch(Action::CategoriesChosen(chosen(&["media"]))).unwrap();
        let analyzer = Canned::new(Err(AnalyzeError::Server {
            status: 400,
            message: Some("Could not extract text from PDF".to_string()),
        }));
        let mut up = upload_with_pdf();

        let out = w.run_analysis(&mut up, &analyzer).await.unwrap();
        assert_eq!(
            out,
            AnalysisOutcome::Failed("Could not extract text from PDF".to_string())
        );
        assert_eq!(w.state().step(), Step::Upload);
        assert!(!w.state().loading());
        assert!(up.has_file());
        assert_eq!(up.error(), Some("Could not extract text from PDF"));
    }

    #[tokio::test]
    async fn test_inconsistent_counts_are_rejected() {
        let mut w = Wizard::new();
        w.dispatch(Action::CategoriesChosen(chosen(&["travel"]))).unwrap();
        let analyzer = Canned::new(Ok(AnalysisResult {
            total_transactions: 1,
            ..sample_result()
        }));
        let mut up = upload_with_pdf();

        let out = w.run_analysis(&mut up, &analyzer).await.unwrap();
        assert!(matches!(out, AnalysisOutcome::Failed(_)));
        assert_eq!(w.state().step(), Step::Upload);
        assert!(w.state().results().is_none());
    }

    #[tokio::test]
    async fn test_reset_clears_everything() {
        let mut w = Wizard::new();
        w.dispatch(Action::CategoriesChosen(chosen(&["dining"]))).unwrap();
        let analyzer = Canned::new(Ok(sample_result()));
        let mut up = upload_with_pdf();
        w.run_analysis(&mut up, &analyzer).await.unwrap();
        assert_eq!(w.state().step(), Step::Results);

        w.dispatch(Action::Reset).unwrap();
        assert_eq!(w.state(), &WizardState::default());
        assert_eq!(w.state().step(), Step::SelectCategories);
    }
}

//! spotlight-core: category selection, statement validation, results
//! summary and the wizard controller for the Spending Spotlight client.

pub mod analyzer;
pub mod category;
pub mod results;
pub mod selection;
pub mod upload;
pub mod wizard;

pub use analyzer::{AnalyzeError, Analyzer, UNREACHABLE_MESSAGE};
pub use category::{catalog, normalize_id, Category, Predefined, SelectionSet};
pub use results::{grouped_rows, render_text, AnalysisResult, Badge, Summary, TransactionRecord};
pub use selection::{CategoryError, CategorySelection};
pub use upload::{
    mime_for_path, validate, FileUpload, UploadCandidate, UploadError, MAX_UPLOAD_BYTES, PDF_MIME,
};
pub use wizard::{Action, AnalysisOutcome, Step, Wizard, WizardError, WizardState};

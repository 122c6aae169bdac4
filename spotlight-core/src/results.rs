//! Step 3 of the wizard: the analyzer's verdict and how it is summarized.

use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// One statement line as classified by the analyzer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    #[serde(rename = "transaction")]
    pub description: String,
}

impl TransactionRecord {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
        }
    }
}

/// Decoded success body of `POST /api/analyze`.
///
/// `total_transactions` may exceed the two lists combined (lines the
/// analyzer counted but did not bucket); it may never be smaller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub total_transactions: u64,
    #[serde(default)]
    pub expected: Vec<TransactionRecord>,
    #[serde(default)]
    pub unexpected: Vec<TransactionRecord>,
}

impl AnalysisResult {
    pub fn classified_count(&self) -> u64 {
        (self.expected.len() + self.unexpected.len()) as u64
    }

    pub fn is_consistent(&self) -> bool {
        self.classified_count() <= self.total_transactions
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Badge {
    Expected,
    Unexpected,
}

impl Badge {
    pub fn label(&self) -> &'static str {
        match self {
            Badge::Expected => "Expected",
            Badge::Unexpected => "Unexpected",
        }
    }
}

/// Counts shown at the top of the results view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub total: u64,
    pub expected: usize,
    pub unexpected: usize,
    /// `None` when the analyzer reported zero transactions.
    pub unexpected_percentage: Option<f64>,
}

impl Summary {
    pub fn of(result: &AnalysisResult) -> Self {
        let unexpected = result.unexpected.len();
        let unexpected_percentage = if result.total_transactions == 0 {
            None
        } else {
            let pct = unexpected as f64 / result.total_transactions as f64 * 100.0;
            Some((pct * 10.0).round() / 10.0)
        };

        Self {
            total: result.total_transactions,
            expected: result.expected.len(),
            unexpected,
            unexpected_percentage,
        }
    }

    /// Alert line, present only when something unexpected showed up.
    pub fn banner(&self) -> Option<String> {
        if self.unexpected == 0 {
            return None;
        }
        self.unexpected_percentage
            .map(|pct| format!("{pct:.1}% of your transactions were unexpected"))
    }
}

/// Rows grouped for display: unexpected first, empty groups omitted.
pub fn grouped_rows(result: &AnalysisResult) -> Vec<(Badge, &[TransactionRecord])> {
    let mut groups = Vec::with_capacity(2);
    if !result.unexpected.is_empty() {
        groups.push((Badge::Unexpected, result.unexpected.as_slice()));
    }
    if !result.expected.is_empty() {
        groups.push((Badge::Expected, result.expected.as_slice()));
    }
    groups
}

/// Plain-text rendering of the results view.
pub fn render_text(result: &AnalysisResult) -> String {
    let summary = Summary::of(result);
    let mut out = String::new();

    let _ = writeln!(out, "Analysis complete\n");
    let _ = writeln!(out, "  Total transactions:  {}", summary.total);
    let _ = writeln!(out, "  Expected:            {}", summary.expected);
    let _ = writeln!(out, "  Unexpected:          {}", summary.unexpected);

    if let Some(banner) = summary.banner() {
        let _ = writeln!(out, "\n! {banner}");
    }

    for (badge, rows) in grouped_rows(result) {
        let heading = match badge {
            Badge::Unexpected => "Unexpected transactions",
            Badge::Expected => "Expected transactions",
        };
        let _ = writeln!(out, "\n{heading} ({})", rows.len());
        for r in rows {
            let _ = writeln!(out, "  [{}] {}", badge.label(), r.description);
        }
    }

    out
}

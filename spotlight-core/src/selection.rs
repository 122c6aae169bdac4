//! Step 1 of the wizard: choosing expected spending categories.

use thiserror::Error;
use tracing::debug;

use crate::category::{Category, Predefined, SelectionSet, catalog, normalize_id};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CategoryError {
    #[error("Category already exists")]
    Duplicate(String),
}

/// Local state of the category step: custom entries, the current
/// selection and the text input buffer.
#[derive(Debug, Clone, Default)]
pub struct CategorySelection {
    custom: Vec<Category>,
    selected: SelectionSet,
    /// Pending text typed into the "add custom" input.
    pub input: String,
}

impl CategorySelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Predefined catalog followed by custom categories.
    pub fn categories(&self) -> Vec<Category> {
        let mut all = catalog();
        all.extend(self.custom.iter().cloned());
        all
    }

    pub fn custom(&self) -> &[Category] {
        &self.custom
    }

    pub fn selected(&self) -> &SelectionSet {
        &self.selected
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.contains(id)
    }

    pub fn toggle(&mut self, id: &str) -> bool {
        let now = self.selected.toggle(id);
        debug!(id, selected = now, "toggle category");
        now
    }

    /// Add a custom category from raw text.
    ///
    /// Empty input is a no-op (`Ok(None)`). A normalized id that matches a
    /// predefined or existing custom id is rejected without touching state.
    pub fn add_custom(&mut self, raw: &str) -> Result<Option<&Category>, CategoryError> {
        let id = normalize_id(raw);
        if id.is_empty() {
            return Ok(None);
        }
        if Predefined::from_id(&id).is_some() || self.custom.iter().any(|c| c.id == id) {
            debug!(id = %id, "duplicate custom category");
            return Err(CategoryError::Duplicate(id));
        }

        self.selected.insert(id.clone());
        self.custom.push(Category::custom(id, raw.trim()));
        Ok(self.custom.last())
    }

    /// Add whatever is in the input buffer; clears it on success.
    pub fn submit_input(&mut self) -> Result<bool, CategoryError> {
        let raw = std::mem::take(&mut self.input);
        let outcome = self.add_custom(&raw).map(|added| added.is_some());
        match outcome {
            Ok(added) => Ok(added),
            Err(e) => {
                self.input = raw;
                Err(e)
            }
        }
    }

    /// Remove a custom category; unknown ids are ignored.
    pub fn remove_custom(&mut self, id: &str) -> bool {
        let Some(pos) = self.custom.iter().position(|c| c.id == id) else {
            return false;
        };
        self.custom.remove(pos);
        self.selected.remove(id);
        true
    }

    pub fn can_continue(&self) -> bool {
        !self.selected.is_empty()
    }

    /// Hand the selection to `on_complete` when at least one id is chosen.
    /// Returns whether the callback fired.
    pub fn continue_with(&self, on_complete: impl FnOnce(SelectionSet)) -> bool {
        if !self.can_continue() {
            return false;
        }
        on_complete(self.selected.clone());
        true
    }
}

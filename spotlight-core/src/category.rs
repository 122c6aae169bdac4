//! Spending categories: the fixed catalog plus user-defined entries,
//! and the ordered set of ids the user expects to spend on.

use serde::{Deserialize, Serialize};

/// A spending category the user can mark as expected.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Category {
    /// Lowercase identifier sent to the analyzer
    pub id: String,
    /// Display label
    pub label: String,
    /// Short hint shown under the label
    pub description: String,
    pub is_custom: bool,
}

impl Category {
    /// Build a custom category from already-normalized id and the label as typed.
    pub fn custom(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            description: "Custom category".to_string(),
            is_custom: true,
        }
    }
}

/// The ten predefined categories, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Predefined {
    Groceries,
    Dining,
    Gas,
    Bills,
    Media,
    Medical,
    Shopping,
    Travel,
    Entertainment,
    Maintenance,
}

impl Predefined {
    pub const ALL: [Predefined; 10] = [
        Predefined::Groceries,
        Predefined::Dining,
        Predefined::Gas,
        Predefined::Bills,
        Predefined::Media,
        Predefined::Medical,
        Predefined::Shopping,
        Predefined::Travel,
        Predefined::Entertainment,
        Predefined::Maintenance,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Predefined::Groceries => "groceries",
            Predefined::Dining => "dining",
            Predefined::Gas => "gas",
            Predefined::Bills => "bills",
            Predefined::Media => "media",
            Predefined::Medical => "medical",
            Predefined::Shopping => "shopping",
            Predefined::Travel => "travel",
            Predefined::Entertainment => "entertainment",
            Predefined::Maintenance => "maintenance",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Predefined::Groceries => "Groceries",
            Predefined::Dining => "Dining & Food",
            Predefined::Gas => "Gas & Fuel",
            Predefined::Bills => "Bills & Utilities",
            Predefined::Media => "Media & Streaming",
            Predefined::Medical => "Medical & Pharmacy",
            Predefined::Shopping => "Online Shopping",
            Predefined::Travel => "Travel & Parking",
            Predefined::Entertainment => "Entertainment",
            Predefined::Maintenance => "Car & Home Maintenance",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Predefined::Groceries => "Supermarkets, grocery stores",
            Predefined::Dining => "Restaurants, cafes, food delivery",
            Predefined::Gas => "Gas stations, EV charging",
            Predefined::Bills => "Phone, internet, electricity",
            Predefined::Media => "Netflix, Spotify, subscriptions",
            Predefined::Medical => "Pharmacies, clinics, dental",
            Predefined::Shopping => "Amazon, online retailers",
            Predefined::Travel => "Airlines, hotels, parking",
            Predefined::Entertainment => "Movies, events, clothing",
            Predefined::Maintenance => "Car services, repairs",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.id() == id)
    }

    pub fn to_category(self) -> Category {
        Category {
            id: self.id().to_string(),
            label: self.label().to_string(),
            description: self.description().to_string(),
            is_custom: false,
        }
    }
}

/// All predefined categories as owned records.
pub fn catalog() -> Vec<Category> {
    Predefined::ALL.into_iter().map(Predefined::to_category).collect()
}

/// Custom ids compare trimmed and lowercased.
pub fn normalize_id(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Insertion-ordered set of selected category ids.
///
/// Serializes as a plain JSON array, which is the `categories` form field
/// the analyzer expects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelectionSet(Vec<String>);

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.iter().any(|s| s == id)
    }

    /// Returns false when the id was already present.
    pub fn insert(&mut self, id: impl Into<String>) -> bool {
        let id = id.into();
        if self.contains(&id) {
            return false;
        }
        self.0.push(id);
        true
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|s| s != id);
        self.0.len() != before
    }

    /// Flip membership; returns true when the id is selected afterwards.
    pub fn toggle(&mut self, id: &str) -> bool {
        if self.remove(id) {
            false
        } else {
            self.0.push(id.to_string());
            true
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// JSON array encoding used for the multipart `categories` field.
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.0).unwrap_or_else(|_| "[]".to_string())
    }
}

impl<S: Into<String>> FromIterator<S> for SelectionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = SelectionSet::new();
        for id in iter {
            set.insert(id);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_has_ten_unique_lowercase_ids() {
        let cats = catalog();
        assert_eq!(cats.len(), 10);
        let mut ids: Vec<_> = cats.iter().map(|c| c.id.clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 10);
        for c in &cats {
            assert_eq!(c.id, c.id.to_lowercase());
            assert!(!c.is_custom);
        }
    }

    #[test]
    fn test_predefined_from_id() {
        assert_eq!(Predefined::from_id("dining"), Some(Predefined::Dining));
        assert_eq!(Predefined::from_id("Dining"), None);
        assert_eq!(Predefined::from_id("pets"), None);
    }

    #[test]
    fn test_serde_ids_match_catalog_ids() {
        for p in Predefined::ALL {
            let json = serde_json::to_string(&p).unwrap();
            assert_eq!(json, format!("\"{}\"", p.id()));
        }
    }

    #[test]
    fn test_normalize_id() {
        assert_eq!(normalize_id("  Pet Care \n"), "pet care");
        assert_eq!(normalize_id("   "), "");
    }

    #[test]
    fn test_selection_set_keeps_insertion_order() {
        let mut set = SelectionSet::new();
        assert!(set.insert("dining"));
        assert!(set.insert("groceries"));
        assert!(!set.insert("dining"));
        assert_eq!(set.as_slice(), ["dining", "groceries"]);
        assert_eq!(set.to_json(), r#"["dining","groceries"]"#);
    }

    #[test]
    fn test_toggle_parity() {
        let ids = ["gas", "bills", "gas", "media", "bills", "gas"];
        let mut set = SelectionSet::new();
        for id in ids {
            set.toggle(id);
        }
        // gas x3, bills x2, media x1
        let mut got: Vec<_> = set.iter().collect();
        got.sort();
        assert_eq!(got, ["gas", "media"]);
    }

    #[test]
    fn test_selection_set_serializes_as_array() {
        let set: SelectionSet = ["travel", "medical"].into_iter().collect();
        let back: SelectionSet = serde_json::from_str(&serde_json::to_string(&set).unwrap()).unwrap();
        assert_eq!(back, set);
    }
}

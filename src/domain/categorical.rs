//! Fixed label tables for the categorical clinical fields.
//!
//! The form shows clinician-friendly labels; the classifier was trained on
//! the integer encodings below. Lookups are exact and case-sensitive.

/// Raised when a label is not part of its field's fixed selection set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown {table} label: {label:?}")]
pub struct UnknownCategoryError {
    /// Name of the table the lookup ran against
    pub table: &'static str,
    /// The offending label
    pub label: String,
}

/// A fixed label → code mapping, in display order.
#[derive(Debug, PartialEq, Eq)]
pub struct CategoryTable {
    pub name: &'static str,
    pub entries: &'static [(&'static str, u8)],
}

impl CategoryTable {
    /// Labels in the order they are offered to the user.
    pub fn labels(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(label, _)| *label)
    }

    /// Number of selectable labels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Reverse lookup: the label that encodes to `code`.
    #[must_use]
    pub fn label_for(&self, code: u8) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|(_, c)| *c == code)
            .map(|(label, _)| *label)
    }

    /// Position of `label` in display order.
    #[must_use]
    pub fn position(&self, label: &str) -> Option<usize> {
        self.entries.iter().position(|(l, _)| *l == label)
    }
}

/// Diabetes and hypertension history.
pub const MEDICAL_HISTORY: CategoryTable = CategoryTable {
    name: "medical history",
    entries: &[("No history", 0), ("Diagnosed", 1)],
};

/// Nephrotoxic drug exposure.
pub const NEPHROTOXIC_DRUG: CategoryTable = CategoryTable {
    name: "nephrotoxic drug",
    entries: &[("Not used", 0), ("Used", 1)],
};

/// Serum albumin level.
pub const ALBUMIN_LEVEL: CategoryTable = CategoryTable {
    name: "albumin level",
    entries: &[
        ("Normal", 1),
        ("Mild Hypoalbuminemia", 2),
        ("Severe Hypoalbuminemia", 3),
    ],
};

/// Look up `label` in `table`.
///
/// # Errors
/// Returns [`UnknownCategoryError`] if the label is not in the table.
pub fn map_categorical(label: &str, table: &CategoryTable) -> Result<u8, UnknownCategoryError> {
    table
        .entries
        .iter()
        .find(|(l, _)| *l == label)
        .map(|(_, code)| *code)
        .ok_or_else(|| UnknownCategoryError {
            table: table.name,
            label: label.to_string(),
        })
}

//! Ordered label list shipped alongside the model.

use serde::Serialize;

/// The label the acceptance policy looks for by default.
pub const WES_ANDERSON: &str = "WES_ANDERSON";

/// Ordered, immutable list of class labels.
///
/// Index `i` names output position `i` of the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LabelSet {
    labels: Vec<String>,
}

impl LabelSet {
    /// Parses a label resource: one label per line, trimmed, blank lines dropped.
    ///
    /// Returns `None` when no label survives trimming.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        Self::new(text.lines().map(str::trim).filter(|l| !l.is_empty()))
    }

    /// Builds a label set from already-split labels.
    ///
    /// Returns `None` when the list is empty.
    pub fn new<I, S>(labels: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        if labels.is_empty() {
            None
        } else {
            Some(Self { labels })
        }
    }

    /// Number of labels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Always false; kept for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Label at `index`, if in range.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    /// Position of `label`, if present.
    #[must_use]
    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }

    /// Iterates labels in model order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }
}

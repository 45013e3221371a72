use serde::{Deserialize, Serialize};

/// A labelled biological sequence (protein or nucleotide)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sequence {
    /// Identifying label (FASTA name, feature id, ...)
    label: String,

    /// Free-text comment
    #[serde(default, skip_serializing_if = "String::is_empty")]
    comment: String,

    /// Residues exactly as supplied
    residues: String,
}

impl Sequence {
    pub fn new(
        label: impl Into<String>,
        comment: impl Into<String>,
        residues: impl Into<String>,
    ) -> Self {
        Self {
            label: label.into(),
            comment: comment.into(),
            residues: residues.into(),
        }
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub fn comment(&self) -> &str {
        &self.comment
    }

    #[must_use]
    pub fn residues(&self) -> &str {
        &self.residues
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.residues.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.residues.is_empty()
    }
}

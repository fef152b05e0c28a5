use std::collections::BTreeMap;

use super::domain::ReviewStatus;
use super::error::ValidationError;

/// How labels outside both vocabularies are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownStatusPolicy {
    Reject,
    #[default]
    Ignore,
}

/// Maps inbound status labels onto the canonical four-state lifecycle.
///
/// Canonical labels always resolve to themselves; aliases exist for older clients and only
/// apply to input, never to stored or rendered statuses.
#[derive(Debug, Clone)]
pub struct StatusVocabulary {
    aliases: BTreeMap<String, ReviewStatus>,
    unknown: UnknownStatusPolicy,
}

impl StatusVocabulary {
    pub fn canonical(unknown: UnknownStatusPolicy) -> Self {
        Self {
            aliases: BTreeMap::new(),
            unknown,
        }
    }

    /// Canonical labels plus `open`, `pending`, and `closed`.
    pub fn with_legacy_aliases(unknown: UnknownStatusPolicy) -> Self {
        Self::canonical(unknown)
            .with_alias("open", ReviewStatus::New)
            .with_alias("pending", ReviewStatus::InReview)
            .with_alias("closed", ReviewStatus::Approved)
    }

    pub fn with_alias(mut self, label: impl Into<String>, status: ReviewStatus) -> Self {
        self.aliases.insert(label.into(), status);
        self
    }

    pub fn unknown_policy(&self) -> UnknownStatusPolicy {
        self.unknown
    }

    /// Resolve a raw label; blank input and ignored unknown labels yield `None`.
    pub fn resolve(&self, raw: &str) -> Result<Option<ReviewStatus>, ValidationError> {
        let label = raw.trim();
        if label.is_empty() {
            return Ok(None);
        }

        if let Some(status) = ReviewStatus::from_label(label) {
            return Ok(Some(status));
        }

        if let Some(status) = self.aliases.get(label) {
            return Ok(Some(*status));
        }

        match self.unknown {
            UnknownStatusPolicy::Reject => {
                Err(ValidationError::UnknownStatusLabel(label.to_string()))
            }
            UnknownStatusPolicy::Ignore => Ok(None),
        }
    }
}

impl Default for StatusVocabulary {
    fn default() -> Self {
        Self::with_legacy_aliases(UnknownStatusPolicy::default())
    }
}

use super::status::UnknownStatusPolicy;
use super::transition::TransitionPolicy;

/// Runtime knobs for the review service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewSettings {
    /// Used when a rejected ticket has no webhook of its own.
    pub fallback_webhook_url: Option<String>,
    pub audit_feed_limit: usize,
    pub unknown_status: UnknownStatusPolicy,
    pub transition_policy: TransitionPolicy,
}

impl Default for ReviewSettings {
    fn default() -> Self {
        Self {
            fallback_webhook_url: None,
            audit_feed_limit: 200,
            unknown_status: UnknownStatusPolicy::Ignore,
            transition_policy: TransitionPolicy::Permissive,
        }
    }
}

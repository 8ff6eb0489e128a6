use serde::{Deserialize, Serialize};

/// Outcome of a grant evaluation.
///
/// Three-valued: `Indeterminate` means no applicable rule was found, which
/// is distinct from both `Allow` and `Deny`. Callers must apply their own
/// default policy to it rather than collapsing it into a boolean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessDecision {
    /// An active grant allows the operation.
    Allow,
    /// An active grant explicitly denies the operation.
    Deny,
    /// No active grant applies.
    Indeterminate,
}

impl AccessDecision {
    /// Returns the stable transport encoding: 1 allow, -1 deny, 0 indeterminate.
    #[must_use]
    pub fn as_i8(&self) -> i8 {
        match self {
            Self::Allow => 1,
            Self::Deny => -1,
            Self::Indeterminate => 0,
        }
    }

    /// Builds the decision an active grant produces from its deny flag.
    #[must_use]
    pub fn from_deny_flag(is_denied: bool) -> Self {
        if is_denied { Self::Deny } else { Self::Allow }
    }
}

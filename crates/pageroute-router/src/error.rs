//! Error types raised at route registration.
//!
//! All failures in this crate surface while a route is being registered;
//! matching never returns an error. A request that cannot be routed is a
//! plain "no match" outcome, not a fault.

/// Why a route was rejected at registration time.
///
/// The tree is left untouched when any of these is returned: a rejected
/// route is never partially inserted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
    /// The pattern text itself is ill-formed: unmatched braces, an empty
    /// parameter name, or an invalid `?`/`=` combination.
    #[error("invalid pattern `{pattern}`: {message}")]
    PatternSyntax { pattern: String, message: String },

    /// The segments are individually well-formed but violate a structural
    /// rule, e.g. a required segment after an optional one, or a wildcard
    /// that is not the final segment.
    #[error("invalid route structure in `{pattern}`: {message}")]
    Structural { pattern: String, message: String },

    /// A constraint specifier could not be parsed, e.g. `min(abc)`.
    ///
    /// Note that an *unknown constraint name* is not a registration error:
    /// it is accepted and rejects every candidate at match time.
    #[error("invalid constraint `{specifier}` in `{pattern}`: {message}")]
    ConstraintFormat {
        pattern: String,
        specifier: String,
        message: String,
    },
}

impl RegistrationError {
    pub(crate) fn syntax(pattern: &str, message: impl Into<String>) -> Self {
        Self::PatternSyntax {
            pattern: pattern.to_owned(),
            message: message.into(),
        }
    }

    pub(crate) fn structural(pattern: &str, message: impl Into<String>) -> Self {
        Self::Structural {
            pattern: pattern.to_owned(),
            message: message.into(),
        }
    }
}

/// Internal parse failure for a single constraint specifier.
///
/// Converted into [`RegistrationError::ConstraintFormat`] once the pattern
/// context is known.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub(crate) struct ConstraintSpecError {
    pub(crate) specifier: String,
    pub(crate) message: String,
}

impl ConstraintSpecError {
    pub(crate) fn new(specifier: &str, message: impl Into<String>) -> Self {
        Self {
            specifier: specifier.to_owned(),
            message: message.into(),
        }
    }
}

//! Identity provider seam.
//!
//! Routine queries are scoped by the stable user id of the signed-in user.
//! Session listening and credential refresh live outside the core.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Failure to resolve the current user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// No signed-in session.
    SignedOut,
    /// Provider failed to answer.
    Unavailable(String),
}

impl Display for IdentityError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SignedOut => write!(f, "no signed-in user"),
            Self::Unavailable(message) => write!(f, "identity provider unavailable: {message}"),
        }
    }
}

impl Error for IdentityError {}

/// Resolves the current user's stable identifier.
pub trait IdentityProvider {
    fn current_user_id(&self) -> Result<String, IdentityError>;
}

/// Fixed identity, for tools and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticIdentity(Option<String>);

impl StaticIdentity {
    pub fn signed_in(user_id: impl Into<String>) -> Self {
        Self(Some(user_id.into()))
    }

    pub fn signed_out() -> Self {
        Self(None)
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_user_id(&self) -> Result<String, IdentityError> {
        match self.0.as_deref().map(str::trim) {
            Some(user_id) if !user_id.is_empty() => Ok(user_id.to_string()),
            _ => Err(IdentityError::SignedOut),
        }
    }
}

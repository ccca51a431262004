//! Session identity passed into every store operation.

use shopcart_core::UserId;

/// The signed-in user on whose behalf the store talks to the backend.
///
/// The store never looks the identity up itself; callers pass
/// `Option<&Session>` and `None` means "not signed in".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Backend user identifier.
    pub user_id: UserId,
}

impl Session {
    /// Create a session for the given user.
    #[must_use]
    pub fn new(user_id: impl Into<UserId>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

//! Identity Service contract consumed by the gateway.

use async_trait::async_trait;

use crate::domain::UserIdentity;
use crate::error::GatewayError;

/// Resolves bearer tokens and usernames to user identities.
///
/// `Ok(None)` means the token or username is unknown. `Err` is reserved for
/// transient failures of the backing service, so callers can tell "not
/// found" apart from "try again later".
#[async_trait]
pub trait IdentityService: Send + Sync + std::fmt::Debug {
    /// Looks up the user owning `token`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::StoreFailure`] if the lookup itself fails.
    async fn verify_token(&self, token: &str) -> Result<Option<UserIdentity>, GatewayError>;

    /// Looks up a user by username.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::StoreFailure`] if the lookup itself fails.
    async fn resolve_username(&self, username: &str)
    -> Result<Option<UserIdentity>, GatewayError>;
}

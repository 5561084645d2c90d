//! Persisted sign-in state.
//!
//! The identity provider is external; this module only remembers which
//! profile is signed in on this device, under the `user` key.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{LedgerResult, ValidationError};
use crate::storage::{KvStore, StorageError};

/// Storage key holding the signed-in profile.
pub const USER_KEY: &str = "user";

/// Profile handed over by the identity provider after sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Provider-assigned user id.
    pub uid: String,
    /// Sign-in email, if the provider shares it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Name shown in the profile view.
    #[serde(default, rename = "name", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Avatar URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
}

impl UserProfile {
    /// Create a profile with only an id.
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            email: None,
            display_name: None,
            profile_image: None,
        }
    }

    /// Attach an email address.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Attach a display name.
    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }
}

/// Signed-in profile cached in memory and mirrored to the store.
pub struct UserSession {
    store: Arc<dyn KvStore>,
    current: Option<UserProfile>,
}

impl std::fmt::Debug for UserSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserSession").field("current", &self.current).finish_non_exhaustive()
    }
}

impl UserSession {
    /// Restore the previously signed-in profile, if any.
    ///
    /// A stored profile that does not decode is logged and treated as
    /// signed out.
    ///
    /// # Errors
    /// Returns the storage error if the read itself failed.
    pub fn restore(store: Arc<dyn KvStore>) -> Result<Self, StorageError> {
        let current = match store.get(USER_KEY) {
            Ok(Some(bytes)) => match serde_json::from_slice::<UserProfile>(&bytes) {
                Ok(profile) => Some(profile),
                Err(e) => {
                    warn!(error = %e, "stored user profile does not decode, signing out");
                    None
                }
            },
            Ok(None) => None,
            Err(StorageError::Corrupted(reason)) => {
                warn!(%reason, "stored user profile is corrupt, signing out");
                None
            }
            Err(e) => return Err(e),
        };
        Ok(Self { store, current })
    }

    /// The signed-in profile.
    #[must_use]
    pub const fn current(&self) -> Option<&UserProfile> {
        self.current.as_ref()
    }

    /// Returns true if a profile is signed in.
    #[must_use]
    pub const fn is_signed_in(&self) -> bool {
        self.current.is_some()
    }

    /// Persist `profile` as the signed-in user.
    ///
    /// # Errors
    /// - `LedgerError::Validation` if the uid is blank
    /// - `LedgerError::Storage` if the write failed; the previous profile stays current
    pub fn login(&mut self, profile: UserProfile) -> LedgerResult<()> {
        if profile.uid.trim().is_empty() {
            return Err(ValidationError::MissingField {
                field: "uid".to_string(),
            }
            .into());
        }

        let bytes = serde_json::to_vec(&profile)
            .map_err(|e| StorageError::Backend(format!("profile serialization failed: {e}")))?;
        self.store.set(USER_KEY, &bytes)?;

        info!(uid = %profile.uid, "signed in");
        self.current = Some(profile);
        Ok(())
    }

    /// Forget the signed-in profile.
    ///
    /// # Errors
    /// Returns the storage error if the stored profile could not be removed.
    pub fn logout(&mut self) -> Result<(), StorageError> {
        self.store.remove(USER_KEY)?;
        if let Some(profile) = self.current.take() {
            info!(uid = %profile.uid, "signed out");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryKvStore;

    #[test]
    fn login_restore_logout() {
        let store: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());

        let mut session = UserSession::restore(store.clone()).unwrap();
        assert!(!session.is_signed_in());

        let profile = UserProfile::new("u-1")
            .with_email("ana@example.com")
            .with_display_name("Ana");
        session.login(profile.clone()).unwrap();
        assert_eq!(session.current(), Some(&profile));

        let restored = UserSession::restore(store.clone()).unwrap();
        assert_eq!(restored.current(), Some(&profile));

        session.logout().unwrap();
        assert!(session.current().is_none());
        assert!(!UserSession::restore(store).unwrap().is_signed_in());
    }

    #[test]
    fn profile_uses_client_field_names() {
        let mut profile = UserProfile::new("u-2").with_display_name("Bob");
        profile.profile_image = Some("https://example.com/bob.png".to_string());

        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"uid": "u-2", "name": "Bob", "profileImage": "https://example.com/bob.png"})
        );
    }

    #[test]
    fn blank_uid_is_rejected() {
        let store: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
        let mut session = UserSession::restore(store.clone()).unwrap();

        let err = session.login(UserProfile::new("   ")).unwrap_err();
        assert!(err.is_validation());
        assert_eq!(store.get(USER_KEY).unwrap(), None);
    }

    #[test]
    fn undecodable_profile_means_signed_out() {
        let store: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
        store.set(USER_KEY, b"{\"name\": 3}").unwrap();

        let session = UserSession::restore(store).unwrap();
        assert!(session.current().is_none());
    }
}

//! Account Store
//!
//! Nick → password digest. Passwords are never kept; the digest is a
//! domain-separated SHA-256 over the length-prefixed nick and password.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::core::hash::StateHasher;

/// Authentication errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Nick was never registered.
    #[error("user {0} is not registered")]
    UnknownUser(String),
    /// Password digest mismatch.
    #[error("user registered with a different password")]
    WrongPassword,
}

/// Result of a successful `register`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// New account.
    Created,
    /// Existing account, password matched.
    Authenticated,
}

/// Hex digest stored for `nick` / `password`.
pub fn password_digest(nick: &str, password: &str) -> String {
    let mut hasher = StateHasher::for_account();
    hasher.update_str(nick);
    hasher.update_str(password);
    hex::encode(hasher.finalize())
}

/// Registered accounts.
#[derive(Clone, Debug, Default)]
pub struct AccountStore {
    accounts: BTreeMap<String, String>,
}

impl AccountStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store from persisted digests.
    pub fn from_digests(accounts: BTreeMap<String, String>) -> Self {
        Self { accounts }
    }

    /// Create the account, or check the password of an existing one.
    pub fn register(&mut self, nick: &str, password: &str) -> Result<RegisterOutcome, AuthError> {
        let digest = password_digest(nick, password);
        match self.accounts.get(nick) {
            Some(stored) if *stored == digest => Ok(RegisterOutcome::Authenticated),
            Some(_) => Err(AuthError::WrongPassword),
            None => {
                self.accounts.insert(nick.to_string(), digest);
                Ok(RegisterOutcome::Created)
            }
        }
    }

    /// Check credentials.
    pub fn verify(&self, nick: &str, password: &str) -> Result<(), AuthError> {
        match self.accounts.get(nick) {
            None => Err(AuthError::UnknownUser(nick.to_string())),
            Some(stored) if *stored == password_digest(nick, password) => Ok(()),
            Some(_) => Err(AuthError::WrongPassword),
        }
    }

    /// Number of accounts.
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// True when no account exists.
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Digests for persistence.
    pub fn digests(&self) -> &BTreeMap<String, String> {
        &self.accounts
    }
}

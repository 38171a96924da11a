//! Account access-key records and the directory lookup seam.
//!
//! The account directory itself is an external collaborator (a database or a
//! remote service); this module only defines the record shape verification
//! consumes and a small in-memory directory used by tests and single-node
//! deployments.

use crate::error::AuthError;

/// One access-key record on an account.
#[derive(Debug, Clone)]
pub struct AccessKey {
    /// The access key ID.
    pub access_key: String,
    /// The matching secret key. Absence is an internal error at verification
    /// time, never a silent pass.
    pub secret_key: Option<String>,
    /// Deactivated keys fail verification even with a correct signature.
    pub deactivated: bool,
}

impl AccessKey {
    /// Create an active access-key record.
    #[must_use]
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: Some(secret_key.into()),
            deactivated: false,
        }
    }
}

/// The access-key credentials of one account, as resolved by the directory.
#[derive(Debug, Clone, Default)]
pub struct AccountCredentials {
    /// All access keys on the account, in directory order.
    pub access_keys: Vec<AccessKey>,
}

/// Lookup seam to the external account directory.
///
/// Implementations may be backed by anything from an in-memory table to a
/// remote database; an outage surfaces as
/// [`AuthError::DirectoryUnavailable`] and is never retried here.
pub trait AccountDirectory: Send + Sync {
    /// Resolve the account owning the given access key, if any.
    fn find_account(&self, access_key: &str) -> Result<Option<AccountCredentials>, AuthError>;
}

/// In-memory account directory.
#[derive(Debug, Default)]
pub struct StaticAccountDirectory {
    accounts: Vec<AccountCredentials>,
}

impl StaticAccountDirectory {
    /// Create a directory over a fixed set of accounts.
    #[must_use]
    pub fn new(accounts: Vec<AccountCredentials>) -> Self {
        Self { accounts }
    }

    /// Create a directory holding one account with one active key pair.
    #[must_use]
    pub fn single(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self::new(vec![AccountCredentials {
            access_keys: vec![AccessKey::new(access_key, secret_key)],
        }])
    }
}

impl AccountDirectory for StaticAccountDirectory {
    fn find_account(&self, access_key: &str) -> Result<Option<AccountCredentials>, AuthError> {
        Ok(self
            .accounts
            .iter()
            .find(|account| {
                account
                    .access_keys
                    .iter()
                    .any(|key| key.access_key == access_key)
            })
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_find_account_by_any_of_its_keys() {
        let directory = StaticAccountDirectory::new(vec![AccountCredentials {
            access_keys: vec![AccessKey::new("AK1", "S1"), AccessKey::new("AK2", "S2")],
        }]);

        assert!(directory.find_account("AK2").unwrap().is_some());
        assert!(directory.find_account("AK3").unwrap().is_none());
    }

    #[test]
    fn test_should_build_single_account_directory() {
        let directory = StaticAccountDirectory::single("AK", "SECRET");
        let account = directory.find_account("AK").unwrap().unwrap();
        assert_eq!(account.access_keys.len(), 1);
        assert!(!account.access_keys[0].deactivated);
    }
}

use anyhow::{Context, Result};
use keyring::Entry;

const SERVICE_NAME: &str = "registrar";

/// Refresh credentials kept in the OS keychain, keyed by user id.
pub struct CredentialStore;

impl CredentialStore {
    /// Store the refresh token for a user
    pub fn store(user_id: &str, refresh_token: &str) -> Result<()> {
        let entry = Entry::new(SERVICE_NAME, user_id)
            .context("Failed to create keyring entry")?;
        entry
            .set_password(refresh_token)
            .context("Failed to store refresh token in keychain")?;
        Ok(())
    }

    /// Retrieve the refresh token for a user
    pub fn get(user_id: &str) -> Result<String> {
        let entry = Entry::new(SERVICE_NAME, user_id)
            .context("Failed to create keyring entry")?;
        entry
            .get_password()
            .context("Failed to retrieve refresh token from keychain")
    }

    /// Delete the stored refresh token for a user
    pub fn delete(user_id: &str) -> Result<()> {
        let entry = Entry::new(SERVICE_NAME, user_id)
            .context("Failed to create keyring entry")?;
        entry
            .delete_credential()
            .context("Failed to delete credential from keychain")?;
        Ok(())
    }
}

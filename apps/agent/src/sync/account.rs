use tracing::{info, warn};

use crate::api_client::ApiClient;
use crate::errors::AgentError;
use crate::models::auth::TokenPair;
use crate::store::CredentialStore;
use crate::sync::access_token;

/// Account lifecycle and pairing: register, login, logout, invitations.
#[derive(Clone)]
pub struct AccountService {
    api: ApiClient,
    credentials: CredentialStore,
}

impl AccountService {
    pub fn new(api: ApiClient, credentials: CredentialStore) -> Self {
        Self { api, credentials }
    }

    pub fn is_logged_in(&self) -> bool {
        self.credentials.access().is_some()
    }

    pub async fn register(
        &self,
        display_name: &str,
        email: &str,
        password: &str,
    ) -> Result<(), AgentError> {
        let (display_name, email) = (display_name.trim(), email.trim());
        if display_name.is_empty() || email.is_empty() || password.is_empty() {
            return Err(AgentError::Validation("Please fill all fields".to_string()));
        }

        let tokens = self.api.register(display_name, email, password).await?;
        self.store_tokens(&tokens)?;
        info!("Registered and logged in as {email}");
        Ok(())
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<(), AgentError> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(AgentError::Validation(
                "Please enter email and password".to_string(),
            ));
        }

        let tokens = self.api.login(email, password).await?;
        self.store_tokens(&tokens)?;
        info!("Logged in as {email}");
        Ok(())
    }

    /// Without a stored refresh token there is nothing to revoke and the local
    /// credentials are just cleared. Otherwise local credentials are cleared
    /// only once the backend has accepted the logout.
    pub async fn logout(&self) -> Result<(), AgentError> {
        let Some(refresh) = self.credentials.refresh() else {
            self.credentials.clear()?;
            return Ok(());
        };

        let access = self.credentials.access();
        self.api.logout(access.as_deref(), &refresh).await?;
        self.credentials.clear()?;
        info!("Logged out");
        Ok(())
    }

    pub async fn create_invitation(&self) -> Result<String, AgentError> {
        let token = access_token(&self.credentials)?;
        let code = self.api.create_invitation(&token).await?;
        info!("Invite code created");
        Ok(code)
    }

    pub async fn accept_invitation(&self, invite_code: &str) -> Result<(), AgentError> {
        let invite_code = invite_code.trim();
        if invite_code.is_empty() {
            return Err(AgentError::Validation("Please enter an invite code".to_string()));
        }

        let token = access_token(&self.credentials)?;
        self.api.accept_invitation(&token, invite_code).await?;
        info!("Successfully paired");
        Ok(())
    }

    pub async fn unlink(&self) -> Result<(), AgentError> {
        let token = access_token(&self.credentials)?;
        self.api.unlink(&token).await?;
        info!("Successfully unlinked");
        Ok(())
    }

    fn store_tokens(&self, tokens: &TokenPair) -> Result<(), AgentError> {
        if !tokens.is_complete() {
            warn!("Auth response is missing a token; nothing stored");
            return Err(AgentError::MissingTokens);
        }
        self.credentials.save(&tokens.access, &tokens.refresh)?;
        Ok(())
    }
}

//! Bearer-token attachment for outgoing API requests.

use reqwest::RequestBuilder;
use secrecy::{ExposeSecret, SecretString};

use crate::errors::AppError;
use crate::storage::ClientStorage;

/// Storage key holding the signed-in user's access token.
pub const TOKEN_KEY: &str = "token";

/// Access token read from client storage.
///
/// Must be obtained before building a request so that a missing token
/// short-circuits the call:
/// ```ignore
/// let token = BearerToken::from_storage(storage.as_ref())?;
/// let response = token.authorize(http.get(url)).send().await?;
/// ```
#[derive(Debug, Clone)]
pub struct BearerToken(SecretString);

impl BearerToken {
    pub fn from_storage(storage: &dyn ClientStorage) -> Result<Self, AppError> {
        let token = storage
            .get(TOKEN_KEY)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or(AppError::Unauthorized)?;
        Ok(Self(SecretString::from(token)))
    }

    pub fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request.bearer_auth(self.0.expose_secret())
    }
}

/// Sign in with an externally issued token.
pub fn store_token(storage: &dyn ClientStorage, token: &SecretString) -> Result<(), AppError> {
    storage.set(TOKEN_KEY, token.expose_secret().trim())
}

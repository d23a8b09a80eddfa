//! HTTP login against the game service.

use crate::{AccountRecord, BotConfig, UserId};
use async_trait::async_trait;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument};

/// Something that can exchange an account credential for a socket token.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Fetches a fresh access token for `account`.
    async fn fetch_token(&self, account: &AccountRecord) -> Result<String, LoginError>;
}

/// Login request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest<'a> {
    /// Player id.
    pub telegram_id: &'a UserId,
    /// First name.
    pub first_name: Option<&'a str>,
    /// Last name.
    pub last_name: Option<&'a str>,
    /// Interface language.
    pub language_code: Option<&'a str>,
    /// Always false.
    pub is_vip: bool,
}

impl<'a> LoginRequest<'a> {
    /// Builds the body for `account`.
    pub fn for_account(account: &'a AccountRecord) -> Self {
        let user = account.user();
        Self {
            telegram_id: account.id(),
            first_name: user.first_name().as_deref(),
            last_name: user.last_name().as_deref(),
            language_code: user.language_code().as_deref(),
            is_vip: false,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginData {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<LoginData>,
}

/// Extracts the access token from a login response body.
///
/// # Errors
///
/// Returns [`LoginError`] if the body is not JSON, reports failure, or has
/// no token.
pub fn parse_login_response(body: &str) -> Result<String, LoginError> {
    let response: LoginResponse = serde_json::from_str(body)
        .map_err(|e| LoginError::new(format!("Failed to parse login response: {}", e)))?;

    if !response.success {
        return Err(LoginError::new("Login failed"));
    }

    response
        .data
        .map(|data| data.access_token)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| LoginError::new("Login response has no access token"))
}

/// Login client for the game service.
#[derive(Debug, Clone)]
pub struct LoginClient {
    login_url: String,
    origin: String,
    referer: String,
    user_agent: String,
    client: reqwest::Client,
}

impl LoginClient {
    /// Creates a login client from configuration.
    #[instrument(skip(config), fields(base_url = %config.base_url()))]
    pub fn new(config: &BotConfig) -> Result<Self, LoginError> {
        let client = reqwest::Client::builder()
            .timeout(config.login_timeout())
            .build()
            .map_err(|e| LoginError::new(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            login_url: format!("{}/api/user/login", config.base_url().trim_end_matches('/')),
            origin: config.origin().clone(),
            referer: config.referer().clone(),
            user_agent: config.login_user_agent().clone(),
            client,
        })
    }

    /// Login endpoint.
    pub fn login_url(&self) -> &str {
        &self.login_url
    }
}

#[async_trait]
impl TokenSource for LoginClient {
    #[instrument(skip(self, account), fields(account = *account.index(), id = %account.id()))]
    async fn fetch_token(&self, account: &AccountRecord) -> Result<String, LoginError> {
        debug!(url = %self.login_url, "Sending login request");

        let response = self
            .client
            .post(&self.login_url)
            .header("Accept", "application/json, text/plain, */*")
            .header("Origin", &self.origin)
            .header("Referer", &self.referer)
            .header("User-Agent", &self.user_agent)
            .bearer_auth(account.query())
            .json(&LoginRequest::for_account(account))
            .send()
            .await
            .map_err(|e| {
                error!(error = ?e, "Login request failed");
                LoginError::new(format!("Login request failed: {}", e))
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            error!(error = ?e, "Failed to read login response");
            LoginError::new(format!("Failed to read login response: {}", e))
        })?;

        if !status.is_success() {
            error!(status = %status, response = %body, "Login rejected");
            return Err(LoginError::new(format!("Login rejected with {}: {}", status, body)));
        }

        let token = parse_login_response(&body)?;
        info!("Access token acquired");
        Ok(token)
    }
}

/// Login error.
#[derive(Debug, Clone, Display, Error)]
#[display("Login error: {} at {}:{}", message, file, line)]
pub struct LoginError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl LoginError {
    /// Creates a new login error.
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}

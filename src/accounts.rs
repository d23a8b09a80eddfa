//! Account file parsing.
//!
//! Each non-blank line of the account file is a URL query string as handed
//! out by the game's web app. Its `user` field holds URL-encoded JSON
//! describing the player. Lines that cannot be decoded are skipped.

use crate::ConfigError;
use derive_getters::Getters;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, instrument, warn};

/// Player identifier as it appears in the user JSON.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(untagged)]
pub enum UserId {
    /// Numeric id.
    Numeric(i64),
    /// String id.
    Text(String),
}

impl UserId {
    /// A zero or empty id counts as missing.
    pub fn is_blank(&self) -> bool {
        match self {
            UserId::Numeric(id) => *id == 0,
            UserId::Text(id) => id.trim().is_empty(),
        }
    }
}

/// Player profile embedded in an account record.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
pub struct TelegramUser {
    /// Player id.
    #[serde(default)]
    id: Option<UserId>,
    /// First name.
    #[serde(default)]
    first_name: Option<String>,
    /// Last name.
    #[serde(default)]
    last_name: Option<String>,
    /// Interface language.
    #[serde(default)]
    language_code: Option<String>,
    /// Handle.
    #[serde(default)]
    username: Option<String>,
}

/// One decoded line of the account file.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct AccountRecord {
    /// 1-based position in the file.
    index: usize,
    /// The raw line, used verbatim as the login credential.
    query: String,
    /// Decoded player profile.
    user: TelegramUser,
    /// Player id, guaranteed present.
    id: UserId,
}

impl AccountRecord {
    /// Name to show in logs: first name, then handle, then id.
    pub fn display_name(&self) -> String {
        self.user
            .first_name
            .clone()
            .or_else(|| self.user.username.clone())
            .unwrap_or_else(|| self.id.to_string())
    }

    /// Decodes one line of the account file.
    ///
    /// # Errors
    ///
    /// Returns [`AccountError`] if the line has no `user` field, the field is
    /// not valid JSON, or the JSON has no usable id.
    #[instrument(skip(line))]
    pub fn parse(index: usize, line: &str) -> Result<Self, AccountError> {
        let query = line.trim();
        let user_field = url::form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == "user")
            .map(|(_, value)| value.into_owned())
            .ok_or_else(|| AccountError::new(index, "User data not found"))?;

        let user: TelegramUser = serde_json::from_str(&user_field)
            .map_err(|e| AccountError::new(index, format!("Invalid user JSON: {}", e)))?;

        let id = match &user.id {
            Some(id) if !id.is_blank() => id.clone(),
            _ => return Err(AccountError::new(index, "Invalid user ID")),
        };

        debug!(%id, "Parsed account record");
        Ok(Self {
            index,
            query: query.to_string(),
            user,
            id,
        })
    }
}

/// Loads every valid record from the account file.
///
/// Carriage returns are stripped and blank lines ignored. Invalid records
/// are logged and skipped.
///
/// # Errors
///
/// Returns [`ConfigError`] if the file cannot be read or has no non-blank
/// lines.
#[instrument(skip(path), fields(path = %path.as_ref().display()))]
pub fn load_accounts(path: impl AsRef<Path>) -> Result<Vec<AccountRecord>, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| {
        ConfigError::new(format!(
            "Failed to read account file {}: {}",
            path.display(),
            e
        ))
    })?;

    let content = content.replace('\r', "");
    let lines: Vec<&str> = content.lines().filter(|line| !line.trim().is_empty()).collect();

    if lines.is_empty() {
        return Err(ConfigError::new(format!(
            "Account file is empty: {}",
            path.display()
        )));
    }

    let total = lines.len();
    let mut accounts = Vec::with_capacity(total);
    for (offset, line) in lines.into_iter().enumerate() {
        let index = offset + 1;
        match AccountRecord::parse(index, line) {
            Ok(record) => accounts.push(record),
            Err(e) => warn!(account = index, total, error = %e.message, "Skipping account"),
        }
    }

    info!(valid = accounts.len(), total, "Account file loaded");
    Ok(accounts)
}

/// A single account record could not be decoded.
#[derive(Debug, Clone, Display, Error)]
#[display("Account {} error: {} at {}:{}", index, message, file, line)]
pub struct AccountError {
    /// 1-based record position.
    pub index: usize,
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl AccountError {
    /// Creates a new account error.
    #[track_caller]
    pub fn new(index: usize, message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            index,
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}

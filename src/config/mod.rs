#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

use crate::adapters::credentials::{PasswordLogin, SessionCredentials, StaticToken};
use crate::core::reconciler::DEFAULT_CONCURRENT_REQUESTS;
use crate::domain::model::TrunkId;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{Result, SyncError};
use crate::utils::validation::{self, Validate};
use reqwest::Client;
use std::time::Duration;
use toml_config::TomlConfig;

pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthSettings {
    Token(String),
    Login { username: String, password: String },
    Missing,
}

/// CLI 與設定檔合併後的最終設定
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub base_url: String,
    pub timeout_seconds: u64,
    pub concurrent_requests: usize,
    pub auth: AuthSettings,
    pub source: Option<TrunkId>,
    pub destination: Option<TrunkId>,
    pub verbose: bool,
    pub json_logs: bool,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            concurrent_requests: DEFAULT_CONCURRENT_REQUESTS,
            auth: AuthSettings::Missing,
            source: None,
            destination: None,
            verbose: false,
            json_logs: false,
        }
    }
}

impl SyncSettings {
    pub fn from_toml(config: &TomlConfig) -> Self {
        let mut settings = Self {
            base_url: config.server.base_url.clone(),
            timeout_seconds: config
                .server
                .timeout_seconds
                .unwrap_or(DEFAULT_TIMEOUT_SECONDS),
            ..Self::default()
        };

        if let Some(auth) = &config.auth {
            settings.auth = auth_settings(
                auth.token.clone(),
                auth.username.clone(),
                auth.password.clone(),
            );
        }

        if let Some(sync) = &config.sync {
            settings.source = sync.source_trunk.map(TrunkId);
            settings.destination = sync.destination_trunk.map(TrunkId);
            if let Some(concurrent) = sync.concurrent_requests {
                settings.concurrent_requests = concurrent;
            }
        }

        if let Some(logging) = &config.logging {
            settings.verbose = logging.verbose.unwrap_or(false);
            settings.json_logs = logging.json.unwrap_or(false);
        }

        settings
    }

    /// 複製作業需要的來源與目的 trunk
    pub fn copy_targets(&self) -> Result<(TrunkId, TrunkId)> {
        let source = *validation::validate_required_field("sync.source_trunk", &self.source)?;
        let destination =
            *validation::validate_required_field("sync.destination_trunk", &self.destination)?;

        if source == destination {
            return Err(SyncError::ConfigValidationError {
                field: "sync.destination_trunk".to_string(),
                message: format!("destination must differ from source trunk {}", source),
            });
        }

        Ok((source, destination))
    }

    pub fn http_client(&self) -> Result<Client> {
        Ok(Client::builder().timeout(self.request_timeout()).build()?)
    }

    pub fn credentials(&self, client: Client) -> Result<SessionCredentials> {
        match &self.auth {
            AuthSettings::Token(token) => Ok(SessionCredentials::Token(StaticToken::new(
                token.clone(),
            ))),
            AuthSettings::Login { username, password } => {
                Ok(SessionCredentials::Login(PasswordLogin::new(
                    &self.base_url,
                    username.clone(),
                    password.clone(),
                    client,
                )))
            }
            AuthSettings::Missing => Err(SyncError::MissingConfigError {
                field: "auth.token or auth.username/auth.password".to_string(),
            }),
        }
    }
}

/// token 優先；帳號密碼要成對才算數
pub fn auth_settings(
    token: Option<String>,
    username: Option<String>,
    password: Option<String>,
) -> AuthSettings {
    match (token, username, password) {
        (Some(token), _, _) if !token.trim().is_empty() => AuthSettings::Token(token),
        (_, Some(username), Some(password)) => AuthSettings::Login { username, password },
        _ => AuthSettings::Missing,
    }
}

impl ConfigProvider for SyncSettings {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    fn concurrent_requests(&self) -> usize {
        self.concurrent_requests
    }
}

impl Validate for SyncSettings {
    fn validate(&self) -> Result<()> {
        validation::validate_url("server.base_url", &self.base_url)?;
        validation::validate_range("server.timeout_seconds", self.timeout_seconds, 1, 600)?;
        validation::validate_positive_number(
            "sync.concurrent_requests",
            self.concurrent_requests,
            1,
        )?;

        match &self.auth {
            AuthSettings::Token(token) => {
                validation::validate_non_empty_string("auth.token", token)?;
                reject_unresolved_env("auth.token", token)?;
            }
            AuthSettings::Login { username, password } => {
                validation::validate_non_empty_string("auth.username", username)?;
                reject_unresolved_env("auth.username", username)?;
                reject_unresolved_env("auth.password", password)?;
            }
            AuthSettings::Missing => {
                return Err(SyncError::MissingConfigError {
                    field: "auth.token or auth.username/auth.password".to_string(),
                })
            }
        }

        Ok(())
    }
}

fn reject_unresolved_env(field: &str, value: &str) -> Result<()> {
    if value.contains("${") {
        return Err(SyncError::ConfigValidationError {
            field: field.to_string(),
            message: format!("unresolved environment variable in '{}'", value),
        });
    }
    Ok(())
}

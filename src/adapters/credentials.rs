use crate::domain::ports::CredentialProvider;
use crate::utils::error::{Result, SyncError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;

/// 呼叫端直接提供的 bearer token
#[derive(Clone)]
pub struct StaticToken {
    token: String,
}

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        let token = token.into();
        // 容許直接貼上整個 Authorization 標頭值
        let token = token
            .strip_prefix("Bearer ")
            .map(str::to_string)
            .unwrap_or(token);
        Self { token }
    }
}

impl std::fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StaticToken(***)")
    }
}

#[async_trait]
impl CredentialProvider for StaticToken {
    async fn bearer_token(&self) -> Result<String> {
        Ok(self.token.clone())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
    security_code: &'a str,
}

#[derive(Debug, Deserialize)]
struct AccessToken {
    access_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LoginResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    token: Option<AccessToken>,
}

/// 以管理員帳密向 web client 登入端點換取 token
///
/// 第一次取用時登入，之後整個 provider 存活期間都重用同一個 token。
pub struct PasswordLogin {
    base_url: String,
    username: String,
    password: String,
    client: Client,
    token: OnceCell<String>,
}

impl PasswordLogin {
    pub fn new(base_url: &str, username: String, password: String, client: Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            username,
            password,
            client,
            token: OnceCell::new(),
        }
    }

    async fn login(&self) -> Result<String> {
        let url = format!("{}/webclient/api/Login/GetAccessToken", self.base_url);
        tracing::debug!("Requesting access token for {}", self.username);

        let response = self
            .client
            .post(&url)
            .json(&LoginRequest {
                username: &self.username,
                password: &self.password,
                security_code: "",
            })
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;
        let login: LoginResponse =
            serde_json::from_slice(&body).map_err(|_| SyncError::AuthenticationError {
                message: format!("Login endpoint returned status {}", status.as_u16()),
            })?;

        let LoginResponse {
            status,
            message,
            token,
        } = login;

        match (status.as_deref(), token) {
            (Some("AuthSuccess"), Some(token)) => {
                tracing::info!("🔑 Logged in as {}", self.username);
                Ok(token.access_token)
            }
            _ => Err(SyncError::AuthenticationError {
                message: message
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| "Login failed".to_string()),
            }),
        }
    }
}

impl std::fmt::Debug for PasswordLogin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordLogin")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"***")
            .field("logged_in", &self.token.initialized())
            .finish()
    }
}

#[async_trait]
impl CredentialProvider for PasswordLogin {
    async fn bearer_token(&self) -> Result<String> {
        self.token
            .get_or_try_init(|| self.login())
            .await
            .map(String::clone)
    }
}

/// 依設定選用的憑證來源
#[derive(Debug)]
pub enum SessionCredentials {
    Token(StaticToken),
    Login(PasswordLogin),
}

#[async_trait]
impl CredentialProvider for SessionCredentials {
    async fn bearer_token(&self) -> Result<String> {
        match self {
            SessionCredentials::Token(token) => token.bearer_token().await,
            SessionCredentials::Login(login) => login.bearer_token().await,
        }
    }
}

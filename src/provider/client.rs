use async_trait::async_trait;
use reqwest::{header, Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::types::DirectoryPage;
use super::{Authenticator, DeviceInfo, ProviderError, TelemetryProvider, Timeseries, TokenSession};
use crate::config::ProviderConfig;

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    token: String,
}

/// Username/password login against `/api/auth/login`
pub struct PasswordLogin {
    http: Client,
    login_url: Url,
    username: String,
    password: String,
}

#[async_trait]
impl Authenticator for PasswordLogin {
    async fn login(&self) -> Result<String, ProviderError> {
        let response = self
            .http
            .post(self.login_url.clone())
            .json(&LoginRequest {
                username: &self.username,
                password: &self.password,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::Authentication {
                status: status.as_u16(),
                message,
            });
        }

        let body: LoginResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(format!("login response: {}", e)))?;
        Ok(body.token)
    }
}

/// HTTP client for a ThingsBoard tenant
pub struct ThingsBoardClient {
    http: Client,
    base_url: Url,
    page_size: u32,
    session: TokenSession<PasswordLogin>,
}

impl ThingsBoardClient {
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let base_url = Url::parse(config.base_url.trim_end_matches('/'))?;
        let login = PasswordLogin {
            http: http.clone(),
            login_url: endpoint(&base_url, &["api", "auth", "login"])?,
            username: config.username.clone(),
            password: config.password.clone(),
        };

        Ok(Self {
            http,
            base_url,
            page_size: config.page_size,
            session: TokenSession::new(login, config.token_ttl()),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, String)],
    ) -> Result<T, ProviderError> {
        let token = self.session.valid_token().await?;
        let bearer = format!("Bearer {}", token);

        debug!("GET {}", url.path());
        let response = self
            .http
            .get(url.clone())
            .query(query)
            .header("X-Authorization", &bearer)
            .header(header::AUTHORIZATION, &bearer)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            // token was revoked early; make the next call log in again
            self.session.invalidate().await;
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                endpoint: url.path().to_string(),
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ProviderError::Decode(format!("{}: {}", url.path(), e)))
    }
}

#[async_trait]
impl TelemetryProvider for ThingsBoardClient {
    async fn device_directory(&self) -> Result<Vec<DeviceInfo>, ProviderError> {
        let url = endpoint(&self.base_url, &["api", "deviceInfos", "all"])?;
        let page: DirectoryPage = self
            .get_json(
                url,
                &[
                    ("pageSize", self.page_size.to_string()),
                    ("page", "0".to_string()),
                ],
            )
            .await?;

        let total = page.data.len();
        let devices: Vec<DeviceInfo> = page.data.iter().filter_map(DeviceInfo::from_raw).collect();
        if devices.len() < total {
            warn!(
                "Skipped {} malformed directory records",
                total - devices.len()
            );
        }
        Ok(devices)
    }

    async fn fetch_timeseries(
        &self,
        tb_device_id: &str,
        keys: &'static [&'static str],
    ) -> Result<Timeseries, ProviderError> {
        let url = endpoint(
            &self.base_url,
            &[
                "api",
                "plugins",
                "telemetry",
                "DEVICE",
                tb_device_id,
                "values",
                "timeseries",
            ],
        )?;
        self.get_json(url, &[("keys", keys.join(","))]).await
    }
}

/// Append path segments to the base URL, percent-encoding each one
fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, ProviderError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| ProviderError::InvalidUrl(base.to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

use crate::api::model::ApiErrorBody;
use crate::config::{self, Settings};
use crate::error::{AppError, AppResult};
use crate::logging::{log, LogLevel};
use bytes::Bytes;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tokio::time::sleep;

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    auth: HeaderValue,
    max_retries: u32,
}

impl ApiClient {
    pub fn new(access_token: &str, settings: &Settings) -> AppResult<Self> {
        Self::with_base_url(config::API_BASE_URL, access_token, settings)
    }

    pub fn with_base_url(base_url: &str, access_token: &str, settings: &Settings) -> AppResult<Self> {
        if access_token.trim().is_empty() {
            return Err(AppError::ConfigError("Access token is empty".to_string()));
        }
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", access_token.trim()))
            .map_err(|_| AppError::ConfigError("Access token is not a valid header value".to_string()))?;
        auth.set_sensitive(true);

        let client = Client::builder()
            .timeout(settings.http_timeout)
            .connect_timeout(Duration::from_secs(config::HTTP_CONNECT_TIMEOUT))
            .build()
            .map_err(AppError::from)?;
        Ok(ApiClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
            max_retries: settings.max_retries,
        })
    }

    pub async fn fetch<T, B>(
        &self,
        method: Method,
        endpoint_key: &'static str,
        path: &str,
        params: &[(&str, String)],
        payload: Option<&B>,
    ) -> AppResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let bytes = self
            .fetch_internal(method, endpoint_key, path, params, payload)
            .await?;

        serde_json::from_slice(&bytes).map_err(|e| {
            let snippet_len = bytes.len().min(200);
            let snippet = String::from_utf8_lossy(&bytes[..snippet_len]);
            log(
                LogLevel::Error,
                &format!(
                    "Fail parse response for {} Type {}: {}. Snippet: '{}'",
                    endpoint_key,
                    std::any::type_name::<T>(),
                    e,
                    snippet
                ),
            );
            AppError::response_invalid(e.to_string(), endpoint_key)
        })
    }

    async fn fetch_internal<B>(
        &self,
        method: Method,
        endpoint_key: &'static str,
        path: &str,
        params: &[(&str, String)],
        json_payload: Option<&B>,
    ) -> AppResult<Bytes>
    where
        B: Serialize + ?Sized,
    {
        let url = format!("{}{}", self.base_url, path);
        let retries = retry_budget(&method, self.max_retries);
        let mut last_error: Option<AppError> = None;

        for attempt in 0..=retries {
            let mut request_builder = self
                .client
                .request(method.clone(), &url)
                .headers(config::BASE_HEADERS.clone())
                .header(AUTHORIZATION, self.auth.clone());
            if !params.is_empty() {
                request_builder = request_builder.query(params);
            }
            if let Some(payload) = json_payload {
                request_builder = request_builder.json(payload);
            }

            let log_prefix = format!("API Req {} {} (Try {})", method, endpoint_key, attempt + 1);
            let mut retry_after: Option<Duration> = None;

            match request_builder.send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        return resp.bytes().await.map_err(|e| {
                            log(
                                LogLevel::Warning,
                                &format!("{} - Error reading success response body: {}", log_prefix, e),
                            );
                            AppError::from(e)
                        });
                    }

                    retry_after = parse_retry_after(&resp);
                    let error = self.handle_http_error(resp, status, endpoint_key).await;
                    if !is_transient(status) {
                        return Err(error);
                    }
                    log(
                        LogLevel::Warning,
                        &format!("{} Failed: {}", log_prefix, error),
                    );
                    last_error = Some(error);
                }
                Err(e) => {
                    let context_str = if e.is_timeout() {
                        "Timeout"
                    } else if e.is_connect() {
                        "Connection"
                    } else {
                        "Request"
                    };
                    let error_message = format!("{} Error: {}", context_str, e);
                    let app_error = if e.is_timeout() {
                        AppError::Timeout(format!("{} {}", log_prefix, error_message))
                    } else {
                        AppError::from(e)
                    };
                    log(
                        LogLevel::Warning,
                        &format!("{} {}", log_prefix, error_message),
                    );
                    last_error = Some(app_error);
                }
            }

            if attempt < retries {
                sleep(retry_delay(attempt, retry_after)).await;
            }
        }

        Err(last_error.unwrap_or_else(|| {
            AppError::Unexpected(format!(
                "Request failed after {} attempts for {}",
                retries + 1,
                endpoint_key
            ))
        }))
    }

    async fn handle_http_error(
        &self,
        resp: Response,
        status: StatusCode,
        endpoint_key: &'static str,
    ) -> AppError {
        let resp_text = resp
            .text()
            .await
            .unwrap_or_else(|_| "Failed to read error body".to_string());

        let message = serde_json::from_str::<ApiErrorBody>(&resp_text)
            .map(|body| body.error.message)
            .ok()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| {
                format!(
                    "HTTP {} ({}). Body: {}...",
                    status,
                    status.canonical_reason().unwrap_or("Unknown Status"),
                    resp_text.chars().take(150).collect::<String>()
                )
            });

        AppError::api_error(status.as_u16(), message, endpoint_key)
    }
}

// A POST may have been applied before the failure was reported.
fn retry_budget(method: &Method, max_retries: u32) -> u32 {
    if *method == Method::GET {
        max_retries
    } else {
        0
    }
}

fn retry_delay(attempt: u32, retry_after: Option<Duration>) -> Duration {
    let backoff =
        Duration::from_secs_f32(config::RETRY_DELAY_BASE_SECS * (2.0_f32.powi(attempt as i32)));
    retry_after
        .map(|d| d.min(Duration::from_secs(config::MAX_RETRY_AFTER_SECS)))
        .unwrap_or(backoff)
}

fn is_transient(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn parse_retry_after(resp: &Response) -> Option<Duration> {
    resp.headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

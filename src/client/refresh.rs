//! 单飞（single-flight）令牌刷新
//!
//! 同一时刻至多一个刷新请求在途。第一个遇到 401 的请求发起刷新，其余并发
//! 请求等待同一个共享 future；刷新结束（无论成功失败）后槽位被清空。
//!
//! 决定“加入 / 发起 / 直接重放”的存储读取与刷新结果的落盘都在同一把锁内
//! 完成，因此检查与动作之间不存在可被其他请求插入的挂起点。

use futures::future::{BoxFuture, FutureExt, Shared};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::error::RefreshError;
use crate::models::{RefreshTokenRequest, RefreshTokenResponse};
use crate::storage::TokenStore;

pub(crate) type RefreshOutcome = Result<String, RefreshError>;
type SharedRefresh = Shared<BoxFuture<'static, RefreshOutcome>>;

struct InFlight {
    generation: u64,
    future: SharedRefresh,
}

#[derive(Default)]
struct Slot {
    next_generation: u64,
    in_flight: Option<InFlight>,
}

/// How a caller should obtain a usable access token
enum Plan {
    /// Another request already refreshed; use the stored token
    Replay(String),
    /// Await the (possibly just started) shared refresh
    Await(SharedRefresh),
}

pub(crate) struct RefreshCoordinator {
    http: reqwest::Client,
    refresh_url: String,
    timeout: Duration,
    credentials: TokenStore,
    slot: Arc<Mutex<Slot>>,
}

impl RefreshCoordinator {
    pub(crate) fn new(
        http: reqwest::Client,
        refresh_url: String,
        timeout: Duration,
        credentials: TokenStore,
    ) -> Self {
        Self {
            http,
            refresh_url,
            timeout,
            credentials,
            slot: Arc::new(Mutex::new(Slot::default())),
        }
    }

    /// Recovers from a 401 received by a request sent with `sent_with`.
    ///
    /// Resolves to the access token the request should be replayed with.
    pub(crate) async fn on_unauthorized(&self, sent_with: Option<&str>) -> RefreshOutcome {
        self.acquire(Some(sent_with)).await
    }

    /// Forces a refresh, joining one already in flight.
    pub(crate) async fn refresh(&self) -> RefreshOutcome {
        self.acquire(None).await
    }

    /// Whether a refresh is currently outstanding
    pub(crate) async fn is_refreshing(&self) -> bool {
        self.slot.lock().await.in_flight.is_some()
    }

    async fn acquire(&self, stale_check: Option<Option<&str>>) -> RefreshOutcome {
        let plan = {
            let mut slot = self.slot.lock().await;
            if let Some(in_flight) = &slot.in_flight {
                debug!(generation = in_flight.generation, "Joining in-flight token refresh");
                Plan::Await(in_flight.future.clone())
            } else {
                let stored = self
                    .credentials
                    .load()
                    .map_err(|e| RefreshError::Storage(e.to_string()))?;

                let Some(tokens) = stored else {
                    warn!("No refresh token stored, clearing credentials");
                    if let Err(e) = self.credentials.clear() {
                        error!(error = %e, "Failed to clear stored credentials");
                    }
                    return Err(RefreshError::MissingRefreshToken);
                };

                match stale_check {
                    Some(sent_with) if sent_with != Some(tokens.access_token.as_str()) => {
                        debug!("Stored access token changed since request was sent, replaying");
                        Plan::Replay(tokens.access_token)
                    }
                    _ => {
                        let generation = slot.next_generation;
                        slot.next_generation += 1;
                        let future = self.start(generation, tokens.refresh_token);
                        slot.in_flight = Some(InFlight {
                            generation,
                            future: future.clone(),
                        });
                        debug!(generation, "Started token refresh");
                        Plan::Await(future)
                    }
                }
            }
        };

        match plan {
            Plan::Replay(access_token) => Ok(access_token),
            Plan::Await(future) => future.await,
        }
    }

    fn start(&self, generation: u64, refresh_token: String) -> SharedRefresh {
        let http = self.http.clone();
        let url = self.refresh_url.clone();
        let timeout = self.timeout;
        let credentials = self.credentials.clone();
        let slot = Arc::clone(&self.slot);

        async move {
            metrics::counter!("bank_client_token_refresh_total").increment(1);
            let outcome = request_access_token(&http, &url, &refresh_token, timeout).await;

            let mut slot = slot.lock().await;
            // 只作用于发起刷新时的那一组凭据；期间重新登录或登出则放弃结果
            let outcome = outcome.and_then(|access_token| {
                match credentials.replace_access_token_if(&refresh_token, &access_token) {
                    Ok(true) => Ok(access_token),
                    Ok(false) => Err(RefreshError::SessionChanged),
                    Err(e) => Err(RefreshError::Storage(e.to_string())),
                }
            });

            match &outcome {
                Ok(_) => info!(generation, "Access token refreshed"),
                Err(RefreshError::SessionChanged) => {
                    warn!(generation, "Stored session changed during refresh, discarding result");
                }
                Err(reason) => {
                    metrics::counter!("bank_client_token_refresh_failed_total").increment(1);
                    warn!(generation, error = %reason, "Token refresh failed, clearing credentials");
                    match credentials.clear_if(&refresh_token) {
                        Ok(true) => {}
                        Ok(false) => debug!(generation, "Stored session changed, keeping it"),
                        Err(e) => error!(error = %e, "Failed to clear stored credentials"),
                    }
                }
            }

            if slot
                .in_flight
                .as_ref()
                .is_some_and(|in_flight| in_flight.generation == generation)
            {
                slot.in_flight = None;
            }

            outcome
        }
        .boxed()
        .shared()
    }
}

/// `POST /auth/refresh`; the refresh token is its own credential, no bearer header
pub(crate) async fn request_access_token(
    http: &reqwest::Client,
    url: &str,
    refresh_token: &str,
    timeout: Duration,
) -> RefreshOutcome {
    let response = http
        .post(url)
        .timeout(timeout)
        .json(&RefreshTokenRequest { refresh_token })
        .send()
        .await
        .map_err(|e| {
            if e.is_timeout() {
                RefreshError::Timeout
            } else {
                RefreshError::Transport(e.to_string())
            }
        })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(RefreshError::Rejected {
            status: status.as_u16(),
            body,
        });
    }

    let body = response
        .text()
        .await
        .map_err(|e| RefreshError::Transport(e.to_string()))?;
    let parsed: RefreshTokenResponse =
        serde_json::from_str(&body).map_err(|e| RefreshError::Decode(e.to_string()))?;

    if parsed.access_token.is_empty() {
        return Err(RefreshError::Decode("empty access token".to_string()));
    }

    Ok(parsed.access_token)
}

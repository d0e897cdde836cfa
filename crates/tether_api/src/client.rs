use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Serialize;

use crate::config::ApiConfig;
use crate::dispatch::EventDispatcher;
use crate::error::{parse_error_message, RelayApiError};
use crate::retry::RetryPolicy;
use crate::sse::SseFrameDecoder;
use crate::types::{ActionOutcome, ActionSet, ActionSubmission, ChatRequest, SessionCursor};
use crate::url::api_url;

/// Optional cancellation signal shared across request and stream loops.
pub type CancellationSignal = Arc<AtomicBool>;

const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// HTTP/SSE client for the relay: chat streaming plus the dashboard frame,
/// action, and push endpoints.
#[derive(Debug)]
pub struct RelayClient {
    http: Client,
    config: ApiConfig,
    token: RwLock<String>,
}

impl RelayClient {
    pub fn new(config: ApiConfig) -> Result<Self, RelayApiError> {
        if config.access_token.trim().is_empty() {
            return Err(RelayApiError::MissingAccessToken);
        }

        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(RelayApiError::from)?;
        let token = RwLock::new(config.access_token.clone());

        Ok(Self {
            http,
            config,
            token,
        })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> String {
        api_url(&self.config.base_url, path)
    }

    fn headers(&self) -> Result<HeaderMap, RelayApiError> {
        let mut headers = HeaderMap::new();
        let token = read_unpoisoned(&self.token);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| RelayApiError::InvalidHeader("authorization".to_string()))?,
        );
        if let Some(user_agent) = self.config.user_agent.as_deref() {
            headers.insert(
                USER_AGENT,
                HeaderValue::from_str(user_agent)
                    .map_err(|_| RelayApiError::InvalidHeader("user-agent".to_string()))?,
            );
        }
        for (key, value) in &self.config.extra_headers {
            headers.insert(
                HeaderName::from_bytes(key.as_bytes())
                    .map_err(|_| RelayApiError::InvalidHeader(key.clone()))?,
                HeaderValue::from_str(value)
                    .map_err(|_| RelayApiError::InvalidHeader(key.clone()))?,
            );
        }
        Ok(headers)
    }

    fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<RequestBuilder, RelayApiError> {
        Ok(self
            .http
            .request(method, self.endpoint(path))
            .headers(self.headers()?)
            .query(query))
    }

    /// Attempt one token refresh through the credential boundary. Returns
    /// whether a fresh token was installed.
    fn refresh_token(&self) -> bool {
        let Some(refresher) = self.config.token_refresher.as_ref() else {
            return false;
        };
        match refresher() {
            Some(fresh) if !fresh.trim().is_empty() => {
                *write_unpoisoned(&self.token) = fresh;
                true
            }
            _ => false,
        }
    }

    /// Open the chat stream and dispatch decoded events until the dispatcher
    /// reports completion or the connection ends.
    ///
    /// An unauthorized response triggers exactly one refresh-and-retry before
    /// surfacing the failure. Dropping the response on early `done` closes
    /// the connection with bytes still unread.
    pub async fn stream_chat<C>(
        &self,
        request: &ChatRequest,
        cancellation: Option<&CancellationSignal>,
        dispatcher: &mut EventDispatcher<C>,
        ctx: &mut C,
    ) -> Result<(), RelayApiError> {
        let response = self
            .send_authorized(Method::POST, "chat/stream", &[], Some(request), cancellation)
            .await?;

        let mut bytes = response.bytes_stream();
        let mut decoder = SseFrameDecoder::default();

        loop {
            let Some(chunk) = await_or_cancel(bytes.next(), cancellation).await? else {
                break;
            };
            if is_cancelled(cancellation) {
                return Err(RelayApiError::Cancelled);
            }
            let chunk = chunk.map_err(RelayApiError::from)?;
            for frame in decoder.feed(&chunk) {
                if !dispatcher.dispatch_frame(ctx, &frame) {
                    return Ok(());
                }
            }
        }

        if is_cancelled(cancellation) {
            return Err(RelayApiError::Cancelled);
        }

        Ok(())
    }

    /// Fetch a rendered dashboard frame as a raw ANSI block.
    pub async fn fetch_tui_frame(
        &self,
        instance_id: &str,
        cols: u16,
        rows: u16,
        cursor: Option<SessionCursor>,
    ) -> Result<String, RelayApiError> {
        let mut query = vec![("cols", cols.to_string()), ("rows", rows.to_string())];
        if let Some(cursor) = cursor {
            query.push(("selected", cursor.selected.to_string()));
            query.push(("scroll", cursor.scroll.to_string()));
        }

        let path = format!("instances/{instance_id}/tui");
        let response = self.send_with_retry(Method::GET, &path, &query, None::<&()>).await?;
        response.text().await.map_err(RelayApiError::from)
    }

    /// Fetch the server-declared action set for an instance.
    pub async fn fetch_actions(&self, instance_id: &str) -> Result<ActionSet, RelayApiError> {
        let path = format!("instances/{instance_id}/tui/actions");
        let response = self.send_with_retry(Method::GET, &path, &[], None::<&()>).await?;
        response.json().await.map_err(RelayApiError::from)
    }

    /// Submit an action with the current cursor and any collected inputs.
    pub async fn submit_action(
        &self,
        instance_id: &str,
        submission: &ActionSubmission,
    ) -> Result<ActionOutcome, RelayApiError> {
        let path = format!("instances/{instance_id}/tui/actions");
        let response = self
            .send_with_retry(Method::POST, &path, &[], Some(submission))
            .await?;
        response.json().await.map_err(RelayApiError::from)
    }

    /// Open the long-lived dashboard push stream. The caller owns decoding
    /// and teardown of the returned response.
    pub async fn open_push_stream(&self, instance_id: &str) -> Result<Response, RelayApiError> {
        let path = format!("instances/{instance_id}/tui/stream");
        self.send_authorized(Method::GET, &path, &[], None::<&()>, None)
            .await
    }

    /// Single-attempt authorized request with one refresh-and-retry on an
    /// unauthorized response.
    async fn send_authorized<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&B>,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<Response, RelayApiError> {
        let mut refreshed = false;

        loop {
            if is_cancelled(cancellation) {
                return Err(RelayApiError::Cancelled);
            }

            let mut builder = self.request(method.clone(), path, query)?;
            if let Some(body) = body {
                builder = builder.json(body);
            }

            let response = await_or_cancel(builder.send(), cancellation)
                .await?
                .map_err(RelayApiError::from)?;
            let status = response.status();
            if status.is_success() {
                return Ok(response);
            }

            let body_text = await_or_cancel(response.text(), cancellation)
                .await?
                .unwrap_or_default();
            let message = parse_error_message(status, &body_text);

            if status == StatusCode::UNAUTHORIZED {
                if !refreshed && self.refresh_token() {
                    refreshed = true;
                    continue;
                }
                return Err(RelayApiError::Unauthorized { message });
            }

            return Err(RelayApiError::Status(status, message));
        }
    }

    /// Bounded-backoff request for the non-streaming dashboard fetches.
    async fn send_with_retry<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<Response, RelayApiError> {
        let policy = RetryPolicy::default();
        let mut last_status: Option<StatusCode> = None;
        let mut last_error = None;

        for attempt in 0u32.. {
            let mut builder = self.request(method.clone(), path, query)?;
            if let Some(body) = body {
                builder = builder.json(body);
            }

            match builder.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    let message = parse_error_message(status, &body_text);
                    last_status = Some(status);
                    last_error = Some(message.clone());

                    if !policy.should_retry(attempt, Some(status.as_u16()), &message) {
                        return Err(RelayApiError::Status(status, message));
                    }
                }
                Err(error) => {
                    last_error = Some(error.to_string());
                    if !policy.should_retry(attempt, None, "") {
                        break;
                    }
                }
            }

            tokio::time::sleep(policy.delay(attempt)).await;
        }

        Err(RelayApiError::RetryExhausted {
            status: last_status,
            last_error,
        })
    }
}

fn is_cancelled(cancel: Option<&CancellationSignal>) -> bool {
    cancel.is_some_and(|token| token.load(Ordering::Acquire))
}

/// Await a future while polling the cancellation signal.
pub async fn await_or_cancel<F>(
    future: F,
    cancellation: Option<&CancellationSignal>,
) -> Result<F::Output, RelayApiError>
where
    F: Future,
{
    if cancellation.is_none() {
        return Ok(future.await);
    }

    let mut future = Box::pin(future);

    loop {
        if is_cancelled(cancellation) {
            return Err(RelayApiError::Cancelled);
        }

        if let Ok(output) = tokio::time::timeout(CANCEL_POLL_INTERVAL, &mut future).await {
            if is_cancelled(cancellation) {
                return Err(RelayApiError::Cancelled);
            }
            return Ok(output);
        }
    }
}

fn read_unpoisoned(lock: &RwLock<String>) -> String {
    match lock.read() {
        Ok(guard) => guard.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}

fn write_unpoisoned(lock: &RwLock<String>) -> std::sync::RwLockWriteGuard<'_, String> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use crate::config::ApiConfig;

    use super::{await_or_cancel, RelayClient};

    #[test]
    fn empty_token_is_rejected() {
        assert!(RelayClient::new(ApiConfig::new("  ")).is_err());
    }

    #[test]
    fn refresh_token_installs_fresh_credential() {
        let refresher = Arc::new(|| Some("fresh-token".to_string()));
        let client = RelayClient::new(
            ApiConfig::new("stale-token").with_token_refresher(refresher),
        )
        .expect("client builds");

        assert!(client.refresh_token());
        assert_eq!(super::read_unpoisoned(&client.token), "fresh-token");
    }

    #[test]
    fn refresh_without_boundary_hook_fails() {
        let client = RelayClient::new(ApiConfig::new("token")).expect("client builds");
        assert!(!client.refresh_token());
    }

    #[tokio::test]
    async fn await_or_cancel_returns_cancelled_for_pending_future() {
        let cancel = Arc::new(AtomicBool::new(false));
        cancel.store(true, Ordering::Release);

        let result = await_or_cancel(std::future::pending::<()>(), Some(&cancel)).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn await_or_cancel_passes_through_without_signal() {
        let result = await_or_cancel(async { 7 }, None).await;
        assert_eq!(result.expect("future completes"), 7);
    }
}

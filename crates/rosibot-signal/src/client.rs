use std::time::Duration;

use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use tokio::time::sleep;

use rosibot_core::{
    domain::{GroupId, PhoneNumber, ResolvedGroup},
    errors::Error,
    messaging::types::IncomingMessage,
    Result,
};

use crate::api::{About, GroupEntry, ReceivedItem, SendRequest};

const RETRY_AFTER_429: Duration = Duration::from_secs(2);
const MAX_ERROR_BODY: usize = 200;

/// Thin HTTP client for the signal-cli REST API.
#[derive(Clone, Debug)]
pub struct SignalClient {
    http: reqwest::Client,
    base_url: String,
    number: PhoneNumber,
    retry_delay: Duration,
}

impl SignalClient {
    pub fn new(base_url: impl Into<String>, number: PhoneNumber, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::External(format!("http client build failed: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            number,
            retry_delay: RETRY_AFTER_429,
        })
    }

    /// Wait between a 429 response and the retry.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub async fn about(&self) -> Result<About> {
        let url = self.url("/v1/about");
        let resp = self.with_retry(|| self.http.get(&url)).await?;
        json_body(resp).await
    }

    pub async fn list_groups(&self) -> Result<Vec<GroupEntry>> {
        let url = self.url(&format!("/v1/groups/{}", self.number.0));
        let resp = self.with_retry(|| self.http.get(&url)).await?;
        json_body(resp).await
    }

    /// Look up the configured group; `configured` may be the `group.` id or the internal id.
    pub async fn resolve_group(&self, configured: &GroupId) -> Result<ResolvedGroup> {
        let groups = self.list_groups().await?;
        find_group(groups, configured).ok_or_else(|| {
            Error::Config(format!(
                "group {configured} is not known to account {}",
                self.number
            ))
        })
    }

    /// Fetch and drain pending messages (REST API in `normal`/`native` mode).
    pub async fn receive(&self) -> Result<Vec<IncomingMessage>> {
        let url = self.url(&format!("/v1/receive/{}", self.number.0));
        let resp = self.with_retry(|| self.http.get(&url)).await?;
        let items: Vec<ReceivedItem> = json_body(resp).await?;
        Ok(items
            .into_iter()
            .filter_map(ReceivedItem::into_incoming)
            .collect())
    }

    pub async fn send(&self, recipient: &GroupId, message: &str) -> Result<()> {
        let url = self.url("/v2/send");
        let body = SendRequest {
            message,
            number: &self.number.0,
            recipients: vec![recipient.0.as_str()],
        };
        self.with_retry(|| self.http.post(&url).json(&body)).await?;
        Ok(())
    }

    /// Execute a request, retrying once on HTTP 429. Non-2xx becomes `Error::External`.
    async fn with_retry(
        &self,
        mut build: impl FnMut() -> reqwest::RequestBuilder,
    ) -> Result<Response> {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            let resp = build()
                .send()
                .await
                .map_err(|e| Error::External(format!("signal request error: {e}")))?;

            let status = resp.status();
            if status == StatusCode::TOO_MANY_REQUESTS && attempts < MAX_RETRIES {
                attempts += 1;
                tracing::warn!("Signal API rate limited, retrying in {:?}", self.retry_delay);
                sleep(self.retry_delay).await;
                continue;
            }
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(Error::External(format!(
                    "signal api returned {status}: {}",
                    body.chars().take(MAX_ERROR_BODY).collect::<String>()
                )));
            }
            return Ok(resp);
        }
    }
}

async fn json_body<T: DeserializeOwned>(resp: Response) -> Result<T> {
    resp.json()
        .await
        .map_err(|e| Error::External(format!("signal json error: {e}")))
}

fn find_group(groups: Vec<GroupEntry>, configured: &GroupId) -> Option<ResolvedGroup> {
    groups
        .into_iter()
        .find(|g| g.id == configured.0 || g.internal_id == configured.0)
        .map(|g| ResolvedGroup {
            id: GroupId(g.id),
            internal_id: GroupId(g.internal_id),
            name: g.name,
        })
}

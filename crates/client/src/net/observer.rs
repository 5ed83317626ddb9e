//! Transparent observing decorator over a [`Transport`].
//!
//! Forwards every request and response unchanged; qualifying JSON bodies are
//! additionally handed to the scan scheduler as a side effect. Nothing the
//! observer does may surface to the caller: admission checks, body decoding
//! and JSON parsing all swallow their own failures.

use async_trait::async_trait;
use serde_json::Value;

use capsift_core::Error;

use super::filter;
use super::{Request, Response, Transport};
use crate::schedule::ScanScheduler;

/// Observing decorator; behaves exactly like the wrapped transport.
pub struct ObservedTransport<T: Transport> {
    inner: T,
    scheduler: ScanScheduler,
}

impl<T: Transport> ObservedTransport<T> {
    /// Wrap a transport, feeding observed payloads into `scheduler`.
    pub fn new(inner: T, scheduler: ScanScheduler) -> Self {
        Self { inner, scheduler }
    }

    /// The wrapped transport.
    pub fn inner(&self) -> &T {
        &self.inner
    }

    fn observe(&self, response: &Response) {
        let text = response.text();
        if !filter::is_json_body(response.content_type.as_deref(), &text) {
            return;
        }

        match serde_json::from_str::<Value>(&text) {
            Ok(value) => {
                tracing::debug!(url = %response.url, "queueing observed payload");
                self.scheduler.enqueue(value);
            }
            Err(e) => {
                tracing::debug!(url = %response.url, "ignoring unparseable body: {}", e);
            }
        }
    }
}

#[async_trait]
impl<T: Transport> Transport for ObservedTransport<T> {
    async fn execute(&self, request: &Request) -> Result<Response, Error> {
        // Admission is decided on the URL the caller asked for, before the
        // request goes out; redirects never change the verdict.
        let admitted = filter::is_target_url(&request.url);

        let response = self.inner.execute(request).await?;

        if admitted {
            self.observe(&response);
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::{ScanScheduler, SchedulerConfig};
    use crate::store::{CaptureStore, StoreConfig};
    use bytes::Bytes;
    use capsift_core::envelope;
    use reqwest::{StatusCode, Url};
    use std::time::Duration;

    struct CannedTransport {
        content_type: Option<String>,
        body: &'static str,
    }

    #[async_trait]
    impl Transport for CannedTransport {
        async fn execute(&self, request: &Request) -> Result<Response, Error> {
            let url = Url::parse(&request.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
            Ok(Response {
                url: url.clone(),
                final_url: url,
                status: StatusCode::OK,
                content_type: self.content_type.clone(),
                bytes: Bytes::from_static(self.body.as_bytes()),
                fetch_ms: 1,
            })
        }
    }

    fn observed(
        content_type: Option<&str>, body: &'static str,
    ) -> (ObservedTransport<CannedTransport>, ScanScheduler) {
        let (tx, rx) = envelope::channel(8);
        drop(rx);
        let store = CaptureStore::new(StoreConfig::default(), tx);
        // Fallback mode with a long delay keeps enqueued payloads visible.
        let scheduler = ScanScheduler::new(
            SchedulerConfig { slice: Duration::ZERO, fallback_delay: Duration::from_secs(60), ..Default::default() },
            store,
        );
        let transport = CannedTransport { content_type: content_type.map(String::from), body };
        (ObservedTransport::new(transport, scheduler.clone()), scheduler)
    }

    const ITEM_BODY: &str = r#"{"large_images":[{"image_url":"https://cdn/full.jpg"}]}"#;

    #[tokio::test]
    async fn test_admitted_json_is_queued() {
        let (transport, scheduler) = observed(Some("application/json"), ITEM_BODY);

        let response = transport.execute(&Request::get("https://x.com/api/material/search")).await.unwrap();
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.text(), ITEM_BODY);
        assert_eq!(scheduler.pending(), 1);
    }

    #[tokio::test]
    async fn test_unadmitted_url_is_forwarded_untouched() {
        let (transport, scheduler) = observed(Some("application/json"), ITEM_BODY);

        let response = transport.execute(&Request::get("https://x.com/session/refresh")).await.unwrap();
        assert_eq!(response.text(), ITEM_BODY);
        assert_eq!(scheduler.pending(), 0);
    }

    #[tokio::test]
    async fn test_non_json_content_type_discarded() {
        let (transport, scheduler) = observed(Some("text/html"), ITEM_BODY);

        transport.execute(&Request::get("https://x.com/api/search")).await.unwrap();
        assert_eq!(scheduler.pending(), 0);
    }

    #[tokio::test]
    async fn test_malformed_json_swallowed() {
        let (transport, scheduler) = observed(Some("application/json"), "{not json");

        let result = transport.execute(&Request::get("https://x.com/api/search")).await;
        assert!(result.is_ok());
        assert_eq!(scheduler.pending(), 0);
    }

    #[tokio::test]
    async fn test_inner_error_propagates_unchanged() {
        let (transport, _scheduler) = observed(Some("application/json"), ITEM_BODY);

        let result = transport.execute(&Request::get("::bad::")).await;
        assert!(matches!(result, Err(Error::InvalidUrl(_))));
    }
}

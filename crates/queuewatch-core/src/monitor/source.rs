//! Where pages come from.

use reqwest::Client;

use crate::error::MonitorError;

/// Supplies the current version of the monitored page.
#[allow(async_fn_in_trait)]
pub trait PageSource {
    /// Human-readable origin, used in logs and errors.
    fn describe(&self) -> &str;

    /// Fetch the raw document.
    async fn fetch(&self) -> Result<String, MonitorError>;
}

/// Fetches the page over HTTP(S).
///
/// Failures are not retried; the polling loop treats them as fatal.
pub struct HttpPageSource {
    client: Client,
    url: String,
}

impl HttpPageSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }

    fn fetch_failed(&self, message: impl Into<String>) -> MonitorError {
        MonitorError::FetchFailed {
            url: self.url.clone(),
            message: message.into(),
        }
    }
}

impl PageSource for HttpPageSource {
    fn describe(&self) -> &str {
        &self.url
    }

    async fn fetch(&self) -> Result<String, MonitorError> {
        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| self.fetch_failed(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(self.fetch_failed(format!("HTTP {status}")));
        }

        resp.text()
            .await
            .map_err(|e| self.fetch_failed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fetches_page_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/status")
            .with_status(200)
            .with_header("content-type", "text/html; charset=utf-8")
            .with_body(r#"<span class="mark">17</span>"#)
            .create_async()
            .await;

        let source = HttpPageSource::new(format!("{}/status", server.url()));
        let body = source.fetch().await.unwrap();

        assert_eq!(body, r#"<span class="mark">17</span>"#);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn error_status_is_fetch_failure() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/status")
            .with_status(503)
            .create_async()
            .await;

        let source = HttpPageSource::new(format!("{}/status", server.url()));
        match source.fetch().await {
            Err(MonitorError::FetchFailed { message, .. }) => assert!(message.contains("503")),
            other => panic!("expected fetch failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreachable_host_is_fetch_failure() {
        let source = HttpPageSource::new("http://127.0.0.1:9/");
        assert!(matches!(
            source.fetch().await,
            Err(MonitorError::FetchFailed { .. })
        ));
    }
}

use std::fmt::Debug;
use std::time::Duration;

use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use surge_runner::prelude::{report_operation, BoxFuture, OperationRecord, Reporter};

/// Name of the check recorded for every request.
pub const GET_STATUS_IS_200: &str = "Get status is 200";

/// Per-request timeout for the HTTP client.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// The one HTTP call this load test makes.
pub trait HttpGet: Debug + Send + Sync {
    /// Send a GET request and return the response status.
    fn get<'a>(
        &'a self,
        url: &'a str,
        headers: HeaderMap,
    ) -> BoxFuture<'a, anyhow::Result<StatusCode>>;
}

#[derive(Debug, Clone)]
pub struct ReqwestHttpGet {
    client: reqwest::Client,
}

impl ReqwestHttpGet {
    pub fn new() -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { client })
    }
}

impl HttpGet for ReqwestHttpGet {
    fn get<'a>(
        &'a self,
        url: &'a str,
        headers: HeaderMap,
    ) -> BoxFuture<'a, anyhow::Result<StatusCode>> {
        Box::pin(async move {
            let response = self.client.get(url).headers(headers).send().await?;
            Ok(response.status())
        })
    }
}

pub fn request_headers(token: &str) -> anyhow::Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    let mut authorization = HeaderValue::from_str(&format!("Bearer {token}"))
        .context("Token is not a valid header value")?;
    authorization.set_sensitive(true);
    headers.insert(AUTHORIZATION, authorization);

    Ok(headers)
}

/// Perform one authenticated GET against `url` and record whether it returned status 200.
///
/// Transport errors, timeouts and unexpected statuses all count as a failed check. Nothing is
/// retried and nothing is returned as an error, so a broken target never stops the scenario.
pub async fn get_status_is_200(
    client: &dyn HttpGet,
    url: &str,
    token: &str,
    reporter: &Reporter,
) -> bool {
    let record = OperationRecord::new("http_get");
    let result = match request_headers(token) {
        Ok(headers) => client.get(url, headers).await,
        Err(e) => Err(e),
    };

    let outcome = match &result {
        Ok(status) if status.is_success() => Ok(()),
        Ok(status) => Err(format!("status {status}")),
        Err(e) => Err(format!("{e:#}")),
    };
    if let Err(reason) = &outcome {
        log::debug!("GET {url} failed: {reason}");
    }
    report_operation(reporter, record, &outcome);

    let passed = matches!(result, Ok(status) if status == StatusCode::OK);
    reporter.check(GET_STATUS_IS_200, passed)
}

/// Run [get_status_is_200] with values looked up for the current iteration.
///
/// A missing URL or token is recorded as a failed check without sending a request.
pub async fn check_endpoint(
    client: &dyn HttpGet,
    url: Option<&str>,
    token: Option<&str>,
    reporter: &Reporter,
) -> bool {
    match (url, token) {
        (Some(url), Some(token)) => get_status_is_200(client, url, token, reporter).await,
        (url, token) => {
            log::warn!(
                "Skipping request, URL set: {}, TOKEN set: {}",
                url.is_some(),
                token.is_some()
            );
            reporter.check(GET_STATUS_IS_200, false)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use surge_runner::prelude::{CheckTally, ReportConfig};

    use super::*;

    #[derive(Debug, Default)]
    struct FakeHttp {
        status: Option<u16>,
        requests: Arc<Mutex<Vec<(String, HeaderMap)>>>,
    }

    impl FakeHttp {
        fn responding(status: u16) -> Self {
            Self {
                status: Some(status),
                ..Default::default()
            }
        }

        fn unreachable() -> Self {
            Self::default()
        }
    }

    impl HttpGet for FakeHttp {
        fn get<'a>(
            &'a self,
            url: &'a str,
            headers: HeaderMap,
        ) -> BoxFuture<'a, anyhow::Result<StatusCode>> {
            self.requests.lock().push((url.to_string(), headers));
            Box::pin(async move {
                match self.status {
                    Some(status) => Ok(StatusCode::from_u16(status)?),
                    None => anyhow::bail!("connection refused"),
                }
            })
        }
    }

    fn tally(reporter: &Reporter) -> CheckTally {
        reporter
            .check_tallies()
            .get(GET_STATUS_IS_200)
            .copied()
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn status_200_passes_the_check() {
        let reporter = ReportConfig::default().init();
        let client = FakeHttp::responding(200);

        let passed = get_status_is_200(&client, "https://example.com/a", "abc", &reporter).await;

        assert!(passed);
        assert_eq!(CheckTally { passes: 1, fails: 0 }, tally(&reporter));
        assert_eq!((1, 0), reporter.operation_counts());
    }

    #[tokio::test]
    async fn sends_json_content_type_and_bearer_token() {
        let reporter = ReportConfig::default().init();
        let client = FakeHttp::responding(200);

        get_status_is_200(&client, "https://example.com/a", "abc", &reporter).await;

        let requests = client.requests.lock();
        assert_eq!(1, requests.len());
        let (url, headers) = &requests[0];
        assert_eq!("https://example.com/a", url.as_str());
        assert_eq!("application/json", headers[CONTENT_TYPE]);
        assert_eq!("Bearer abc", headers[AUTHORIZATION]);
    }

    #[tokio::test]
    async fn server_error_fails_the_check() {
        let reporter = ReportConfig::default().init();
        let client = FakeHttp::responding(500);

        let passed = get_status_is_200(&client, "https://example.com/a", "abc", &reporter).await;

        assert!(!passed);
        assert_eq!(CheckTally { passes: 0, fails: 1 }, tally(&reporter));
        assert_eq!((0, 1), reporter.operation_counts());
    }

    #[tokio::test]
    async fn other_success_statuses_fail_the_check() {
        let reporter = ReportConfig::default().init();
        let client = FakeHttp::responding(204);

        let passed = get_status_is_200(&client, "https://example.com/a", "abc", &reporter).await;

        assert!(!passed);
        assert_eq!(CheckTally { passes: 0, fails: 1 }, tally(&reporter));
    }

    #[tokio::test]
    async fn network_error_fails_the_check() {
        let reporter = ReportConfig::default().init();
        let client = FakeHttp::unreachable();

        let passed = get_status_is_200(&client, "https://example.com/a", "abc", &reporter).await;

        assert!(!passed);
        assert_eq!(CheckTally { passes: 0, fails: 1 }, tally(&reporter));
    }

    #[tokio::test]
    async fn invalid_token_fails_without_sending() {
        let reporter = ReportConfig::default().init();
        let client = FakeHttp::responding(200);

        let passed =
            get_status_is_200(&client, "https://example.com/a", "bad\ntoken", &reporter).await;

        assert!(!passed);
        assert!(client.requests.lock().is_empty());
    }

    #[tokio::test]
    async fn missing_url_or_token_fails_without_sending() {
        let reporter = ReportConfig::default().init();
        let client = FakeHttp::responding(200);

        assert!(!check_endpoint(&client, None, Some("abc"), &reporter).await);
        assert!(!check_endpoint(&client, Some("https://example.com/a"), None, &reporter).await);
        assert!(check_endpoint(&client, Some("https://example.com/a"), Some("abc"), &reporter).await);

        assert_eq!(CheckTally { passes: 1, fails: 2 }, tally(&reporter));
        assert_eq!(1, client.requests.lock().len());
    }
}

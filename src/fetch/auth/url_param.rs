use crate::fetch::client::HttpClient;
use async_trait::async_trait;

/// An [`HttpClient`] wrapper that appends an API key as a URL query parameter.
///
/// OneBusAway expects its credential as `?key=<api key>` on every call, so the
/// transit client is built as `UrlParam::new(BasicClient, "key", api_key)`.
pub struct UrlParam<C> {
    pub inner: C,
    pub param_name: String,
    pub key: String,
}

impl<C> UrlParam<C> {
    pub fn new(inner: C, param_name: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            inner,
            param_name: param_name.into(),
            key: key.into(),
        }
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for UrlParam<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        req.url_mut()
            .query_pairs_mut()
            .append_pair(&self.param_name, &self.key);
        self.inner.execute(req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        urls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl HttpClient for Recorder {
        async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
            self.urls.lock().unwrap().push(req.url().to_string());
            Ok(reqwest::Response::from(
                axum::http::Response::builder()
                    .status(200)
                    .body(String::new())
                    .unwrap(),
            ))
        }
    }

    #[tokio::test]
    async fn test_appends_key_after_existing_query() {
        let client = UrlParam::new(Recorder::default(), "key", "s3cr3t");
        let req = reqwest::Request::new(
            reqwest::Method::GET,
            "https://example.org/api/where/x.json?includeStatus=true"
                .parse()
                .unwrap(),
        );
        client.execute(req).await.unwrap();

        let urls = client.inner.urls.lock().unwrap();
        assert_eq!(
            urls.as_slice(),
            ["https://example.org/api/where/x.json?includeStatus=true&key=s3cr3t"]
        );
    }
}

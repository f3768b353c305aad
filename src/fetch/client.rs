use async_trait::async_trait;
use reqwest::{Request, Response};

/// Executes outbound requests. Decorators such as [`super::auth::UrlParam`]
/// wrap another `HttpClient` to alter requests before they are sent.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}

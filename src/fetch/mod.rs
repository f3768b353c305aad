//! Outbound HTTP plumbing shared by transit-source clients.

mod basic;
mod client;
pub mod auth;

pub use basic::BasicClient;
pub use client::HttpClient;

use crate::error::FetchCause;
use serde::de::DeserializeOwned;

/// GETs `url` through `client` and decodes the JSON body.
///
/// # Errors
///
/// A transport failure, a non-2xx status, or a body that does not decode
/// into `T`.
pub async fn fetch_json<C, T>(client: &C, url: &str) -> Result<T, FetchCause>
where
    C: HttpClient + ?Sized,
    T: DeserializeOwned,
{
    let req = reqwest::Request::new(reqwest::Method::GET, url.parse()?);

    let resp = client.execute(req).await?;
    let status = resp.status();
    let body = resp.bytes().await?;

    if !status.is_success() {
        return Err(FetchCause::Status {
            status: status.as_u16(),
            body: String::from_utf8_lossy(&body).chars().take(200).collect(),
        });
    }

    Ok(serde_json::from_slice(&body)?)
}

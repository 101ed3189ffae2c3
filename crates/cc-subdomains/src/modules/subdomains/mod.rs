pub mod commoncrawl;

use super::Module;
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use tokio_util::sync::CancellationToken;

#[async_trait]
pub trait SubdomainModule: Module + Send + Sync {
    /// Sorted hostnames equal to `domain` or below it.
    async fn enumerate(
        &self,
        http_client: &Client,
        domain: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>>;
}

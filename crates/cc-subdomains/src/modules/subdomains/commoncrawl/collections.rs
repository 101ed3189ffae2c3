use crate::modules::http_request;
use crate::{Error, Result};
use reqwest::Client;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, trace};

/// One crawl snapshot of the index and its CDX query endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Collection {
    pub id: String,
    #[serde(rename = "cdx-api")]
    pub cdx_api: String,
}

#[instrument(name = "collections", level = "info", skip_all, fields(url = collinfo_url))]
pub async fn fetch_collections(
    http_client: &Client,
    collinfo_url: &str,
    cancel: &CancellationToken,
) -> Result<Vec<Collection>> {
    let res = http_request(http_client, collinfo_url, cancel).await?;

    if !res.status().is_success() {
        return Err(Error::InvalidHttpResponse(format!(
            "{} returned {}",
            collinfo_url,
            res.status()
        )));
    }

    let body = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(Error::Cancelled),
        body = res.bytes() => body?,
    };

    let collections: Vec<Collection> = serde_json::from_slice(&body)?;
    for collection in &collections {
        trace!("Collection {} at {}", collection.id, collection.cdx_api);
    }

    debug!("{} collections", collections.len());
    Ok(collections)
}

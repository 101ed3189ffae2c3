mod collections;
mod index;

use collections::fetch_collections;
use index::query_collection;

use super::SubdomainModule;
use crate::config::Config;
use crate::model::ResultSet;
use crate::modules::Module;
use crate::Result;
use async_trait::async_trait;
use futures::{stream, StreamExt};
use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

// region:        --- Module info

pub struct CommonCrawl {
    config: Config,
}

impl CommonCrawl {
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl Module for CommonCrawl {
    fn name(&self) -> String {
        "subdomains/commoncrawl".to_string()
    }

    fn description(&self) -> String {
        "Use index.commoncrawl.org to find subdomains".to_string()
    }
}

// endregion:     --- Module info

#[async_trait]
impl SubdomainModule for CommonCrawl {
    #[instrument(name = "enumerate", level = "debug", fields(module = %self.name()), skip_all)]
    async fn enumerate(
        &self,
        http_client: &Client,
        domain: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>> {
        info!("Fetching collections");
        let collections = fetch_collections(http_client, &self.config.collinfo_url, cancel).await?;
        let limit = self.config.limit.unwrap_or(collections.len());
        info!(
            "{} collections available, querying {}",
            collections.len(),
            limit.min(collections.len())
        );

        let results = ResultSet::new(domain);
        let prefilter = self.config.prefilter;

        stream::iter(collections.iter().take(limit))
            .for_each_concurrent(self.config.concurrency.max(1), |collection| {
                let results = &results;
                async move {
                    if cancel.is_cancelled() {
                        debug!("Not querying {}: cancelled", collection.id);
                        return;
                    }

                    info!("Querying index: {}", collection.id);
                    match query_collection(http_client, collection, results, prefilter, cancel)
                        .await
                    {
                        Ok(stats) => debug!("{}: {} new hosts", collection.id, stats.inserted),
                        Err(err) => error!("{}: {}", collection.id, err),
                    }
                }
            })
            .await;

        if cancel.is_cancelled() {
            warn!("Cancelled, keeping hosts found so far");
        }

        let hosts = results.into_sorted_vec();
        info!("{} hosts found", hosts.len());
        Ok(hosts)
    }
}

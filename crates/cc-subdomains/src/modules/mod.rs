pub mod subdomains;

use self::subdomains::commoncrawl::CommonCrawl;
use self::subdomains::SubdomainModule;
use crate::config::Config;
use crate::{Error, Result};
use reqwest::{Client, Response};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

pub trait Module {
    fn name(&self) -> String;
    fn description(&self) -> String;
}

pub fn subdomains_modules(config: &Config) -> Vec<Box<dyn SubdomainModule>> {
    vec![Box::new(CommonCrawl::new(config.clone()))]
}

pub fn display_all() {
    let subdomains_modules = subdomains_modules(&Config::default());
    println!("\nSubdomains modules");
    for module in subdomains_modules {
        println!("- {:25}{}", module.name(), module.description());
    }
}

// region:        --- HTTP requests

#[instrument(name = "HTTP_request", level = "info", skip_all, fields(url = url))]
pub async fn http_request(
    http_client: &Client,
    url: &str,
    cancel: &CancellationToken,
) -> Result<Response> {
    info!("Sending request");
    let res = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            debug!("Cancelled before response");
            return Err(Error::Cancelled);
        }
        res = http_client.get(url).send() => res,
    };

    match res {
        Ok(res) => {
            info!("Receive with status: {}", res.status());
            debug!("Response: {:?}", res);
            Ok(res)
        }
        Err(err) => {
            error!("Reason: {}", err);
            Err(Error::Network(err))
        }
    }
}

// endregion:     --- HTTP requests

use crate::config::Config;
use crate::model::{normalize_domain, ResultSet};
use crate::modules::{self, subdomains::SubdomainModule, Module};
use crate::Result;
use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, trace, warn};

// region:        --- Scan main function

#[tokio::main]
#[instrument(name = "scan", level = "info", skip_all)]
pub async fn scan(target: &str, config: Config) -> Result<Vec<String>> {
    let domain = normalize_domain(target)?;
    trace!("Start scan on {}", domain);

    let http_client = http_client(&config)?;

    let cancel = CancellationToken::new();
    watch_cancellation(&cancel, &config);

    let subdomains = scan_subdomains(&http_client, &domain, &config, &cancel).await;
    cancel.cancel();
    subdomains
}

// endregion:     --- Scan main function

// region:        --- Scan subfunctions

/// Client bounding every request, body included, by `request_timeout`.
fn http_client(config: &Config) -> Result<Client> {
    let http_client = Client::builder().timeout(config.request_timeout).build()?;
    debug!("HTTP Client created: {:?}", http_client);
    Ok(http_client)
}

/// Cancels the run on Ctrl-C or once `max_time` is elapsed.
fn watch_cancellation(cancel: &CancellationToken, config: &Config) {
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = on_signal.cancelled() => {}
            res = tokio::signal::ctrl_c() => {
                if res.is_ok() {
                    warn!("Interrupted");
                    on_signal.cancel();
                }
            }
        }
    });

    if let Some(max_time) = config.max_time {
        let on_deadline = cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = on_deadline.cancelled() => {}
                _ = tokio::time::sleep(max_time) => {
                    warn!("Deadline of {:?} reached", max_time);
                    on_deadline.cancel();
                }
            }
        });
    }
}

#[instrument(name = "subdomains", level = "info", skip_all)]
async fn scan_subdomains(
    http_client: &Client,
    domain: &str,
    config: &Config,
    cancel: &CancellationToken,
) -> Result<Vec<String>> {
    let results = ResultSet::new(domain);

    for module in modules::subdomains_modules(config) {
        info!("Running {}", module.name());
        for host in module.enumerate(http_client, domain, cancel).await? {
            results.insert(&host).await;
        }
    }

    let subdomains = results.into_sorted_vec();
    info!("{} subdomains", subdomains.len());
    Ok(subdomains)
}

// endregion:     --- Scan subfunctions

use crate::{Error, Result};
use std::collections::BTreeSet;
use tokio::sync::Mutex;

// region:        --- Target domain

/// Trim, lowercase and strip the trailing dot of a target domain.
pub fn normalize_domain(raw: &str) -> Result<String> {
    let domain = raw.trim().trim_end_matches('.').to_ascii_lowercase();

    let is_invalid = domain.is_empty()
        || domain.starts_with('.')
        || domain.contains("..")
        || domain
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '/' | ':' | '*' | '?' | '#' | '@'));

    if is_invalid {
        return Err(Error::InvalidDomain(raw.to_string()));
    }

    Ok(domain)
}

/// `host` is the domain itself or one of its subdomains.
pub fn is_in_scope(host: &str, domain: &str) -> bool {
    match host.strip_suffix(domain) {
        Some("") => true,
        Some(prefix) => prefix.len() > 1 && prefix.ends_with('.'),
        None => false,
    }
}

// endregion:     --- Target domain

// region:        --- Result set

/// Hostnames found for one domain, shared by every collection query of a run.
#[derive(Debug)]
pub struct ResultSet {
    domain: String,
    hosts: Mutex<BTreeSet<String>>,
}

impl ResultSet {
    pub fn new(domain: &str) -> Self {
        Self {
            domain: domain.to_string(),
            hosts: Mutex::new(BTreeSet::new()),
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Returns `true` only when the host is in scope and was not already known.
    pub async fn insert(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        if !is_in_scope(&host, &self.domain) {
            return false;
        }
        self.hosts.lock().await.insert(host)
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.hosts.lock().await.len()
    }

    /// Sorted lexicographically.
    pub fn into_sorted_vec(self) -> Vec<String> {
        self.hosts.into_inner().into_iter().collect()
    }
}

// endregion:     --- Result set

use super::collections::Collection;
use crate::model::ResultSet;
use crate::modules::http_request;
use crate::{Error, Result};
use futures::TryStreamExt;
use reqwest::{Client, Url};
use serde::Deserialize;
use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, trace};

// longer index lines are dropped
pub const MAX_LINE_BYTES: u64 = 64 * 1024;

/// A line of a CDX answer, only the captured url matters here.
#[derive(Debug, Deserialize)]
struct IndexRecord {
    url: Option<String>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct QueryStats {
    pub lines: usize,
    pub skipped: usize,
    pub inserted: usize,
}

pub fn query_url(cdx_api: &str, domain: &str) -> Result<Url> {
    let mut url = Url::parse(cdx_api)
        .map_err(|err| Error::InvalidCollection(format!("{cdx_api}: {err}")))?;

    url.query_pairs_mut()
        .append_pair("url", &format!("*.{domain}"))
        .append_pair("matchType", "domain")
        .append_pair("output", "json");

    Ok(url)
}

/// Lowercased host of a captured url.
pub fn extract_host(raw: &str) -> Result<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(Error::Extraction("empty url".to_string()));
    }

    let url = Url::parse(raw).map_err(|err| Error::Extraction(format!("{raw}: {err}")))?;
    match url.host_str().map(|host| host.trim_end_matches('.')) {
        Some(host) if !host.is_empty() => Ok(host.to_ascii_lowercase()),
        _ => Err(Error::Extraction(format!("{raw}: no host"))),
    }
}

fn host_from_line(line: &[u8]) -> Result<String> {
    let record: IndexRecord = serde_json::from_slice(line)?;
    match record.url {
        Some(url) => extract_host(&url),
        None => Err(Error::Extraction("missing url field".to_string())),
    }
}

fn mentions(line: &[u8], domain: &[u8]) -> bool {
    !domain.is_empty()
        && line
            .windows(domain.len())
            .any(|window| window.eq_ignore_ascii_case(domain))
}

#[derive(Debug, PartialEq, Eq)]
enum Line {
    Read,
    TooLong,
    End,
}

/// Reads one line into `line`, never buffering more than `MAX_LINE_BYTES`.
/// The rest of a longer line is consumed and dropped.
async fn next_line<R>(reader: &mut R, line: &mut Vec<u8>) -> io::Result<Line>
where
    R: AsyncBufRead + Unpin,
{
    line.clear();
    let read = (&mut *reader).take(MAX_LINE_BYTES).read_until(b'\n', line).await?;
    if read == 0 {
        return Ok(Line::End);
    }
    if (read as u64) < MAX_LINE_BYTES || line.last() == Some(&b'\n') {
        return Ok(Line::Read);
    }

    loop {
        let buf = reader.fill_buf().await?;
        if buf.is_empty() {
            break;
        }
        match buf.iter().position(|byte| *byte == b'\n') {
            Some(end) => {
                reader.consume(end + 1);
                break;
            }
            None => {
                let len = buf.len();
                reader.consume(len);
            }
        }
    }
    Ok(Line::TooLong)
}

/// Streams the CDX answer of one collection line by line into `results`.
///
/// Hosts are inserted as soon as their line is read, so an error in the middle
/// of the body keeps everything found before it.
#[instrument(name = "query", level = "info", skip_all, fields(collection = %collection.id))]
pub async fn query_collection(
    http_client: &Client,
    collection: &Collection,
    results: &ResultSet,
    prefilter: bool,
    cancel: &CancellationToken,
) -> Result<QueryStats> {
    let domain = results.domain();
    let url = query_url(&collection.cdx_api, domain)?;
    let res = http_request(http_client, url.as_str(), cancel).await?;

    if !res.status().is_success() {
        return Err(Error::InvalidHttpResponse(format!(
            "{} returned {}",
            collection.id,
            res.status()
        )));
    }

    let body = res.bytes_stream().map_err(io::Error::other);
    let mut reader = StreamReader::new(Box::pin(body));

    let mut stats = QueryStats::default();
    let mut line = Vec::new();
    loop {
        let read = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            read = next_line(&mut reader, &mut line) => read?,
        };
        match read {
            Line::End => break,
            Line::TooLong => {
                trace!("Skipping line longer than {} bytes", MAX_LINE_BYTES);
                stats.lines += 1;
                stats.skipped += 1;
                continue;
            }
            Line::Read => {}
        }

        let trimmed = line.trim_ascii();
        if trimmed.is_empty() {
            continue;
        }
        stats.lines += 1;

        if prefilter && !mentions(trimmed, domain.as_bytes()) {
            stats.skipped += 1;
            continue;
        }

        match host_from_line(trimmed) {
            Ok(host) => {
                if results.insert(&host).await {
                    trace!("Collecting: {:?}", host);
                    stats.inserted += 1;
                }
            }
            Err(err) => {
                trace!("Skipping line: {}", err);
                stats.skipped += 1;
            }
        }
    }

    debug!(
        "{} lines, {} skipped, {} new hosts",
        stats.lines, stats.skipped, stats.inserted
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client() -> Client {
        Client::builder().no_proxy().build().unwrap()
    }

    fn domain_query(domain: &str) -> Matcher {
        Matcher::AllOf(vec![
            Matcher::UrlEncoded("url".into(), format!("*.{domain}")),
            Matcher::UrlEncoded("matchType".into(), "domain".into()),
            Matcher::UrlEncoded("output".into(), "json".into()),
        ])
    }

    #[test]
    fn builds_domain_query() {
        let url = query_url("https://index.commoncrawl.org/CC-MAIN-2024-10-index", "example.com")
            .unwrap();

        assert_eq!(
            "https://index.commoncrawl.org/CC-MAIN-2024-10-index?url=*.example.com&matchType=domain&output=json",
            url.as_str()
        );
    }

    #[test]
    fn query_percent_encodes_domain() {
        let url = query_url("http://x/A", "exa&mple.com").unwrap();
        assert_eq!(
            "http://x/A?url=*.exa%26mple.com&matchType=domain&output=json",
            url.as_str()
        );
    }

    #[test]
    fn bad_cdx_api_is_rejected() {
        assert!(matches!(
            query_url("not a url", "example.com"),
            Err(Error::InvalidCollection(_))
        ));
    }

    #[test]
    fn extracts_lowercase_host() {
        assert_eq!(
            "sub1.example.com",
            extract_host("http://SUB1.Example.com/page?q=1").unwrap()
        );
        assert_eq!("example.com", extract_host("https://example.com:8443/").unwrap());
        assert_eq!("www.example.com", extract_host("http://www.example.com./").unwrap());
    }

    #[test]
    fn extraction_failures() {
        for raw in ["", "   ", "not a url", "/relative/path", "mailto:someone@example.com"] {
            assert!(
                matches!(extract_host(raw), Err(Error::Extraction(_))),
                "{raw:?} should not yield a host"
            );
        }
    }

    #[test]
    fn line_parsing() {
        assert_eq!(
            "a.example.com",
            host_from_line(br#"{"urlkey": "com,example,a)/", "url": "http://a.example.com/", "status": "200"}"#)
                .unwrap()
        );
        assert!(matches!(host_from_line(b"not-json-at-all"), Err(Error::Decode(_))));
        assert!(matches!(host_from_line(br#"{"status": "200"}"#), Err(Error::Extraction(_))));
        assert!(matches!(host_from_line(br#"{"url": ""}"#), Err(Error::Extraction(_))));
    }

    #[test]
    fn mentions_domain_case_insensitive() {
        assert!(mentions(br#"{"url": "http://WWW.EXAMPLE.COM/"}"#, b"example.com"));
        assert!(!mentions(br#"{"url": "http://other.org/"}"#, b"example.com"));
        assert!(!mentions(b"anything", b""));
    }

    #[tokio::test]
    async fn long_lines_are_capped_and_dropped() {
        let long = format!(
            "{{\"url\":\"http://a.example.com/{}\"}}",
            "x".repeat(MAX_LINE_BYTES as usize)
        );
        let body = format!("{long}\n{{\"url\":\"http://b.example.com/\"}}\n{long}");
        let mut reader = body.as_bytes();
        let mut line = Vec::new();

        assert_eq!(Line::TooLong, next_line(&mut reader, &mut line).await.unwrap());
        assert!(line.len() as u64 <= MAX_LINE_BYTES);

        assert_eq!(Line::Read, next_line(&mut reader, &mut line).await.unwrap());
        assert_eq!(b"{\"url\":\"http://b.example.com/\"}\n".as_slice(), line.as_slice());

        assert_eq!(Line::TooLong, next_line(&mut reader, &mut line).await.unwrap());
        assert_eq!(Line::End, next_line(&mut reader, &mut line).await.unwrap());
    }

    #[tokio::test]
    async fn long_line_does_not_stop_the_stream() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/A")
            .match_query(domain_query("example.com"))
            .with_status(200)
            .with_body(format!(
                "{{\"url\":\"http://a.example.com/{}\"}}\n{{\"url\":\"http://b.example.com/\"}}\n",
                "x".repeat(2 * MAX_LINE_BYTES as usize)
            ))
            .create_async()
            .await;

        let collection = Collection {
            id: "A".to_string(),
            cdx_api: format!("{}/A", server.url()),
        };
        let results = ResultSet::new("example.com");
        let stats = query_collection(&client(), &collection, &results, false, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(2, stats.lines);
        assert_eq!(1, stats.skipped);
        assert_eq!(vec!["b.example.com"], results.into_sorted_vec());
    }

    #[tokio::test]
    async fn keeps_only_hosts_of_the_domain() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/A")
            .match_query(domain_query("example.com"))
            .with_status(200)
            .with_body(
                "{\"url\":\"http://sub1.example.com/page\"}\n{\"url\":\"http://other.org/x\"}\n",
            )
            .create_async()
            .await;

        let collection = Collection {
            id: "A".to_string(),
            cdx_api: format!("{}/A", server.url()),
        };
        let results = ResultSet::new("example.com");
        let stats = query_collection(&client(), &collection, &results, false, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(2, stats.lines);
        assert_eq!(1, stats.inserted);
        assert_eq!(vec!["sub1.example.com"], results.into_sorted_vec());
    }

    #[tokio::test]
    async fn malformed_lines_do_not_stop_the_stream() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/A")
            .match_query(domain_query("example.com"))
            .with_status(200)
            .with_body(
                [
                    r#"{"url":"http://example.com/"}"#,
                    "not-json-at-all",
                    "",
                    r#"{"status":"404"}"#,
                    r#"{"url":"http://api.example.com/v1"}"#,
                    r#"{"url":"http://api.example.com/v2"}"#,
                ]
                .join("\n"),
            )
            .create_async()
            .await;

        let collection = Collection {
            id: "A".to_string(),
            cdx_api: format!("{}/A", server.url()),
        };
        let results = ResultSet::new("example.com");
        let stats = query_collection(&client(), &collection, &results, false, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            QueryStats {
                lines: 5,
                skipped: 2,
                inserted: 2
            },
            stats
        );
        assert_eq!(vec!["api.example.com", "example.com"], results.into_sorted_vec());
    }

    #[tokio::test]
    async fn prefilter_skips_lines_without_the_domain() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/A")
            .match_query(domain_query("example.com"))
            .with_status(200)
            .with_body(
                "{\"url\":\"http://other.org/x\"}\n{\"url\":\"http://WWW.Example.com/\"}\n",
            )
            .create_async()
            .await;

        let collection = Collection {
            id: "A".to_string(),
            cdx_api: format!("{}/A", server.url()),
        };
        let results = ResultSet::new("example.com");
        let stats = query_collection(&client(), &collection, &results, true, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(1, stats.skipped);
        assert_eq!(vec!["www.example.com"], results.into_sorted_vec());
    }

    #[tokio::test]
    async fn error_status_fails_the_collection() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/A")
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body("No Captures found for: *.example.com")
            .create_async()
            .await;

        let collection = Collection {
            id: "A".to_string(),
            cdx_api: format!("{}/A", server.url()),
        };
        let results = ResultSet::new("example.com");
        let res = query_collection(&client(), &collection, &results, false, &CancellationToken::new()).await;

        assert!(matches!(res, Err(Error::InvalidHttpResponse(_))));
        assert_eq!(0, results.len().await);
    }
}

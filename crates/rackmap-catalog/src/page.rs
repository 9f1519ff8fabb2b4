//! Pagination over catalog list endpoints
//!
//! List responses carry a `{results: [...], next: URL|null}` envelope; the
//! paginator follows `next` links until exhausted and hands back the fully
//! materialized record list.

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::cache::CachePolicy;
use crate::error::{CatalogError, Result};
use crate::http::CatalogFetch;

/// List response envelope
#[derive(Debug, Deserialize)]
struct PageEnvelope {
    results: Vec<Value>,
    next: Option<String>,
}

/// Fetch every page of a paginated listing, in page order.
///
/// # Errors
/// Returns [`CatalogError::EmptyUrl`] when `start_url` is empty (a caller
/// configuration mistake), a transport/decode error if any page fails, and
/// [`CatalogError::Decode`] when a page lacks a `results` array.
pub async fn fetch_all(
    fetch: &dyn CatalogFetch,
    start_url: &str,
    policy: CachePolicy,
) -> Result<Vec<Value>> {
    if start_url.is_empty() {
        return Err(CatalogError::EmptyUrl);
    }

    let mut records = Vec::new();
    let mut url = start_url.to_string();
    let mut pages = 0usize;

    loop {
        let page = fetch.fetch(&url, policy).await?;
        pages += 1;

        let envelope: PageEnvelope = serde_json::from_value(page)
            .map_err(|e| CatalogError::Decode(format!("page {pages} of {start_url}: {e}")))?;
        records.extend(envelope.results);

        match envelope.next {
            Some(next) if !next.is_empty() => url = next,
            _ => break,
        }
    }

    debug!(%start_url, pages, records = records.len(), "pagination complete");

    Ok(records)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;

    /// Scripted transport: URL -> response, counting fetches
    struct ScriptedFetch {
        pages: Vec<(String, Value)>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedFetch {
        fn new(pages: Vec<(&str, Value)>) -> Self {
            Self {
                pages: pages
                    .into_iter()
                    .map(|(u, v)| (u.to_string(), v))
                    .collect(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl CatalogFetch for ScriptedFetch {
        async fn fetch(&self, url: &str, _policy: CachePolicy) -> Result<Value> {
            self.calls.lock().unwrap().push(url.to_string());
            self.pages
                .iter()
                .find(|(u, _)| u == url)
                .map(|(_, v)| v.clone())
                .ok_or(CatalogError::Api {
                    status: 404,
                    message: url.to_string(),
                })
        }
    }

    #[tokio::test]
    async fn test_follows_next_links_in_page_order() {
        let fetch = ScriptedFetch::new(vec![
            (
                "http://x/p1",
                json!({"results": [1, 2], "next": "http://x/p2"}),
            ),
            (
                "http://x/p2",
                json!({"results": [3], "next": "http://x/p3"}),
            ),
            ("http://x/p3", json!({"results": [4, 5], "next": null})),
        ]);

        let records = fetch_all(&fetch, "http://x/p1", CachePolicy::disabled())
            .await
            .unwrap();

        assert_eq!(records, vec![json!(1), json!(2), json!(3), json!(4), json!(5)]);
        assert_eq!(fetch.call_count(), 3);
    }

    #[tokio::test]
    async fn test_single_page_without_next_field() {
        let fetch = ScriptedFetch::new(vec![("http://x/p1", json!({"results": ["a"]}))]);

        let records = fetch_all(&fetch, "http://x/p1", CachePolicy::disabled())
            .await
            .unwrap();

        assert_eq!(records, vec![json!("a")]);
        assert_eq!(fetch.call_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_start_url_is_an_error() {
        let fetch = ScriptedFetch::new(vec![]);

        let err = fetch_all(&fetch, "", CachePolicy::disabled())
            .await
            .unwrap_err();

        assert!(matches!(err, CatalogError::EmptyUrl));
        assert_eq!(fetch.call_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_results_is_a_decode_error() {
        let fetch = ScriptedFetch::new(vec![("http://x/p1", json!({"next": null}))]);

        let err = fetch_all(&fetch, "http://x/p1", CachePolicy::disabled())
            .await
            .unwrap_err();

        assert!(matches!(err, CatalogError::Decode(_)));
    }

    #[tokio::test]
    async fn test_mid_chain_failure_aborts() {
        let fetch = ScriptedFetch::new(vec![(
            "http://x/p1",
            json!({"results": [1], "next": "http://x/p2"}),
        )]);

        let err = fetch_all(&fetch, "http://x/p1", CachePolicy::disabled())
            .await
            .unwrap_err();

        assert!(matches!(err, CatalogError::Api { status: 404, .. }));
    }
}

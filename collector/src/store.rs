use anyhow::Context;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum StoreError {
    /// The store answered with an error payload instead of results.
    #[error("Store returned an error for a query on {index}: {payload}")]
    Query { index: String, payload: Value },
    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Malformed search response from {index}: {source}")]
    Malformed {
        index: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// A search-indexed document store that benchmark runs and host telemetry are published to.
pub trait SearchStore: Sync {
    /// Run a search request against every index matching the `index` prefix and return the raw
    /// response body.
    fn search<'a>(
        &'a self,
        index: &'a str,
        query: &'a Value,
    ) -> BoxFuture<'a, Result<Value, StoreError>>;
}

/// One search hit. Only the stored document is used.
#[derive(Debug, Clone, Deserialize)]
pub struct Hit {
    #[serde(rename = "_source")]
    pub source: Value,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: HitList,
}

#[derive(Debug, Deserialize)]
struct HitList {
    #[serde(default)]
    hits: Vec<Hit>,
}

/// Run a search and return its hits, turning an error payload into [StoreError::Query].
pub async fn search_hits<S>(store: &S, index: &str, query: &Value) -> Result<Vec<Hit>, StoreError>
where
    S: SearchStore + ?Sized,
{
    let response = store.search(index, query).await?;
    parse_hits(index, response)
}

pub(crate) fn parse_hits(index: &str, response: Value) -> Result<Vec<Hit>, StoreError> {
    if let Some(payload) = response.get("error") {
        return Err(StoreError::Query {
            index: index.to_string(),
            payload: payload.clone(),
        });
    }

    let response: SearchResponse =
        serde_json::from_value(response).map_err(|source| StoreError::Malformed {
            index: index.to_string(),
            source,
        })?;

    Ok(response.hits.hits)
}

/// [SearchStore] over the store's HTTP search API.
#[derive(Debug, Clone)]
pub struct HttpStore {
    client: reqwest::Client,
    base: Url,
}

impl HttpStore {
    /// Create a store for `address`, either `host:port` or a full base URL.
    pub fn new(address: &str) -> anyhow::Result<Self> {
        let base = if address.contains("://") {
            Url::parse(address)
        } else {
            Url::parse(&format!("http://{address}/"))
        }
        .with_context(|| format!("Invalid store address: {address}"))?;

        Ok(Self {
            client: reqwest::Client::new(),
            base,
        })
    }

    fn search_url(&self, index: &str) -> Result<Url, StoreError> {
        self.base
            .join(&format!("{index}*/_search"))
            .map_err(|e| StoreError::Unavailable(format!("Invalid search url for {index}: {e}")))
    }
}

impl SearchStore for HttpStore {
    fn search<'a>(
        &'a self,
        index: &'a str,
        query: &'a Value,
    ) -> BoxFuture<'a, Result<Value, StoreError>> {
        async move {
            let url = self.search_url(index)?;
            log::debug!("Querying {url}: {query}");

            let transport = |source| StoreError::Transport {
                url: url.to_string(),
                source,
            };
            let response = self
                .client
                .post(url.clone())
                .json(query)
                .send()
                .await
                .map_err(transport)?;
            // Error payloads come back with a 4xx/5xx status, so the body is read regardless.
            let body: Value = response.json().await.map_err(transport)?;

            #[cfg(feature = "test_data")]
            if let Err(e) = crate::test_data::insert_query_result(index, query, &body) {
                log::warn!("Failed to record query result for {index}: {e:?}");
            }

            log::trace!("Response: {body}");

            Ok(body)
        }
        .boxed()
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn error_payload_is_a_query_error() {
        let err = parse_hits(
            "metricbeat",
            json!({"error": {"type": "search_phase_execution_exception"}, "status": 400}),
        )
        .unwrap_err();

        match err {
            StoreError::Query { index, payload } => {
                assert_eq!("metricbeat", index);
                assert_eq!(json!({"type": "search_phase_execution_exception"}), payload);
            }
            e => panic!("Unexpected error: {e:?}"),
        }
    }

    #[test]
    fn hits_are_read_from_source() {
        let hits = parse_hits(
            "fiotest",
            json!({"took": 3, "hits": {"total": 1, "hits": [{"_id": "a", "_source": {"Name": "run"}}]}}),
        )
        .unwrap();

        assert_eq!(1, hits.len());
        assert_eq!(json!({"Name": "run"}), hits[0].source);
    }

    #[test]
    fn missing_hits_is_malformed() {
        let err = parse_hits("fiotest", json!({"took": 3})).unwrap_err();
        assert!(matches!(err, StoreError::Malformed { .. }), "{err:?}");
    }

    #[test]
    fn search_url_uses_index_prefix() {
        let store = HttpStore::new("localhost:9200").unwrap();
        assert_eq!(
            "http://localhost:9200/fiotest*/_search",
            store.search_url("fiotest").unwrap().as_str()
        );

        let store = HttpStore::new("https://search.internal:9243").unwrap();
        assert_eq!(
            "https://search.internal:9243/metricbeat*/_search",
            store.search_url("metricbeat").unwrap().as_str()
        );
    }
}

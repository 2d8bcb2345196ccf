//! Query construction and lazy, paginated record retrieval.
//!
//! A [`Query`] captures one logical read — endpoint URL, optional detail
//! key, translated filters, pagination, sort — and is immutable once
//! built. [`RecordSet`] drives it: the first [`try_next`](RecordSet::try_next)
//! issues the request, normalizes whichever body shape the server chose
//! (paginated `result`/`meta` envelope, bare array, or a single object)
//! and buffers the page; subsequent calls drain the buffer without
//! touching the network.
//!
//! When the caller asked for no explicit page-size limit, the set fetches
//! *everything*: the first response's `meta.total` is read, and if the
//! page is short one more request with `limit = total` replaces it. One
//! extra round trip buys iteration over the full listing by default.

use std::collections::{BTreeMap, VecDeque};

use http::Method;
use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::endpoint::Endpoint;
use crate::record::Record;
use crate::{Error, Result};

/// The page size the server applies when a listing is paginated and the
/// caller specified none.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Sort direction for one field of a sorted listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortOrder {
    /// Ascending.
    Asc,
    /// Descending (the remote API spells it `DSC`).
    Dsc,
}

/// One logical read: everything needed to build the request(s) that
/// satisfy it. Immutable after construction; the memoized total lives on
/// the [`RecordSet`] driving the query.
#[derive(Debug, Clone)]
pub(crate) struct Query {
    url: Url,
    key: Option<String>,
    filters: Vec<(String, String)>,
    limit: Option<u32>,
    page: Option<u32>,
    sort_by: Option<BTreeMap<String, SortOrder>>,
}

impl Query {
    pub(crate) fn list(
        url: Url,
        filters: Vec<(String, String)>,
        limit: Option<u32>,
        page: Option<u32>,
        sort_by: Option<BTreeMap<String, SortOrder>>,
    ) -> Query {
        Query {
            url,
            key: None,
            filters,
            limit,
            page,
            sort_by,
        }
    }

    pub(crate) fn detail(url: Url, key: String) -> Query {
        Query {
            url,
            key: Some(key),
            filters: Vec::new(),
            limit: None,
            page: None,
            sort_by: None,
        }
    }

    pub(crate) fn limit(&self) -> Option<u32> {
        self.limit
    }

    /// Rejects caller mistakes before any request is issued.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.page.is_some() && !matches!(self.limit, Some(l) if l > 0) {
            return Err(Error::Usage(
                "page requires a positive limit value".to_string(),
            ));
        }
        Ok(())
    }

    /// Detail lookups address `{url}/{key}`; listings keep the trailing
    /// slash the server expects.
    pub(crate) fn target_url(&self) -> Url {
        let mut url = self.url.clone();
        let base = url.path().trim_end_matches('/').to_string();
        match &self.key {
            Some(key) => url.set_path(&format!("{}/{}", base, key)),
            None => url.set_path(&format!("{}/", base)),
        }
        url
    }

    /// Query parameters for the initial request.
    pub(crate) fn params(&self) -> Vec<(String, String)> {
        let mut params = self.filters.clone();
        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(page) = self.page {
            params.push(("page".to_string(), page.to_string()));
        }
        self.push_sort(&mut params);
        params
    }

    /// Parameters for the fetch-everything follow-up call: same filters
    /// and sort, `limit` forced to the reported total, no page.
    pub(crate) fn params_with_limit(&self, limit: u64) -> Vec<(String, String)> {
        let mut params = self.filters.clone();
        params.push(("limit".to_string(), limit.to_string()));
        self.push_sort(&mut params);
        params
    }

    /// Parameters for the count probe: a zero-result window that only
    /// exists to carry back `meta.total`.
    pub(crate) fn count_params(&self) -> Vec<(String, String)> {
        let mut params = self.filters.clone();
        params.push(("limit".to_string(), "0".to_string()));
        params
    }

    fn push_sort(&self, params: &mut Vec<(String, String)>) {
        if let Some(sort_by) = &self.sort_by {
            let encoded = serde_json::to_string(sort_by).unwrap_or_default();
            params.push(("sort_by".to_string(), encoded));
        }
    }
}

#[derive(Debug)]
enum State {
    Pending,
    Draining(VecDeque<Value>),
    Exhausted,
}

/// A lazy sequence of [`Record`]s backed by one or more network calls.
///
/// The set is **single-pass**: once exhausted, [`try_next`](RecordSet::try_next)
/// keeps returning `Ok(None)` and never re-issues the query. To iterate
/// again, call the endpoint operation again; that builds a fresh set which
/// re-executes from page one.
///
/// # Examples
///
/// ```no_run
/// # async fn example() -> centreon_api::Result<()> {
/// # let api = centreon_api::Api::builder().url("https://ctn")?.build()?;
/// let mut hosts = api.monitoring().endpoint("hosts").all();
/// while let Some(host) = hosts.try_next().await? {
///     println!("{}", host);
/// }
/// # Ok(())
/// # }
/// ```
pub struct RecordSet {
    endpoint: Endpoint,
    query: Query,
    state: State,
    count: Option<u64>,
}

impl std::fmt::Debug for RecordSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordSet")
            .field("query", &self.query)
            .field("state", &self.state)
            .field("count", &self.count)
            .finish()
    }
}

impl RecordSet {
    pub(crate) fn new(endpoint: Endpoint, query: Query) -> RecordSet {
        RecordSet {
            endpoint,
            query,
            state: State::Pending,
            count: None,
        }
    }

    /// Produces the next record, fetching from the server if this set has
    /// not issued its query yet.
    ///
    /// Returns `Ok(None)` once the sequence is exhausted, and keeps
    /// returning it on every later call.
    pub async fn try_next(&mut self) -> Result<Option<Record>> {
        loop {
            match self.state {
                State::Pending => {
                    self.query.validate()?;
                    let buf = self.load().await?;
                    self.state = State::Draining(buf);
                }
                State::Draining(ref mut buf) => match buf.pop_front() {
                    Some(value) => return self.endpoint.materialize(value).map(Some),
                    None => {
                        self.state = State::Exhausted;
                        return Ok(None);
                    }
                },
                State::Exhausted => return Ok(None),
            }
        }
    }

    /// Drains the remaining records into a `Vec`.
    pub async fn collect(mut self) -> Result<Vec<Record>> {
        let mut records = Vec::new();
        while let Some(record) = self.try_next().await? {
            records.push(record);
        }
        Ok(records)
    }

    /// The total number of records matching the query, as reported by the
    /// server.
    ///
    /// Memoized: the first call either reuses the total recorded while
    /// paginating or issues a zero-result-window probe purely to read
    /// `meta.total`; later calls reuse the cached value.
    pub async fn total(&mut self) -> Result<u64> {
        if let Some(count) = self.count {
            return Ok(count);
        }
        self.query.validate()?;
        let body = self.fetch(self.query.count_params()).await?;
        let count = match body {
            Value::Object(map) => map
                .get("meta")
                .and_then(|meta| meta.get("total"))
                .and_then(Value::as_u64)
                .or_else(|| {
                    map.get("result")
                        .and_then(Value::as_array)
                        .map(|items| items.len() as u64)
                })
                .unwrap_or(1),
            Value::Array(items) => items.len() as u64,
            Value::Null => 0,
            _ => 1,
        };
        self.count = Some(count);
        Ok(count)
    }

    /// Issues the initial request and normalizes the body into a buffer
    /// of pending objects, following up once when the full listing was
    /// implicitly requested.
    async fn load(&mut self) -> Result<VecDeque<Value>> {
        let body = self.fetch(self.query.params()).await?;
        match body {
            Value::Object(map) if is_envelope(&map) => {
                let items = take_result(map, &mut self.count);
                let total = self.count.unwrap_or(items.len() as u64);

                if self.query.limit().is_some() {
                    // The caller asked for this one page; further pages
                    // are theirs to request.
                    return Ok(items.into());
                }
                if total > items.len() as u64 {
                    tracing::debug!(total, "fetching full listing");
                    let body = self.fetch(self.query.params_with_limit(total)).await?;
                    let items = match body {
                        Value::Object(map) if is_envelope(&map) => {
                            take_result(map, &mut self.count)
                        }
                        Value::Array(items) => items,
                        Value::Null => Vec::new(),
                        single => vec![single],
                    };
                    return Ok(items.into());
                }
                Ok(items.into())
            }
            Value::Array(items) => {
                self.count = Some(items.len() as u64);
                Ok(items.into())
            }
            Value::Null => {
                self.count = Some(0);
                Ok(VecDeque::new())
            }
            single => {
                self.count = Some(1);
                Ok(VecDeque::from([single]))
            }
        }
    }

    async fn fetch(&self, params: Vec<(String, String)>) -> Result<Value> {
        self.endpoint
            .transport()
            .execute(Method::GET, self.query.target_url(), &params, None)
            .await
    }
}

fn is_envelope(map: &serde_json::Map<String, Value>) -> bool {
    map.get("result").map(Value::is_array).unwrap_or(false)
}

/// Pulls the `result` items out of an envelope and records `meta.total`
/// when present, falling back to the page length.
fn take_result(
    mut map: serde_json::Map<String, Value>,
    count: &mut Option<u64>,
) -> Vec<Value> {
    let items = match map.remove("result") {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
    };
    let total = map
        .get("meta")
        .and_then(|meta| meta.get("total"))
        .and_then(Value::as_u64);
    *count = Some(total.unwrap_or(items.len() as u64));
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url() -> Url {
        Url::parse("https://ctn/api/latest/monitoring/hosts").unwrap()
    }

    #[test]
    fn page_without_limit_is_rejected() {
        let query = Query::list(url(), Vec::new(), None, Some(2), None);
        let err = query.validate().unwrap_err();
        assert!(err.is_usage());
        assert!(err.to_string().contains("positive limit"));
    }

    #[test]
    fn page_with_zero_limit_is_rejected() {
        let query = Query::list(url(), Vec::new(), Some(0), Some(2), None);
        assert!(query.validate().is_err());
    }

    #[test]
    fn page_with_limit_is_accepted() {
        let query = Query::list(url(), Vec::new(), Some(10), Some(2), None);
        assert!(query.validate().is_ok());
    }

    #[test]
    fn params_encode_pagination_as_strings() {
        let query = Query::list(url(), Vec::new(), Some(10), Some(2), None);
        let params = query.params();
        assert!(params.contains(&("limit".to_string(), "10".to_string())));
        assert!(params.contains(&("page".to_string(), "2".to_string())));
    }

    #[test]
    fn sort_serializes_as_json_mapping() {
        let mut sort = BTreeMap::new();
        sort.insert("host.name".to_string(), SortOrder::Asc);
        let query = Query::list(url(), Vec::new(), None, None, Some(sort));
        let params = query.params();
        assert!(params.contains(&("sort_by".to_string(), r#"{"host.name":"ASC"}"#.to_string())));
    }

    #[test]
    fn follow_up_params_drop_the_page() {
        let mut sort = BTreeMap::new();
        sort.insert("host.name".to_string(), SortOrder::Dsc);
        let query = Query::list(
            url(),
            vec![("search".to_string(), "{}".to_string())],
            Some(10),
            Some(2),
            Some(sort),
        );
        let params = query.params_with_limit(25);
        assert!(params.contains(&("limit".to_string(), "25".to_string())));
        assert!(params.contains(&("sort_by".to_string(), r#"{"host.name":"DSC"}"#.to_string())));
        assert!(!params.iter().any(|(k, _)| k == "page"));
    }

    #[test]
    fn detail_and_list_urls() {
        let query = Query::detail(url(), "42".to_string());
        assert_eq!(
            query.target_url().as_str(),
            "https://ctn/api/latest/monitoring/hosts/42"
        );
        let query = Query::list(url(), Vec::new(), None, None, None);
        assert_eq!(
            query.target_url().as_str(),
            "https://ctn/api/latest/monitoring/hosts/"
        );
    }

    #[test]
    fn count_probe_requests_a_zero_window() {
        let query = Query::list(url(), Vec::new(), Some(10), Some(2), None);
        assert_eq!(
            query.count_params(),
            vec![("limit".to_string(), "0".to_string())]
        );
    }
}

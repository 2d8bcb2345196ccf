//! Per-resource operation surface.
//!
//! An [`Endpoint`] binds one resource path (`{base}/{app}/{resource}`) to
//! the record specialization registered for it and to the shared API
//! context, and exposes the read/write operations the Centreon v2 API
//! offers on such paths. Reads hand back lazy [`RecordSet`]s; writes go
//! out as single batch calls and materialize fresh [`Record`]s from the
//! response.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use http::Method;
use serde_json::{json, Map, Value};
use tokio::sync::OnceCell;
use url::Url;

use crate::api::Api;
use crate::query::{Query, RecordSet, SortOrder, DEFAULT_PAGE_SIZE};
use crate::record::{Record, RecordKind};
use crate::transport::Transport;
use crate::{Error, Result};

/// Filter field names that collide with the controls the builder manages
/// itself; rejected before any request goes out.
const RESERVED_FIELDS: [&str; 5] = ["limit", "page", "q", "search", "sort_by"];

/// Search criteria and pagination controls for a listing.
///
/// Field filters are rewritten into the remote search-object syntax:
/// underscores in the name become dots, and the whole mapping is
/// serialized under a single `search` query parameter, so
/// `field("host_name", "x")` queries for `{"host.name": "x"}`.
///
/// Known limitation of that translation: an underscore that is part of
/// the remote field name itself (not a dot separator) cannot be
/// expressed this way. Pass a pre-built [`search`](Filter::search)
/// string to bypass the translation entirely; with a raw search present,
/// field filters are sent through as plain query parameters, untouched.
///
/// # Examples
///
/// ```
/// use centreon_api::{Filter, SortOrder};
///
/// let filter = Filter::new()
///     .field("host_name", "db-01")
///     .sort("host.name", SortOrder::Asc)
///     .limit(50);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Filter {
    term: Option<String>,
    fields: Vec<(String, Value)>,
    search: Option<String>,
    limit: Option<u32>,
    page: Option<u32>,
    sort_by: BTreeMap<String, SortOrder>,
}

impl Filter {
    /// An empty filter: matches everything.
    pub fn new() -> Filter {
        Filter::default()
    }

    /// Freeform search term, passed through as the `q` parameter.
    pub fn term(mut self, term: impl Into<String>) -> Filter {
        self.term = Some(term.into());
        self
    }

    /// Adds one field filter, subject to the dotted-name translation
    /// described on [`Filter`].
    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Filter {
        self.fields.push((name.into(), value.into()));
        self
    }

    /// Supplies a pre-built search string verbatim, bypassing the
    /// dotted-name translation.
    pub fn search(mut self, search: impl Into<String>) -> Filter {
        self.search = Some(search.into());
        self
    }

    /// Caps each server response at `limit` records. Iterating a set
    /// built with an explicit limit yields exactly one page.
    pub fn limit(mut self, limit: u32) -> Filter {
        self.limit = Some(limit);
        self
    }

    /// Requests one specific page. Requires a positive
    /// [`limit`](Filter::limit).
    pub fn page(mut self, page: u32) -> Filter {
        self.page = Some(page);
        self
    }

    /// Requests one specific page at the server's default page size
    /// ([`DEFAULT_PAGE_SIZE`]) unless a limit was already chosen.
    pub fn paged(mut self, page: u32) -> Filter {
        self.page = Some(page);
        self.limit.get_or_insert(DEFAULT_PAGE_SIZE);
        self
    }

    /// Sorts the listing by `field` in the given direction. May be called
    /// once per field.
    pub fn sort(mut self, field: impl Into<String>, order: SortOrder) -> Filter {
        self.sort_by.insert(field.into(), order);
        self
    }

    /// Translates the criteria into query parameters, rejecting reserved
    /// field names before anything reaches the network.
    fn into_query(self, url: Url) -> Result<Query> {
        for (name, _) in &self.fields {
            if RESERVED_FIELDS.contains(&name.as_str()) {
                return Err(Error::Usage(format!(
                    "a reserved filter field was passed ({}); remove it and use the matching control instead",
                    name
                )));
            }
        }

        let mut params = Vec::new();
        match &self.search {
            Some(raw) => {
                params.push(("search".to_string(), raw.clone()));
                for (name, value) in &self.fields {
                    params.push((name.clone(), param_string(value)));
                }
            }
            None => {
                if !self.fields.is_empty() {
                    let translated: Map<String, Value> = self
                        .fields
                        .iter()
                        .map(|(name, value)| (name.replace('_', "."), value.clone()))
                        .collect();
                    let encoded = serde_json::to_string(&translated).unwrap_or_default();
                    params.push(("search".to_string(), encoded));
                }
            }
        }
        if let Some(term) = &self.term {
            params.push(("q".to_string(), term.clone()));
        }

        let sort_by = if self.sort_by.is_empty() {
            None
        } else {
            Some(self.sort_by)
        };
        Ok(Query::list(url, params, self.limit, self.page, sort_by))
    }
}

fn param_string(value: &Value) -> String {
    match value.as_str() {
        Some(s) => s.to_string(),
        None => value.to_string(),
    }
}

/// One element of a batch update.
///
/// Records are diffed against their construction snapshot via
/// [`Record::updates`]; raw objects must already carry their `id`.
pub enum Updatable {
    /// A record fetched earlier, possibly mutated with [`Record::set`].
    Record(Record),
    /// A raw JSON object including the `id` field.
    Object(Map<String, Value>),
}

impl From<Record> for Updatable {
    fn from(record: Record) -> Updatable {
        Updatable::Record(record)
    }
}

impl From<Map<String, Value>> for Updatable {
    fn from(object: Map<String, Value>) -> Updatable {
        Updatable::Object(object)
    }
}

/// One element of a batch delete: an identifier, a numeric string, or a
/// record carrying its identifier.
pub enum Deletable {
    /// An entity identifier.
    Id(i64),
    /// A string holding a numeric identifier.
    Key(String),
    /// A record; must carry an `id` field.
    Record(Record),
}

impl Deletable {
    fn into_id(self) -> Result<i64> {
        match self {
            Deletable::Id(id) => Ok(id),
            Deletable::Key(key) => key.trim().parse::<i64>().map_err(|_| {
                Error::Usage(format!(
                    "invalid object in list of objects to delete: '{}' is not a numeric identifier",
                    key
                ))
            }),
            Deletable::Record(record) => record.id().ok_or_else(|| {
                Error::Usage(
                    "a record without an id cannot be bulk deleted".to_string(),
                )
            }),
        }
    }
}

impl From<i64> for Deletable {
    fn from(id: i64) -> Deletable {
        Deletable::Id(id)
    }
}

impl From<&str> for Deletable {
    fn from(key: &str) -> Deletable {
        Deletable::Key(key.to_string())
    }
}

impl From<String> for Deletable {
    fn from(key: String) -> Deletable {
        Deletable::Key(key)
    }
}

impl From<Record> for Deletable {
    fn from(record: Record) -> Deletable {
        Deletable::Record(record)
    }
}

struct EndpointInner {
    api: Api,
    app: String,
    name: String,
    url: Url,
    kind: RecordKind,
    choices: OnceCell<BTreeMap<String, Vec<Value>>>,
}

/// The operation surface for one resource path.
///
/// Cheap to clone; clones share the resolved record specialization and
/// the cached `choices` metadata.
///
/// # Examples
///
/// ```no_run
/// use centreon_api::{Api, Filter};
///
/// # async fn example() -> centreon_api::Result<()> {
/// let api = Api::builder()
///     .url("https://centreon.example.com/centreon")?
///     .token("d6f4e314a5b5fefd164995169f28ae32d987704f")
///     .build()?;
///
/// let hosts = api.configuration().endpoint("hosts");
///
/// // Iterate over everything.
/// let mut all = hosts.all();
/// while let Some(host) = all.try_next().await? {
///     println!("{}", host);
/// }
///
/// // Narrow by field.
/// let down = hosts
///     .filter(Filter::new().field("host_name", "db-01"))?
///     .collect()
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Endpoint {
    inner: Arc<EndpointInner>,
}

impl Endpoint {
    pub(crate) fn new(api: Api, app: &str, name: &str) -> Endpoint {
        let url = api.resource_url(&[app, name]);
        Endpoint {
            inner: Arc::new(EndpointInner {
                api,
                app: app.to_string(),
                name: name.to_string(),
                url,
                kind: RecordKind::resolve(app, name),
                choices: OnceCell::new(),
            }),
        }
    }

    /// The namespace this endpoint lives in.
    pub fn app(&self) -> &str {
        &self.inner.app
    }

    /// The resource name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The resource URL.
    pub fn url(&self) -> &Url {
        &self.inner.url
    }

    /// The record specialization responses materialize as.
    pub fn kind(&self) -> RecordKind {
        self.inner.kind
    }

    pub(crate) fn transport(&self) -> &Transport {
        self.inner.api.transport()
    }

    pub(crate) fn materialize(&self, value: Value) -> Result<Record> {
        match value {
            Value::Object(map) => Ok(Record::from_object(
                self.inner.kind,
                map,
                Some(self.clone()),
            )),
            _ => Err(Error::Content {
                url: self.inner.url.to_string(),
                detail: "expected a JSON object in the response".to_string(),
            }),
        }
    }

    /// Queries the full listing.
    ///
    /// With no explicit limit the returned set fetches every record,
    /// trading one extra round trip for complete iteration; to page or
    /// sort the listing instead, pass an empty [`Filter`] with the
    /// matching controls to [`filter`](Endpoint::filter).
    pub fn all(&self) -> RecordSet {
        RecordSet::new(
            self.clone(),
            Query::list(self.inner.url.clone(), Vec::new(), None, None, None),
        )
    }

    /// Queries the listing narrowed by `filter`.
    ///
    /// Reserved field names and a page without a positive limit are
    /// rejected here, before any request is issued.
    pub fn filter(&self, filter: Filter) -> Result<RecordSet> {
        let query = filter.into_query(self.inner.url.clone())?;
        query.validate()?;
        Ok(RecordSet::new(self.clone(), query))
    }

    /// Looks up one record by its key.
    ///
    /// A 404 means the record does not exist and returns `Ok(None)`; any
    /// other failure propagates.
    pub async fn get(&self, key: impl fmt::Display) -> Result<Option<Record>> {
        let query = Query::detail(self.inner.url.clone(), key.to_string());
        let mut set = RecordSet::new(self.clone(), query);
        match set.try_next().await {
            Ok(record) => Ok(record),
            Err(e) if e.status() == Some(http::StatusCode::NOT_FOUND) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Looks up the single record matching `filter`.
    ///
    /// Zero matches return `Ok(None)`. Two or more are a usage error —
    /// the check consumes at most two items from the underlying set, so
    /// no further pages are pulled just to fail.
    pub async fn get_by(&self, filter: Filter) -> Result<Option<Record>> {
        let mut set = self.filter(filter)?;
        let first = match set.try_next().await? {
            Some(record) => record,
            None => return Ok(None),
        };
        if set.try_next().await?.is_some() {
            return Err(Error::Usage(
                "get_by returned more than one result; narrow the filter or use filter() or all() instead"
                    .to_string(),
            ));
        }
        Ok(Some(first))
    }

    /// Creates one object and returns the record the server answered
    /// with.
    ///
    /// A 409 surfaces as [`Error::Allocation`]: the resource could not be
    /// allocated, typically because a unique key already exists.
    pub async fn create(&self, object: Map<String, Value>) -> Result<Record> {
        let response = self
            .transport()
            .execute(
                Method::POST,
                self.inner.url.clone(),
                &[],
                Some(&Value::Object(object)),
            )
            .await?;
        match response {
            Value::Array(items) => items
                .into_iter()
                .next()
                .ok_or_else(|| Error::Content {
                    url: self.inner.url.to_string(),
                    detail: "creation response was an empty list".to_string(),
                })
                .and_then(|item| self.materialize(item)),
            single => self.materialize(single),
        }
    }

    /// Creates several objects in one call and returns the created
    /// records.
    pub async fn create_bulk(&self, objects: Vec<Map<String, Value>>) -> Result<Vec<Record>> {
        let payload = Value::Array(objects.into_iter().map(Value::Object).collect());
        let response = self
            .transport()
            .execute(Method::POST, self.inner.url.clone(), &[], Some(&payload))
            .await?;
        self.materialize_many(response)
    }

    /// Applies a batch of partial updates in one call.
    ///
    /// Records contribute only their changed fields (with the identifier
    /// re-attached); records with no changes are dropped from the batch.
    /// Raw objects must already carry an `id`. An all-unchanged batch
    /// issues no request at all.
    pub async fn update<I>(&self, objects: I) -> Result<Vec<Record>>
    where
        I: IntoIterator,
        I::Item: Into<Updatable>,
    {
        let mut series = Vec::new();
        for object in objects {
            match object.into() {
                Updatable::Record(record) => {
                    let mut changes = record.updates();
                    if changes.is_empty() {
                        continue;
                    }
                    let id = record.id().ok_or_else(|| {
                        Error::Usage("a record without an id cannot be updated".to_string())
                    })?;
                    changes.insert("id".to_string(), json!(id));
                    series.push(Value::Object(changes));
                }
                Updatable::Object(object) => {
                    if !object.contains_key("id") {
                        return Err(Error::Usage(format!(
                            "id is missing from object: {}",
                            Value::Object(object)
                        )));
                    }
                    series.push(Value::Object(object));
                }
            }
        }
        if series.is_empty() {
            return Ok(Vec::new());
        }
        let response = self
            .transport()
            .execute(
                Method::PATCH,
                self.inner.url.clone(),
                &[],
                Some(&Value::Array(series)),
            )
            .await?;
        self.materialize_many(response)
    }

    /// Deletes a batch of entities in one call.
    ///
    /// Accepts identifiers, numeric strings, and records that carry an
    /// identifier; anything else is a usage error raised before the
    /// request goes out.
    pub async fn delete<I>(&self, objects: I) -> Result<bool>
    where
        I: IntoIterator,
        I::Item: Into<Deletable>,
    {
        let mut ids = Vec::new();
        for object in objects {
            ids.push(object.into().into_id()?);
        }
        let payload = Value::Array(ids.into_iter().map(|id| json!({ "id": id })).collect());
        self.transport()
            .execute_delete(self.inner.url.clone(), &payload)
            .await
    }

    /// Counts the records matching `filter` without fetching them.
    pub async fn count(&self, filter: Filter) -> Result<u64> {
        let mut set = self.filter(filter)?;
        set.total().await
    }

    /// The fields of this endpoint that declare an enumerated set of
    /// allowed values, keyed by field name.
    ///
    /// Fetched once from the endpoint's OPTIONS metadata and cached for
    /// the lifetime of the endpoint (and its clones).
    pub async fn choices(&self) -> Result<BTreeMap<String, Vec<Value>>> {
        self.inner
            .choices
            .get_or_try_init(|| self.fetch_choices())
            .await
            .cloned()
    }

    async fn fetch_choices(&self) -> Result<BTreeMap<String, Vec<Value>>> {
        let body = self
            .transport()
            .execute(Method::OPTIONS, self.inner.url.clone(), &[], None)
            .await?;
        let post_actions = body
            .get("actions")
            .and_then(|actions| actions.get("POST"))
            .and_then(Value::as_object)
            .ok_or_else(|| Error::Content {
                url: self.inner.url.to_string(),
                detail: "unexpected format in the OPTIONS response".to_string(),
            })?;

        let mut choices = BTreeMap::new();
        for (field, descriptor) in post_actions {
            if let Some(values) = descriptor.get("choices").and_then(Value::as_array) {
                choices.insert(field.clone(), values.clone());
            }
        }
        Ok(choices)
    }

    fn materialize_many(&self, response: Value) -> Result<Vec<Record>> {
        match response {
            Value::Array(items) => items
                .into_iter()
                .map(|item| self.materialize(item))
                .collect(),
            Value::Null => Ok(Vec::new()),
            single => Ok(vec![self.materialize(single)?]),
        }
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("url", &self.inner.url.as_str())
            .field("kind", &self.inner.kind)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(filter: Filter) -> Vec<(String, String)> {
        let url = Url::parse("https://ctn/api/latest/monitoring/hosts").unwrap();
        filter.into_query(url).unwrap().params()
    }

    #[test]
    fn field_filters_translate_to_dotted_search() {
        let params = params(Filter::new().field("host_name", "db-01"));
        assert_eq!(
            params,
            vec![("search".to_string(), r#"{"host.name":"db-01"}"#.to_string())]
        );
    }

    #[test]
    fn non_string_values_survive_translation() {
        let params = params(Filter::new().field("poller_id", 2));
        assert_eq!(
            params,
            vec![("search".to_string(), r#"{"poller.id":2}"#.to_string())]
        );
    }

    #[test]
    fn raw_search_bypasses_translation() {
        let params = params(
            Filter::new()
                .search(r#"{"host.alias":"prod_db"}"#)
                .field("state", "down"),
        );
        assert_eq!(
            params,
            vec![
                ("search".to_string(), r#"{"host.alias":"prod_db"}"#.to_string()),
                ("state".to_string(), "down".to_string()),
            ]
        );
    }

    #[test]
    fn freeform_term_becomes_q() {
        let params = params(Filter::new().term("db"));
        assert_eq!(params, vec![("q".to_string(), "db".to_string())]);
    }

    #[test]
    fn reserved_field_names_are_rejected() {
        for reserved in RESERVED_FIELDS {
            let url = Url::parse("https://ctn/api/latest/monitoring/hosts").unwrap();
            let err = Filter::new()
                .field(reserved, "x")
                .into_query(url)
                .unwrap_err();
            assert!(err.is_usage(), "{} should be reserved", reserved);
        }
    }

    #[test]
    fn paged_fills_in_the_default_page_size() {
        let params = params(Filter::new().paged(3));
        assert!(params.contains(&("limit".to_string(), DEFAULT_PAGE_SIZE.to_string())));
        assert!(params.contains(&("page".to_string(), "3".to_string())));
    }

    #[test]
    fn paged_keeps_an_explicit_limit() {
        let params = params(Filter::new().limit(50).paged(3));
        assert!(params.contains(&("limit".to_string(), "50".to_string())));
    }

    #[test]
    fn deletables_normalize_to_identifiers() {
        let record = Record::from_object(
            RecordKind::Generic,
            serde_json::from_value(json!({"id": 3})).unwrap(),
            None,
        );
        let batch: Vec<Deletable> = vec![1i64.into(), "2".into(), record.into()];
        let ids: Vec<i64> = batch
            .into_iter()
            .map(|d| d.into_id().unwrap())
            .collect();
        assert_eq!(ids, [1, 2, 3]);
    }

    #[test]
    fn non_numeric_keys_are_a_usage_error() {
        assert!(Deletable::from("db-01").into_id().unwrap_err().is_usage());
    }

    #[test]
    fn records_without_ids_cannot_be_deleted() {
        let record = Record::from_object(
            RecordKind::Generic,
            serde_json::from_value(json!({"name": "x"})).unwrap(),
            None,
        );
        assert!(Deletable::from(record).into_id().unwrap_err().is_usage());
    }
}

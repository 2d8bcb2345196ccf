//! Record model: one materialized remote entity.
//!
//! A [`Record`] is built from one JSON object in a server response. Every
//! key of that object becomes a field in a typed map; nested objects and
//! arrays are wrapped recursively so nested entities are records too.
//! The object received at construction is kept as an immutable snapshot,
//! which is what lets [`Record::updates`] report only the fields that
//! changed since — the shape a PATCH payload wants.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::{Map, Value};

use crate::endpoint::Endpoint;

/// The closed set of record specializations.
///
/// Resolved once at [`Endpoint`](crate::Endpoint) construction from the
/// (namespace, resource name) pair. Resources without a registered
/// specialization use [`RecordKind::Generic`]; nested records are always
/// generic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum RecordKind {
    /// Default variant for resources without a specialization.
    Generic,
    /// `configuration/hosts`
    Host,
    /// `configuration/hosts_groups`
    HostGroup,
    /// `configuration/hosts_categories`
    HostCategory,
    /// `configuration/hosts_templates`
    HostTemplate,
    /// `configuration/services`
    Service,
    /// `configuration/services_groups`
    ServiceGroup,
    /// `configuration/services_categories`
    ServiceCategory,
    /// `configuration/services_templates`
    ServiceTemplate,
}

impl RecordKind {
    /// Looks up the specialization registered for a namespace/resource
    /// pair. Unregistered pairs resolve to [`RecordKind::Generic`].
    pub fn resolve(app: &str, resource: &str) -> RecordKind {
        match (app, resource) {
            ("configuration", "hosts") => RecordKind::Host,
            ("configuration", "hosts_groups") => RecordKind::HostGroup,
            ("configuration", "hosts_categories") => RecordKind::HostCategory,
            ("configuration", "hosts_templates") => RecordKind::HostTemplate,
            ("configuration", "services") => RecordKind::Service,
            ("configuration", "services_groups") => RecordKind::ServiceGroup,
            ("configuration", "services_categories") => RecordKind::ServiceCategory,
            ("configuration", "services_templates") => RecordKind::ServiceTemplate,
            _ => RecordKind::Generic,
        }
    }
}

/// One field of a [`Record`].
///
/// Scalars stay plain JSON values; objects become nested records and
/// arrays become lists whose elements are wrapped the same way.
#[derive(Debug, Clone)]
pub enum FieldValue {
    /// A JSON scalar (string, number, bool, or null).
    Scalar(Value),
    /// A nested object, wrapped as a generic record.
    Record(Box<Record>),
    /// An array whose elements are wrapped recursively.
    List(Vec<FieldValue>),
}

impl FieldValue {
    fn wrap(value: Value, endpoint: Option<&Endpoint>) -> FieldValue {
        match value {
            Value::Object(map) => FieldValue::Record(Box::new(Record::from_object(
                RecordKind::Generic,
                map,
                endpoint.cloned(),
            ))),
            Value::Array(items) => FieldValue::List(
                items
                    .into_iter()
                    .map(|item| FieldValue::wrap(item, endpoint))
                    .collect(),
            ),
            scalar => FieldValue::Scalar(scalar),
        }
    }

    /// Serializes this field back into plain JSON.
    pub fn to_value(&self) -> Value {
        match self {
            FieldValue::Scalar(v) => v.clone(),
            FieldValue::Record(r) => Value::Object(r.to_object()),
            FieldValue::List(items) => Value::Array(items.iter().map(FieldValue::to_value).collect()),
        }
    }

    /// Returns the field as a string slice, if it is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Scalar(v) => v.as_str(),
            _ => None,
        }
    }

    /// Returns the field as an integer, if it is one.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Scalar(v) => v.as_i64(),
            _ => None,
        }
    }

    /// Returns the field as a bool, if it is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Scalar(v) => v.as_bool(),
            _ => None,
        }
    }

    /// Returns the nested record, if this field is one.
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            FieldValue::Record(r) => Some(r),
            _ => None,
        }
    }

    /// Returns the list elements, if this field is an array.
    pub fn as_list(&self) -> Option<&[FieldValue]> {
        match self {
            FieldValue::List(items) => Some(items),
            _ => None,
        }
    }
}

/// A snapshot of one remote entity.
///
/// The field set is exactly the keys of the JSON object the record was
/// built from. Fields are read with [`Record::get`] and the typed helpers,
/// and changed with [`Record::set`]; [`Record::updates`] then yields only
/// the changed subset. Write operations on the owning endpoint produce new
/// `Record` instances from the server response rather than mutating this
/// one in place.
///
/// # Examples
///
/// ```
/// use centreon_api::{Record, RecordKind};
/// use serde_json::{json, Map, Value};
///
/// let raw: Map<String, Value> = serde_json::from_value(json!({
///     "id": 12,
///     "name": "db-01",
///     "alias": "primary",
/// })).unwrap();
///
/// let mut host = Record::from_object(RecordKind::Host, raw, None);
/// host.set("alias", "standby");
///
/// let expected: Map<String, Value> =
///     serde_json::from_value(json!({"alias": "standby"})).unwrap();
/// assert_eq!(host.id(), Some(12));
/// assert_eq!(host.updates(), expected);
/// ```
#[derive(Debug, Clone)]
pub struct Record {
    kind: RecordKind,
    raw: Map<String, Value>,
    fields: BTreeMap<String, FieldValue>,
    endpoint: Option<Endpoint>,
}

impl Record {
    /// Builds a record from a parsed JSON object, promoting every key to
    /// a field and wrapping nested objects and arrays recursively.
    ///
    /// `endpoint` is the owning endpoint, kept so later write calls know
    /// where the entity lives; records detached from any endpoint (login
    /// responses, nested values) pass `None`.
    pub fn from_object(
        kind: RecordKind,
        raw: Map<String, Value>,
        endpoint: Option<Endpoint>,
    ) -> Record {
        let fields = raw
            .iter()
            .map(|(name, value)| (name.clone(), FieldValue::wrap(value.clone(), endpoint.as_ref())))
            .collect();
        Record {
            kind,
            raw,
            fields,
            endpoint,
        }
    }

    /// The specialization this record was materialized as.
    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    /// The owning endpoint, when the record came from one.
    pub fn endpoint(&self) -> Option<&Endpoint> {
        self.endpoint.as_ref()
    }

    /// The JSON object this record was built from, untouched by any
    /// [`set`](Record::set) calls since.
    pub fn raw(&self) -> &Map<String, Value> {
        &self.raw
    }

    /// Returns a field by name.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Returns a string field by name.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name)?.as_str()
    }

    /// Returns an integer field by name.
    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name)?.as_i64()
    }

    /// Returns a bool field by name.
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name)?.as_bool()
    }

    /// Iterates over field names in sorted order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// The entity identifier, when the record carries one.
    pub fn id(&self) -> Option<i64> {
        self.get_i64("id")
    }

    /// Sets a field to a new value.
    ///
    /// The original value stays in the construction snapshot, so the
    /// change shows up in [`Record::updates`]. Setting a name absent from
    /// the snapshot adds it and reports it as an update too.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(
            name.into(),
            FieldValue::wrap(value.into(), self.endpoint.as_ref()),
        );
    }

    /// Serializes the current field values back into a JSON object.
    pub fn to_object(&self) -> Map<String, Value> {
        self.fields
            .iter()
            .map(|(name, value)| (name.clone(), value.to_value()))
            .collect()
    }

    /// Returns only the fields whose current value differs from the
    /// construction snapshot, excluding the identifier.
    ///
    /// An empty map means nothing changed; batch updates drop such
    /// records from the outgoing payload.
    pub fn updates(&self) -> Map<String, Value> {
        let mut changed = Map::new();
        for (name, value) in &self.fields {
            if name == "id" {
                continue;
            }
            let current = value.to_value();
            if self.raw.get(name) != Some(&current) {
                changed.insert(name.clone(), current);
            }
        }
        changed
    }

    /// Returns `true` if `other` refers to the same remote entity, i.e.
    /// both records carry the same identifier.
    pub fn same_entity(&self, other: &Record) -> bool {
        match (self.id(), other.id()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialEq for Record {
    /// Records with identifiers compare by identifier; records without
    /// compare by their current field values.
    fn eq(&self, other: &Record) -> bool {
        match (self.id(), other.id()) {
            (Some(a), Some(b)) => a == b,
            _ => self.to_object() == other.to_object(),
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = self.get_str("name").or_else(|| self.get_str("alias")) {
            return f.write_str(name);
        }
        if let Some(id) = self.id() {
            return write!(f, "{}", id);
        }
        f.write_str("<record>")
    }
}

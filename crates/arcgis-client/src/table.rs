//! Tables: field metadata and paginated record queries.
//!
//! # Aggregation
//!
//! A query with [`Query::all`] keeps requesting pages, advancing
//! `resultOffset` by the page size, until the server returns an empty page.
//! There is no upper bound on the number of requests: a server that never
//! returns an empty page (for instance one that ignores `resultOffset`) makes
//! the query loop forever.

use crate::client::Client;
use crate::error::{Error, Result};
use crate::resource::{required_entries, RemoteResource};
use crate::result::ResultSet;
use crate::types::{Descriptor, Field, FieldEntry, ResultType};
use indexmap::IndexMap;
use serde_json::Value;
use std::cell::OnceCell;
use std::fmt;

/// Parameters of a table query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    /// SQL filter (default: `1=1`)
    pub where_clause: String,
    /// Index of the first record (default: 0)
    pub offset: u64,
    /// Page size; the table's maximum when unset
    pub record_count: Option<u64>,
    /// `orderByFields` value
    pub order_by: Option<String>,
    /// `outFields` value (default: `*`)
    pub out_fields: String,
    /// `resultType` value (default: standard)
    pub result_type: ResultType,
    /// Fetch every page until the server runs dry
    pub all: bool,
}

impl Default for Query {
    fn default() -> Self {
        Self {
            where_clause: "1=1".to_string(),
            offset: 0,
            record_count: None,
            order_by: None,
            out_fields: "*".to_string(),
            result_type: ResultType::Standard,
            all: false,
        }
    }
}

impl Query {
    /// A query for every field of every record, first page only.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the SQL filter.
    pub fn filter(mut self, where_clause: impl Into<String>) -> Self {
        self.where_clause = where_clause.into();
        self
    }

    /// Start at the given record index.
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    /// Request at most `count` records.
    pub fn record_count(mut self, count: u64) -> Self {
        self.record_count = Some(count);
        self
    }

    /// Order results by the given fields (`"name ASC, date DESC"`).
    pub fn order_by(mut self, fields: impl Into<String>) -> Self {
        self.order_by = Some(fields.into());
        self
    }

    /// Restrict the returned fields (comma separated).
    pub fn out_fields(mut self, fields: impl Into<String>) -> Self {
        self.out_fields = fields.into();
        self
    }

    /// Set the result type.
    pub fn result_type(mut self, result_type: ResultType) -> Self {
        self.result_type = result_type;
        self
    }

    /// Fetch all pages, stopping at the first empty one.
    ///
    /// A server that never returns an empty page keeps this looping.
    pub fn all(mut self) -> Self {
        self.all = true;
        self
    }

    /// Reject `all` combined with an explicit offset or page size.
    pub fn validate(&self) -> Result<()> {
        if self.all && (self.offset != 0 || self.record_count.is_some()) {
            return Err(Error::InvalidArgument(
                "all cannot be combined with offset or record_count".to_string(),
            ));
        }
        Ok(())
    }

    fn params(&self, offset: u64, page_size: u64) -> Vec<(String, String)> {
        let mut params = vec![
            ("where".to_string(), self.where_clause.clone()),
            ("resultOffset".to_string(), offset.to_string()),
            ("resultRecordCount".to_string(), page_size.to_string()),
        ];
        if let Some(order_by) = &self.order_by {
            params.push(("orderByFields".to_string(), order_by.clone()));
        }
        params.push(("outFields".to_string(), self.out_fields.clone()));
        params.push(("resultType".to_string(), self.result_type.to_string()));
        params
    }
}

/// A tabular endpoint of a feature service.
pub struct Table {
    resource: RemoteResource,
    id: i64,
    name: String,
    fields: OnceCell<IndexMap<String, Field>>,
    max_record_count: OnceCell<u64>,
}

impl Table {
    pub(crate) fn new(client: Client, url: &str, id: i64, name: String) -> Result<Self> {
        Ok(Self {
            resource: RemoteResource::new(client, url)?,
            id,
            name,
            fields: OnceCell::new(),
            max_record_count: OnceCell::new(),
        })
    }

    /// Numeric id within the service.
    pub fn id(&self) -> i64 {
        self.id
    }

    /// Table name as listed by the service.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The normalized table URL.
    pub fn url(&self) -> &str {
        self.resource.url()
    }

    /// The underlying resource and its descriptor.
    pub fn resource(&self) -> &RemoteResource {
        &self.resource
    }

    /// Re-fetch the descriptor. Already built fields and limits are kept.
    pub fn fetch(&mut self) -> Result<&mut Self> {
        self.resource.fetch()?;
        Ok(self)
    }

    /// Field metadata keyed by name, in declaration order.
    pub fn fields(&self) -> Result<&IndexMap<String, Field>> {
        if let Some(fields) = self.fields.get() {
            return Ok(fields);
        }
        let fields = parse_fields(self.resource.descriptor()?)?;
        Ok(self.fields.get_or_init(|| fields))
    }

    /// The field called `name`.
    pub fn field(&self, name: &str) -> Result<&Field> {
        self.fields()?
            .get(name)
            .ok_or_else(|| Error::NotFound(format!("Field {}", name)))
    }

    /// Maximum number of records the server returns per request.
    pub fn max_record_count(&self) -> Result<u64> {
        if let Some(count) = self.max_record_count.get() {
            return Ok(*count);
        }

        let descriptor = self.resource.descriptor()?;
        let count = ["standardMaxRecordCount", "maxRecordCount"]
            .iter()
            .find_map(|key| descriptor.get(*key).and_then(Value::as_u64))
            .ok_or_else(|| {
                Error::InvalidResponse(format!("{} declares no maximum record count", self.url()))
            })?;

        if count == 0 {
            return Err(Error::InvalidResponse(format!(
                "{} declares a maximum record count of 0",
                self.url()
            )));
        }

        Ok(*self.max_record_count.get_or_init(|| count))
    }

    /// Run a query against `<table>/query`.
    ///
    /// With [`Query::all`], pages are appended until the server returns an
    /// empty one.
    pub fn query(&self, query: &Query) -> Result<ResultSet> {
        query.validate()?;

        let url = format!("{}/query", self.url());
        let client = self.resource.client();
        let page_size = match query.record_count {
            Some(count) => count,
            None => self.max_record_count()?,
        };

        let mut response = client.get_json(&url, &query.params(query.offset, page_size))?;

        if query.all {
            let mut features = take_features(&mut response)?;
            let mut offset = query.offset;

            if !features.is_empty() {
                loop {
                    offset = offset.checked_add(page_size).ok_or_else(|| {
                        Error::InvalidResponse(format!(
                            "{}: result offset overflows after {} records (page size {})",
                            url,
                            features.len(),
                            page_size
                        ))
                    })?;
                    let mut page = client.get_json(&url, &query.params(offset, page_size))?;
                    let returned = take_features(&mut page)?;

                    tracing::debug!(
                        table = %self.name,
                        offset = offset,
                        page_size = page_size,
                        returned = returned.len(),
                        total = features.len() + returned.len(),
                        "Fetched page"
                    );

                    if returned.is_empty() {
                        break;
                    }
                    features.extend(returned);
                }
            }

            response.insert("features".to_string(), Value::Array(features));
        }

        ResultSet::from_response(response)
    }
}

impl fmt::Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("url", &self.url())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Build the name-keyed field map from a descriptor's `fields` array.
pub(crate) fn parse_fields(descriptor: &Descriptor) -> Result<IndexMap<String, Field>> {
    let listed: Vec<FieldEntry> = required_entries(descriptor, "fields")?;
    listed
        .into_iter()
        .map(|entry| {
            let field = Field::from_entry(entry)?;
            Ok((field.name.clone(), field))
        })
        .collect()
}

fn take_features(response: &mut Descriptor) -> Result<Vec<Value>> {
    match response.remove("features") {
        Some(Value::Array(features)) => Ok(features),
        Some(_) => Err(Error::InvalidResponse(
            "'features' is not an array".to_string(),
        )),
        None => Err(Error::InvalidResponse(
            "Query response has no 'features' key".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{page, ScriptedTransport};
    use crate::types::FieldType;
    use serde_json::json;

    const SERVICE: &str = "https://host/arcgis/rest/services/ServiceRequest/FeatureServer";

    fn table_url() -> String {
        format!("{SERVICE}/1")
    }

    fn query_url() -> String {
        format!("{SERVICE}/1/query")
    }

    fn table_descriptor(max: u64) -> serde_json::Value {
        json!({
            "id": 1,
            "name": "ServiceRequestComment",
            "standardMaxRecordCount": max,
            "maxRecordCount": 1000,
            "fields": [
                {"name": "objectid", "type": "esriFieldTypeOID", "alias": "OBJECTID"},
                {"name": "status", "type": "esriFieldTypeString"},
                {"name": "created", "type": "esriFieldTypeDate", "alias": "Created"}
            ]
        })
    }

    fn transport(max: u64) -> ScriptedTransport {
        ScriptedTransport::new()
            .with(SERVICE, json!({"tables": [{"id": 1, "name": "ServiceRequestComment"}]}))
            .with(&table_url(), table_descriptor(max))
    }

    fn with_table<T>(transport: &ScriptedTransport, f: impl FnOnce(&Table) -> T) -> T {
        let service = transport.client().service(SERVICE).unwrap();
        let table = service.table(1).unwrap();
        f(table)
    }

    #[test]
    fn test_fields_built_once() {
        let transport = transport(10);
        with_table(&transport, |table| {
            let fields = table.fields().unwrap();
            assert_eq!(fields.len(), 3);
            assert_eq!(
                fields.keys().collect::<Vec<_>>(),
                vec!["objectid", "status", "created"]
            );
            assert_eq!(fields["status"].alias, "status");
            assert_eq!(table.field("created").unwrap().field_type, FieldType::Date);
            assert!(table.field("missing").unwrap_err().is_not_found());

            table.fields().unwrap();
            table.max_record_count().unwrap();
        });
        assert_eq!(transport.calls_to(&table_url()), 1);
    }

    #[test]
    fn test_max_record_count_prefers_standard() {
        let transport = transport(25);
        with_table(&transport, |table| {
            assert_eq!(table.max_record_count().unwrap(), 25);
        });
    }

    #[test]
    fn test_max_record_count_falls_back() {
        let transport = ScriptedTransport::new()
            .with(SERVICE, json!({"tables": [{"id": 1}]}))
            .with(&table_url(), json!({"fields": [], "maxRecordCount": 2000}));
        with_table(&transport, |table| {
            assert_eq!(table.max_record_count().unwrap(), 2000);
        });

        let transport = ScriptedTransport::new()
            .with(SERVICE, json!({"tables": [{"id": 1}]}))
            .with(&table_url(), json!({"fields": []}));
        with_table(&transport, |table| {
            assert!(matches!(
                table.max_record_count(),
                Err(Error::InvalidResponse(_))
            ));
        });
    }

    #[test]
    fn test_query_params() {
        let transport = transport(10).with(&query_url(), page(0, 3));
        with_table(&transport, |table| {
            let query = Query::new()
                .filter("status = 'open'")
                .offset(20)
                .record_count(3)
                .order_by("objectid DESC")
                .out_fields("objectid,status")
                .result_type(ResultType::None);
            table.query(&query).unwrap();
        });

        let calls = transport.calls();
        let call = calls.iter().find(|c| c.url == query_url()).unwrap();
        assert_eq!(call.param("where"), Some("status = 'open'"));
        assert_eq!(call.param("resultOffset"), Some("20"));
        assert_eq!(call.param("resultRecordCount"), Some("3"));
        assert_eq!(call.param("orderByFields"), Some("objectid DESC"));
        assert_eq!(call.param("outFields"), Some("objectid,status"));
        assert_eq!(call.param("resultType"), Some("none"));
        assert_eq!(call.param("f"), Some("json"));
    }

    #[test]
    fn test_query_defaults_to_table_maximum() {
        let transport = transport(10).with(&query_url(), page(0, 10));
        let result = with_table(&transport, |table| table.query(&Query::new()).unwrap());

        assert_eq!(result.len(), 10);
        let calls = transport.calls();
        let call = calls.iter().find(|c| c.url == query_url()).unwrap();
        assert_eq!(call.param("where"), Some("1=1"));
        assert_eq!(call.param("resultOffset"), Some("0"));
        assert_eq!(call.param("resultRecordCount"), Some("10"));
        assert_eq!(call.param("orderByFields"), None);
        assert_eq!(call.param("outFields"), Some("*"));
        assert_eq!(call.param("resultType"), Some("standard"));
    }

    #[test]
    fn test_single_page_returns_available_records() {
        let transport = transport(10).with(&query_url(), page(0, 3));
        let result = with_table(&transport, |table| {
            table.query(&Query::new().record_count(5)).unwrap()
        });

        assert_eq!(result.len(), 3);
        assert_eq!(result.to_csv().unwrap().lines().count(), 4);
        assert_eq!(transport.calls_to(&query_url()), 1);
    }

    #[test]
    fn test_all_rejects_explicit_paging() {
        let transport = ScriptedTransport::new();
        let table = Table::new(transport.client(), &table_url(), 1, "comments".into()).unwrap();

        for query in [
            Query::new().all().record_count(5),
            Query::new().all().offset(10),
        ] {
            assert!(matches!(
                table.query(&query),
                Err(Error::InvalidArgument(_))
            ));
        }
        assert!(transport.calls().is_empty());
    }

    #[test]
    fn test_all_aggregates_until_empty_page() {
        let transport = transport(10)
            .with_page(&query_url(), 0, page(0, 10))
            .with_page(&query_url(), 10, page(10, 10))
            .with_page(&query_url(), 20, page(20, 0));
        let result = with_table(&transport, |table| table.query(&Query::new().all()).unwrap());

        assert_eq!(result.len(), 20);
        let ids: Vec<u64> = result
            .features()
            .iter()
            .map(|record| record["objectid"].as_u64().unwrap())
            .collect();
        assert_eq!(ids, (0..20).collect::<Vec<u64>>());

        let offsets: Vec<String> = transport
            .calls()
            .iter()
            .filter(|c| c.url == query_url())
            .map(|c| c.param("resultOffset").unwrap().to_string())
            .collect();
        assert_eq!(offsets, vec!["0", "10", "20"]);
    }

    #[test]
    fn test_all_with_sequential_pages() {
        let transport = transport(10).with_sequence(
            &query_url(),
            vec![page(0, 10), page(10, 10), page(20, 0)],
        );
        let result = with_table(&transport, |table| table.query(&Query::new().all()).unwrap());

        assert_eq!(result.len(), 20);
        assert_eq!(transport.calls_to(&query_url()), 3);
    }

    #[test]
    fn test_all_stops_after_empty_first_page() {
        let transport = transport(10).with(&query_url(), page(0, 0));
        let result = with_table(&transport, |table| table.query(&Query::new().all()).unwrap());

        assert!(result.is_empty());
        assert_eq!(transport.calls_to(&query_url()), 1);
    }

    #[test]
    fn test_query_error_mid_aggregation() {
        let transport = transport(10)
            .with_page(&query_url(), 0, page(0, 10))
            .with_status(&query_url(), 502);
        let err = with_table(&transport, |table| {
            table.query(&Query::new().all()).unwrap_err()
        });

        assert_eq!(err.status(), Some(502));
    }

    #[test]
    fn test_all_offset_overflow_is_an_error() {
        let transport = transport(u64::MAX).with(&query_url(), page(0, 3));
        let err = with_table(&transport, |table| {
            table.query(&Query::new().all()).unwrap_err()
        });

        assert!(matches!(err, Error::InvalidResponse(_)));
        let offsets: Vec<String> = transport
            .calls()
            .iter()
            .filter(|call| call.url == query_url())
            .filter_map(|call| call.param("resultOffset").map(str::to_string))
            .collect();
        assert_eq!(offsets, vec!["0".to_string(), u64::MAX.to_string()]);
    }

    #[test]
    fn test_missing_features_key() {
        let transport = transport(10).with(&query_url(), json!({"fields": []}));
        let err = with_table(&transport, |table| {
            table.query(&Query::new().all()).unwrap_err()
        });
        assert!(matches!(err, Error::InvalidResponse(_)));
    }
}

//! Query results and their CSV/JSON renderings.

use crate::error::{Error, Result};
use crate::table::parse_fields;
use crate::types::{Descriptor, Field, Record};
use indexmap::IndexMap;
use serde_json::Value;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Field metadata plus the flat attribute records of a query.
///
/// Geometry is dropped; values are kept exactly as the server sent them.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSet {
    fields: IndexMap<String, Field>,
    features: Vec<Record>,
}

impl ResultSet {
    /// Build from a raw query response (`{fields: [...], features: [{attributes, geometry?}]}`).
    pub(crate) fn from_response(mut response: Descriptor) -> Result<Self> {
        let fields = parse_fields(&response)?;

        let features = match response.remove("features") {
            Some(Value::Array(features)) => features,
            _ => {
                return Err(Error::InvalidResponse(
                    "Query response has no 'features' array".to_string(),
                ))
            }
        };

        let features = features
            .into_iter()
            .map(|feature| match feature {
                Value::Object(mut feature) => match feature.remove("attributes") {
                    Some(Value::Object(attributes)) => Ok(attributes),
                    _ => Err(Error::InvalidResponse(
                        "Feature has no 'attributes' object".to_string(),
                    )),
                },
                _ => Err(Error::InvalidResponse(
                    "Feature is not an object".to_string(),
                )),
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { fields, features })
    }

    /// Field metadata keyed by name, in response order.
    pub fn fields(&self) -> &IndexMap<String, Field> {
        &self.fields
    }

    /// The attribute records, in response order.
    pub fn features(&self) -> &[Record] {
        &self.features
    }

    /// Consume the result set, keeping only the records.
    pub fn into_features(self) -> Vec<Record> {
        self.features
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether the query returned no records.
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Per-field value conversion (dates, domains) is not implemented.
    pub fn format(&self) -> Result<ResultSet> {
        Err(Error::UnsupportedOperation(
            "field value formatting not yet implemented".to_string(),
        ))
    }

    /// The records as a pretty-printed JSON array.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.features)?)
    }

    /// Write the records as a pretty-printed JSON array to `path`.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        serde_json::to_writer_pretty(&mut writer, &self.features)?;
        writer.flush()?;
        tracing::debug!(path = %path.as_ref().display(), records = self.len(), "Wrote JSON");
        Ok(())
    }

    /// The records as CSV with a header row of field names.
    pub fn to_csv(&self) -> Result<String> {
        let bytes = self.write_csv_to(Vec::new())?;
        String::from_utf8(bytes).map_err(|e| Error::InvalidResponse(e.to_string()))
    }

    /// Write the records as CSV to `path`.
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::create(path.as_ref())?;
        let mut writer = self.write_csv_to(BufWriter::new(file))?;
        writer.flush()?;
        tracing::debug!(path = %path.as_ref().display(), records = self.len(), "Wrote CSV");
        Ok(())
    }

    /// Missing keys become empty cells; keys outside the field list are rejected.
    fn write_csv_to<W: Write>(&self, out: W) -> Result<W> {
        let mut writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::CRLF)
            .from_writer(out);

        writer.write_record(self.fields.keys())?;

        for record in &self.features {
            if let Some(extra) = record.keys().find(|key| !self.fields.contains_key(*key)) {
                return Err(Error::UnknownField(extra.clone()));
            }
            writer.write_record(
                self.fields
                    .keys()
                    .map(|name| record.get(name).map(cell).unwrap_or_default()),
            )?;
        }

        writer.into_inner().map_err(|e| Error::Io(e.into_error()))
    }
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

//! Services and their layers.
//!
//! Only FeatureServer services expose child tables and layers; asking any
//! other service type for them fails with [`Error::UnsupportedCapability`]
//! before a request is made.

use crate::client::Client;
use crate::error::{Error, Result};
use crate::resource::{entries, RemoteResource};
use crate::result::ResultSet;
use crate::table::{Query, Table};
use crate::types::{GeometryType, LayerEntry, ServiceType, TableEntry};
use indexmap::IndexMap;
use std::cell::OnceCell;
use std::fmt;
use url::Url;

/// A service endpoint with a declared capability type.
pub struct Service {
    resource: RemoteResource,
    name: String,
    service_type: ServiceType,
    layers: OnceCell<IndexMap<i64, Layer>>,
    tables: OnceCell<IndexMap<i64, Table>>,
}

impl Service {
    pub(crate) fn new(
        client: Client,
        url: &str,
        name: String,
        service_type: ServiceType,
    ) -> Result<Self> {
        Ok(Self {
            resource: RemoteResource::new(client, url)?,
            name,
            service_type,
            layers: OnceCell::new(),
            tables: OnceCell::new(),
        })
    }

    /// Address a service by URL; name and type come from the last two path
    /// segments (`.../Census/MapServer`).
    pub fn from_url(client: Client, url: &str) -> Result<Self> {
        let resource = RemoteResource::new(client, url)?;
        let parsed =
            Url::parse(resource.url()).map_err(|e| Error::InvalidUrl(format!("{}: {}", url, e)))?;
        let segments: Vec<&str> = parsed
            .path_segments()
            .map(|segments| segments.filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();

        let [.., name, service_type] = segments.as_slice() else {
            return Err(Error::InvalidUrl(format!(
                "{}: expected .../<name>/<type>",
                url
            )));
        };

        Ok(Self {
            name: name.to_string(),
            service_type: service_type.parse()?,
            resource,
            layers: OnceCell::new(),
            tables: OnceCell::new(),
        })
    }

    /// Service name as listed by its catalog.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared capability type.
    pub fn service_type(&self) -> ServiceType {
        self.service_type
    }

    /// The normalized service URL.
    pub fn url(&self) -> &str {
        self.resource.url()
    }

    /// The underlying resource and its descriptor.
    pub fn resource(&self) -> &RemoteResource {
        &self.resource
    }

    /// Re-fetch the descriptor. Already discovered tables and layers are kept.
    pub fn fetch(&mut self) -> Result<&mut Self> {
        self.resource.fetch()?;
        Ok(self)
    }

    fn ensure_supported(&self, what: &str) -> Result<()> {
        if self.service_type.is_supported() {
            return Ok(());
        }
        Err(Error::UnsupportedCapability(format!(
            "{} is a {}; only FeatureServer services expose {}",
            self.name, self.service_type, what
        )))
    }

    /// All layers keyed by id, in the order the service lists them.
    pub fn layers(&self) -> Result<&IndexMap<i64, Layer>> {
        self.ensure_supported("layers")?;
        if let Some(layers) = self.layers.get() {
            return Ok(layers);
        }

        let listed: Vec<LayerEntry> = entries(self.resource.descriptor()?, "layers")?;
        let mut layers = IndexMap::with_capacity(listed.len());
        for entry in listed {
            let layer = Layer {
                resource: RemoteResource::new(
                    self.resource.client().clone(),
                    &self.resource.child_url(&entry.id.to_string()),
                )?,
                id: entry.id,
                geometry_type: entry.geometry()?,
                name: entry.name,
            };
            layers.insert(entry.id, layer);
        }

        tracing::debug!(service = %self.name, count = layers.len(), "Discovered layers");
        Ok(self.layers.get_or_init(|| layers))
    }

    /// The layer with the given id.
    pub fn layer(&self, id: i64) -> Result<&Layer> {
        self.layers()?
            .get(&id)
            .ok_or_else(|| Error::NotFound(format!("Layer {}", id)))
    }

    /// All tables keyed by id, in the order the service lists them.
    pub fn tables(&self) -> Result<&IndexMap<i64, Table>> {
        self.ensure_supported("tables")?;
        if let Some(tables) = self.tables.get() {
            return Ok(tables);
        }

        let listed: Vec<TableEntry> = entries(self.resource.descriptor()?, "tables")?;
        let mut tables = IndexMap::with_capacity(listed.len());
        for entry in listed {
            let url = self.resource.child_url(&entry.id.to_string());
            let name = entry.name.unwrap_or_else(|| entry.id.to_string());
            let table = Table::new(self.resource.client().clone(), &url, entry.id, name)?;
            tables.insert(entry.id, table);
        }

        tracing::debug!(service = %self.name, count = tables.len(), "Discovered tables");
        Ok(self.tables.get_or_init(|| tables))
    }

    /// The table with the given id.
    pub fn table(&self, id: i64) -> Result<&Table> {
        self.tables()?
            .get(&id)
            .ok_or_else(|| Error::NotFound(format!("Table {}", id)))
    }
}

impl fmt::Debug for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Service")
            .field("name", &self.name)
            .field("service_type", &self.service_type)
            .field("url", &self.url())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A geometry layer of a feature service.
#[derive(Debug)]
pub struct Layer {
    resource: RemoteResource,
    id: i64,
    name: Option<String>,
    geometry_type: Option<GeometryType>,
}

impl Layer {
    /// Numeric id within the service.
    pub fn id(&self) -> i64 {
        self.id
    }

    /// Layer name, if the service lists one.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Declared geometry type, if the service lists one.
    pub fn geometry_type(&self) -> Option<GeometryType> {
        self.geometry_type
    }

    /// The normalized layer URL.
    pub fn url(&self) -> &str {
        self.resource.url()
    }

    /// The underlying resource and its descriptor.
    pub fn resource(&self) -> &RemoteResource {
        &self.resource
    }

    /// Layer queries are not implemented; use the service's tables.
    pub fn query(&self, _query: &Query) -> Result<ResultSet> {
        Err(Error::UnsupportedOperation(
            "layer query not yet implemented".to_string(),
        ))
    }
}

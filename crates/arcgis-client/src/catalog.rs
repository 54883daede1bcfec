//! Directory nodes of a service catalog: the server root and its folders.
//!
//! Both are [`Catalog`]s. A catalog discovers its child folders and services
//! from its descriptor the first time they are asked for and keeps them for
//! its lifetime, so repeated lookups hand out the same instances.

use crate::client::Client;
use crate::error::{Error, Result};
use crate::resource::{entries, RemoteResource};
use crate::service::Service;
use crate::types::{ServiceEntry, ServiceType};
use std::cell::OnceCell;
use std::fmt;
use std::ops::Deref;

/// A resource that lists sub-folders and services.
pub struct Catalog {
    resource: RemoteResource,
    folders: OnceCell<Vec<Folder>>,
    services: OnceCell<Vec<Service>>,
}

impl Catalog {
    fn new(client: Client, url: &str) -> Result<Self> {
        Ok(Self {
            resource: RemoteResource::new(client, url)?,
            folders: OnceCell::new(),
            services: OnceCell::new(),
        })
    }

    /// The normalized catalog URL.
    pub fn url(&self) -> &str {
        self.resource.url()
    }

    /// The underlying resource and its descriptor.
    pub fn resource(&self) -> &RemoteResource {
        &self.resource
    }

    /// Re-fetch the descriptor. Already discovered children are kept.
    pub fn fetch(&mut self) -> Result<&mut Self> {
        self.resource.fetch()?;
        Ok(self)
    }

    /// All child folders, in the order the server lists them.
    pub fn folders(&self) -> Result<&[Folder]> {
        if let Some(folders) = self.folders.get() {
            return Ok(folders);
        }

        let names: Vec<String> = entries(self.resource.descriptor()?, "folders")?;
        let folders = names
            .into_iter()
            .map(|name| {
                let url = self.resource.child_url(&name);
                Folder::new(self.resource.client().clone(), &url, name)
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(url = %self.url(), count = folders.len(), "Discovered folders");
        Ok(self.folders.get_or_init(|| folders))
    }

    /// The child folder called `name`.
    pub fn folder(&self, name: &str) -> Result<&Folder> {
        self.folders()?
            .iter()
            .find(|folder| folder.name() == name)
            .ok_or_else(|| Error::NotFound(format!("Folder {}", name)))
    }

    /// All services listed by this catalog, in the order the server lists them.
    ///
    /// Entries without a `url` (older servers) get `<catalog>/<name>/<type>`.
    pub fn services(&self) -> Result<&[Service]> {
        if let Some(services) = self.services.get() {
            return Ok(services);
        }

        let listed: Vec<ServiceEntry> = entries(self.resource.descriptor()?, "services")?;
        let services = listed
            .into_iter()
            .map(|entry| {
                let service_type: ServiceType = entry.service_type.parse()?;
                // Names inside folders are listed as `<folder>/<name>`.
                let url = match entry.url {
                    Some(url) => url,
                    None => {
                        let leaf = entry.name.rsplit('/').next().unwrap_or(&entry.name);
                        self.resource
                            .child_url(&format!("{}/{}", leaf, service_type))
                    }
                };
                Service::new(
                    self.resource.client().clone(),
                    &url,
                    entry.name,
                    service_type,
                )
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(url = %self.url(), count = services.len(), "Discovered services");
        Ok(self.services.get_or_init(|| services))
    }

    /// The first service called `name`, optionally also matching `service_type`.
    ///
    /// Servers commonly publish one name under several types (a MapServer and
    /// a FeatureServer), so pass the type when it matters.
    pub fn service(&self, name: &str, service_type: Option<ServiceType>) -> Result<&Service> {
        self.services()?
            .iter()
            .find(|service| {
                service.name() == name
                    && service_type.map_or(true, |wanted| service.service_type() == wanted)
            })
            .ok_or_else(|| match service_type {
                Some(wanted) => Error::NotFound(format!("Service {} ({})", name, wanted)),
                None => Error::NotFound(format!("Service {}", name)),
            })
    }
}

impl fmt::Debug for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Catalog")
            .field("url", &self.url())
            .field("folders", &self.folders.get().map(Vec::len))
            .field("services", &self.services.get().map(Vec::len))
            .finish()
    }
}

/// The root of a service directory (`.../arcgis/rest/services`).
#[derive(Debug)]
pub struct Server {
    catalog: Catalog,
}

impl Server {
    /// Connect to `url` and fetch the root descriptor.
    pub fn connect(client: Client, url: &str) -> Result<Self> {
        let mut catalog = Catalog::new(client, url)?;
        catalog.fetch()?;
        tracing::debug!(url = %catalog.url(), "Connected to server");
        Ok(Self { catalog })
    }

    /// Re-fetch the root descriptor. Already discovered children are kept.
    pub fn fetch(&mut self) -> Result<&mut Self> {
        self.catalog.fetch()?;
        Ok(self)
    }
}

impl Deref for Server {
    type Target = Catalog;

    fn deref(&self) -> &Catalog {
        &self.catalog
    }
}

impl fmt::Display for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url())
    }
}

/// A named sub-directory of a server.
#[derive(Debug)]
pub struct Folder {
    name: String,
    catalog: Catalog,
}

impl Folder {
    fn new(client: Client, url: &str, name: String) -> Result<Self> {
        Ok(Self {
            name,
            catalog: Catalog::new(client, url)?,
        })
    }

    /// Folder name as listed by its parent.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fetch the folder descriptor now. Already discovered children are kept.
    pub fn fetch(&mut self) -> Result<&mut Self> {
        self.catalog.fetch()?;
        Ok(self)
    }
}

impl Deref for Folder {
    type Target = Catalog;

    fn deref(&self) -> &Catalog {
        &self.catalog
    }
}

impl fmt::Display for Folder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

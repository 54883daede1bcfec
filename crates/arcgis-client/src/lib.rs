//! ArcGIS REST Client
//!
//! A blocking Rust client for ArcGIS REST service directories: walk a server's
//! folders and services, inspect feature-service tables, and pull complete
//! record sets out of page-limited query endpoints.
//!
//! # Features
//!
//! - **Lazy traversal**: folders, services, tables and fields are discovered on
//!   first access and cached for the lifetime of the owning object
//! - **Pagination**: [`Query::all`] follows `resultOffset` until the server
//!   returns an empty page
//! - **Export**: [`ResultSet`] renders records as CSV or pretty JSON, as text
//!   or straight to a file
//! - **Closed vocabularies**: service, geometry and field types are enums;
//!   unknown values are rejected when parsed
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use arcgis_client::{Client, ClientConfig, Query, ServiceType};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::new(ClientConfig::default())?;
//!     let server = client.server("https://sampleserver6.arcgisonline.com/arcgis/rest/services")?;
//!
//!     for folder in server.folders()? {
//!         println!("{}", folder.name());
//!     }
//!
//!     let service = server.service("ServiceRequest", Some(ServiceType::FeatureServer))?;
//!     let table = service.table(1)?;
//!     let records = table.query(&Query::new().all())?;
//!     records.write_csv("comments.csv")?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Caching
//!
//! Every entity fetches its descriptor at most once unless `fetch()` is
//! called. Children discovered from a descriptor are never rebuilt, so a
//! lookup always returns the same instance. Entities are not `Sync`; use
//! them from one thread.
//!
//! # Error Handling
//!
//! All operations return `Result<T, Error>`. Nothing is retried. The main
//! failure kinds are:
//!
//! - `Status` / `Api`: the server rejected the request
//! - `NotFound`: a folder, service, table or field lookup missed
//! - `UnsupportedCapability`: tables or layers requested from a non-FeatureServer
//! - `InvalidArgument`: `all` combined with an explicit offset or page size
//! - `InvalidVariant`: a type name outside the known vocabulary

pub mod catalog;
pub mod client;
pub mod config;
pub mod error;
pub mod resource;
pub mod result;
pub mod service;
pub mod table;
pub mod types;

#[cfg(test)]
mod test_utils;

pub use catalog::{Catalog, Folder, Server};
pub use client::{Client, HttpTransport, Transport};
pub use config::{ClientConfig, ClientConfigBuilder, DEFAULT_USER_AGENT};
pub use error::{Error, Result};
pub use resource::{normalize_url, RemoteResource};
pub use result::ResultSet;
pub use service::{Layer, Service};
pub use table::{Query, Table};
pub use types::{Descriptor, Field, FieldType, GeometryType, Record, ResultType, ServiceType};

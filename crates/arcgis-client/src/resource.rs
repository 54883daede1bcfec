//! Remote resources: a canonical URL plus a lazily fetched JSON descriptor.
//!
//! # Staleness Behavior
//!
//! A descriptor is fetched at most once per resource unless [`RemoteResource::fetch`]
//! is called explicitly. State derived from the descriptor (children, fields,
//! record limits) is built on first access and kept for the lifetime of the
//! owning entity, even across a later `fetch`.
//!
//! The lazy cells are `!Sync`: entities are meant to be used from one thread.

use crate::client::Client;
use crate::error::{Error, Result};
use crate::types::Descriptor;
use serde::de::DeserializeOwned;
use std::cell::OnceCell;
use url::Url;

/// A REST endpoint and its cached descriptor.
pub struct RemoteResource {
    client: Client,
    url: String,
    descriptor: OnceCell<Descriptor>,
}

impl RemoteResource {
    /// Wrap `url`, stripping its query string and fragment.
    pub fn new(client: Client, url: &str) -> Result<Self> {
        Ok(Self {
            client,
            url: normalize_url(url)?,
            descriptor: OnceCell::new(),
        })
    }

    /// The normalized URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub(crate) fn client(&self) -> &Client {
        &self.client
    }

    /// Whether a descriptor has been fetched.
    pub fn is_fetched(&self) -> bool {
        self.descriptor.get().is_some()
    }

    /// Fetch the descriptor now, replacing any cached one.
    pub fn fetch(&mut self) -> Result<&mut Self> {
        let descriptor = self.client.get_json(&self.url, &[])?;
        self.descriptor = OnceCell::from(descriptor);
        Ok(self)
    }

    /// The cached descriptor, fetching it on first use.
    pub fn descriptor(&self) -> Result<&Descriptor> {
        if let Some(descriptor) = self.descriptor.get() {
            return Ok(descriptor);
        }
        let descriptor = self.client.get_json(&self.url, &[])?;
        Ok(self.descriptor.get_or_init(|| descriptor))
    }

    /// URL of a direct child: this URL, `/`, then `segment`.
    pub(crate) fn child_url(&self, segment: &str) -> String {
        format!("{}/{}", self.url, segment.trim_matches('/'))
    }
}

impl std::fmt::Debug for RemoteResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteResource")
            .field("url", &self.url)
            .field("fetched", &self.is_fetched())
            .finish()
    }
}

/// Canonical form of a resource URL: no query, no fragment, no trailing slash.
pub fn normalize_url(url: &str) -> Result<String> {
    let mut parsed =
        Url::parse(url).map_err(|e| Error::InvalidUrl(format!("{}: {}", url, e)))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(Error::InvalidUrl(format!(
            "{}: unsupported scheme '{}'",
            url,
            parsed.scheme()
        )));
    }

    parsed.set_query(None);
    parsed.set_fragment(None);

    Ok(parsed.as_str().trim_end_matches('/').to_string())
}

/// Deserialize the array under `key`; a missing or null key yields no entries.
pub(crate) fn entries<T: DeserializeOwned>(descriptor: &Descriptor, key: &str) -> Result<Vec<T>> {
    match descriptor.get(key) {
        None | Some(serde_json::Value::Null) => Ok(Vec::new()),
        Some(value) => serde_json::from_value(value.clone()).map_err(|e| {
            Error::InvalidResponse(format!("Malformed '{}' array: {}", key, e))
        }),
    }
}

/// Deserialize the array under `key`, which must be present.
pub(crate) fn required_entries<T: DeserializeOwned>(
    descriptor: &Descriptor,
    key: &str,
) -> Result<Vec<T>> {
    if !descriptor.contains_key(key) {
        return Err(Error::InvalidResponse(format!(
            "Descriptor has no '{}' key",
            key
        )));
    }
    entries(descriptor, key)
}

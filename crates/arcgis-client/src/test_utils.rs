//! In-memory transport for unit tests.
//!
//! Serves canned JSON per URL (optionally per `resultOffset`) and records
//! every call so tests can assert on network traffic.

use crate::client::{Client, Transport};
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// One recorded request.
#[derive(Debug, Clone)]
pub(crate) struct Call {
    pub url: String,
    pub params: Vec<(String, String)>,
}

impl Call {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

enum Reply {
    Json(Value),
    Status(u16),
    /// Successive bodies regardless of parameters; the last one repeats.
    Sequence(VecDeque<Value>),
}

struct Route {
    url: String,
    offset: Option<u64>,
    reply: Reply,
}

#[derive(Default)]
struct Inner {
    routes: Mutex<Vec<Route>>,
    calls: Mutex<Vec<Call>>,
}

#[derive(Clone, Default)]
pub(crate) struct ScriptedTransport {
    inner: Arc<Inner>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn route(self, url: &str, offset: Option<u64>, reply: Reply) -> Self {
        self.inner.routes.lock().unwrap().push(Route {
            url: url.to_string(),
            offset,
            reply,
        });
        self
    }

    pub fn with(self, url: &str, body: Value) -> Self {
        self.route(url, None, Reply::Json(body))
    }

    pub fn with_status(self, url: &str, status: u16) -> Self {
        self.route(url, None, Reply::Status(status))
    }

    /// Serve `body` only when `resultOffset` equals `offset`.
    pub fn with_page(self, url: &str, offset: u64, body: Value) -> Self {
        self.route(url, Some(offset), Reply::Json(body))
    }

    pub fn with_sequence(self, url: &str, bodies: Vec<Value>) -> Self {
        self.route(url, None, Reply::Sequence(bodies.into()))
    }

    pub fn client(&self) -> Client {
        Client::with_transport(Arc::new(self.clone()), ClientConfig::default())
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.calls().iter().filter(|call| call.url == url).count()
    }
}

impl Transport for ScriptedTransport {
    fn get(&self, url: &str, params: &[(String, String)]) -> Result<Value> {
        let call = Call {
            url: url.to_string(),
            params: params.to_vec(),
        };
        let offset = call
            .param("resultOffset")
            .and_then(|value| value.parse::<u64>().ok());
        self.inner.calls.lock().unwrap().push(call);

        let mut routes = self.inner.routes.lock().unwrap();
        let index = routes
            .iter()
            .position(|r| r.url == url && r.offset.is_some() && r.offset == offset)
            .or_else(|| routes.iter().position(|r| r.url == url && r.offset.is_none()));

        let Some(index) = index else {
            return Err(Error::Status {
                url: url.to_string(),
                status: 404,
            });
        };

        match &mut routes[index].reply {
            Reply::Json(body) => Ok(body.clone()),
            Reply::Status(status) => Err(Error::Status {
                url: url.to_string(),
                status: *status,
            }),
            Reply::Sequence(bodies) => {
                if bodies.len() > 1 {
                    Ok(bodies.pop_front().unwrap_or(Value::Null))
                } else {
                    Ok(bodies.front().cloned().unwrap_or(Value::Null))
                }
            }
        }
    }
}

/// A query response with `count` records numbered from `start`.
pub(crate) fn page(start: usize, count: usize) -> Value {
    let features: Vec<Value> = (start..start + count)
        .map(|i| {
            serde_json::json!({
                "attributes": {"objectid": i, "status": "open"},
                "geometry": {"x": 1.0, "y": 2.0}
            })
        })
        .collect();

    serde_json::json!({
        "fields": [
            {"name": "objectid", "type": "esriFieldTypeOID", "alias": "OBJECTID"},
            {"name": "status", "type": "esriFieldTypeString"}
        ],
        "features": features
    })
}

//! Network with canned answers.
//!
//! Routes are keyed by absolute URL. Unrouted or failing URLs behave like
//! an unreachable host, which is also how the offline state is modelled.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Method;

use super::{Network, Request, Response, ResponseSource};
use hypernews_core::Error;

#[derive(Debug, Clone)]
enum Route {
    Respond { status: u16, content_type: String, body: Bytes },
    Fail,
}

/// A request the scripted network received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub method: Method,
    pub url: String,
    pub body: Option<Bytes>,
}

/// Network answering from a routing table.
#[derive(Debug, Default)]
pub struct ScriptedNetwork {
    routes: Mutex<HashMap<String, Route>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer requests for `url` with the given status and body.
    pub fn respond(&self, url: &str, status: u16, content_type: &str, body: impl Into<Bytes>) -> &Self {
        let route = Route::Respond { status, content_type: content_type.to_string(), body: body.into() };
        self.routes_mut().insert(url.to_string(), route);
        self
    }

    /// Make requests for `url` fail at the transport level.
    pub fn fail(&self, url: &str) -> &Self {
        self.routes_mut().insert(url.to_string(), Route::Fail);
        self
    }

    /// Make every request fail.
    pub fn go_offline(&self) {
        let mut routes = self.routes_mut();
        for route in routes.values_mut() {
            *route = Route::Fail;
        }
    }

    /// Every request received so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).clone()
    }

    /// Number of requests received for `url`.
    pub fn call_count(&self, url: &str) -> usize {
        self.calls().iter().filter(|call| call.url == url).count()
    }

    fn routes_mut(&self) -> std::sync::MutexGuard<'_, HashMap<String, Route>> {
        self.routes.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Network for ScriptedNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let url = request.url.as_str().to_string();
        self.calls.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).push(RecordedCall {
            method: request.method.clone(),
            url: url.clone(),
            body: request.body.clone(),
        });

        let route = self.routes_mut().get(&url).cloned();
        match route {
            Some(Route::Respond { status, content_type, body }) => Ok(Response {
                status,
                content_type: Some(content_type),
                headers: Vec::new(),
                body,
                source: ResponseSource::Network,
            }),
            Some(Route::Fail) | None => Err(Error::HttpError(format!("network error: {url} unreachable"))),
        }
    }
}

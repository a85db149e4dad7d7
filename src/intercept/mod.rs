//! Outbound call interception.
//!
//! A host composes a [`CallChain`] once at startup: zero or more
//! [`Interceptor`]s in front of a terminal [`Executor`] that actually performs
//! the call. Each interceptor sees the call and a [`Next`] cursor and decides
//! whether, and with what call, to continue down the chain.

mod http;
mod pipeline;

pub use http::HttpExecutor;
pub use pipeline::{Decision, FaultInjector};

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use url::Url;

use crate::Result;

/// An outbound request about to be sent
#[derive(Debug, Clone)]
pub struct OutboundCall {
    /// HTTP method
    pub method: Method,
    /// Target
    pub url: Url,
    /// Request headers
    pub headers: HeaderMap,
    /// Request body, possibly empty
    pub body: Bytes,
}

impl OutboundCall {
    /// Call with no headers and no body
    #[must_use]
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Set the body
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }
}

/// Response to an [`OutboundCall`]
#[derive(Debug, Clone)]
pub struct CallResponse {
    /// Status code
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Response body
    pub body: Bytes,
}

impl CallResponse {
    /// Body as text, lossy
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Terminal step of a chain
#[async_trait]
pub trait Executor: Send + Sync + 'static {
    /// Perform the call
    ///
    /// # Errors
    ///
    /// Returns an error if the call could not be completed.
    async fn execute(&self, call: OutboundCall) -> Result<CallResponse>;
}

/// Middleware around outbound calls
#[async_trait]
pub trait Interceptor: Send + Sync + 'static {
    /// Handle `call`, usually by forwarding some call to `next`
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or the interceptor aborts it.
    async fn handle(&self, call: OutboundCall, next: Next<'_>) -> Result<CallResponse>;
}

/// Remainder of the chain as seen by one interceptor
#[derive(Clone, Copy)]
pub struct Next<'a> {
    interceptors: &'a [Arc<dyn Interceptor>],
    executor: &'a dyn Executor,
}

impl Next<'_> {
    /// Pass `call` to the next interceptor, or to the executor at the end
    ///
    /// # Errors
    ///
    /// Propagates errors from downstream interceptors and the executor.
    pub async fn run(self, call: OutboundCall) -> Result<CallResponse> {
        match self.interceptors.split_first() {
            Some((first, rest)) => {
                let next = Next {
                    interceptors: rest,
                    executor: self.executor,
                };
                first.handle(call, next).await
            }
            None => self.executor.execute(call).await,
        }
    }
}

/// Interceptors composed in front of an executor
pub struct CallChain {
    interceptors: Vec<Arc<dyn Interceptor>>,
    executor: Arc<dyn Executor>,
}

impl CallChain {
    /// Start building a chain ending in `executor`.
    #[must_use]
    pub fn builder(executor: Arc<dyn Executor>) -> CallChainBuilder {
        CallChainBuilder {
            interceptors: Vec::new(),
            executor,
        }
    }

    /// Send `call` through every interceptor, in insertion order
    ///
    /// # Errors
    ///
    /// Propagates errors from interceptors and the executor.
    pub async fn execute(&self, call: OutboundCall) -> Result<CallResponse> {
        Next {
            interceptors: &self.interceptors,
            executor: self.executor.as_ref(),
        }
        .run(call)
        .await
    }

    /// Number of interceptors
    #[must_use]
    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    /// Whether the chain goes straight to the executor
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }
}

/// Builder for [`CallChain`].
pub struct CallChainBuilder {
    interceptors: Vec<Arc<dyn Interceptor>>,
    executor: Arc<dyn Executor>,
}

impl CallChainBuilder {
    /// Append an interceptor to the chain.
    #[must_use]
    pub fn interceptor(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    /// Finalise and produce a [`CallChain`].
    #[must_use]
    pub fn build(self) -> CallChain {
        CallChain {
            interceptors: self.interceptors,
            executor: self.executor,
        }
    }
}

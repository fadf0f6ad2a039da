//! Ordered, short-circuiting middleware chains
//!
//! A chain is an immutable list of stages built once at startup. Each request
//! walks the list front to back; a stage either hands the request to the rest
//! of the chain through [`Next::run`] or returns its own response, which ends
//! the walk.

use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    response::Response,
    Router,
};
use std::sync::Arc;

/// One stage of a [`MiddlewareChain`]
#[async_trait]
pub trait Middleware: Send + Sync + 'static {
    /// Short identifier used in logs
    fn name(&self) -> &'static str;

    /// Process `req`. Call `next.run(req)` to continue down the chain, or
    /// return a response directly to short-circuit.
    async fn handle(&self, req: Request, next: Next<'_>) -> Response;
}

/// The remainder of a chain, as seen from inside a stage
pub struct Next<'a> {
    stages: &'a [Arc<dyn Middleware>],
    endpoint: axum::middleware::Next,
}

impl<'a> Next<'a> {
    /// Run the remaining stages, then the wrapped endpoint
    pub async fn run(self, req: Request) -> Response {
        match self.stages.split_first() {
            Some((stage, rest)) => {
                let next = Next {
                    stages: rest,
                    endpoint: self.endpoint,
                };
                stage.handle(req, next).await
            }
            None => self.endpoint.run(req).await,
        }
    }

    /// Number of stages still ahead of the endpoint
    pub fn remaining(&self) -> usize {
        self.stages.len()
    }
}

/// An immutable, cheaply clonable list of stages
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    stages: Arc<[Arc<dyn Middleware>]>,
}

impl MiddlewareChain {
    pub fn builder() -> ChainBuilder {
        ChainBuilder::default()
    }

    /// Stage names, outermost first
    pub fn names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// A new chain with `stages` appended; `self` is left untouched
    pub fn extend(&self, stages: impl IntoIterator<Item = Arc<dyn Middleware>>) -> Self {
        let stages: Vec<_> = self.stages.iter().cloned().chain(stages).collect();
        Self {
            stages: stages.into(),
        }
    }

    /// Run the chain around `endpoint`
    pub async fn run(&self, req: Request, endpoint: axum::middleware::Next) -> Response {
        Next {
            stages: &self.stages,
            endpoint,
        }
        .run(req)
        .await
    }

    /// Wrap every route and the fallback of `router`
    pub fn layer<S>(&self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        router.layer(axum::middleware::from_fn_with_state(self.clone(), run_chain))
    }

    /// Wrap only the routes of `router`; unmatched requests skip the chain
    pub fn route_layer<S>(&self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        router.route_layer(axum::middleware::from_fn_with_state(self.clone(), run_chain))
    }
}

async fn run_chain(
    State(chain): State<MiddlewareChain>,
    req: Request,
    next: axum::middleware::Next,
) -> Response {
    chain.run(req, next).await
}

/// Collects stages in order, outermost first
#[derive(Default)]
pub struct ChainBuilder {
    stages: Vec<Arc<dyn Middleware>>,
}

impl ChainBuilder {
    pub fn stage<M: Middleware>(mut self, stage: M) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    pub fn shared(mut self, stage: Arc<dyn Middleware>) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn build(self) -> MiddlewareChain {
        MiddlewareChain {
            stages: self.stages.into(),
        }
    }
}

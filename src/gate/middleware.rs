use crate::error::GateError;
use crate::gate::{Admission, GateRequest, RequestGate};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower_layer::Layer;
use tower_service::Service;

/// A request the gate admitted, handed to the inner service.
#[derive(Debug, Clone)]
pub struct AdmittedRequest<B = ()> {
    /// The original request.
    pub request: GateRequest<B>,
    /// What the gate resolved while admitting it.
    pub admission: Admission,
}

/// Error from a gated service: either the gate rejected the request or the handler failed.
#[derive(Debug)]
pub enum GatedError<E> {
    /// The gate denied the request; convert with [`GateError::into_rejection`].
    Rejected(GateError),
    /// The inner service failed.
    Inner(E),
}

impl<E: fmt::Display> fmt::Display for GatedError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatedError::Rejected(e) => write!(f, "rejected: {}", e),
            GatedError::Inner(e) => write!(f, "{}", e),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for GatedError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GatedError::Rejected(e) => Some(e),
            GatedError::Inner(e) => Some(e),
        }
    }
}

impl<E> GatedError<E> {
    /// The gate's rejection, if that is what happened.
    pub fn rejection(&self) -> Option<&GateError> {
        match self {
            GatedError::Rejected(e) => Some(e),
            GatedError::Inner(_) => None,
        }
    }

    /// Get the inner error if this is an Inner variant.
    pub fn into_inner(self) -> Option<E> {
        match self {
            GatedError::Inner(e) => Some(e),
            GatedError::Rejected(_) => None,
        }
    }
}

/// A layer that runs every request through a [`RequestGate`].
#[derive(Clone, Debug)]
pub struct GateLayer {
    gate: Arc<RequestGate>,
}

impl GateLayer {
    /// Create a new gate layer.
    pub fn new(gate: RequestGate) -> Self {
        Self { gate: Arc::new(gate) }
    }
}

impl<S> Layer<S> for GateLayer {
    type Service = GateService<S>;

    fn layer(&self, service: S) -> Self::Service {
        GateService { inner: service, gate: self.gate.clone() }
    }
}

/// Middleware service that admits requests before the handler runs.
#[derive(Clone, Debug)]
pub struct GateService<S> {
    inner: S,
    gate: Arc<RequestGate>,
}

impl<S, B> Service<GateRequest<B>> for GateService<S>
where
    S: Service<AdmittedRequest<B>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    B: Send + Sync + 'static,
{
    type Response = S::Response;
    type Error = GatedError<S::Error>;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(GatedError::Inner)
    }

    fn call(&mut self, req: GateRequest<B>) -> Self::Future {
        let gate = self.gate.clone();
        // The clone is not ready; swap so the instance polled in poll_ready handles this call.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let admission = gate.admit(&req).await.map_err(GatedError::Rejected)?;
            inner.call(AdmittedRequest { request: req, admission }).await.map_err(GatedError::Inner)
        })
    }
}

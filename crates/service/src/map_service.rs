//! Map service abstraction.
//!
//! The hosted map owns layers and geometry; this crate only describes the
//! calls the explorer makes against it. Every call is an asynchronous
//! request/response operation and any of them may fail transiently.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use foundation::{LayerId, Viewport};
use tokio::sync::broadcast;
use tracing::debug;

use crate::protocol::{
    CreatedOverlay, LayerInfo, LayerStyle, MapEvent, OverlayGeometry, OverlayStyle,
    RenderedFeature, VisibilityChange,
};

/// Error type for map service operations.
#[derive(Debug)]
pub struct ServiceError {
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as _)
    }
}

impl ServiceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Type alias for a boxed future that can be sent between threads.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Calls the explorer makes against the hosted map.
///
/// Implementations must be `Send + Sync` for use across async tasks.
/// Methods return boxed futures for dyn-compatibility.
pub trait MapService: Send + Sync {
    /// Current center and zoom of the map.
    fn viewport(&self) -> BoxFuture<'_, ServiceResult<Viewport>>;

    /// Subscribe to map notifications. Dropping the receiver unsubscribes.
    fn subscribe(&self) -> broadcast::Receiver<MapEvent>;

    /// Create a new layer from ad-hoc geometry.
    fn create_overlay(
        &self,
        geometry: OverlayGeometry,
        style: OverlayStyle,
    ) -> BoxFuture<'_, ServiceResult<CreatedOverlay>>;

    /// Delete a layer (or layer group) by id.
    fn delete_layer(&self, id: LayerId) -> BoxFuture<'_, ServiceResult<()>>;

    fn set_layer_visibility(&self, change: VisibilityChange) -> BoxFuture<'_, ServiceResult<()>>;

    /// Copy of an existing layer (same features, same style). Returns the
    /// new layer's id.
    fn duplicate_layer(&self, id: LayerId) -> BoxFuture<'_, ServiceResult<LayerId>>;

    fn rename_layer(&self, id: LayerId, name: String) -> BoxFuture<'_, ServiceResult<()>>;

    fn set_layer_style(&self, id: LayerId, style: LayerStyle) -> BoxFuture<'_, ServiceResult<()>>;

    fn layers(&self) -> BoxFuture<'_, ServiceResult<Vec<LayerInfo>>>;

    /// Features of `layer` that are currently rendered, with attributes and
    /// bounding boxes.
    fn rendered_features(&self, layer: LayerId)
    -> BoxFuture<'_, ServiceResult<Vec<RenderedFeature>>>;
}

/// Waits for the next [`MapEvent::Idle`] or until `timeout` elapses.
///
/// Returns `true` if the map reported idle. A closed or lagging event
/// stream is treated like a timeout.
pub async fn wait_for_idle(events: &mut broadcast::Receiver<MapEvent>, timeout: Duration) -> bool {
    let wait = async {
        loop {
            match events.recv().await {
                Ok(MapEvent::Idle) => return true,
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    debug!(skipped = n, "map event stream lagged while waiting for idle");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return false,
            }
        }
    };
    tokio::time::timeout(timeout, wait).await.unwrap_or(false)
}

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use tos_core::BlobService;

use crate::icon::IconFinder;

/// Shared per-process state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<BlobService>,
    pub icons: Arc<IconFinder>,
    /// Fired on shutdown; long-poll reads derive child tokens from it.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(service: BlobService, icons: IconFinder, shutdown: CancellationToken) -> Self {
        Self {
            service: Arc::new(service),
            icons: Arc::new(icons),
            shutdown,
        }
    }
}

//! Application state.

use std::sync::Arc;

use crate::service::VideoService;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<VideoService>,
}

impl AppState {
    pub fn new(service: VideoService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

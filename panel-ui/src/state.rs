//! Shared application state for the panel server.

use std::sync::Arc;

use panel::Panel;

use crate::pages::Pages;

/// Shared state accessible from all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub panel: Arc<Panel>,
    pub pages: Arc<Pages>,
}

impl AppState {
    pub fn new(panel: Panel) -> Self {
        Self {
            panel: Arc::new(panel),
            pages: Arc::new(Pages::new()),
        }
    }
}

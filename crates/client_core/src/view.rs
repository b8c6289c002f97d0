use std::sync::Arc;

use serde_json::Value;
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, info, warn};

use crate::{host::ViewComponent, notify::Notifier, source::CollectionSource};

pub const DO_AJAX: &str = "do_ajax";

/// Holds the fetched categories collection, unset until a fetch succeeds.
pub struct CategoriesView {
    state: Arc<watch::Sender<Option<Value>>>,
    source: Arc<dyn CollectionSource>,
    notifier: Arc<dyn Notifier>,
}

impl CategoriesView {
    pub fn new(source: Arc<dyn CollectionSource>, notifier: Arc<dyn Notifier>) -> Self {
        let (state, _) = watch::channel(None);
        Self {
            state: Arc::new(state),
            source,
            notifier,
        }
    }

    pub fn data(&self) -> Option<Value> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Value>> {
        self.state.subscribe()
    }

    pub fn mounted(&self) {
        info!("categories view mounted");
    }

    /// Starts one fetch and returns without waiting for it.
    ///
    /// Calls are not serialized: whichever fetch completes last decides the
    /// state. A failed fetch raises one alert and keeps the previous value.
    pub fn do_ajax(&self) -> JoinHandle<()> {
        let state = Arc::clone(&self.state);
        let source = Arc::clone(&self.source);
        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            match source.fetch().await {
                Ok(value) => {
                    debug!("categories fetched");
                    state.send_replace(Some(value));
                }
                Err(err) => {
                    warn!(error = %err, "categories fetch failed");
                    notifier.alert(&err.to_string());
                }
            }
        })
    }
}

impl ViewComponent for CategoriesView {
    fn data(&self) -> Option<Value> {
        CategoriesView::data(self)
    }

    fn subscribe(&self) -> watch::Receiver<Option<Value>> {
        CategoriesView::subscribe(self)
    }

    fn mounted(&self) {
        CategoriesView::mounted(self)
    }

    fn methods(&self) -> &'static [&'static str] {
        &[DO_AJAX]
    }

    fn call(&self, method: &str) -> Option<JoinHandle<()>> {
        match method {
            DO_AJAX => Some(self.do_ajax()),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "tests/view_tests.rs"]
mod tests;

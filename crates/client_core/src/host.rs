use futures::{Stream, StreamExt};
use serde_json::Value;
use tokio::{sync::watch, task::JoinHandle};
use tokio_stream::wrappers::WatchStream;
use tracing::info;

use crate::error::HostError;

pub const EMPTY_PLACEHOLDER: &str = "(no data yet)";

/// Contract between a view and the host that mounts and renders it.
pub trait ViewComponent: Send + Sync {
    fn data(&self) -> Option<Value>;
    fn subscribe(&self) -> watch::Receiver<Option<Value>>;
    fn mounted(&self);
    fn methods(&self) -> &'static [&'static str];
    /// Runs the named action; `None` when the name is unknown.
    fn call(&self, method: &str) -> Option<JoinHandle<()>>;
}

pub struct ViewHost<C: ViewComponent> {
    component: C,
    mount_point: Option<String>,
}

impl<C: ViewComponent> ViewHost<C> {
    pub fn create(component: C) -> Self {
        Self {
            component,
            mount_point: None,
        }
    }

    pub fn mount(&mut self, selector: &str) -> Result<(), HostError> {
        if let Some(existing) = &self.mount_point {
            return Err(HostError::AlreadyMounted(existing.clone()));
        }
        match selector.strip_prefix('#') {
            Some(id) if !id.is_empty() && !id.contains(char::is_whitespace) => {}
            _ => return Err(HostError::InvalidSelector(selector.to_string())),
        }
        self.mount_point = Some(selector.to_string());
        info!(selector, "mounting view");
        self.component.mounted();
        Ok(())
    }

    pub fn mount_point(&self) -> Option<&str> {
        self.mount_point.as_deref()
    }

    pub fn dispatch(&self, method: &str) -> Result<JoinHandle<()>, HostError> {
        if self.mount_point.is_none() {
            return Err(HostError::NotMounted);
        }
        self.component
            .call(method)
            .ok_or_else(|| HostError::UnknownMethod(method.to_string()))
    }

    pub fn component(&self) -> &C {
        &self.component
    }

    pub fn render(&self) -> String {
        render_value(self.component.data().as_ref())
    }

    /// Yields a fresh rendering each time the component state changes.
    pub fn renders(&self) -> impl Stream<Item = String> {
        WatchStream::from_changes(self.component.subscribe())
            .map(|value| render_value(value.as_ref()))
    }
}

pub fn render_value(value: Option<&Value>) -> String {
    match value {
        Some(value) => serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string()),
        None => EMPTY_PLACEHOLDER.to_string(),
    }
}

#[cfg(test)]
#[path = "tests/host_tests.rs"]
mod tests;

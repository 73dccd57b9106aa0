use std::collections::BTreeSet;

use crate::registry::NodeId;
use crate::trace::{CascadeStatus, CascadeTrace};

use super::{Form, FormError};

/// Origin attached to changes raised by a filter
pub const FILTER_EVENT_ORIGIN: &str = "Filter Element Event";

/// A value change reaching the observers of a node
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeEvent {
    origin: Option<String>,
}

impl ChangeEvent {
    /// A change made by the user
    pub fn user() -> Self {
        Self::default()
    }

    /// A change raised while parameter `name` was being updated
    pub fn propagated(name: impl Into<String>) -> Self {
        ChangeEvent {
            origin: Some(name.into()),
        }
    }

    /// A change raised by filtering
    pub fn filter() -> Self {
        Self::propagated(FILTER_EVENT_ORIGIN)
    }

    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }
}

impl Form {
    /// The value of `id` changed: update every node observing it
    ///
    /// Events whose origin is the node's own name are swallowed. All observers
    /// share one visited set, which starts with the changed node, so each node
    /// is refreshed at most once per event. A failing observer does not stop
    /// the others.
    pub async fn notify_change(&mut self, id: NodeId, event: ChangeEvent) -> Result<CascadeTrace, FormError> {
        let node = self.node_ref(id)?;
        let name = node.name.clone();
        let observers = node.observers.clone();

        if event.origin() == Some(name.as_str()) {
            log::debug!("Skipping self reference to avoid infinite loop! ({})", name);
            return Ok(CascadeTrace::new(name, CascadeStatus::Swallowed));
        }

        log::debug!("Cascading changes from parameter {}...", name);
        let mut trace = CascadeTrace::changed(name.as_str());
        let mut visited = BTreeSet::from([id]);
        for observer in observers {
            let observer_name = self.name_of(observer);
            if !visited.insert(observer) {
                trace.add_child(CascadeTrace::skipped(observer_name));
                continue;
            }
            match self.cascade(observer, &mut visited).await {
                Ok(child) => trace.add_child(child),
                Err(error) => {
                    log::warn!("Failed to update {} after {} changed: {}", observer_name, name, error);
                    trace.add_child(CascadeTrace::failed(observer_name, &error));
                }
            }
        }
        Ok(trace)
    }

    /// The user changed the value of `id`
    pub async fn changed(&mut self, id: NodeId) -> Result<CascadeTrace, FormError> {
        self.notify_change(id, ChangeEvent::user()).await
    }

    /// Apply a user supplied value to `id` and notify its observers
    ///
    /// See [`crate::Widget::apply_value`] for how the value is read.
    pub async fn set_value(&mut self, id: NodeId, value: &str) -> Result<CascadeTrace, FormError> {
        if let Some(widget) = self.widget_mut(id) {
            widget.apply_value(value);
        }
        self.changed(id).await
    }
}

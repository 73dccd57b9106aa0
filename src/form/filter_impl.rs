use serde::Serialize;

use crate::filter::FilterOutcome;
use crate::registry::NodeId;
use crate::trace::CascadeTrace;

use super::{ChangeEvent, Form, FormError};

/// Result of filtering a node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterReport {
    pub outcome: FilterOutcome,
    /// Cascade triggered when the filter changed the submitted value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub propagation: Option<CascadeTrace>,
}

impl Form {
    /// Apply `query` to the filter of `id` without notifying anyone
    pub fn apply_filter(&mut self, id: NodeId, query: &str) -> Result<FilterOutcome, FormError> {
        let node = self.node_mut(id)?;
        let Some(filter) = node.filter.as_mut() else {
            return Err(FormError::NoFilter {
                parameter: node.name.clone(),
            });
        };
        Ok(match node.widget.as_mut() {
            Some(widget) => filter.apply(widget, query),
            None => FilterOutcome::Detached,
        })
    }

    /// Apply `query` to the filter of `id`
    ///
    /// When the filter propagates changes and the submitted value differs
    /// afterwards, observers are notified with a filter event.
    pub async fn filter(&mut self, id: NodeId, query: &str) -> Result<FilterReport, FormError> {
        let before = self.value_of(id)?;
        let outcome = self.apply_filter(id, query)?;
        let propagate = self
            .node_ref(id)?
            .filter
            .as_ref()
            .map(|f| f.options().propagate_changes)
            .unwrap_or(false);

        let propagation = if propagate && self.value_of(id)? != before {
            Some(self.notify_change(id, ChangeEvent::filter()).await?)
        } else {
            None
        };
        Ok(FilterReport {
            outcome,
            propagation,
        })
    }

    /// Give the submission marker of radio group `group` to option `option_id`
    ///
    /// Applies to every radio list of the form in that group. Returns the
    /// number of widgets touched.
    pub fn select_radio(&mut self, group: &str, option_id: &str) -> usize {
        self.nodes
            .iter_mut()
            .filter_map(|n| n.widget.as_mut())
            .map(|w| w.select_radio(group, option_id))
            .filter(|touched| *touched)
            .count()
    }
}

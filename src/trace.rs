/// Trace of a cascade, for debugging and visualizing updates
use serde::{Deserialize, Serialize};

use crate::render::RenderOutcome;

/// What happened to one parameter during a cascade
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CascadeStatus {
    /// Root of a change notification
    Changed,
    /// A change raised by the parameter itself; nothing was notified
    Swallowed,
    /// State sent, results fetched and rendered
    Updated,
    /// Already updated earlier in the same cascade
    Skipped,
    /// The update failed; the error is recorded
    Failed,
}

/// Represents a single parameter in the cascade trace
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CascadeTrace {
    pub parameter: String,

    pub status: CascadeStatus,

    /// Serialized referenced-parameter state sent to the evaluator
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub state: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub render: Option<RenderOutcome>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,

    /// Dependents updated as a consequence, in update order
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub children: Vec<CascadeTrace>,
}

impl CascadeTrace {
    pub fn new(parameter: impl Into<String>, status: CascadeStatus) -> Self {
        CascadeTrace {
            parameter: parameter.into(),
            status,
            state: None,
            render: None,
            error: None,
            children: Vec::new(),
        }
    }

    pub fn changed(parameter: impl Into<String>) -> Self {
        Self::new(parameter, CascadeStatus::Changed)
    }

    pub fn updated(parameter: impl Into<String>) -> Self {
        Self::new(parameter, CascadeStatus::Updated)
    }

    pub fn skipped(parameter: impl Into<String>) -> Self {
        Self::new(parameter, CascadeStatus::Skipped)
    }

    pub fn failed(parameter: impl Into<String>, error: &impl std::fmt::Display) -> Self {
        Self::new(parameter, CascadeStatus::Failed).with_error(error.to_string())
    }

    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    pub fn with_render(mut self, render: RenderOutcome) -> Self {
        self.render = Some(render);
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn add_child(&mut self, child: CascadeTrace) {
        self.children.push(child);
    }

    /// Names of updated parameters, in update order
    pub fn updated_parameters(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect(CascadeStatus::Updated, &mut names);
        names
    }

    /// Number of nodes in the trace with `status`
    pub fn count(&self, status: CascadeStatus) -> usize {
        let own = usize::from(self.status == status);
        own + self.children.iter().map(|c| c.count(status)).sum::<usize>()
    }

    /// First node, depth first, describing `parameter`
    pub fn find(&self, parameter: &str) -> Option<&CascadeTrace> {
        if self.parameter == parameter {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(parameter))
    }

    fn collect<'a>(&'a self, status: CascadeStatus, names: &mut Vec<&'a str>) {
        if self.status == status {
            names.push(&self.parameter);
        }
        for child in &self.children {
            child.collect(status, names);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CascadeTrace {
        let mut root = CascadeTrace::changed("country");
        let mut state = CascadeTrace::updated("state").with_state("country=Brazil");
        state.add_child(CascadeTrace::updated("city").with_render(RenderOutcome::Rendered { items: 2 }));
        root.add_child(state);
        root.add_child(CascadeTrace::skipped("city"));
        root.add_child(CascadeTrace::failed("zip", &"boom"));
        root
    }

    #[test]
    fn test_updated_parameters_in_order() {
        assert_eq!(sample().updated_parameters(), vec!["state", "city"]);
    }

    #[test]
    fn test_count_and_find() {
        let trace = sample();
        assert_eq!(trace.count(CascadeStatus::Skipped), 1);
        assert_eq!(trace.find("zip").and_then(|t| t.error.as_deref()), Some("boom"));
        assert!(trace.find("nowhere").is_none());
    }

    #[test]
    fn test_serialization_skips_empty_fields() {
        let json = serde_json::to_value(CascadeTrace::skipped("a")).unwrap();
        assert_eq!(json, serde_json::json!({"parameter": "a", "status": "skipped"}));

        let back: CascadeTrace = serde_json::from_value(serde_json::to_value(sample()).unwrap()).unwrap();
        assert_eq!(back, sample());
    }
}

/// Form module - the parameter graph and the cascade engine driving it
// Sub-modules
mod error;

// Implementation modules
mod filter_impl;
mod observer_impl;
mod update_impl;

// Public exports
pub use error::FormError;
pub use filter_impl::FilterReport;
pub use observer_impl::{ChangeEvent, FILTER_EVENT_ORIGIN};

use crate::filter::{FilterOptions, FilterOverlay};
use crate::protocol::{self, ParameterValue};
use crate::registry::{DependencyRegistry, NodeId};
use crate::remote::RemoteEvaluator;
use crate::render;
use crate::widget::Widget;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Prefix of generated random names
pub const RANDOM_NAME_PREFIX: &str = "choice-parameter";

/// How a node takes part in cascades
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeRole {
    /// A control that is only ever read
    #[default]
    Plain,
    /// Choices fetched from an evaluator and rendered with selection state
    Cascade,
    /// Content fetched from an evaluator and rendered read-only
    DynamicReference,
}

impl NodeRole {
    pub fn is_remote(&self) -> bool {
        !matches!(self, NodeRole::Plain)
    }
}

/// Options for building a form
#[derive(Debug, Clone, Default)]
pub struct FormOptions {
    /// Seed for random name generation
    pub seed: Option<u64>,
}

impl FormOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// A parameter of the form and everything attached to it
pub struct ParameterNode {
    pub(super) name: String,
    pub(super) random_name: String,
    pub(super) role: NodeRole,
    pub(super) widget: Option<Widget>,
    pub(super) evaluator: Option<Arc<dyn RemoteEvaluator>>,
    pub(super) references: Vec<NodeId>,
    pub(super) observers: Vec<NodeId>,
    pub(super) filter: Option<FilterOverlay>,
}

impl ParameterNode {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn random_name(&self) -> &str {
        &self.random_name
    }

    pub fn role(&self) -> NodeRole {
        self.role
    }

    pub fn widget(&self) -> Option<&Widget> {
        self.widget.as_ref()
    }

    /// Upstream nodes, in declaration order
    pub fn references(&self) -> &[NodeId] {
        &self.references
    }

    /// Dependents notified when this node changes
    pub fn observers(&self) -> &[NodeId] {
        &self.observers
    }

    pub fn filter(&self) -> Option<&FilterOverlay> {
        self.filter.as_ref()
    }

    /// Current submitted value; a detached widget reads as empty
    pub fn value(&self) -> ParameterValue {
        self.widget
            .as_ref()
            .map(Widget::parameter_value)
            .unwrap_or_else(ParameterValue::empty)
    }
}

/// Create a random parameter name: `<prefix>-<number>[-<suffix>]`
pub fn random_parameter_name<R: Rng>(rng: &mut R, prefix: &str, suffix: &str) -> String {
    let mut name = String::new();
    if !prefix.trim().is_empty() {
        name.push_str(prefix);
        name.push('-');
    }
    name.push_str(&rng.gen::<u64>().to_string());
    if !suffix.trim().is_empty() {
        name.push('-');
        name.push_str(suffix);
    }
    name
}

/// The parameter graph of one form
///
/// Nodes live in an arena and refer to each other through [`NodeId`]s. The
/// form owns the registry of cascading nodes used to find dependents.
pub struct Form {
    pub(super) nodes: Vec<ParameterNode>,
    pub(super) registry: DependencyRegistry,
    pub(super) rng: StdRng,
}

impl Default for Form {
    fn default() -> Self {
        Self::new()
    }
}

impl Form {
    pub fn new() -> Self {
        Self::with_options(FormOptions::default())
    }

    pub fn with_options(options: FormOptions) -> Self {
        let rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Form {
            nodes: Vec::new(),
            registry: DependencyRegistry::new(),
            rng,
        }
    }

    /// Add a control that only provides values
    pub fn add_parameter(&mut self, name: impl Into<String>, widget: Widget) -> NodeId {
        self.insert_node(name.into(), NodeRole::Plain, Some(widget), None, None)
    }

    /// Add a parameter whose choices come from `evaluator`
    pub fn add_cascade(
        &mut self,
        name: impl Into<String>,
        widget: Widget,
        evaluator: Arc<dyn RemoteEvaluator>,
    ) -> NodeId {
        self.insert_node(
            name.into(),
            NodeRole::Cascade,
            Some(widget),
            Some(evaluator),
            None,
        )
    }

    /// Add a parameter whose read-only content comes from `evaluator`
    pub fn add_dynamic_reference(
        &mut self,
        name: impl Into<String>,
        widget: Widget,
        evaluator: Arc<dyn RemoteEvaluator>,
    ) -> NodeId {
        self.insert_node(
            name.into(),
            NodeRole::DynamicReference,
            Some(widget),
            Some(evaluator),
            None,
        )
    }

    pub(crate) fn insert_node(
        &mut self,
        name: String,
        role: NodeRole,
        mut widget: Option<Widget>,
        evaluator: Option<Arc<dyn RemoteEvaluator>>,
        random_name: Option<String>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        let random_name = random_name
            .unwrap_or_else(|| random_parameter_name(&mut self.rng, RANDOM_NAME_PREFIX, ""));

        // Options declared without ids get the ids a render would give them
        if let Some(options) = widget.as_mut().and_then(Widget::choice_options_mut) {
            for (index, option) in options.iter_mut().enumerate() {
                if option.id.is_empty() {
                    option.id = render::element_id(&random_name, index);
                }
            }
        }
        if let Some(Widget::RadioList { group, .. }) = widget.as_mut() {
            if group.is_empty() {
                group.clone_from(&name);
            }
        }

        if role.is_remote() {
            self.registry.register(id, name.as_str());
        }
        log::debug!("Added {:?} parameter {} as {}", role, name, id);

        self.nodes.push(ParameterNode {
            name,
            random_name,
            role,
            widget,
            evaluator,
            references: Vec::new(),
            observers: Vec::new(),
            filter: None,
        });
        id
    }

    /// Declare that `dependent` reads the value of `upstream`
    ///
    /// `upstream` may be any node, including `dependent` itself; `dependent`
    /// must be a cascading node.
    pub fn reference(&mut self, dependent: NodeId, upstream: NodeId) -> Result<(), FormError> {
        let upstream_name = self.node_ref(upstream)?.name.clone();
        let node = self.node_mut(dependent)?;
        if !node.role.is_remote() {
            return Err(FormError::NotRemote {
                parameter: node.name.clone(),
            });
        }
        node.references.push(upstream);
        self.registry.add_reference(dependent, upstream_name);
        self.nodes[upstream.0].observers.push(dependent);
        Ok(())
    }

    /// Attach a filter, snapshotting the current options
    pub fn attach_filter(&mut self, id: NodeId, options: FilterOptions) -> Result<(), FormError> {
        let node = self.node_mut(id)?;
        let overlay = match node.widget.as_ref() {
            Some(widget) if widget.kind().is_choice() => FilterOverlay::capture(widget, options),
            _ => {
                return Err(FormError::NoFilter {
                    parameter: node.name.clone(),
                })
            }
        };
        node.filter = Some(overlay);
        Ok(())
    }

    pub fn node(&self, id: NodeId) -> Option<&ParameterNode> {
        self.nodes.get(id.0)
    }

    /// First node called `name`
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.nodes.iter().position(|n| n.name == name).map(NodeId)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &ParameterNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    pub fn registry(&self) -> &DependencyRegistry {
        &self.registry
    }

    pub fn widget(&self, id: NodeId) -> Option<&Widget> {
        self.node(id).and_then(ParameterNode::widget)
    }

    pub fn widget_mut(&mut self, id: NodeId) -> Option<&mut Widget> {
        self.nodes.get_mut(id.0).and_then(|n| n.widget.as_mut())
    }

    /// Remove the widget of a node, as when the control leaves the page
    pub fn detach_widget(&mut self, id: NodeId) -> Option<Widget> {
        self.nodes.get_mut(id.0).and_then(|n| n.widget.take())
    }

    pub fn value_of(&self, id: NodeId) -> Result<ParameterValue, FormError> {
        Ok(self.node_ref(id)?.value())
    }

    /// Current values of the referenced parameters, serialized in order
    pub fn referenced_parameters_as_text(&self, id: NodeId) -> Result<String, FormError> {
        let node = self.node_ref(id)?;
        let mut entries = Vec::with_capacity(node.references.len());
        for upstream in &node.references {
            let upstream = self.node_ref(*upstream)?;
            entries.push((upstream.name.as_str(), upstream.value()));
        }
        Ok(protocol::serialize_parameters(entries))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub(super) fn node_ref(&self, id: NodeId) -> Result<&ParameterNode, FormError> {
        self.nodes.get(id.0).ok_or(FormError::UnknownNode(id))
    }

    pub(super) fn node_mut(&mut self, id: NodeId) -> Result<&mut ParameterNode, FormError> {
        self.nodes.get_mut(id.0).ok_or(FormError::UnknownNode(id))
    }

    pub(super) fn name_of(&self, id: NodeId) -> String {
        self.nodes
            .get(id.0)
            .map(|n| n.name.clone())
            .unwrap_or_else(|| id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{ScriptValue, ScriptedEvaluator};
    use crate::widget::ChoiceOption;

    fn evaluator() -> Arc<dyn RemoteEvaluator> {
        Arc::new(ScriptedEvaluator::constant(ScriptValue::list(["a"])))
    }

    #[test]
    fn test_random_parameter_name() {
        let mut rng = StdRng::seed_from_u64(1);
        let name = random_parameter_name(&mut rng, "test", "param");
        assert!(name.starts_with("test-"));
        assert!(name.ends_with("-param"));
        let name = random_parameter_name(&mut rng, "", "param");
        assert!(!name.starts_with('-'));
        let name = random_parameter_name(&mut rng, "test", " ");
        assert!(!name.ends_with('-'));
    }

    #[test]
    fn test_seeded_random_names_repeat() {
        let mut a = Form::with_options(FormOptions::new().with_seed(7));
        let mut b = Form::with_options(FormOptions::new().with_seed(7));
        let x = a.add_parameter("x", Widget::text_input(""));
        let y = b.add_parameter("x", Widget::text_input(""));
        assert_eq!(
            a.node(x).map(ParameterNode::random_name),
            b.node(y).map(ParameterNode::random_name)
        );
    }

    #[test]
    fn test_option_ids_are_assigned() {
        let mut form = Form::new();
        let id = form.insert_node(
            "p".into(),
            NodeRole::Plain,
            Some(Widget::radio_list("", vec![ChoiceOption::new("a", "A")])),
            None,
            Some("rand om".into()),
        );
        let Some(Widget::RadioList { group, options, .. }) = form.widget(id) else {
            panic!("expected a radio list");
        };
        assert_eq!(group, "p");
        assert_eq!(options[0].id, "ecp_rand_om_0");
    }

    #[test]
    fn test_references_and_registry() {
        let mut form = Form::new();
        let country = form.add_parameter("country", Widget::text_input("Brazil"));
        let state = form.add_cascade("state", Widget::single_select(vec![]), evaluator());
        form.reference(state, country).unwrap();

        assert_eq!(form.registry().find_dependents("country"), vec![state]);
        assert_eq!(form.node(country).unwrap().observers(), &[state]);
        assert_eq!(
            form.referenced_parameters_as_text(state).unwrap(),
            "country=Brazil"
        );
    }

    #[test]
    fn test_plain_nodes_cannot_reference() {
        let mut form = Form::new();
        let a = form.add_parameter("a", Widget::text_input(""));
        let b = form.add_parameter("b", Widget::text_input(""));
        assert!(matches!(
            form.reference(a, b),
            Err(FormError::NotRemote { .. })
        ));
        assert!(matches!(
            form.reference(a, NodeId(9)),
            Err(FormError::UnknownNode(_))
        ));
    }

    #[test]
    fn test_detached_widget_reads_empty() {
        let mut form = Form::new();
        let a = form.add_parameter("a", Widget::text_input("x"));
        let b = form.add_cascade("b", Widget::single_select(vec![]), evaluator());
        form.reference(b, a).unwrap();
        form.detach_widget(a);
        assert_eq!(form.referenced_parameters_as_text(b).unwrap(), "a=");
    }

    #[test]
    fn test_filter_requires_choice_widget() {
        let mut form = Form::new();
        let a = form.add_parameter("a", Widget::text_input("x"));
        assert!(matches!(
            form.attach_filter(a, FilterOptions::new()),
            Err(FormError::NoFilter { .. })
        ));
    }
}

/// Param Cascade - cascading dynamic parameters for web forms
///
/// A form is a graph of parameters. Cascading parameters read the current
/// values of the parameters they reference, send them to a remote evaluator,
/// and render the choices that come back; the change then propagates to
/// every parameter that depends on them in turn.
///
/// # Example
///
/// ```
/// # tokio_test::block_on(async {
/// use param_cascade::remote::{ScriptValue, ScriptedEvaluator};
/// use param_cascade::{ChoiceOption, Form, Widget};
/// use std::sync::Arc;
///
/// let mut form = Form::new();
/// let country = form.add_parameter(
///     "country",
///     Widget::single_select(vec![ChoiceOption::new("Brazil", "Brazil").selected(true)]),
/// );
/// let states = ScriptedEvaluator::new(|params| match params.get("country").map(String::as_str) {
///     Some("Brazil") => ScriptValue::list(["SP:selected", "RJ"]),
///     _ => ScriptValue::list(Vec::<String>::new()),
/// });
/// let state = form.add_cascade("state", Widget::single_select(vec![]), Arc::new(states));
/// form.reference(state, country).unwrap();
///
/// form.changed(country).await.unwrap();
/// assert_eq!(form.value_of(state).unwrap().to_string(), "SP");
/// # });
/// ```
pub mod definition;
pub mod diagnostic;
pub mod filter;
pub mod form;
pub mod protocol;
pub mod registry;
pub mod remote;
pub mod render;
pub mod span;
pub mod trace;
pub mod value_set;
pub mod widget;

use std::sync::Arc;

/// Re-export main types for convenience
pub use definition::{DefinitionError, FormDefinition};
pub use filter::{FilterOptions, FilterOutcome};
pub use form::{ChangeEvent, Form, FormError, FormOptions, NodeRole};
pub use protocol::{DecodeError, ParameterValue};
pub use registry::NodeId;
pub use remote::{RemoteEvaluator, TransportError};
pub use trace::CascadeTrace;
pub use value_set::ValueSet;
pub use widget::{ChoiceOption, Widget, WidgetKind};

/// Combined error type for the crate
#[derive(Debug)]
pub enum Error {
    Definition(DefinitionError),
    Form(FormError),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Definition(e) => write!(f, "Definition error: {}", e),
            Error::Form(e) => write!(f, "Update error: {}", e),
        }
    }
}

impl std::error::Error for Error {}

impl From<DefinitionError> for Error {
    fn from(e: DefinitionError) -> Self {
        Error::Definition(e)
    }
}

impl From<FormError> for Error {
    fn from(e: FormError) -> Self {
        Error::Form(e)
    }
}

/// Parse a JSON form definition and build it, resolving evaluators with
/// `resolve`
///
/// # Example
/// ```
/// use param_cascade::load_form_with;
/// use param_cascade::remote::{RemoteEvaluator, ScriptValue, ScriptedEvaluator};
/// use std::sync::Arc;
///
/// let source = r#"{"parameters": [
///     {"name": "a", "widget": {"kind": "text-input", "value": "x"}},
///     {"name": "b", "role": "cascade", "widget": {"kind": "single-select"}, "references": ["a"]}
/// ]}"#;
/// let form = load_form_with(source, |_| {
///     Ok(Arc::new(ScriptedEvaluator::constant(ScriptValue::list(["1"]))) as Arc<dyn RemoteEvaluator>)
/// })
/// .unwrap();
/// assert_eq!(form.len(), 2);
/// ```
pub fn load_form_with<F>(source: &str, resolve: F) -> Result<Form, Error>
where
    F: FnMut(&definition::ParameterDefinition) -> Result<Arc<dyn RemoteEvaluator>, DefinitionError>,
{
    let definition = FormDefinition::from_json(source)?;
    Ok(definition.build_with(resolve)?)
}

/// Parse a JSON form definition and build it with HTTP evaluators
#[cfg(feature = "http")]
pub fn load_form(source: &str) -> Result<Form, Error> {
    let definition = FormDefinition::from_json(source)?;
    Ok(definition.build()?)
}

/// Refresh every cascading parameter once, in declaration order, as a page
/// does when it first loads
///
/// Failures are logged and recorded in the returned traces.
pub async fn initialize(form: &mut Form) -> Vec<CascadeTrace> {
    let remote: Vec<NodeId> = form
        .nodes()
        .filter(|(_, node)| node.role().is_remote())
        .map(|(id, _)| id)
        .collect();

    let mut traces = Vec::with_capacity(remote.len());
    for id in remote {
        match form.update(id, true).await {
            Ok(trace) => traces.push(trace),
            Err(error) => {
                let name = form.node(id).map(|n| n.name().to_string()).unwrap_or_default();
                log::warn!("Failed to initialize {}: {}", name, error);
                traces.push(CascadeTrace::failed(name, &error));
            }
        }
    }
    traces
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{ScriptValue, ScriptedEvaluator};

    #[tokio::test]
    async fn test_initialize_refreshes_each_remote_node_once() {
        let evaluator = ScriptedEvaluator::constant(ScriptValue::list(["a", "b:selected"]));
        let mut form = Form::new();
        let a = form.add_parameter("a", Widget::text_input("x"));
        let b = form.add_cascade("b", Widget::single_select(vec![]), Arc::new(evaluator.clone()));
        let c = form.add_cascade("c", Widget::checkbox_list(vec![]), Arc::new(evaluator.clone()));
        form.reference(b, a).unwrap();
        form.reference(c, b).unwrap();

        let traces = initialize(&mut form).await;
        assert_eq!(traces.len(), 2);
        assert_eq!(evaluator.update_count(), 2);
        assert_eq!(form.value_of(b).unwrap().to_string(), "b");
        assert_eq!(form.value_of(c).unwrap().to_string(), "b");
    }

    #[test]
    fn test_load_form_with_reports_json_errors() {
        let result = load_form_with("{", |_| unreachable!());
        assert!(matches!(result, Err(Error::Definition(DefinitionError::Json { .. }))));
    }
}

/// Form definitions - the JSON description of a form, built into a [`Form`]
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::filter::FilterOptions;
use crate::form::{Form, FormError, FormOptions, NodeRole};
use crate::remote::RemoteEvaluator;
use crate::span::Span;
use crate::widget::{ChoiceOption, Widget, WidgetKind};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FormDefinition {
    /// Seed for random names; random when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    pub parameters: Vec<ParameterDefinition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParameterDefinition {
    pub name: String,
    #[serde(default)]
    pub role: NodeRole,
    pub widget: WidgetDefinition,
    /// Names of the parameters this one reads, in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub random_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<FilterOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluator: Option<EvaluatorDefinition>,
}

/// Initial state of a widget
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WidgetDefinition {
    pub kind: WidgetKind,
    /// Options of choice widgets
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<ChoiceOption>,
    /// Text of text inputs and formatted blocks
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub value: String,
    /// Items of lists, image sources of galleries
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EvaluatorDefinition {
    /// Base URL the operations are posted under
    pub url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DefinitionError {
    Json { message: String, span: Span },
    UnknownReference { parameter: String, reference: String },
    MissingEvaluator { parameter: String },
    InvalidEvaluator { parameter: String, message: String },
    PlainWithReferences { parameter: String },
    Form(FormError),
}

impl std::fmt::Display for DefinitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DefinitionError::Json { message, .. } => write!(f, "Invalid form definition: {}", message),
            DefinitionError::UnknownReference { parameter, reference } => write!(
                f,
                "Parameter '{}' references unknown parameter '{}'",
                parameter, reference
            ),
            DefinitionError::MissingEvaluator { parameter } => {
                write!(f, "Parameter '{}' needs an evaluator", parameter)
            }
            DefinitionError::InvalidEvaluator { parameter, message } => {
                write!(f, "Invalid evaluator for '{}': {}", parameter, message)
            }
            DefinitionError::PlainWithReferences { parameter } => write!(
                f,
                "Parameter '{}' has references but is not a cascade or dynamic reference",
                parameter
            ),
            DefinitionError::Form(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for DefinitionError {}

impl From<FormError> for DefinitionError {
    fn from(e: FormError) -> Self {
        DefinitionError::Form(e)
    }
}

impl DefinitionError {
    /// Location of the error inside `source`, when it can be found
    pub fn span(&self, source: &str) -> Option<Span> {
        match self {
            DefinitionError::Json { span, .. } => Some(*span),
            DefinitionError::UnknownReference { reference, .. } => Span::find_quoted(source, reference),
            DefinitionError::MissingEvaluator { parameter }
            | DefinitionError::InvalidEvaluator { parameter, .. }
            | DefinitionError::PlainWithReferences { parameter } => Span::find_quoted(source, parameter),
            DefinitionError::Form(e) => e.parameter().and_then(|p| Span::find_quoted(source, p)),
        }
    }
}

impl WidgetDefinition {
    pub fn new(kind: WidgetKind) -> Self {
        WidgetDefinition {
            kind,
            options: Vec::new(),
            value: String::new(),
            items: Vec::new(),
        }
    }

    /// Build the widget; radio lists are grouped under `parameter`
    pub fn to_widget(&self, parameter: &str) -> Widget {
        let options = self.options.clone();
        match self.kind {
            WidgetKind::SingleSelect => Widget::single_select(options),
            WidgetKind::MultiSelect => Widget::multi_select(options),
            WidgetKind::CheckboxList => Widget::checkbox_list(options),
            WidgetKind::RadioList => Widget::radio_list(parameter, options),
            WidgetKind::TextInput => Widget::text_input(self.value.as_str()),
            WidgetKind::FormattedHtml => Widget::formatted_html(self.value.as_str()),
            WidgetKind::OrderedList => Widget::ordered_list(self.items.clone()),
            WidgetKind::UnorderedList => Widget::unordered_list(self.items.clone()),
            WidgetKind::ImageGallery => Widget::image_gallery(self.items.clone()),
        }
    }
}

impl FormDefinition {
    /// Parse a JSON form definition
    ///
    /// # Example
    /// ```
    /// use param_cascade::definition::FormDefinition;
    ///
    /// let source = r#"{"parameters": [{"name": "country", "widget": {"kind": "text-input", "value": "Brazil"}}]}"#;
    /// let definition = FormDefinition::from_json(source).unwrap();
    /// assert_eq!(definition.parameters[0].name, "country");
    /// ```
    pub fn from_json(source: &str) -> Result<Self, DefinitionError> {
        serde_json::from_str(source).map_err(|e| DefinitionError::Json {
            message: e.to_string(),
            span: Span::from_line_column(source, e.line(), e.column()),
        })
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Build the form, resolving evaluators with `resolve`
    ///
    /// `resolve` is called once per cascade and dynamic reference, in
    /// declaration order. References to a name declared more than once go to
    /// the first declaration.
    pub fn build_with<F>(&self, mut resolve: F) -> Result<Form, DefinitionError>
    where
        F: FnMut(&ParameterDefinition) -> Result<Arc<dyn RemoteEvaluator>, DefinitionError>,
    {
        let mut options = FormOptions::new();
        if let Some(seed) = self.seed {
            options = options.with_seed(seed);
        }
        let mut form = Form::with_options(options);

        let mut seen = BTreeSet::new();
        let mut ids = Vec::with_capacity(self.parameters.len());
        for parameter in &self.parameters {
            if !seen.insert(parameter.name.as_str()) {
                log::warn!(
                    "Parameter {} is declared more than once; references resolve to the first one",
                    parameter.name
                );
            }
            if !parameter.role.is_remote() && !parameter.references.is_empty() {
                return Err(DefinitionError::PlainWithReferences {
                    parameter: parameter.name.clone(),
                });
            }
            let evaluator = if parameter.role.is_remote() {
                Some(resolve(parameter)?)
            } else {
                None
            };
            ids.push(form.insert_node(
                parameter.name.clone(),
                parameter.role,
                Some(parameter.widget.to_widget(&parameter.name)),
                evaluator,
                parameter.random_name.clone(),
            ));
        }

        for (parameter, id) in self.parameters.iter().zip(ids.iter().copied()) {
            for reference in &parameter.references {
                let upstream = form.find(reference).ok_or_else(|| DefinitionError::UnknownReference {
                    parameter: parameter.name.clone(),
                    reference: reference.clone(),
                })?;
                form.reference(id, upstream)?;
            }
            if let Some(filter) = &parameter.filter {
                form.attach_filter(id, filter.clone())?;
            }
        }

        Ok(form)
    }

    /// Build the form with an HTTP evaluator per remote parameter
    #[cfg(feature = "http")]
    pub fn build(&self) -> Result<Form, DefinitionError> {
        self.build_with(|parameter| {
            let definition = parameter
                .evaluator
                .as_ref()
                .ok_or_else(|| DefinitionError::MissingEvaluator {
                    parameter: parameter.name.clone(),
                })?;
            let evaluator = crate::remote::HttpEvaluator::new(&definition.url).map_err(|e| {
                DefinitionError::InvalidEvaluator {
                    parameter: parameter.name.clone(),
                    message: e.to_string(),
                }
            })?;
            Ok(Arc::new(evaluator) as Arc<dyn RemoteEvaluator>)
        })
    }
}

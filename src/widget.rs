/// Widget model - the tagged variants a parameter control can take
use serde::{Deserialize, Serialize};

use crate::protocol::ParameterValue;

/// Marker name carried by the radio option whose value is submitted
pub const SUBMIT_MARKER: &str = "value";

/// Kinds of controls participating in the dependency graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WidgetKind {
    SingleSelect,
    MultiSelect,
    CheckboxList,
    RadioList,
    TextInput,
    FormattedHtml,
    OrderedList,
    UnorderedList,
    ImageGallery,
}

impl WidgetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WidgetKind::SingleSelect => "single-select",
            WidgetKind::MultiSelect => "multi-select",
            WidgetKind::CheckboxList => "checkbox-list",
            WidgetKind::RadioList => "radio-list",
            WidgetKind::TextInput => "text-input",
            WidgetKind::FormattedHtml => "formatted-html",
            WidgetKind::OrderedList => "ordered-list",
            WidgetKind::UnorderedList => "unordered-list",
            WidgetKind::ImageGallery => "image-gallery",
        }
    }

    /// Kinds rendered from a value set with selection state
    pub fn is_choice(&self) -> bool {
        matches!(
            self,
            WidgetKind::SingleSelect
                | WidgetKind::MultiSelect
                | WidgetKind::CheckboxList
                | WidgetKind::RadioList
        )
    }

    /// Kinds a dynamic reference parameter can render
    pub fn is_render_only(&self) -> bool {
        !self.is_choice()
    }
}

impl std::fmt::Display for WidgetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One option of a select, checkbox list or radio list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceOption {
    /// Element id, unique within the widget
    #[serde(default)]
    pub id: String,
    /// Backing key submitted as the parameter value
    pub key: String,
    /// Display text
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub selected: bool,
    #[serde(default)]
    pub disabled: bool,
    /// Submission marker (radio lists only)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub marker: String,
}

impl ChoiceOption {
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        ChoiceOption {
            key: key.into(),
            label: label.into(),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    /// Label shown to the user; falls back to the key
    pub fn display_label(&self) -> &str {
        if self.label.is_empty() {
            &self.key
        } else {
            &self.label
        }
    }

    /// Text a filter query is matched against
    pub fn match_text(&self) -> &str {
        self.display_label()
    }

    /// Value submitted for this option; falls back to the label
    pub fn submitted_value(&self) -> &str {
        if self.key.is_empty() {
            &self.label
        } else {
            &self.key
        }
    }
}

/// A link + image pair in an image gallery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GalleryImage {
    pub href: String,
    pub src: String,
}

impl GalleryImage {
    pub fn new(source: impl Into<String>) -> Self {
        let src = source.into();
        GalleryImage {
            href: src.clone(),
            src,
        }
    }
}

/// A parameter control and exactly the state relevant to its kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Widget {
    Select {
        multiple: bool,
        options: Vec<ChoiceOption>,
        #[serde(skip_serializing_if = "Option::is_none")]
        visible_rows: Option<usize>,
    },
    CheckboxList {
        options: Vec<ChoiceOption>,
        #[serde(skip_serializing_if = "Option::is_none")]
        height_px: Option<u32>,
    },
    RadioList {
        /// Class shared by every option of the group
        group: String,
        options: Vec<ChoiceOption>,
        #[serde(skip_serializing_if = "Option::is_none")]
        height_px: Option<u32>,
    },
    TextInput {
        value: String,
    },
    FormattedHtml {
        content: String,
    },
    List {
        ordered: bool,
        items: Vec<String>,
    },
    Gallery {
        images: Vec<GalleryImage>,
    },
}

impl Widget {
    pub fn single_select(options: Vec<ChoiceOption>) -> Self {
        Widget::Select {
            multiple: false,
            options,
            visible_rows: None,
        }
    }

    pub fn multi_select(options: Vec<ChoiceOption>) -> Self {
        Widget::Select {
            multiple: true,
            options,
            visible_rows: None,
        }
    }

    pub fn checkbox_list(options: Vec<ChoiceOption>) -> Self {
        Widget::CheckboxList {
            options,
            height_px: None,
        }
    }

    pub fn radio_list(group: impl Into<String>, options: Vec<ChoiceOption>) -> Self {
        Widget::RadioList {
            group: group.into(),
            options,
            height_px: None,
        }
    }

    pub fn text_input(value: impl Into<String>) -> Self {
        Widget::TextInput {
            value: value.into(),
        }
    }

    pub fn formatted_html(content: impl Into<String>) -> Self {
        Widget::FormattedHtml {
            content: content.into(),
        }
    }

    pub fn ordered_list(items: Vec<String>) -> Self {
        Widget::List {
            ordered: true,
            items,
        }
    }

    pub fn unordered_list(items: Vec<String>) -> Self {
        Widget::List {
            ordered: false,
            items,
        }
    }

    pub fn image_gallery(sources: Vec<String>) -> Self {
        Widget::Gallery {
            images: sources.into_iter().map(GalleryImage::new).collect(),
        }
    }

    pub fn kind(&self) -> WidgetKind {
        match self {
            Widget::Select { multiple: false, .. } => WidgetKind::SingleSelect,
            Widget::Select { multiple: true, .. } => WidgetKind::MultiSelect,
            Widget::CheckboxList { .. } => WidgetKind::CheckboxList,
            Widget::RadioList { .. } => WidgetKind::RadioList,
            Widget::TextInput { .. } => WidgetKind::TextInput,
            Widget::FormattedHtml { .. } => WidgetKind::FormattedHtml,
            Widget::List { ordered: true, .. } => WidgetKind::OrderedList,
            Widget::List { ordered: false, .. } => WidgetKind::UnorderedList,
            Widget::Gallery { .. } => WidgetKind::ImageGallery,
        }
    }

    /// Options of a choice widget, `None` for other kinds
    pub fn choice_options(&self) -> Option<&[ChoiceOption]> {
        match self {
            Widget::Select { options, .. }
            | Widget::CheckboxList { options, .. }
            | Widget::RadioList { options, .. } => Some(options),
            _ => None,
        }
    }

    pub fn choice_options_mut(&mut self) -> Option<&mut Vec<ChoiceOption>> {
        match self {
            Widget::Select { options, .. }
            | Widget::CheckboxList { options, .. }
            | Widget::RadioList { options, .. } => Some(options),
            _ => None,
        }
    }

    /// Replace the visible options with already materialized ones
    ///
    /// Returns `false` when the widget has no options.
    pub fn replace_options(&mut self, options: Vec<ChoiceOption>) -> bool {
        match self.choice_options_mut() {
            Some(current) => {
                *current = options;
                true
            }
            None => false,
        }
    }

    /// Number of visible entries, whatever the kind
    pub fn len(&self) -> usize {
        match self {
            Widget::Select { options, .. }
            | Widget::CheckboxList { options, .. }
            | Widget::RadioList { options, .. } => options.len(),
            Widget::List { items, .. } => items.len(),
            Widget::Gallery { images } => images.len(),
            Widget::TextInput { value } => usize::from(!value.is_empty()),
            Widget::FormattedHtml { content } => usize::from(!content.is_empty()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The value submitted for this control
    ///
    /// Selects yield their selected keys, checkbox lists their checked keys,
    /// radio lists the key carrying the submission marker and text inputs their
    /// text. Render-only kinds have no value.
    pub fn parameter_value(&self) -> ParameterValue {
        match self {
            Widget::Select {
                multiple: true,
                options,
                ..
            } => ParameterValue::Multiple(
                options
                    .iter()
                    .filter(|o| o.selected)
                    .map(|o| o.submitted_value().to_string())
                    .collect(),
            ),
            Widget::Select { options, .. } => options
                .iter()
                .find(|o| o.selected)
                .map(|o| ParameterValue::from(o.submitted_value()))
                .unwrap_or_else(ParameterValue::empty),
            Widget::CheckboxList { options, .. } => ParameterValue::Multiple(
                options
                    .iter()
                    .filter(|o| o.selected && !o.key.is_empty())
                    .map(|o| o.key.clone())
                    .collect(),
            ),
            Widget::RadioList { options, .. } => options
                .iter()
                .find(|o| o.marker == SUBMIT_MARKER)
                .map(|o| ParameterValue::from(o.key.as_str()))
                .unwrap_or_else(ParameterValue::empty),
            Widget::TextInput { value } => ParameterValue::from(value.as_str()),
            Widget::FormattedHtml { .. } | Widget::List { .. } | Widget::Gallery { .. } => {
                ParameterValue::empty()
            }
        }
    }

    /// Select the options whose keys are listed, deselecting the rest
    ///
    /// Single selects and radio lists keep only the first match. Returns the
    /// number of options left selected.
    pub fn select_keys(&mut self, keys: &[&str]) -> usize {
        let single = matches!(
            self,
            Widget::Select {
                multiple: false,
                ..
            } | Widget::RadioList { .. }
        );
        let is_radio = matches!(self, Widget::RadioList { .. });
        let Some(options) = self.choice_options_mut() else {
            return 0;
        };

        let mut count = 0;
        for option in options.iter_mut() {
            let wanted = keys.contains(&option.submitted_value()) && !(single && count > 0);
            option.selected = wanted;
            if is_radio {
                option.marker = if wanted {
                    SUBMIT_MARKER.to_string()
                } else {
                    String::new()
                };
            }
            if wanted {
                count += 1;
            }
        }
        count
    }

    /// Set the checked state of one option, identified by key
    pub fn set_checked(&mut self, key: &str, checked: bool) -> bool {
        if let Widget::RadioList { options, .. } = self {
            if !options.iter().any(|o| o.key == key) {
                return false;
            }
            for option in options.iter_mut() {
                if option.key == key {
                    option.selected = checked;
                    option.marker = if checked {
                        SUBMIT_MARKER.to_string()
                    } else {
                        String::new()
                    };
                } else if checked {
                    option.selected = false;
                    option.marker.clear();
                }
            }
            return true;
        }

        let multiple = !matches!(
            self,
            Widget::Select {
                multiple: false,
                ..
            }
        );
        let Some(options) = self.choice_options_mut() else {
            return false;
        };
        if !options.iter().any(|o| o.key == key) {
            return false;
        }
        for option in options.iter_mut() {
            if option.key == key {
                option.selected = checked;
            } else if !multiple && checked {
                option.selected = false;
            }
        }
        true
    }

    /// Replace the text of a text input
    pub fn set_text(&mut self, text: impl Into<String>) -> bool {
        match self {
            Widget::TextInput { value } => {
                *value = text.into();
                true
            }
            _ => false,
        }
    }

    /// Apply a user supplied value: text for text inputs, comma separated keys
    /// for choice widgets
    pub fn apply_value(&mut self, value: &str) -> bool {
        match self {
            Widget::TextInput { .. } => self.set_text(value),
            Widget::Select { .. } | Widget::CheckboxList { .. } | Widget::RadioList { .. } => {
                let keys: Vec<&str> = value
                    .split(',')
                    .map(str::trim)
                    .filter(|k| !k.is_empty())
                    .collect();
                self.select_keys(&keys);
                true
            }
            _ => false,
        }
    }

    /// Give the submission marker to option `id` of radio group `group`
    ///
    /// Every other option of the group loses the marker. Returns `true` when
    /// this widget is a radio list of that group.
    pub fn select_radio(&mut self, group: &str, id: &str) -> bool {
        match self {
            Widget::RadioList {
                group: own_group,
                options,
                ..
            } if own_group == group => {
                for option in options.iter_mut() {
                    let chosen = option.id == id;
                    option.selected = chosen;
                    option.marker = if chosen {
                        SUBMIT_MARKER.to_string()
                    } else {
                        String::new()
                    };
                }
                true
            }
            _ => false,
        }
    }
}

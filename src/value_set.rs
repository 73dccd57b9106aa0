/// Value sets returned by remote evaluators and the selection marker convention
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Suffix flagging a display value or key as pre-selected
pub const SELECTED_MARKER: &str = ":selected";

/// Display values and backing keys, index aligned
///
/// Index `i` of `values` and index `i` of `keys` always describe the same option.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueSet {
    pub values: Vec<String>,
    pub keys: Vec<String>,
}

/// A value set with selection markers removed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Choices {
    pub values: Vec<String>,
    pub keys: Vec<String>,
    /// Indices that carried the selection marker on either side
    pub selected: BTreeSet<usize>,
}

impl ValueSet {
    pub fn new(values: Vec<String>, keys: Vec<String>) -> Self {
        ValueSet { values, keys }
    }

    /// Build a value set where every entry is its own key
    pub fn from_values<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values: Vec<String> = values.into_iter().map(Into::into).collect();
        ValueSet {
            keys: values.clone(),
            values,
        }
    }

    /// Build a value set from `(key, display value)` pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let (keys, values): (Vec<String>, Vec<String>) = pairs
            .into_iter()
            .map(|(k, v)| -> (String, String) { (k.into(), v.into()) })
            .unzip();
        ValueSet { values, keys }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Remove the selection marker from both sequences
    ///
    /// An index is recorded as selected when either its value or its key ends
    /// with the marker. A key missing for some index falls back to the value.
    pub fn strip_selection_markers(&self) -> Choices {
        let mut choices = Choices::default();
        for (index, raw_value) in self.values.iter().enumerate() {
            let raw_key = self.keys.get(index).unwrap_or(raw_value);
            let (value, value_marked) = strip_marker(raw_value);
            let (key, key_marked) = strip_marker(raw_key);
            if value_marked || key_marked {
                choices.selected.insert(index);
            }
            choices.values.push(value.to_string());
            choices.keys.push(key.to_string());
        }
        choices
    }
}

impl Choices {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_selected(&self, index: usize) -> bool {
        self.selected.contains(&index)
    }
}

/// Cut a marked entry at the first occurrence of the marker
fn strip_marker(text: &str) -> (&str, bool) {
    if !text.ends_with(SELECTED_MARKER) {
        return (text, false);
    }
    match text.find(SELECTED_MARKER) {
        Some(at) => (&text[..at], true),
        None => (text, false),
    }
}

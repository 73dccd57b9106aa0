/// Client side filtering of choice widgets
use serde::{Deserialize, Serialize};

use crate::widget::{ChoiceOption, Widget, WidgetKind, SUBMIT_MARKER};

/// Behaviour of a filter attached to a choice widget
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOptions {
    /// Non-empty queries shorter than this leave every option visible
    #[serde(default)]
    pub min_length: usize,
    /// Notify observers when filtering changes the submitted value
    #[serde(default)]
    pub propagate_changes: bool,
}

impl FilterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min_length(mut self, min_length: usize) -> Self {
        self.min_length = min_length;
        self
    }

    pub fn with_propagation(mut self, propagate: bool) -> Self {
        self.propagate_changes = propagate;
        self
    }
}

/// Result of applying a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum FilterOutcome {
    Filtered { visible: usize, total: usize },
    /// Query too short; the full snapshot is shown
    BelowMinimum { total: usize },
    /// The widget has no options to filter
    Unsupported,
    /// The widget is gone
    Detached,
}

/// Snapshot of every option plus the current query
///
/// The snapshot is never narrowed by a query; only a re-render replaces it.
#[derive(Debug, Clone, Default)]
pub struct FilterOverlay {
    options: FilterOptions,
    snapshot: Vec<ChoiceOption>,
    query: String,
}

impl FilterOverlay {
    pub fn new(options: FilterOptions) -> Self {
        FilterOverlay {
            options,
            ..Default::default()
        }
    }

    /// Take the current options of `widget` as the snapshot
    pub fn capture(widget: &Widget, options: FilterOptions) -> Self {
        FilterOverlay {
            options,
            snapshot: widget
                .choice_options()
                .map(<[ChoiceOption]>::to_vec)
                .unwrap_or_default(),
            query: String::new(),
        }
    }

    pub fn options(&self) -> &FilterOptions {
        &self.options
    }

    pub fn snapshot(&self) -> &[ChoiceOption] {
        &self.snapshot
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Replace the snapshot after a re-render; the query is cleared
    pub fn set_snapshot(&mut self, snapshot: Vec<ChoiceOption>) {
        self.snapshot = snapshot;
        self.clear_query();
    }

    pub fn clear_query(&mut self) {
        self.query.clear();
    }

    /// Snapshot entries whose text contains `query`, case-insensitively
    pub fn matching(&self, query: &str) -> Vec<ChoiceOption> {
        let needle = query.to_lowercase();
        self.snapshot
            .iter()
            .filter(|o| o.match_text().to_lowercase().contains(&needle))
            .cloned()
            .collect()
    }

    /// Show the snapshot entries matching `query` in `widget`
    pub fn apply(&mut self, widget: &mut Widget, query: &str) -> FilterOutcome {
        let exclusive = matches!(widget.kind(), WidgetKind::SingleSelect | WidgetKind::RadioList);
        let Some(visible) = widget.choice_options() else {
            return FilterOutcome::Unsupported;
        };
        self.remember_state(visible, exclusive);
        self.query = query.to_string();

        let total = self.snapshot.len();
        if !query.is_empty() && query.chars().count() < self.options.min_length {
            widget.replace_options(self.snapshot.clone());
            return FilterOutcome::BelowMinimum { total };
        }

        let shown = self.matching(query);
        let count = shown.len();
        widget.replace_options(shown);
        FilterOutcome::Filtered {
            visible: count,
            total,
        }
    }

    /// Copy selection state of the visible options back into the snapshot
    ///
    /// For `exclusive` widgets a visible selection clears any hidden one.
    fn remember_state(&mut self, visible: &[ChoiceOption], exclusive: bool) {
        let chosen = visible
            .iter()
            .any(|o| o.selected || o.marker == SUBMIT_MARKER);
        if exclusive && chosen {
            for entry in self.snapshot.iter_mut() {
                if !visible.iter().any(|o| o.id == entry.id) {
                    entry.selected = false;
                    entry.marker.clear();
                }
            }
        }
        for option in visible {
            if let Some(entry) = self.snapshot.iter_mut().find(|e| e.id == option.id) {
                entry.selected = option.selected;
                entry.marker.clone_from(&option.marker);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> Widget {
        let names = [
            "Bruno", "Nuno", "Alice", "Carla", "Diego", "Elena", "Fabio", "Gina",
        ];
        Widget::single_select(
            names
                .iter()
                .enumerate()
                .map(|(i, n)| ChoiceOption::new(*n, *n).with_id(format!("o{}", i)))
                .collect(),
        )
    }

    #[test]
    fn test_filter_and_clear() {
        let mut widget = names();
        let mut overlay = FilterOverlay::capture(&widget, FilterOptions::new());

        let outcome = overlay.apply(&mut widget, "uno");
        assert_eq!(outcome, FilterOutcome::Filtered { visible: 2, total: 8 });
        assert_eq!(widget.len(), 2);

        overlay.apply(&mut widget, "");
        assert_eq!(widget.len(), 8);
        assert_eq!(overlay.snapshot().len(), 8);
    }

    #[test]
    fn test_filter_is_case_insensitive() {
        let mut widget = names();
        let mut overlay = FilterOverlay::capture(&widget, FilterOptions::new());
        overlay.apply(&mut widget, "BRU");
        assert_eq!(widget.len(), 1);
    }

    #[test]
    fn test_min_length() {
        let mut widget = names();
        let mut overlay = FilterOverlay::capture(&widget, FilterOptions::new().with_min_length(4));
        assert_eq!(
            overlay.apply(&mut widget, "uno"),
            FilterOutcome::BelowMinimum { total: 8 }
        );
        assert_eq!(widget.len(), 8);
        overlay.apply(&mut widget, "Nuno");
        assert_eq!(widget.len(), 1);
    }

    #[test]
    fn test_selection_survives_filtering() {
        let mut widget = names();
        let mut overlay = FilterOverlay::capture(&widget, FilterOptions::new());
        overlay.apply(&mut widget, "uno");
        widget.select_keys(&["Nuno"]);
        overlay.apply(&mut widget, "");
        assert_eq!(widget.parameter_value().to_string(), "Nuno");
    }

    #[test]
    fn test_visible_choice_replaces_hidden_selection() {
        let mut widget = Widget::radio_list(
            "names",
            vec![
                ChoiceOption::new("Alice", "Alice").with_id("r0").selected(true),
                ChoiceOption::new("Bruno", "Bruno").with_id("r1"),
                ChoiceOption::new("Nuno", "Nuno").with_id("r2"),
            ],
        );
        widget.select_radio("names", "r0");
        let mut overlay = FilterOverlay::capture(&widget, FilterOptions::new());
        overlay.apply(&mut widget, "uno");
        widget.select_radio("names", "r2");
        overlay.apply(&mut widget, "");

        assert_eq!(widget.parameter_value().to_string(), "Nuno");
        let options = widget.choice_options().unwrap();
        assert_eq!(options.iter().filter(|o| o.selected).count(), 1);
        assert_eq!(options.iter().filter(|o| o.marker == SUBMIT_MARKER).count(), 1);
    }

    #[test]
    fn test_set_snapshot_clears_query() {
        let mut widget = names();
        let mut overlay = FilterOverlay::capture(&widget, FilterOptions::new());
        overlay.apply(&mut widget, "x");
        overlay.set_snapshot(vec![ChoiceOption::new("a", "A")]);
        assert_eq!(overlay.query(), "");
        assert_eq!(overlay.snapshot().len(), 1);
    }

    #[test]
    fn test_unsupported_widget() {
        let mut widget = Widget::text_input("x");
        let mut overlay = FilterOverlay::new(FilterOptions::new());
        assert_eq!(overlay.apply(&mut widget, "x"), FilterOutcome::Unsupported);
    }
}

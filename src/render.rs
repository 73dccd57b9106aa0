/// Rendering fetched results into widgets
use serde::{Deserialize, Serialize};

use crate::value_set::Choices;
use crate::widget::{ChoiceOption, GalleryImage, Widget, WidgetKind, SUBMIT_MARKER};

/// Rows shown by a multi-select before it scrolls
pub const MAX_VISIBLE_ROWS: usize = 10;

/// Height of one checkbox or radio row, in pixels
pub const ROW_HEIGHT_PX: u32 = 23;

/// Names needed to render options for one parameter
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    /// Parameter name, used as the radio group
    pub parameter_name: &'a str,
    /// Per-instance random name, used in element ids
    pub random_name: &'a str,
}

/// What a render did to a widget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum RenderOutcome {
    Rendered { items: usize },
    /// The widget kind cannot show this kind of result; nothing changed
    Unsupported { kind: WidgetKind },
    /// The widget is gone; nothing rendered
    Detached,
}

/// Element id of option `index`: `ecp_<random name>_<index>`, spaces replaced
pub fn element_id(random_name: &str, index: usize) -> String {
    format!("ecp_{}_{}", random_name, index).replace(' ', "_")
}

/// Visible rows of a multi-select holding `count` options
pub fn visible_rows(count: usize) -> usize {
    count.min(MAX_VISIBLE_ROWS)
}

/// Height of a checkbox or radio list holding `count` options
pub fn list_height(count: usize) -> u32 {
    ROW_HEIGHT_PX * visible_rows(count) as u32
}

/// Replace the options of a choice widget with `choices`
///
/// Every previous option is discarded. Single selects and radio lists keep only
/// the last pre-selected option. Non-choice widgets are left untouched.
pub fn render_choices(widget: &mut Widget, choices: &Choices, ctx: &RenderContext) -> RenderOutcome {
    let kind = widget.kind();
    if !kind.is_choice() {
        return RenderOutcome::Unsupported { kind };
    }

    let mut options: Vec<ChoiceOption> = choices
        .values
        .iter()
        .zip(choices.keys.iter())
        .enumerate()
        .map(|(index, (value, key))| {
            ChoiceOption::new(key.as_str(), value.as_str())
                .with_id(element_id(ctx.random_name, index))
                .selected(choices.is_selected(index))
        })
        .collect();
    let count = options.len();

    if matches!(kind, WidgetKind::SingleSelect | WidgetKind::RadioList) {
        if let Some(last) = choices.selected.iter().next_back().copied() {
            for (index, option) in options.iter_mut().enumerate() {
                option.selected = index == last;
            }
        }
    }

    match widget {
        Widget::Select {
            multiple,
            options: current,
            visible_rows: rows,
        } => {
            *rows = if *multiple {
                Some(visible_rows(count))
            } else {
                None
            };
            *current = options;
        }
        Widget::CheckboxList {
            options: current,
            height_px,
        } => {
            *height_px = Some(list_height(count));
            *current = options;
        }
        Widget::RadioList {
            group,
            options: current,
            height_px,
        } => {
            for option in options.iter_mut().filter(|o| o.selected) {
                option.marker = SUBMIT_MARKER.to_string();
            }
            *group = ctx.parameter_name.to_string();
            *height_px = Some(list_height(count));
            *current = options;
        }
        _ => return RenderOutcome::Unsupported { kind },
    }

    RenderOutcome::Rendered { items: count }
}

/// Replace the items of a list or the images of a gallery, verbatim
pub fn render_items(widget: &mut Widget, items: &[String]) -> RenderOutcome {
    match widget {
        Widget::List { items: current, .. } => {
            *current = items.to_vec();
            RenderOutcome::Rendered { items: items.len() }
        }
        Widget::Gallery { images } => {
            *images = items.iter().cloned().map(GalleryImage::new).collect();
            RenderOutcome::Rendered { items: items.len() }
        }
        other => RenderOutcome::Unsupported { kind: other.kind() },
    }
}

/// Replace the value of a text input or the content of a formatted block
pub fn render_text(widget: &mut Widget, text: &str) -> RenderOutcome {
    match widget {
        Widget::TextInput { value } => {
            *value = text.to_string();
            RenderOutcome::Rendered { items: 1 }
        }
        Widget::FormattedHtml { content } => {
            *content = text.to_string();
            RenderOutcome::Rendered { items: 1 }
        }
        other => RenderOutcome::Unsupported { kind: other.kind() },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_set::ValueSet;

    fn ctx() -> RenderContext<'static> {
        RenderContext {
            parameter_name: "myClazz",
            random_name: "choice parameter 42",
        }
    }

    fn countries() -> Choices {
        ValueSet::from_pairs([
            ("br", "Brazil"),
            ("ar:selected", "Argentina"),
            ("cl", "Chile:selected"),
        ])
        .strip_selection_markers()
    }

    #[test]
    fn test_element_id_replaces_spaces() {
        assert_eq!(element_id("choice parameter 42", 3), "ecp_choice_parameter_42_3");
    }

    #[test]
    fn test_sizing() {
        assert_eq!(visible_rows(3), 3);
        assert_eq!(visible_rows(40), 10);
        assert_eq!(list_height(2), 46);
        assert_eq!(list_height(12), 230);
    }

    #[test]
    fn test_render_multi_select() {
        let mut widget = Widget::multi_select(vec![ChoiceOption::new("old", "Old")]);
        let outcome = render_choices(&mut widget, &countries(), &ctx());
        assert_eq!(outcome, RenderOutcome::Rendered { items: 3 });

        let Widget::Select {
            options,
            visible_rows,
            ..
        } = &widget
        else {
            panic!("expected a select");
        };
        assert_eq!(*visible_rows, Some(3));
        assert_eq!(options[0].id, "ecp_choice_parameter_42_0");
        assert_eq!(options[1].key, "ar");
        assert_eq!(options[2].label, "Chile");
        assert_eq!(widget.parameter_value().to_string(), "ar,cl");
    }

    #[test]
    fn test_render_single_select_keeps_last_selected() {
        let mut widget = Widget::single_select(vec![]);
        render_choices(&mut widget, &countries(), &ctx());
        assert_eq!(widget.parameter_value().to_string(), "cl");
    }

    #[test]
    fn test_render_radio_list() {
        let mut widget = Widget::radio_list("", vec![]);
        let set = ValueSet::from_values(["a", "b:selected"]);
        render_choices(&mut widget, &set.strip_selection_markers(), &ctx());

        let Widget::RadioList {
            group,
            options,
            height_px,
        } = &widget
        else {
            panic!("expected a radio list");
        };
        assert_eq!(group, "myClazz");
        assert_eq!(*height_px, Some(46));
        assert_eq!(options[1].marker, SUBMIT_MARKER);
        assert!(options[0].marker.is_empty());
        assert_eq!(widget.parameter_value().to_string(), "b");
    }

    #[test]
    fn test_render_checkboxes() {
        let mut widget = Widget::checkbox_list(vec![]);
        render_choices(&mut widget, &countries(), &ctx());
        assert_eq!(widget.len(), 3);
        assert_eq!(widget.parameter_value().to_string(), "ar,cl");
    }

    #[test]
    fn test_render_choices_on_text_is_unsupported() {
        let mut widget = Widget::text_input("keep");
        let outcome = render_choices(&mut widget, &countries(), &ctx());
        assert_eq!(
            outcome,
            RenderOutcome::Unsupported {
                kind: WidgetKind::TextInput
            }
        );
        assert_eq!(widget, Widget::text_input("keep"));
    }

    #[test]
    fn test_render_items_and_text() {
        let mut list = Widget::ordered_list(vec![]);
        let items = vec!["a:selected".to_string(), "b".to_string()];
        assert_eq!(render_items(&mut list, &items), RenderOutcome::Rendered { items: 2 });
        assert_eq!(list, Widget::ordered_list(items.clone()));

        let mut gallery = Widget::image_gallery(vec![]);
        render_items(&mut gallery, &items);
        assert_eq!(gallery.len(), 2);

        let mut html = Widget::formatted_html("");
        render_text(&mut html, "<b>hi</b>");
        assert_eq!(html, Widget::formatted_html("<b>hi</b>"));
        assert!(matches!(
            render_text(&mut list, "x"),
            RenderOutcome::Unsupported { .. }
        ));
    }
}

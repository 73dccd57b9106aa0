/// Tests for widget rendering and serialization
use param_cascade::render::{render_choices, RenderContext, RenderOutcome};
use param_cascade::value_set::ValueSet;
use param_cascade::widget::SUBMIT_MARKER;
use param_cascade::{ChoiceOption, Widget, WidgetKind};
use serde_json::json;

fn ctx() -> RenderContext<'static> {
    RenderContext {
        parameter_name: "myClazz",
        random_name: "choice-parameter-1",
    }
}

#[test]
fn test_each_choice_kind_renders_every_entry() {
    let values: Vec<String> = (0..12).map(|i| format!("v{}", i)).collect();
    let choices = ValueSet::from_values(values).strip_selection_markers();

    for mut widget in [
        Widget::single_select(vec![]),
        Widget::multi_select(vec![]),
        Widget::checkbox_list(vec![]),
        Widget::radio_list("", vec![]),
    ] {
        let outcome = render_choices(&mut widget, &choices, &ctx());
        assert_eq!(outcome, RenderOutcome::Rendered { items: 12 }, "{}", widget.kind());
        assert_eq!(widget.len(), 12);
    }
}

#[test]
fn test_sizes_are_capped() {
    let choices = ValueSet::from_values((0..12).map(|i| i.to_string())).strip_selection_markers();

    let mut select = Widget::multi_select(vec![]);
    render_choices(&mut select, &choices, &ctx());
    let Widget::Select { visible_rows, .. } = select else {
        panic!("expected a select");
    };
    assert_eq!(visible_rows, Some(10));

    let mut checkboxes = Widget::checkbox_list(vec![]);
    render_choices(&mut checkboxes, &choices, &ctx());
    let Widget::CheckboxList { height_px, .. } = checkboxes else {
        panic!("expected a checkbox list");
    };
    assert_eq!(height_px, Some(230));
}

#[test]
fn test_radio_group_and_marker() {
    let choices = ValueSet::from_pairs([("1", "One"), ("2:selected", "Two")]).strip_selection_markers();
    let mut widget = Widget::radio_list("", vec![]);
    render_choices(&mut widget, &choices, &ctx());

    assert!(widget.select_radio("myClazz", "ecp_choice-parameter-1_0"));
    let options = widget.choice_options().unwrap();
    assert_eq!(options[0].marker, SUBMIT_MARKER);
    assert!(options[1].marker.is_empty());
    assert_eq!(widget.parameter_value().to_string(), "1");
}

#[test]
fn test_rerender_discards_previous_options() {
    let mut widget = Widget::single_select(vec![
        ChoiceOption::new("old", "Old").selected(true),
        ChoiceOption::new("older", "Older"),
    ]);
    let choices = ValueSet::from_values(["new"]).strip_selection_markers();
    render_choices(&mut widget, &choices, &ctx());

    assert_eq!(widget.len(), 1);
    assert_eq!(widget.parameter_value().to_string(), "");
}

#[test]
fn test_widget_serialization() {
    let widget = Widget::radio_list(
        "myClazz",
        vec![ChoiceOption::new("1", "One").with_id("r1").selected(true)],
    );
    assert_eq!(
        serde_json::to_value(&widget).unwrap(),
        json!({
            "kind": "radio-list",
            "group": "myClazz",
            "options": [{"id": "r1", "key": "1", "label": "One", "selected": true, "disabled": false}]
        })
    );

    let gallery = Widget::image_gallery(vec!["a.png".into()]);
    assert_eq!(
        serde_json::to_value(&gallery).unwrap(),
        json!({"kind": "gallery", "images": [{"href": "a.png", "src": "a.png"}]})
    );
}

#[test]
fn test_kind_names() {
    assert_eq!(
        serde_json::to_value(WidgetKind::FormattedHtml).unwrap(),
        json!("formatted-html")
    );
    let kind: WidgetKind = serde_json::from_value(json!("multi-select")).unwrap();
    assert_eq!(kind, WidgetKind::MultiSelect);
    assert_eq!(kind.to_string(), "multi-select");
}

/// Diagnostic reporting using ariadne for readable error messages
use crate::definition::DefinitionError;
use crate::form::FormError;
use crate::protocol::DecodeError;
use crate::remote::TransportError;
use crate::span::Span;
use ariadne::{Color, Label, Report, ReportKind, Source};

fn render<'a>(
    source_name: &'a str,
    source: &str,
    report: Report<'_, (&'a str, std::ops::Range<usize>)>,
) -> String {
    let mut output = Vec::new();
    if let Err(e) = report.write((source_name, Source::from(source)), &mut output) {
        return format!("Failed to write diagnostic: {}", e);
    }
    String::from_utf8_lossy(&output).into_owned()
}

/// Clamp a span so it always labels something inside `source`
fn label_range(source: &str, span: Span) -> std::ops::Range<usize> {
    let start = span.start.min(source.len().saturating_sub(1));
    let end = span.end.clamp(start, source.len()).max((start + 1).min(source.len()));
    start..end
}

/// Report a form definition error
pub fn report_definition_error(source_name: &str, source: &str, error: &DefinitionError) -> String {
    let span = error.span(source).unwrap_or_else(Span::dummy);
    let range = label_range(source, span);

    let builder = Report::build(ReportKind::Error, source_name, range.start).with_message(error.to_string());
    let report = match error {
        DefinitionError::Json { message, .. } => builder
            .with_label(
                Label::new((source_name, range))
                    .with_message(message)
                    .with_color(Color::Red),
            )
            .with_note("A form definition is a JSON object with a \"parameters\" array")
            .finish(),
        DefinitionError::UnknownReference { reference, .. } => builder
            .with_label(
                Label::new((source_name, range))
                    .with_message(format!("no parameter is named '{}'", reference))
                    .with_color(Color::Red),
            )
            .with_help(format!("Declare '{}' or fix the reference", reference))
            .finish(),
        DefinitionError::MissingEvaluator { parameter } => builder
            .with_label(
                Label::new((source_name, range))
                    .with_message(format!("'{}' has no evaluator", parameter))
                    .with_color(Color::Red),
            )
            .with_help("Add an \"evaluator\": {\"url\": ...} entry")
            .finish(),
        DefinitionError::InvalidEvaluator { message, .. } => builder
            .with_label(
                Label::new((source_name, range))
                    .with_message(message)
                    .with_color(Color::Red),
            )
            .finish(),
        DefinitionError::PlainWithReferences { .. } => builder
            .with_label(
                Label::new((source_name, range))
                    .with_message("plain parameters cannot reference others")
                    .with_color(Color::Red),
            )
            .with_help("Set \"role\" to \"cascade\" or \"dynamic-reference\"")
            .finish(),
        DefinitionError::Form(e) => builder
            .with_label(
                Label::new((source_name, range))
                    .with_message(e.to_string())
                    .with_color(Color::Red),
            )
            .finish(),
    };

    render(source_name, source, report)
}

/// Report a response body that could not be decoded
///
/// The body itself is the source the labels point into.
pub fn report_decode_error(source_name: &str, error: &DecodeError) -> String {
    let body = error.body().unwrap_or_default();
    let report = match error {
        DecodeError::InvalidJson { message, span, .. } => {
            let range = label_range(body, *span);
            Report::build(ReportKind::Error, source_name, range.start)
                .with_message(error.to_string())
                .with_label(
                    Label::new((source_name, range))
                        .with_message(message)
                        .with_color(Color::Red),
                )
                .finish()
        }
        DecodeError::UnexpectedShape { expected, .. } => {
            let range = label_range(body, Span::new(0, body.len()));
            Report::build(ReportKind::Error, source_name, 0)
                .with_message(error.to_string())
                .with_label(
                    Label::new((source_name, range))
                        .with_message(format!("expected {}", expected))
                        .with_color(Color::Red),
                )
                .finish()
        }
        DecodeError::LengthMismatch { values, keys, .. } => Report::build(ReportKind::Error, source_name, 0)
            .with_message(error.to_string())
            .with_note(format!(
                "Every display value needs a key: got {} values and {} keys",
                values, keys
            ))
            .finish(),
    };

    render(source_name, body, report)
}

/// Report an error raised while updating a form
pub fn report_form_error(source_name: &str, error: &FormError) -> String {
    match error {
        FormError::MalformedResponse { source, .. }
        | FormError::Transport {
            source: TransportError::Decode(source),
            ..
        } => format!("{}\n{}", error, report_decode_error(source_name, source)),
        other => other.to_string(),
    }
}

/// Combined error reporting for any crate error
pub fn report_error(source_name: &str, source: &str, error: &crate::Error) -> String {
    match error {
        crate::Error::Definition(e) => report_definition_error(source_name, source, e),
        crate::Error::Form(e) => report_form_error(source_name, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::decode_value_set;

    #[test]
    fn test_unknown_reference_diagnostic() {
        let source = r#"{"parameters": [{"name": "b", "references": ["ghost"]}]}"#;
        let error = DefinitionError::UnknownReference {
            parameter: "b".to_string(),
            reference: "ghost".to_string(),
        };
        let diagnostic = report_definition_error("form.json", source, &error);
        assert!(diagnostic.contains("unknown parameter 'ghost'"));
        assert!(diagnostic.contains("Declare 'ghost'"));
    }

    #[test]
    fn test_invalid_json_body_diagnostic() {
        let error = decode_value_set("[[\"a\"], oops]").unwrap_err();
        let diagnostic = report_decode_error("getChoicesForUI", &error);
        assert!(diagnostic.contains("Invalid JSON returned by getChoicesForUI"));
    }

    #[test]
    fn test_length_mismatch_diagnostic() {
        let error = decode_value_set("[[\"a\", \"b\"], [\"1\"]]").unwrap_err();
        let diagnostic = report_decode_error("getChoicesForUI", &error);
        assert!(diagnostic.contains("2 values but 1 keys"));
    }

    #[test]
    fn test_label_range_is_clamped() {
        assert_eq!(label_range("abc", Span::new(10, 20)), 2..3);
        assert_eq!(label_range("abc", Span::dummy()), 0..1);
    }
}

//! Human-readable rendering of model errors.

use codespan_reporting::diagnostic::{Diagnostic, Label};
use codespan_reporting::files::SimpleFile;
use codespan_reporting::term::{self, termcolor::NoColor};

use crate::ir::error::{ErrorKind, ModelError};

fn kind_note(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Syntax => "syntax error",
        ErrorKind::Semantic => "semantic error",
        ErrorKind::Reference => "reference error",
    }
}

/// Render `error` as an uncoloured diagnostic. Errors carrying a span into
/// expression text get a labelled snippet.
pub fn render(error: &ModelError) -> String {
    let mut diagnostic = Diagnostic::error()
        .with_message(error.to_string())
        .with_notes(vec![kind_note(error.kind()).to_string()]);

    let file = match error.source_span() {
        Some((text, span)) => {
            diagnostic = diagnostic.with_labels(vec![Label::primary((), span)]);
            SimpleFile::new("<expression>", text.to_string())
        }
        None => SimpleFile::new("<model>", String::new()),
    };

    let mut writer = NoColor::new(Vec::new());
    let config = term::Config::default();
    match term::emit(&mut writer, &config, &file, &diagnostic) {
        Ok(()) => String::from_utf8_lossy(&writer.into_inner()).into_owned(),
        Err(_) => format!("error: {error}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::ast::parse_node;

    #[test]
    fn test_render_syntax_error() {
        let err = parse_node("dV/dt = (V + 1").unwrap_err();
        assert!(err.source_span().is_some());
        let text = render(&err);
        assert!(text.starts_with("error:"), "{text}");
        assert!(text.contains("<expression>"), "{text}");
        assert!(text.contains("(V + 1"), "{text}");
        assert!(text.contains("syntax error"), "{text}");
    }

    #[test]
    fn test_render_without_span() {
        let text = render(&ModelError::DuplicateRegime("r1".into()));
        assert!(text.contains("more than one regime is named 'r1'"), "{text}");
        assert!(text.contains("semantic error"), "{text}");
        assert!(!text.contains("<model>"), "{text}");
    }
}

use crate::span::Span;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ParseError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("Expected {expected}, found {found} at {span}")]
    UnexpectedToken {
        expected: String,
        found: String,
        span: Span,
    },
    #[error("Unexpected end of input, expected {expected}")]
    UnexpectedEof { expected: String },
    #[error("Unclosed delimiter '{delimiter}' opened at {open_span}")]
    UnclosedDelimiter { delimiter: char, open_span: Span },
    #[error("Invalid number '{value}' at {span}")]
    InvalidNumber { value: String, span: Span },
    #[error("Invalid atom '{value}' at {span}")]
    InvalidAtom { value: String, span: Span },
    #[error("{message}{}", .span.map(|s| format!(" at {}", s)).unwrap_or_default())]
    Custom { message: String, span: Option<Span> },
}

impl ParseError {
    pub fn unexpected_token(expected: impl Into<String>, found: impl Into<String>, span: Span) -> Self {
        ParseError::UnexpectedToken {
            expected: expected.into(),
            found: found.into(),
            span,
        }
    }

    pub fn unexpected_eof(expected: impl Into<String>) -> Self {
        ParseError::UnexpectedEof {
            expected: expected.into(),
        }
    }

    pub fn unclosed_delimiter(delimiter: char, open_span: Span) -> Self {
        ParseError::UnclosedDelimiter { delimiter, open_span }
    }

    pub fn invalid_number(value: impl Into<String>, span: Span) -> Self {
        ParseError::InvalidNumber {
            value: value.into(),
            span,
        }
    }

    pub fn invalid_atom(value: impl Into<String>, span: Span) -> Self {
        ParseError::InvalidAtom {
            value: value.into(),
            span,
        }
    }

    pub fn custom(message: impl Into<String>, span: Option<Span>) -> Self {
        ParseError::Custom {
            message: message.into(),
            span,
        }
    }

    pub fn span(&self) -> Option<Span> {
        match self {
            ParseError::UnexpectedToken { span, .. }
            | ParseError::InvalidNumber { span, .. }
            | ParseError::InvalidAtom { span, .. } => Some(*span),
            ParseError::UnclosedDelimiter { open_span, .. } => Some(*open_span),
            ParseError::UnexpectedEof { .. } => None,
            ParseError::Custom { span, .. } => *span,
        }
    }

    /// The message followed by the offending line of `source`, marked
    pub fn report(&self, source: &str) -> String {
        match self.span() {
            Some(span) => {
                let (line, column) = span.line_col(source);
                format!("{} (line {}, column {})\n{}", self, line, column, span.excerpt(source))
            }
            None => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ParseError::unexpected_token("pitch", ")", Span::new(2, 3));
        assert_eq!(err.to_string(), "Expected pitch, found ) at 2..3");
        assert_eq!(ParseError::custom("bad", None).to_string(), "bad");
        assert_eq!(ParseError::custom("bad", Some(Span::new(1, 2))).to_string(), "bad at 1..2");
    }

    #[test]
    fn test_report_marks_source() {
        let err = ParseError::unclosed_delimiter('[', Span::new(2, 3));
        assert_eq!(
            err.report("0 [1 2"),
            "Unclosed delimiter '[' opened at 2..3 (line 1, column 3)\n0 [1 2\n  ^"
        );
        let eof = ParseError::unexpected_eof("number");
        assert_eq!(eof.report("0!"), eof.to_string());
    }
}

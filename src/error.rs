use thiserror::Error;

/// Represents errors that can occur while compiling or rendering a template.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TemplateError {
    #[error("Syntax error at line {line}: {message}")]
    Syntax { line: usize, message: String },
    #[error("Syntax error in expression: {0}")]
    Expression(String),
    #[error("Helper \"{0}\" is undefined")]
    UndefinedHelper(String),
    #[error("Helper \"{name}\" failed: {message}")]
    Helper { name: String, message: String },
    #[error("Block nesting exceeds the limit of {0}")]
    NestingTooDeep(usize),
    #[error("Context error: {0}")]
    Context(String),
}

impl TemplateError {
    pub(crate) fn syntax(line: usize, message: impl Into<String>) -> Self {
        TemplateError::Syntax {
            line,
            message: message.into(),
        }
    }

    pub(crate) fn expression(message: impl Into<String>) -> Self {
        TemplateError::Expression(message.into())
    }

    /// Attaches a template line to an expression error.
    pub(crate) fn at_line(self, line: usize) -> Self {
        match self {
            TemplateError::Expression(message) => TemplateError::Syntax { line, message },
            other => other,
        }
    }

    /// Whether the error is fixed by editing the template source.
    pub fn is_syntax(&self) -> bool {
        matches!(
            self,
            TemplateError::Syntax { .. } | TemplateError::Expression(_)
        )
    }
}

impl serde::ser::Error for TemplateError {
    fn custom<T: std::fmt::Display>(msg: T) -> Self {
        TemplateError::Context(msg.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TemplateError>;

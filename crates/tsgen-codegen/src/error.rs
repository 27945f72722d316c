use std::fmt;
use std::path::PathBuf;

/// Why a type was not generated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("`{name}` is neither a struct with named fields nor an enum of unit variants")]
    NotDataShape { name: String },

    #[error("`{name}` is declared inside a const or static initializer")]
    Nested { name: String },

    #[error("`{name}` is declared inside a function body")]
    Local { name: String },

    #[error("supertype `{supertype}` of `{name}` has no declaration to generate from")]
    OpaqueSupertype { name: String, supertype: String },

    #[error(
        "duplicate TypeScript identifier `{name}`: `{existing}` is already generated, \
         `{duplicate}` would collide with it"
    )]
    DuplicateName {
        name: String,
        existing: String,
        duplicate: String,
    },

    #[error("no declaration found for `{name}`")]
    Unknown { name: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub rejection: Rejection,
}

impl Diagnostic {
    pub fn error(rejection: Rejection) -> Self {
        Self {
            severity: Severity::Error,
            rejection,
        }
    }

    pub fn warning(rejection: Rejection) -> Self {
        Self {
            severity: Severity::Warning,
            rejection,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.severity {
            Severity::Error => write!(f, "error: {}", self.rejection),
            Severity::Warning => write!(f, "warning: {}", self.rejection),
        }
    }
}

/// A broken internal contract between pipeline stages.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StructuralError {
    #[error("bounds requested on `{0}`, which is not a type variable")]
    BoundsOnNonVariable(String),

    #[error("`{0}` has no type arguments")]
    NoParameters(String),

    #[error("type argument {index} out of range for `{name}` ({len} arguments)")]
    IndexOutOfRange {
        name: String,
        index: usize,
        len: usize,
    },

    #[error("type argument `{key}` of `{name}` was never wrapped")]
    MissingParameter { name: String, key: String },
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("TypeScript generation failed:\n{}", render(.0))]
    Rejected(Vec<Diagnostic>),

    #[error("internal error: {0}")]
    Internal(#[from] StructuralError),

    #[error("output directory `{}` does not exist or is not a directory", .0.display())]
    OutputDir(PathBuf),

    #[error("failed to parse `{}`: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: syn::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Diagnostics carried by a [`Error::Rejected`] failure.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            Error::Rejected(diagnostics) => diagnostics,
            _ => &[],
        }
    }
}

fn render(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(|d| format!("  {d}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_lists_every_diagnostic() {
        let err = Error::Rejected(vec![
            Diagnostic::error(Rejection::Local {
                name: "crate::Hidden".into(),
            }),
            Diagnostic::warning(Rejection::NotDataShape {
                name: "crate::Wrapper".into(),
            }),
        ]);
        let message = err.to_string();
        assert!(message.contains("error: `crate::Hidden` is declared inside a function body"));
        assert!(message.contains("warning: `crate::Wrapper` is neither"));
        assert_eq!(err.diagnostics().len(), 2);
    }

    #[test]
    fn test_duplicate_names_both_types() {
        let rejection = Rejection::DuplicateName {
            name: "User".into(),
            existing: "crate::a::User".into(),
            duplicate: "crate::b::User".into(),
        };
        let message = rejection.to_string();
        assert!(message.contains("crate::a::User"));
        assert!(message.contains("crate::b::User"));
    }
}

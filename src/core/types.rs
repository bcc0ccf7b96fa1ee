use crate::core::error::CoreError;

/// A named entity passed to a backend command.
///
/// The closed set of shapes the command line can carry: a plain name, an
/// integer used as a name (rewrite indices), or a set of names joined by
/// single spaces (vertex selections). Every variant must resolve to a
/// non-empty string before it may be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandArg {
    Name(String),
    Index(i32),
    NameSet(Vec<String>),
}

impl CommandArg {
    pub fn name(s: impl Into<String>) -> Self {
        CommandArg::Name(s.into())
    }

    /// The textual form placed on the command line, or `UnnamedArgument`
    /// if the entity has no usable name.
    pub fn resolve(&self) -> Result<String, CoreError> {
        let text = match self {
            CommandArg::Name(name) => name.clone(),
            CommandArg::Index(i) => i.to_string(),
            CommandArg::NameSet(names) => {
                if names.iter().any(String::is_empty) {
                    return Err(CoreError::UnnamedArgument);
                }
                names.join(" ")
            }
        };
        if text.is_empty() {
            return Err(CoreError::UnnamedArgument);
        }
        Ok(text)
    }
}

/// Vertex kinds understood by the backend, passed as lowercase names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexKind {
    Red,
    Green,
    Hadamard,
    Boundary,
}

impl VertexKind {
    pub fn as_str(self) -> &'static str {
        match self {
            VertexKind::Red => "red",
            VertexKind::Green => "green",
            VertexKind::Hadamard => "hadamard",
            VertexKind::Boundary => "boundary",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CommandArg, VertexKind};
    use crate::core::error::CoreError;

    #[test]
    fn resolve_joins_name_sets_with_spaces() {
        let arg = CommandArg::NameSet(vec!["v1".into(), "v2".into(), "v3".into()]);
        assert_eq!(arg.resolve().unwrap(), "v1 v2 v3");
    }

    #[test]
    fn negative_indices_keep_their_sign() {
        assert_eq!(CommandArg::Index(-3).resolve().unwrap(), "-3");
        assert_eq!(CommandArg::Index(0).resolve().unwrap(), "0");
    }

    #[test]
    fn unnamed_entities_are_rejected() {
        assert!(matches!(
            CommandArg::Name(String::new()).resolve(),
            Err(CoreError::UnnamedArgument)
        ));
        assert!(matches!(
            CommandArg::NameSet(vec![]).resolve(),
            Err(CoreError::UnnamedArgument)
        ));
        assert!(matches!(
            CommandArg::NameSet(vec!["a".into(), String::new()]).resolve(),
            Err(CoreError::UnnamedArgument)
        ));
    }

    #[test]
    fn vertex_kinds_are_lowercase() {
        assert_eq!(VertexKind::Hadamard.as_str(), "hadamard");
    }
}

use crate::protocol::DecodeError;
use crate::registry::NodeId;
use crate::remote::TransportError;

#[derive(Debug, Clone, PartialEq)]
pub enum FormError {
    UnknownNode(NodeId),
    NotRemote {
        parameter: String,
    },
    NoFilter {
        parameter: String,
    },
    Transport {
        parameter: String,
        source: TransportError,
    },
    MalformedResponse {
        parameter: String,
        source: DecodeError,
    },
}

impl std::fmt::Display for FormError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FormError::UnknownNode(id) => write!(f, "Unknown parameter node {}", id),
            FormError::NotRemote { parameter } => {
                write!(f, "Parameter '{}' has no remote evaluator", parameter)
            }
            FormError::NoFilter { parameter } => {
                write!(f, "Parameter '{}' has no filter", parameter)
            }
            FormError::Transport { parameter, source } => {
                write!(f, "Updating '{}' failed: {}", parameter, source)
            }
            FormError::MalformedResponse { parameter, source } => {
                write!(f, "Malformed response for '{}': {}", parameter, source)
            }
        }
    }
}

impl std::error::Error for FormError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FormError::Transport { source, .. } => Some(source),
            FormError::MalformedResponse { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl FormError {
    /// Attribute an evaluator failure to `parameter`
    pub fn transport(parameter: &str, error: TransportError) -> Self {
        match error {
            TransportError::Decode(source) => FormError::MalformedResponse {
                parameter: parameter.to_string(),
                source,
            },
            source => FormError::Transport {
                parameter: parameter.to_string(),
                source,
            },
        }
    }

    /// Name of the parameter the error is about, when known
    pub fn parameter(&self) -> Option<&str> {
        match self {
            FormError::UnknownNode(_) => None,
            FormError::NotRemote { parameter }
            | FormError::NoFilter { parameter }
            | FormError::Transport { parameter, .. }
            | FormError::MalformedResponse { parameter, .. } => Some(parameter),
        }
    }
}

use thiserror::Error;

/// The error type shared by the taskpool crates.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct Error(Box<ErrorKind>);

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        self.0.as_ref()
    }

    pub fn into_kind(self) -> ErrorKind {
        *self.0
    }

    /// Returns `true` if the error reports that results were requested before
    /// the execution has finished.
    pub fn is_not_finished(&self) -> bool {
        matches!(self.kind(), ErrorKind::NotFinished)
    }

    /// Returns `true` if the error describes an unrecoverable fault caught
    /// at the execution boundary.
    pub fn is_execution_fault(&self) -> bool {
        matches!(self.kind(), ErrorKind::ExecutionFault { .. })
    }

    pub fn invalid_arg(name: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidArgument {
                name: name.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn invalid_operation(name: impl Into<String>) -> Error {
        Error(ErrorKind::InvalidOperation { name: name.into() }.into())
    }

    pub fn not_finished() -> Error {
        Error(ErrorKind::NotFinished.into())
    }

    pub fn execution_fault(component: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::ExecutionFault {
                component: component.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Error {
        Error(
            ErrorKind::Io {
                context: context.into(),
                source,
            }
            .into(),
        )
    }
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("invalid argument {name}: {message}")]
    InvalidArgument { name: String, message: String },

    #[error("invalid operation {name}")]
    InvalidOperation { name: String },

    /// Results or timing were requested before the execution finished.
    #[error("execution has not finished")]
    NotFinished,

    #[error("execution fault in {component}: {message}")]
    ExecutionFault { component: String, message: String },

    #[error("IO error for '{context}': {source}")]
    Io {
        context: String,
        source: std::io::Error,
    },
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error(kind.into())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::io("", e)
    }
}

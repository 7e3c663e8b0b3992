use std::path::PathBuf;

/// Result type alias for the declaration index and descriptor model
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the application
#[derive(Debug)]
pub enum Error {
    IoError(std::io::Error),
    ParseError { file: PathBuf, message: String },
    DecodeError(String),
    InvalidDescriptor { index: usize, reason: String },
    /// A `(package, name)` pair was declared twice.
    DuplicateType { pkg: String, name: String },
    /// A `(package, receiver, method)` triple was declared twice.
    DuplicateMethod {
        pkg: String,
        receiver: String,
        method: String,
    },
    /// A method receiver did not reduce to a named type.
    InvalidReceiver { receiver: String, file: PathBuf },
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::IoError(e) => write!(f, "IO error: {}", e),
            Error::ParseError { file, message } => {
                write!(f, "parse error in {}: {}", file.display(), message)
            }
            Error::DecodeError(msg) => write!(f, "descriptor decode error: {}", msg),
            Error::InvalidDescriptor { index, reason } => {
                write!(f, "invalid route descriptor #{}: {}", index, reason)
            }
            Error::DuplicateType { pkg, name } => {
                write!(f, "duplicate type declaration {}::{}", pkg, name)
            }
            Error::DuplicateMethod {
                pkg,
                receiver,
                method,
            } => write!(
                f,
                "duplicate method declaration {}::{}::{}",
                pkg, receiver, method
            ),
            Error::InvalidReceiver { receiver, file } => write!(
                f,
                "method receiver `{}` in {} is not a named type",
                receiver,
                file.display()
            ),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::DecodeError(format!("JSON: {}", err))
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::DecodeError(format!("YAML: {}", err))
    }
}

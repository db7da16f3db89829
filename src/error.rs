use std::path::PathBuf;

/// Result type alias for per-file analysis steps
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while reading or analysing a single source file.
///
/// None of these abort a run: the walk driver logs them and treats the
/// offending file (or include) as contributing zero routes.
#[derive(Debug)]
pub enum Error {
    IoError { file: PathBuf, source: std::io::Error },
    ParseError { file: PathBuf, message: String },
    UnresolvedModule { module: String, from: PathBuf },
    InvalidArgument(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::IoError { file, source } => {
                write!(f, "I/O error reading {}: {}", file.display(), source)
            }
            Error::ParseError { file, message } => {
                write!(f, "Could not parse {}: {}", file.display(), message)
            }
            Error::UnresolvedModule { module, from } => write!(
                f,
                "Could not resolve module '{}' (referenced from {})",
                module,
                from.display()
            ),
            Error::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError { source, .. } => Some(source),
            _ => None,
        }
    }
}

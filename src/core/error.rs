use std::fmt;

/// Error kinds named explicitly by the error-handling design: `IoError` is always sticky
/// on the writer that raised it; `CorruptFormat` is fatal and carries the offending file
/// path; `OutOfMemory` is a soft failure the caller recovers from locally (never the
/// whole index); `ParseError` is config/wordform/exception-rule parsing; `Overflow` is a
/// dictionary/infix blob that would exceed a 32-bit on-disk offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    IoError,
    CorruptFormat,
    OutOfMemory,
    ParseError,
    Overflow,
}

#[derive(Debug, Clone)]
pub struct Error {
    pub kind: ErrorKind,
    pub context: String,
}

impl Error {
    pub fn new(kind: ErrorKind, context: impl Into<String>) -> Self {
        Error { kind, context: context.into() }
    }

    pub fn corrupt(path: impl AsRef<std::path::Path>, why: impl fmt::Display) -> Self {
        Error::new(
            ErrorKind::CorruptFormat,
            format!("{}: {}", path.as_ref().display(), why),
        )
    }

    pub fn out_of_memory(context: impl Into<String>) -> Self {
        Error::new(ErrorKind::OutOfMemory, context)
    }

    pub fn overflow(context: impl Into<String>) -> Self {
        Error::new(ErrorKind::Overflow, context)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.context)
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::new(ErrorKind::IoError, err.to_string())
    }
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error::new(ErrorKind::ParseError, err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// A sticky error flag carried by writer objects (§7 propagation policy): the first
/// error wins, every later operation becomes a no-op that preserves it.
#[derive(Debug, Default)]
pub struct StickyError(Option<Error>);

impl StickyError {
    pub fn set(&mut self, err: Error) {
        if self.0.is_none() {
            log::error!("{}", err);
            self.0 = Some(err);
        }
    }

    pub fn is_set(&self) -> bool {
        self.0.is_some()
    }

    pub fn check(&self) -> Result<()> {
        match &self.0 {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    pub fn take(self) -> Result<()> {
        match self.0 {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

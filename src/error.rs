//! Typed failures shared by every library adapter
//!
//! Trait methods return `anyhow::Result`; the variants below travel inside
//! those errors so callers can `downcast_ref::<LibraryError>()` when they need
//! to tell a usage error from a storage failure.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LibraryError {
    /// A capability or field the owning format cannot provide
    #[error("{operation} is not supported by {format} libraries")]
    Unsupported {
        operation: &'static str,
        format: String,
    },

    /// Programmer or usage error, e.g. a foreign track handed to `set_tracks`
    #[error("integrity violation: {0}")]
    Integrity(String),

    /// Underlying SQLite failure
    #[error("{context}")]
    Storage {
        context: String,
        #[source]
        source: rusqlite::Error,
    },

    /// A storage handle used after `close()`
    #[error("{0} is closed")]
    Closed(String),

    /// Underlying filesystem failure
    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl LibraryError {
    pub fn unsupported(operation: &'static str, format: impl Into<String>) -> Self {
        Self::Unsupported {
            operation,
            format: format.into(),
        }
    }

    pub fn integrity(msg: impl Into<String>) -> Self {
        Self::Integrity(msg.into())
    }

    pub fn storage(context: impl Into<String>, source: rusqlite::Error) -> Self {
        Self::Storage {
            context: context.into(),
            source,
        }
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

/// Extension for attaching a storage context to rusqlite results
pub trait StorageContext<T> {
    fn storage_context<F, C>(self, f: F) -> Result<T, LibraryError>
    where
        F: FnOnce() -> C,
        C: Into<String>;
}

impl<T> StorageContext<T> for Result<T, rusqlite::Error> {
    fn storage_context<F, C>(self, f: F) -> Result<T, LibraryError>
    where
        F: FnOnce() -> C,
        C: Into<String>,
    {
        self.map_err(|e| LibraryError::storage(f(), e))
    }
}

/// True when `err` carries a `LibraryError::Integrity`
pub fn is_integrity(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<LibraryError>(),
        Some(LibraryError::Integrity(_))
    )
}

/// True when `err` carries a `LibraryError::Unsupported`
pub fn is_unsupported(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<LibraryError>(),
        Some(LibraryError::Unsupported { .. })
    )
}

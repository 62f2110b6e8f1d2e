//! datastore::error
//!
//! Error type shared by the datastore modules.

use std::path::PathBuf;

use thiserror::Error;

use crate::core::query::QueryError;
use crate::core::schema::SchemaError;
use crate::core::types::{StoreName, TypeError};
use crate::core::xml::XmlError;

/// Coarse classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed request: bad path, unknown or missing store, conflicting
    /// object existence.
    Argument,
    /// Unknown schema node or key arity mismatch.
    Schema,
    /// Content that does not fit the schema.
    Validation,
    /// Backing file access.
    Io,
    /// A plugin rejected a transaction phase.
    Transaction,
}

/// Errors from datastore operations.
#[derive(Debug, Error)]
pub enum DatastoreError {
    #[error("{0}")]
    Argument(String),

    #[error("unknown store '{0}'")]
    UnknownStore(String),

    #[error("store '{0}' does not exist")]
    StoreNotFound(StoreName),

    #[error("{0}")]
    Schema(String),

    #[error(transparent)]
    SchemaFile(#[from] SchemaError),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("object to create already exists: {0}")]
    AlreadyExists(String),

    #[error("object to delete does not exist: {0}")]
    DoesNotExist(String),

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed store '{store}': {source}")]
    Xml {
        store: StoreName,
        #[source]
        source: XmlError,
    },

    #[error(transparent)]
    Query(#[from] QueryError),
}

impl DatastoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DatastoreError::Argument(_)
            | DatastoreError::UnknownStore(_)
            | DatastoreError::StoreNotFound(_)
            | DatastoreError::AlreadyExists(_)
            | DatastoreError::DoesNotExist(_)
            | DatastoreError::Query(_) => ErrorKind::Argument,
            DatastoreError::Schema(_) | DatastoreError::SchemaFile(_) => ErrorKind::Schema,
            DatastoreError::Validation(_) | DatastoreError::Xml { .. } => ErrorKind::Validation,
            DatastoreError::Io { .. } => ErrorKind::Io,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DatastoreError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<TypeError> for DatastoreError {
    fn from(err: TypeError) -> Self {
        DatastoreError::Argument(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages() {
        assert_eq!(
            DatastoreError::AlreadyExists("/a".into()).to_string(),
            "object to create already exists: /a"
        );
        assert_eq!(
            DatastoreError::DoesNotExist("/a".into()).to_string(),
            "object to delete does not exist: /a"
        );
        assert_eq!(
            DatastoreError::StoreNotFound(StoreName::running()).to_string(),
            "store 'running' does not exist"
        );
    }

    #[test]
    fn kinds() {
        assert_eq!(
            DatastoreError::UnknownStore("x".into()).kind(),
            ErrorKind::Argument
        );
        assert_eq!(DatastoreError::Schema("x".into()).kind(), ErrorKind::Schema);
        assert_eq!(
            DatastoreError::Validation("x".into()).kind(),
            ErrorKind::Validation
        );
        let io = DatastoreError::io(
            "/x",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert_eq!(io.kind(), ErrorKind::Io);
        assert!(io.to_string().contains("gone"));
    }

    #[test]
    fn type_errors_are_arguments() {
        let err: DatastoreError = TypeError::InvalidEditOp("upsert".into()).into();
        assert_eq!(err.kind(), ErrorKind::Argument);
        assert!(err.to_string().contains("upsert"));
    }
}

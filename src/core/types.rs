//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`StoreName`] - Validated datastore name ("running", "candidate", ...)
//! - [`SessionId`] - Client session identifier used as lock holder
//! - [`EditOp`] - Edit operation applied when reconciling an edit tree
//! - [`TransactionId`] - Monotonic transaction identifier
//!
//! # Validation
//!
//! These types enforce validity at construction time. Invalid values
//! cannot be represented, preventing entire classes of bugs.
//!
//! # Examples
//!
//! ```
//! use xmldb::core::types::{EditOp, StoreName};
//!
//! let store = StoreName::new("candidate").unwrap();
//! assert_eq!(store.as_str(), "candidate");
//!
//! let op: EditOp = "replace".parse().unwrap();
//! assert_eq!(op, EditOp::Replace);
//!
//! assert!(StoreName::new("../etc").is_err());
//! assert!("upsert".parse::<EditOp>().is_err());
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid store name: {0}")]
    InvalidStoreName(String),

    #[error("invalid edit operation: {0}")]
    InvalidEditOp(String),
}

/// A validated datastore name.
///
/// Store names map one-to-one onto backing files, so they are restricted to
/// ASCII alphanumerics, `-` and `_`:
/// - Cannot be empty
/// - Cannot contain path separators or dots
///
/// # Example
///
/// ```
/// use xmldb::core::types::StoreName;
///
/// let name = StoreName::new("running").unwrap();
/// assert_eq!(name, StoreName::running());
///
/// assert!(StoreName::new("").is_err());
/// assert!(StoreName::new("a/b").is_err());
/// assert!(StoreName::new("x.db").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StoreName(String);

impl StoreName {
    /// Create a new validated store name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidStoreName` if the name is empty or holds
    /// characters outside `[A-Za-z0-9_-]`.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        if name.is_empty() {
            return Err(TypeError::InvalidStoreName(
                "store name cannot be empty".into(),
            ));
        }
        if let Some(c) = name
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
        {
            return Err(TypeError::InvalidStoreName(format!(
                "store name '{}' contains invalid character '{}'",
                name, c
            )));
        }
        Ok(Self(name))
    }

    /// The live configuration store.
    pub fn running() -> Self {
        Self("running".to_string())
    }

    /// The scratch store edits are staged in before commit.
    pub fn candidate() -> Self {
        Self("candidate".to_string())
    }

    /// The store loaded at startup.
    pub fn startup() -> Self {
        Self("startup".to_string())
    }

    /// Temporary store used by copy-style operations.
    pub fn tmp() -> Self {
        Self("tmp".to_string())
    }

    /// The default store set.
    pub fn defaults() -> Vec<StoreName> {
        vec![
            Self::running(),
            Self::candidate(),
            Self::startup(),
            Self::tmp(),
        ]
    }

    /// Get the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StoreName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for StoreName {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<StoreName> for String {
    fn from(name: StoreName) -> Self {
        name.0
    }
}

impl FromStr for StoreName {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for StoreName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Identifier of a client session.
///
/// Session 0 is reserved: the lock table reports it for unlocked stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(u32);

impl SessionId {
    /// The "no holder" session.
    pub const NONE: SessionId = SessionId(0);

    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn get(self) -> u32 {
        self.0
    }

    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Edit operation applied when reconciling an edit tree into a base tree.
///
/// Attached to edit nodes through the `operation` attribute, otherwise
/// inherited from the nearest ancestor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditOp {
    /// Merge the edit into existing content.
    #[default]
    Merge,
    /// Purge existing content, then merge.
    Replace,
    /// Create; fails if the object already exists.
    Create,
    /// Delete; fails if the object does not exist.
    Delete,
    /// Delete if present.
    Remove,
    /// Only traverse; nodes created on the way are speculative.
    None,
}

impl EditOp {
    /// All operations, in vocabulary order.
    pub const ALL: [EditOp; 6] = [
        EditOp::Merge,
        EditOp::Replace,
        EditOp::Create,
        EditOp::Delete,
        EditOp::Remove,
        EditOp::None,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EditOp::Merge => "merge",
            EditOp::Replace => "replace",
            EditOp::Create => "create",
            EditOp::Delete => "delete",
            EditOp::Remove => "remove",
            EditOp::None => "none",
        }
    }

    /// Check if the operation removes content.
    pub fn is_removal(self) -> bool {
        matches!(self, EditOp::Delete | EditOp::Remove)
    }
}

impl fmt::Display for EditOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EditOp {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EditOp::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| TypeError::InvalidEditOp(s.to_string()))
    }
}

/// Identifier of a commit transaction.
///
/// Allocated in increasing order by the coordinator that owns the counter.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct TransactionId(u64);

impl TransactionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(self) -> u64 {
        self.0
    }

    /// The identifier following this one.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Storage-assigned file identifier.
///
/// Adapters allocate it; everything above the storage layer only compares ids for
/// equality and passes them back unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(i64);

impl FileId {
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// Raw value, for adapters that persist the id.
    pub const fn value(&self) -> i64 {
        self.0
    }
}

impl From<i64> for FileId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for FileId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<i64>().map(FileId)
    }
}

/// Authorization material stored with a file.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "snake_case")]
pub enum Credential {
    /// Password kept verbatim and compared for equality.
    Plaintext { password: String },
    /// `hash = H(salt + "$" + password)`.
    SaltedHash { salt: String, hash: String },
}

impl Credential {
    /// Stable name of the variant, as persisted by the database adapter.
    pub fn kind(&self) -> &'static str {
        match self {
            Credential::Plaintext { .. } => "plaintext",
            Credential::SaltedHash { .. } => "salted_hash",
        }
    }

    /// Rebuild a credential from its persisted columns.
    ///
    /// Plaintext credentials keep the password in the `secret` column with an empty
    /// salt.
    pub fn from_parts(kind: &str, salt: String, secret: String) -> Option<Self> {
        match kind {
            "plaintext" => Some(Credential::Plaintext { password: secret }),
            "salted_hash" => Some(Credential::SaltedHash { salt, hash: secret }),
            _ => None,
        }
    }

    /// Split into `(salt, secret)` columns. Inverse of [`Credential::from_parts`].
    pub fn to_parts(&self) -> (&str, &str) {
        match self {
            Credential::Plaintext { password } => ("", password.as_str()),
            Credential::SaltedHash { salt, hash } => (salt.as_str(), hash.as_str()),
        }
    }
}

// Never print secrets, even at debug level.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::Plaintext { .. } => f
                .debug_struct("Plaintext")
                .field("password", &"<redacted>")
                .finish(),
            Credential::SaltedHash { salt, .. } => f
                .debug_struct("SaltedHash")
                .field("salt", salt)
                .field("hash", &"<redacted>")
                .finish(),
        }
    }
}

/// Metadata stored alongside every file.
///
/// `created_at` is fixed at construction and there are no setters: expiry is always
/// computed from the instant the orchestrator stamped at upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    is_private: bool,
    content_type: String,
    created_at: DateTime<Utc>,
    credential: Credential,
}

impl FileMetadata {
    pub fn new(
        is_private: bool,
        content_type: impl Into<String>,
        created_at: DateTime<Utc>,
        credential: Credential,
    ) -> Self {
        Self {
            is_private,
            content_type: content_type.into(),
            created_at,
            credential,
        }
    }

    pub fn is_private(&self) -> bool {
        self.is_private
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }
}

/// Listing projection: no content and no authorization material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileListEntry {
    pub id: FileId,
    pub created_at: DateTime<Utc>,
}

impl FileListEntry {
    pub fn new(id: FileId, created_at: DateTime<Utc>) -> Self {
        Self { id, created_at }
    }
}

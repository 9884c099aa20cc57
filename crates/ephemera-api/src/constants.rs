//! API constants

/// Versioned prefix every file route is nested under.
pub const API_PREFIX: &str = "/api/v0";

/// Request header carrying the file password on upload and delete.
pub const PASSWORD_HEADER: &str = "x-file-password";

/// Response header with the RFC 3339 creation instant.
pub const CREATED_AT_HEADER: &str = "x-created-at";

/// Response header with the RFC 3339 instant the file stops being served.
pub const EXPIRES_AT_HEADER: &str = "x-expires-at";

pub const PRIVATE_HEADER: &str = "x-private";

/// Content type stored when the upload carries none.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

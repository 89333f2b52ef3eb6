use thiserror::Error;

/// `kCGErrorIllegalArgument`: the server rejected an id it no longer knows.
const K_CG_ERROR_ILLEGAL_ARGUMENT: i32 = 1001;
/// `kCGErrorInvalidConnection`: the target connection is gone.
const K_CG_ERROR_INVALID_CONNECTION: i32 = 1002;
/// `kCGErrorInvalidOperation`: the operation is not permitted for this caller.
const K_CG_ERROR_INVALID_OPERATION: i32 = 1010;

/// Errors surfaced by window server queries.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// No window server session exists for this process (SSH login, daemon
    /// context). Nothing in this crate can work; callers should bail.
    #[error("no window server session")]
    NoSession,

    /// The window, space, property, or target connection does not exist.
    /// Ids go stale at any time, so this is an ordinary recoverable outcome.
    #[error("window, space, or property not found")]
    NotFound,

    /// The server refused the operation for this connection, typically a
    /// property write against a connection the caller does not own.
    #[error("operation not permitted on the target connection")]
    PermissionDenied,

    /// Transient server failure carrying the raw `CGError` code. Worth a
    /// bounded retry; persistent codes mean the server is wedged.
    #[error("window server unavailable: CGError {0}")]
    Unavailable(i32),
}

impl Error {
    /// Classify a nonzero `CGError` return.
    ///
    /// The codes are undocumented; this mapping follows observed behavior:
    /// stale or foreign ids come back as illegal-argument or
    /// invalid-connection, rights failures as invalid-operation, and
    /// anything else is treated as transient.
    pub(crate) fn from_cg(code: i32) -> Self {
        match code {
            K_CG_ERROR_ILLEGAL_ARGUMENT | K_CG_ERROR_INVALID_CONNECTION => Self::NotFound,
            K_CG_ERROR_INVALID_OPERATION => Self::PermissionDenied,
            _ => Self::Unavailable(code),
        }
    }

    /// The `CGError` this classification stands for, for callers that need
    /// to surface a raw code. Representative where a class folds several
    /// codes (`NotFound` reports illegal-argument); `NoSession` has no
    /// server code and reports 0.
    #[must_use]
    pub const fn cg_code(self) -> i32 {
        match self {
            Self::NoSession => 0,
            Self::NotFound => K_CG_ERROR_ILLEGAL_ARGUMENT,
            Self::PermissionDenied => K_CG_ERROR_INVALID_OPERATION,
            Self::Unavailable(code) => code,
        }
    }
}

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

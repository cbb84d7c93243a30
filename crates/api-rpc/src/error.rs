//! RPC Error Types
//!
//! Maps application errors to JSON-RPC error codes.

use jsonrpsee::types::ErrorObjectOwned;
use snapshot_core::error::AppError;

/// RPC Error Codes
pub mod code {
    pub const VALIDATION_ERROR: i32 = 4000;
    pub const NOT_FOUND: i32 = 4001;
    pub const INTERNAL_ERROR: i32 = 5000;
    pub const DB_ERROR: i32 = 5001;
    pub const SYSTEM_ERROR: i32 = 5002;
    pub const TRANSPORT_ERROR: i32 = 5003;
    /// Trust token rejected (service-unavailable class)
    pub const AUTHENTICATION_FAILED: i32 = 5030;
}

/// Convert AppError to JSON-RPC ErrorObject
pub fn to_rpc_error(err: AppError) -> ErrorObjectOwned {
    match err {
        AppError::Validation(msg) => {
            ErrorObjectOwned::owned(code::VALIDATION_ERROR, msg, None::<()>)
        }
        AppError::NotFound(msg) => ErrorObjectOwned::owned(code::NOT_FOUND, msg, None::<()>),
        AppError::Database(msg) => ErrorObjectOwned::owned(code::DB_ERROR, msg, None::<()>),
        AppError::Internal(msg) => ErrorObjectOwned::owned(code::INTERNAL_ERROR, msg, None::<()>),
        AppError::Domain(e) => {
            ErrorObjectOwned::owned(code::VALIDATION_ERROR, e.to_string(), None::<()>)
        }
        AppError::Io(e) => ErrorObjectOwned::owned(code::SYSTEM_ERROR, e.to_string(), None::<()>),
        AppError::Serialization(e) => {
            ErrorObjectOwned::owned(code::VALIDATION_ERROR, e.to_string(), None::<()>)
        }
        AppError::Config(msg) => ErrorObjectOwned::owned(code::INTERNAL_ERROR, msg, None::<()>),
        AppError::Authentication(msg) => {
            ErrorObjectOwned::owned(code::AUTHENTICATION_FAILED, msg, None::<()>)
        }
        AppError::Transport(e) => {
            ErrorObjectOwned::owned(code::TRANSPORT_ERROR, e.to_string(), None::<()>)
        }
    }
}

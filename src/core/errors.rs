/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors surfaced by the node tree and the lifecycle manager
///
/// Every variant maps onto exactly one discrete [`Status`] code, so callers
/// that prefer branching on codes can use [`VmError::status`].
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum VmError {
    #[error("Already exists: {0}")]
    #[diagnostic(
        code(vm::already_exists),
        help("The name or resource is already registered. Treat as non-fatal if re-initializing.")
    )]
    AlreadyExists(String),

    #[error("Busy: {0}")]
    #[diagnostic(
        code(vm::busy),
        help("The virtual machine is in the middle of another operation or at a limit.")
    )]
    Busy(String),

    #[error("Locked: {0}")]
    #[diagnostic(
        code(vm::locked),
        help("Only one shutdown handler may wait at a time.")
    )]
    Locked(String),

    #[error("Failed: {0}")]
    #[diagnostic(code(vm::failed))]
    Failed(String),

    #[error("Not found: {0}")]
    #[diagnostic(
        code(vm::not_found),
        help("The node or virtual machine does not exist. Check initialization order.")
    )]
    NotFound(String),

    #[error("Allocation failed: {0}")]
    #[diagnostic(
        code(vm::failed_alloc),
        help("The system refused to provide a resource (memory or thread).")
    )]
    FailedAlloc(String),

    #[error("Missing argument: {0}")]
    #[diagnostic(code(vm::arg_null))]
    ArgNull(&'static str),

    #[error("Invalid argument: {0}")]
    #[diagnostic(code(vm::arg_invalid))]
    ArgInvalid(String),

    #[error("Not supported: {0}")]
    #[diagnostic(
        code(vm::not_supported),
        help("This operation is not supported in this build.")
    )]
    NotSupported(String),

    #[error("Invalid root: {0}")]
    #[diagnostic(
        code(vm::invalid_root),
        help("The registry tree is not present. Call initialize() first.")
    )]
    InvalidRoot(String),

    #[error("System shutdown: {0}")]
    #[diagnostic(code(vm::system_shutdown))]
    SystemShutdown(String),

    #[error("Not implemented: {0}")]
    #[diagnostic(code(vm::not_implemented))]
    NotImplemented(String),
}

impl VmError {
    /// Discrete status code for this error
    pub fn status(&self) -> Status {
        match self {
            VmError::AlreadyExists(_) => Status::AlreadyExists,
            VmError::Busy(_) => Status::Busy,
            VmError::Locked(_) => Status::Locked,
            VmError::Failed(_) => Status::Failed,
            VmError::NotFound(_) => Status::NotFound,
            VmError::FailedAlloc(_) => Status::FailedAlloc,
            VmError::ArgNull(_) => Status::ArgNull,
            VmError::ArgInvalid(_) => Status::ArgInvalid,
            VmError::NotSupported(_) => Status::NotSupported,
            VmError::InvalidRoot(_) => Status::InvalidRoot,
            VmError::SystemShutdown(_) => Status::SystemShutdown,
            VmError::NotImplemented(_) => Status::NotImplemented,
        }
    }
}

/// Discrete status codes reported to subsystems and the console
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum Status {
    Ok = 0,
    AlreadyExists,
    Busy,
    Locked,
    Failed,
    NotFound,
    FailedAlloc,
    ArgNull,
    ArgInvalid,
    NotSupported,
    InvalidRoot,
    SystemShutdown,
    NotImplemented,
}

impl Status {
    /// Status of any operation result
    pub fn of<T>(result: &Result<T, VmError>) -> Self {
        match result {
            Ok(_) => Status::Ok,
            Err(e) => e.status(),
        }
    }

    #[inline]
    pub fn is_ok(self) -> bool {
        self == Status::Ok
    }

    /// Name used in console output and logs
    pub const fn as_str(self) -> &'static str {
        match self {
            Status::Ok => "VM_OK",
            Status::AlreadyExists => "VM_ALREADY_EXISTS",
            Status::Busy => "VM_BUSY",
            Status::Locked => "VM_LOCKED",
            Status::Failed => "VM_FAILED",
            Status::NotFound => "VM_NOT_FOUND",
            Status::FailedAlloc => "VM_FAILED_ALLOC",
            Status::ArgNull => "VM_ARG_NULL",
            Status::ArgInvalid => "VM_ARG_INVALID",
            Status::NotSupported => "VM_NOT_SUPPORTED",
            Status::InvalidRoot => "VM_INVALID_ROOT",
            Status::SystemShutdown => "VM_SYSTEM_SHUTDOWN",
            Status::NotImplemented => "VM_NOT_IMPLEMENTED",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&VmError> for Status {
    fn from(err: &VmError) -> Self {
        err.status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_of_result() {
        let ok: Result<(), VmError> = Ok(());
        assert_eq!(Status::of(&ok), Status::Ok);

        let locked: Result<(), VmError> = Err(VmError::Locked("second waiter".into()));
        assert_eq!(Status::of(&locked), Status::Locked);
    }

    #[test]
    fn test_status_names() {
        assert_eq!(Status::InvalidRoot.to_string(), "VM_INVALID_ROOT");
        assert_eq!(VmError::ArgNull("name").status().as_str(), "VM_ARG_NULL");
    }

    #[test]
    fn test_status_serializes_as_code_name() {
        let json = serde_json::to_string(&Status::AlreadyExists).unwrap();
        assert_eq!(json, "\"ALREADY_EXISTS\"");
    }
}

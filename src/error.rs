/*
 * Central error type for the window group layer.
 *
 * Only recoverable conditions live here: a tooltip that could not be created,
 * a layout batch the platform refused, a wake-up message that could not be
 * posted. Broken reference counting and similar invariant violations are not
 * errors; they stop the offending call with a panic.
 */

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    InitializationFailed(String),
    OperationFailed(String),
    InvalidHandle(String),
    // The running platform has no implementation for the requested facility.
    Unsupported(String),
    // A Win32 call failed. `code` is the raw HRESULT reinterpreted as u32.
    Win32 { function: &'static str, code: u32 },
}

impl std::fmt::Display for PlatformError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InitializationFailed(msg) => write!(f, "initialization failed: {msg}"),
            Self::OperationFailed(msg) => write!(f, "operation failed: {msg}"),
            Self::InvalidHandle(msg) => write!(f, "invalid handle: {msg}"),
            Self::Unsupported(msg) => write!(f, "unsupported: {msg}"),
            Self::Win32 { function, code } => write!(f, "{function} failed (error {code:#010x})"),
        }
    }
}

impl std::error::Error for PlatformError {}

#[cfg(target_os = "windows")]
impl From<windows::core::Error> for PlatformError {
    fn from(e: windows::core::Error) -> Self {
        Self::Win32 {
            function: "windows",
            code: e.code().0 as u32,
        }
    }
}

pub type Result<T> = std::result::Result<T, PlatformError>;

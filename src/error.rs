use crate::storage::HardwareError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The page buffer could not be allocated.
    OutOfMemory,
    /// A range operation was issued before `setup`.
    NotInitialized,
    /// The requested byte range does not fit inside the device.
    OutOfBounds,
    /// The storage primitive failed; the code is passed through untouched.
    Hardware(i32),
    /// An image file header is missing or corrupt.
    InvalidImage,
}

impl From<HardwareError> for ErrorKind {
    fn from(err: HardwareError) -> Self {
        ErrorKind::Hardware(err.0)
    }
}

impl core::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ErrorKind::OutOfMemory => write!(f, "out of memory"),
            ErrorKind::NotInitialized => write!(f, "block device not initialized"),
            ErrorKind::OutOfBounds => write!(f, "range outside of device"),
            ErrorKind::Hardware(code) => write!(f, "hardware error {}", code),
            ErrorKind::InvalidImage => write!(f, "invalid image"),
        }
    }
}

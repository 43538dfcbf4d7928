//! Error types for flexnor-core
//!
//! This module provides a no_std compatible error type that can be used
//! throughout the crate.

use core::fmt;

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    // Bus errors
    /// Controller transfer failed
    Transport,

    // Argument errors
    /// Misaligned offset/size, or an oversized status-register write
    InvalidArgument,
    /// Address range extends beyond the device
    OutOfBounds,
    /// Device geometry is inconsistent (divisibility or page-size rules)
    InvalidGeometry,

    // Bring-up errors
    /// Writing the status registers during the quad-enable handshake failed
    StatusWriteFailed,
    /// Quad mode did not stick after the status write
    QuadEnableFailed {
        /// Status register 2 value read back after the write
        status: u8,
    },
    /// Vendor id probe failed; device absent or not answering
    DeviceNotResponding,
    /// Controller rejected the device configuration or sequence table
    ConfigRejected,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport => write!(f, "controller transfer failed"),
            Self::InvalidArgument => write!(f, "invalid argument"),
            Self::OutOfBounds => write!(f, "address range out of bounds"),
            Self::InvalidGeometry => write!(f, "invalid device geometry"),
            Self::StatusWriteFailed => write!(f, "status register write failed"),
            Self::QuadEnableFailed { status } => {
                write!(f, "quad enable failed: status register 2 = {:#04x}", status)
            }
            Self::DeviceNotResponding => write!(f, "device not responding"),
            Self::ConfigRejected => write!(f, "controller rejected device configuration"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;

//! JEDEC SPI NOR opcodes and status register bits
//!
//! Only the opcodes used by the command sequence table are defined here.

use bitflags::bitflags;

// ============================================================================
// Write control
// ============================================================================

/// Write Enable - required before any write/erase operation
pub const WREN: u8 = 0x06;

// ============================================================================
// Status register operations
// ============================================================================

/// Read Status Register 1
pub const RDSR: u8 = 0x05;
/// Read Status Register 2
pub const RDSR2: u8 = 0x35;
/// Write Status Registers 1-2
pub const WRSR: u8 = 0x01;

// ============================================================================
// Identification
// ============================================================================

/// Read JEDEC ID (manufacturer + device ID)
pub const RDID: u8 = 0x9F;

// ============================================================================
// Read commands
// ============================================================================

/// Quad Output Fast Read (1-1-4)
pub const QREAD: u8 = 0x6B;
/// Quad I/O Fast Read (1-4-4)
pub const QIOR: u8 = 0xEB;

// ============================================================================
// Page Program
// ============================================================================

/// Page Program (1-1-1)
pub const PP: u8 = 0x02;
/// Quad Input Page Program (1-1-4)
pub const QPP: u8 = 0x32;

// ============================================================================
// Erase commands
// ============================================================================

/// Sector Erase (4 KiB)
pub const SE: u8 = 0x20;
/// Block Erase (64 KiB)
pub const BE: u8 = 0xD8;
/// Chip Erase (entire device)
pub const BULKE: u8 = 0xC7;

bitflags! {
    /// Status register 1 bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Status1: u8 {
        /// Write In Progress - an internal write/erase cycle is running
        const BUSY = 1 << 0;
        /// Write Enable Latch - set by WREN, cleared when an operation completes
        const WEL  = 1 << 1;
    }
}

bitflags! {
    /// Status register 2 bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Status2: u8 {
        /// Quad Enable - releases the hold/write-protect pins for quad I/O
        const QE = 1 << 1;
    }
}

//! Memory-bus controller interface
//!
//! The controller is an external collaborator: it owns the electrical
//! signaling, the sequence engine, and the memory-mapped read window. This
//! module defines the trait the driver core drives it through, the transfer
//! descriptor handed to it, and the per-port device configuration installed
//! at bring-up.

use crate::error::Result;
use crate::seq::{OperationId, SequenceTable};

/// Controller chip-select port a device is wired to
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Port {
    /// Port A, chip select 1
    #[default]
    A1,
    /// Port A, chip select 2
    A2,
    /// Port B, chip select 1
    B1,
    /// Port B, chip select 2
    B2,
}

/// Direction of one controller transfer
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TransferDirection {
    /// Command only, no data phase
    #[default]
    Command,
    /// Data clocked out of the device
    Read,
    /// Data clocked into the device
    Write,
}

/// One command-sequence-driven bus transaction
///
/// Built per call from an [`OperationId`] and consumed immediately by
/// [`Controller::transfer`]. The lifetime parameter ties the descriptor to
/// the buffers it references.
pub struct Transfer<'a> {
    /// Device address offset driven in the sequence's address phase
    pub offset: u32,
    /// Target port
    pub port: Port,
    /// Transfer direction
    pub direction: TransferDirection,
    /// Sequence table slot to execute
    pub seq: OperationId,
    /// Data for the write phase, if any
    pub write_data: &'a [u8],
    /// Buffer for the read phase, if any
    pub read_buf: &'a mut [u8],
}

impl<'a> Transfer<'a> {
    /// A command-only transfer with no data phase (e.g. write-enable, erase)
    pub fn command(port: Port, seq: OperationId, offset: u32) -> Self {
        Self {
            offset,
            port,
            direction: TransferDirection::Command,
            seq,
            write_data: &[],
            read_buf: &mut [],
        }
    }

    /// A transfer reading into `buf` (e.g. status, id)
    pub fn read(port: Port, seq: OperationId, offset: u32, buf: &'a mut [u8]) -> Self {
        Self {
            offset,
            port,
            direction: TransferDirection::Read,
            seq,
            write_data: &[],
            read_buf: buf,
        }
    }

    /// A transfer writing `data` (e.g. page program, write-status)
    pub fn write(port: Port, seq: OperationId, offset: u32, data: &'a [u8]) -> Self {
        Self {
            offset,
            port,
            direction: TransferDirection::Write,
            seq,
            write_data: data,
            read_buf: &mut [],
        }
    }
}

/// Per-port electrical and timing configuration
///
/// Handed to the controller opaquely at bring-up; the driver core never
/// interprets these fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Serial root clock in Hz
    pub root_clock_hz: u32,
    /// Chip-select interval between commands, in serial clock cycles
    pub cs_interval: u16,
    /// Chip-select hold time, in serial clock cycles
    pub cs_hold_time: u8,
    /// Chip-select setup time, in serial clock cycles
    pub cs_setup_time: u8,
    /// Data-valid time in nanoseconds
    pub data_valid_time: u8,
    /// Column address bit count (0 for pure row addressing)
    pub column_space: u8,
    /// Whether the device is word- rather than byte-addressable
    pub word_addressable: bool,
    /// Sequence executed for memory-mapped fetches
    pub read_seq: OperationId,
    /// Wait interval after a memory-mapped write, in bus cycles
    pub write_wait_interval: u16,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            root_clock_hz: 120_000_000,
            cs_interval: 2,
            cs_hold_time: 3,
            cs_setup_time: 3,
            data_valid_time: 0,
            column_space: 0,
            word_addressable: false,
            read_seq: OperationId::ReadQuadIo,
            write_wait_interval: 0,
        }
    }
}

/// The memory-bus controller collaborator
///
/// Implementations execute sequence-driven transactions against one or more
/// flash devices and expose each device through a directly readable
/// memory-mapped window kept coherent by [`invalidate_dcache`].
///
/// [`invalidate_dcache`]: Controller::invalidate_dcache
pub trait Controller {
    /// Execute one command-sequence-driven bus transaction
    ///
    /// Returns [`Error::Transport`](crate::Error::Transport) if the
    /// transaction fails; the driver core never retries.
    fn transfer(&mut self, xfer: &mut Transfer<'_>) -> Result<()>;

    /// The device's memory-mapped read window at `offset`, `len` bytes long
    fn mapped_slice(&self, port: Port, offset: u32, len: usize) -> &[u8];

    /// Reset controller-internal transaction state
    ///
    /// Required after every state-mutating device operation before the next
    /// command is issued.
    fn reset(&mut self);

    /// Block until the controller itself (not the device) is idle
    ///
    /// Used only at bring-up, before reconfiguring a controller that may
    /// still be serving memory-mapped fetches.
    fn wait_bus_idle(&mut self);

    /// Install the sequence table and per-port configuration
    ///
    /// Called once at bring-up. Returns
    /// [`Error::ConfigRejected`](crate::Error::ConfigRejected) if the
    /// controller refuses the configuration.
    fn set_device_config(
        &mut self,
        config: &DeviceConfig,
        table: &SequenceTable,
        port: Port,
    ) -> Result<()>;

    /// Whether flash content currently backs executing code
    fn is_xip_active(&self) -> bool;

    /// Invalidate cached lines covering `[offset, offset + len)` of the
    /// memory-mapped window
    fn invalidate_dcache(&mut self, port: Port, offset: u32, len: usize);
}

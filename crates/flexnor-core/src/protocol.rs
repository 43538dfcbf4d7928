//! Primitive device operations
//!
//! One function per logical flash operation. Each builds a [`Transfer`] from
//! the operation's sequence table slot and hands it to the controller; a
//! transport failure is surfaced immediately and never retried here.

use crate::controller::{Controller, Port, Transfer};
use crate::error::{Error, Result};
use crate::seq::opcodes::Status1;
use crate::seq::OperationId;

/// Read the JEDEC manufacturer id byte
///
/// Used once at bring-up as a sanity probe.
pub fn read_vendor_id<C: Controller + ?Sized>(controller: &mut C, port: Port) -> Result<u8> {
    let mut buf = [0u8; 1];

    log::debug!("reading id");
    controller.transfer(&mut Transfer::read(port, OperationId::ReadId, 0, &mut buf))?;
    Ok(buf[0])
}

/// Read status register 1
pub fn read_status1<C: Controller + ?Sized>(controller: &mut C, port: Port) -> Result<u8> {
    let mut buf = [0u8; 1];
    controller.transfer(&mut Transfer::read(port, OperationId::ReadStatus1, 0, &mut buf))?;
    Ok(buf[0])
}

/// Read status register 2
pub fn read_status2<C: Controller + ?Sized>(controller: &mut C, port: Port) -> Result<u8> {
    let mut buf = [0u8; 1];
    controller.transfer(&mut Transfer::read(port, OperationId::ReadStatus2, 0, &mut buf))?;
    Ok(buf[0])
}

/// Write the status registers
///
/// At most two registers can be written in one command.
pub fn write_status<C: Controller + ?Sized>(
    controller: &mut C,
    port: Port,
    values: &[u8],
) -> Result<()> {
    if values.len() > 2 {
        log::error!("cannot write more than 2 status registers");
        return Err(Error::InvalidArgument);
    }

    log::debug!("writing status register");
    controller.transfer(&mut Transfer::write(port, OperationId::WriteStatus, 0, values))
}

/// Set the write-enable latch
pub fn write_enable<C: Controller + ?Sized>(controller: &mut C, port: Port) -> Result<()> {
    log::debug!("enabling write");
    controller.transfer(&mut Transfer::command(port, OperationId::WriteEnable, 0))
}

/// Erase the sector containing `offset`
pub fn erase_sector<C: Controller + ?Sized>(controller: &mut C, port: Port, offset: u32) -> Result<()> {
    log::debug!("erasing sector at {:#010x}", offset);
    controller.transfer(&mut Transfer::command(port, OperationId::EraseSector, offset))
}

/// Erase the block containing `offset`
pub fn erase_block<C: Controller + ?Sized>(controller: &mut C, port: Port, offset: u32) -> Result<()> {
    log::debug!("erasing block at {:#010x}", offset);
    controller.transfer(&mut Transfer::command(port, OperationId::EraseBlock, offset))
}

/// Erase the entire device
pub fn erase_chip<C: Controller + ?Sized>(controller: &mut C, port: Port) -> Result<()> {
    log::debug!("erasing chip");
    controller.transfer(&mut Transfer::command(port, OperationId::EraseChip, 0))
}

/// Program `data` at `offset` with the quad page-program sequence
///
/// The caller is responsible for keeping `data` inside one page; the device
/// wraps within the page otherwise.
pub fn page_program<C: Controller + ?Sized>(
    controller: &mut C,
    port: Port,
    offset: u32,
    data: &[u8],
) -> Result<()> {
    log::debug!("page programming {} bytes to {:#010x}", data.len(), offset);
    controller.transfer(&mut Transfer::write(port, OperationId::ProgramQuad, offset, data))
}

/// Poll status register 1 until the device reports idle
///
/// Loops with no backoff and no iteration cap: device busy time is bounded by
/// the operation's own timing, and a device that never clears the busy bit
/// will block the caller indefinitely. A transport error aborts the poll and
/// propagates.
pub fn wait_until_idle<C: Controller + ?Sized>(controller: &mut C, port: Port) -> Result<()> {
    loop {
        let status = read_status1(controller, port)?;
        log::trace!("status: {:#04x}", status);
        if !Status1::from_bits_truncate(status).contains(Status1::BUSY) {
            return Ok(());
        }
    }
}

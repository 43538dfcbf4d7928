//! The NOR flash device handle
//!
//! Owns the controller channel for one port and drives the operation
//! sequencing: write-enable before every mutation, busy polling and
//! controller reset after, page-aware program splitting, erase granularity
//! selection, and the execute-in-place critical-section discipline.

use crate::controller::{Controller, DeviceConfig, Port};
use crate::error::{Error, Result};
use crate::protocol;
use crate::seq::opcodes::Status2;
use crate::seq::SEQUENCE_TABLE;
use crate::xip::XipGuard;

use super::geometry::{FlashParameters, Geometry, PageLayout};

/// Smallest programmable unit in bytes
const NOR_WRITE_SIZE: u32 = 1;
/// Byte value of erased flash
const NOR_ERASE_VALUE: u8 = 0xFF;
/// Staging buffer size; must hold one full program page
const STAGING_SIZE: usize = 256;

/// Handle to one serial NOR flash device behind the controller
///
/// The handle exclusively borrows the controller for its lifetime; one
/// logical caller context owns it at a time, and the surrounding system is
/// responsible for serializing concurrent callers.
///
/// # Execute-in-place
///
/// When [`Controller::is_xip_active`] reports that the device also backs
/// executing code, [`program`](Self::program) and [`erase`](Self::erase) run
/// their transfer loops inside a critical section. No code or data reached
/// during those loops may reside in the flash under modification.
pub struct NorFlash<'c, C: Controller + ?Sized> {
    controller: &'c mut C,
    port: Port,
    config: DeviceConfig,
    geometry: Geometry,
    parameters: FlashParameters,
    staging: Option<[u8; STAGING_SIZE]>,
    vendor_id: Option<u8>,
    ready: bool,
}

impl<'c, C: Controller + ?Sized> NorFlash<'c, C> {
    /// Create a handle with the default device configuration
    ///
    /// The geometry is validated here; the device is not touched until
    /// [`init`](Self::init).
    pub fn new(controller: &'c mut C, port: Port, geometry: Geometry) -> Result<Self> {
        Self::with_config(controller, port, geometry, DeviceConfig::default())
    }

    /// Create a handle with an explicit device configuration
    pub fn with_config(
        controller: &'c mut C,
        port: Port,
        geometry: Geometry,
        config: DeviceConfig,
    ) -> Result<Self> {
        geometry.validate()?;
        Ok(Self {
            controller,
            port,
            config,
            geometry,
            parameters: FlashParameters {
                write_block_size: NOR_WRITE_SIZE,
                erase_value: NOR_ERASE_VALUE,
            },
            staging: None,
            vendor_id: None,
            ready: false,
        })
    }

    /// Stage program chunks through a handle-owned one-page buffer
    ///
    /// Needed when the caller's source buffer may not be safely read during
    /// the bus transfer, e.g. when it aliases memory that must not move
    /// while the transfer runs.
    pub fn with_write_buffer(mut self) -> Result<Self> {
        if self.geometry.page_size as usize > STAGING_SIZE {
            return Err(Error::InvalidGeometry);
        }
        self.staging = Some([NOR_ERASE_VALUE; STAGING_SIZE]);
        Ok(self)
    }

    /// Bring up the device
    ///
    /// Installs the sequence table and port configuration, probes the vendor
    /// id, and switches the device into quad mode. Any failure leaves the
    /// device un-initialized and [`is_ready`](Self::is_ready) false.
    pub fn init(&mut self) -> Result<()> {
        if self.controller.is_xip_active() {
            // Outstanding mapped fetches must drain before reconfiguring
            self.controller.wait_bus_idle();
        }

        if self
            .controller
            .set_device_config(&self.config, &SEQUENCE_TABLE, self.port)
            .is_err()
        {
            log::error!("could not set device configuration");
            return Err(Error::ConfigRejected);
        }

        protocol::wait_until_idle(&mut *self.controller, self.port)?;
        self.controller.reset();

        let vendor_id = match protocol::read_vendor_id(&mut *self.controller, self.port) {
            Ok(id) => id,
            Err(_) => {
                log::error!("could not read vendor id");
                return Err(Error::DeviceNotResponding);
            }
        };
        log::debug!("vendor id: {:#04x}", vendor_id);
        self.vendor_id = Some(vendor_id);

        self.enable_quad_mode()?;
        protocol::wait_until_idle(&mut *self.controller, self.port)?;
        self.controller.reset();

        self.ready = true;
        Ok(())
    }

    /// One-shot quad-mode handshake
    fn enable_quad_mode(&mut self) -> Result<()> {
        protocol::write_enable(&mut *self.controller, self.port)?;
        if protocol::write_status(
            &mut *self.controller,
            self.port,
            &[0x00, Status2::QE.bits()],
        )
        .is_err()
        {
            log::error!("writing status register failed");
            return Err(Error::StatusWriteFailed);
        }
        protocol::wait_until_idle(&mut *self.controller, self.port)?;

        let status = protocol::read_status2(&mut *self.controller, self.port)?;
        if status != Status2::QE.bits() {
            log::error!("failed to enable quad mode");
            return Err(Error::QuadEnableFailed { status });
        }
        protocol::wait_until_idle(&mut *self.controller, self.port)?;
        self.controller.reset();
        Ok(())
    }

    /// Read `buf.len()` bytes starting at `offset`
    ///
    /// A pure copy out of the memory-mapped window; no command sequence is
    /// issued and no busy-wait applies. The window is kept current by the
    /// cache invalidation performed in [`program`](Self::program) and
    /// [`erase`](Self::erase).
    pub fn read(&mut self, offset: u32, buf: &mut [u8]) -> Result<()> {
        self.check_range(offset, buf.len())?;
        let src = self.controller.mapped_slice(self.port, offset, buf.len());
        buf.copy_from_slice(src);
        Ok(())
    }

    /// Program `data` starting at `offset`
    ///
    /// Accepts any offset and length inside the device. The write is split
    /// so that no single program transfer crosses a page boundary; the
    /// device would otherwise wrap within the page and corrupt data. Each
    /// chunk is write-enabled, programmed, polled to completion, and
    /// followed by a controller reset.
    ///
    /// A transport failure partway leaves the device partially programmed
    /// and is reported as-is; nothing is rolled back or retried.
    pub fn program(&mut self, offset: u32, data: &[u8]) -> Result<()> {
        self.check_range(offset, data.len())?;

        let start = offset;
        {
            let _guard = XipGuard::enter(self.controller.is_xip_active());

            let page_size = self.geometry.page_size;
            let mut offset = offset;
            let mut remaining = data;
            while !remaining.is_empty() {
                let room = (page_size - offset % page_size) as usize;
                let chunk_len = room.min(remaining.len());
                let (chunk, rest) = remaining.split_at(chunk_len);

                protocol::write_enable(&mut *self.controller, self.port)?;
                match self.staging.as_mut() {
                    Some(stage) => {
                        stage[..chunk_len].copy_from_slice(chunk);
                        protocol::page_program(
                            &mut *self.controller,
                            self.port,
                            offset,
                            &stage[..chunk_len],
                        )?;
                    }
                    None => {
                        protocol::page_program(&mut *self.controller, self.port, offset, chunk)?;
                    }
                }
                protocol::wait_until_idle(&mut *self.controller, self.port)?;
                self.controller.reset();

                offset += chunk_len as u32;
                remaining = rest;
            }
        }

        self.controller.invalidate_dcache(self.port, start, data.len());
        Ok(())
    }

    /// Erase `size` bytes starting at `offset`
    ///
    /// Both must be sector-aligned. The largest applicable erase unit is
    /// selected: the whole chip when the request covers the device, blocks
    /// when offset and size are block-aligned, sectors otherwise.
    pub fn erase(&mut self, offset: u32, size: u32) -> Result<()> {
        let geometry = self.geometry;
        if offset % geometry.sector_size != 0 {
            log::error!("invalid offset");
            return Err(Error::InvalidArgument);
        }
        if size % geometry.sector_size != 0 {
            log::error!("invalid size");
            return Err(Error::InvalidArgument);
        }
        self.check_range(offset, size as usize)?;

        let start = offset;
        {
            let _guard = XipGuard::enter(self.controller.is_xip_active());

            if offset == 0 && size == geometry.total_size {
                protocol::write_enable(&mut *self.controller, self.port)?;
                protocol::erase_chip(&mut *self.controller, self.port)?;
                protocol::wait_until_idle(&mut *self.controller, self.port)?;
                self.controller.reset();
            } else if offset % geometry.block_size == 0 && size % geometry.block_size == 0 {
                let mut offset = offset;
                for _ in 0..size / geometry.block_size {
                    protocol::write_enable(&mut *self.controller, self.port)?;
                    protocol::erase_block(&mut *self.controller, self.port, offset)?;
                    protocol::wait_until_idle(&mut *self.controller, self.port)?;
                    self.controller.reset();
                    offset += geometry.block_size;
                }
            } else {
                let mut offset = offset;
                for _ in 0..size / geometry.sector_size {
                    protocol::write_enable(&mut *self.controller, self.port)?;
                    protocol::erase_sector(&mut *self.controller, self.port, offset)?;
                    protocol::wait_until_idle(&mut *self.controller, self.port)?;
                    self.controller.reset();
                    offset += geometry.sector_size;
                }
            }
        }

        self.controller.invalidate_dcache(self.port, start, size as usize);
        Ok(())
    }

    /// Fixed write parameters of the device
    pub fn parameters(&self) -> &FlashParameters {
        &self.parameters
    }

    /// Erase-page layout of the device, in sector units
    pub fn page_layout(&self) -> PageLayout {
        PageLayout {
            page_count: self.geometry.total_size / self.geometry.sector_size,
            page_size: self.geometry.sector_size,
        }
    }

    /// The device geometry
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Whether bring-up completed successfully
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Vendor id read at bring-up, if `init` has run
    pub fn vendor_id(&self) -> Option<u8> {
        self.vendor_id
    }

    /// Shared access to the underlying controller
    pub fn controller(&self) -> &C {
        &*self.controller
    }

    fn check_range(&self, offset: u32, len: usize) -> Result<()> {
        let end = offset as u64 + len as u64;
        if end > self.geometry.total_size as u64 {
            return Err(Error::OutOfBounds);
        }
        Ok(())
    }
}

//! flexnor-sim - In-memory controller and flash emulator for testing
//!
//! This crate provides a simulated memory-bus controller with one NOR flash
//! device behind it. It is useful for testing and development without real
//! hardware.
//!
//! Unlike a shortcut mock, the simulator interprets the sequence table the
//! driver installs: every transfer is resolved to its command opcode through
//! the installed table, and device behavior (write-enable latch, busy bit,
//! intra-page program wrap, erase fills) is keyed off that opcode. A driver
//! whose table and ordering are wrong fails here the way it would on
//! hardware.
//!
//! The memory-mapped window is deliberately stale: [`mapped_slice`] serves a
//! cached copy that is refreshed only by [`invalidate_dcache`], so tests
//! exercise the driver's cache maintenance for real.
//!
//! [`mapped_slice`]: flexnor_core::controller::Controller::mapped_slice
//! [`invalidate_dcache`]: flexnor_core::controller::Controller::invalidate_dcache

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "alloc")]
use alloc::vec;
#[cfg(feature = "alloc")]
use alloc::vec::Vec;

use flexnor_core::controller::{Controller, DeviceConfig, Port, Transfer, TransferDirection};
use flexnor_core::error::{Error, Result};
use flexnor_core::flash::Geometry;
use flexnor_core::seq::{opcodes, Instruction, OperationId, Phase, SequenceTable};
use flexnor_core::seq::{SEQUENCE_COUNT, SEQUENCE_WORDS};

/// Configuration for the simulated device
#[derive(Debug, Clone, Copy)]
pub struct SimConfig {
    /// JEDEC manufacturer id served for the id probe
    pub vendor_id: u8,
    /// Device geometry
    pub geometry: Geometry,
    /// Status polls the busy bit stays set for after a mutating operation
    pub busy_polls: u32,
    /// Whether status-register writes latch the quad-enable bit
    pub quad_sticks: bool,
    /// Refuse `set_device_config`
    pub reject_config: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            vendor_id: 0xEF, // Winbond
            geometry: Geometry::W25Q128JV,
            busy_polls: 2,
            quad_sticks: true,
            reject_config: false,
        }
    }
}

/// One recorded controller interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimEvent {
    /// A sequence-driven transfer: slot, resolved opcode, offset, data length
    Transfer {
        /// Sequence table slot
        seq: OperationId,
        /// Command opcode resolved from the installed table
        opcode: u8,
        /// Device address offset
        offset: u32,
        /// Bytes moved in the data phase
        len: usize,
    },
    /// Controller reset
    Reset,
    /// Bring-up bus-idle wait
    WaitBusIdle,
    /// Sequence table and port configuration installed
    SetDeviceConfig,
    /// Cache lines over a window range invalidated
    CacheInvalidate {
        /// Window offset
        offset: u32,
        /// Length in bytes
        len: usize,
    },
}

/// Simulated controller with one NOR flash device
#[cfg(feature = "alloc")]
pub struct SimController {
    config: SimConfig,
    memory: Vec<u8>,
    window: Vec<u8>,
    lut: Option<[[u32; SEQUENCE_WORDS]; SEQUENCE_COUNT]>,
    sr1: u8,
    sr2: u8,
    busy_left: u32,
    write_enabled: bool,
    xip_active: bool,
    fail_seq: Option<OperationId>,
    fail_after: u32,
    hazards: u32,
    events: Vec<SimEvent>,
}

#[cfg(feature = "alloc")]
impl SimController {
    /// Create a simulator with the given configuration
    pub fn new(config: SimConfig) -> Self {
        let size = config.geometry.total_size as usize;
        Self {
            config,
            memory: vec![0xFF; size],
            window: vec![0xFF; size],
            lut: None,
            sr1: 0,
            sr2: 0,
            busy_left: 0,
            write_enabled: false,
            xip_active: false,
            fail_seq: None,
            fail_after: 0,
            hazards: 0,
            events: Vec::new(),
        }
    }

    /// Create a simulator with the default configuration
    pub fn new_default() -> Self {
        Self::new(SimConfig::default())
    }

    /// The device memory contents
    pub fn memory(&self) -> &[u8] {
        &self.memory
    }

    /// Mutable device memory, for preloading contents
    pub fn memory_mut(&mut self) -> &mut [u8] {
        &mut self.memory
    }

    /// The recorded interaction journal
    pub fn events(&self) -> &[SimEvent] {
        &self.events
    }

    /// Number of transfers executed for a given table slot
    pub fn transfer_count(&self, seq: OperationId) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, SimEvent::Transfer { seq: s, .. } if *s == seq))
            .count()
    }

    /// Commands that arrived while the device was still busy
    ///
    /// Anything nonzero means the driver broke the poll-until-idle rule.
    pub fn hazard_count(&self) -> u32 {
        self.hazards
    }

    /// Status register 2 as the device holds it
    pub fn status2(&self) -> u8 {
        self.sr2
    }

    /// Report execute-in-place as active or inactive
    pub fn set_xip_active(&mut self, active: bool) {
        self.xip_active = active;
    }

    /// Fail every transfer of the given table slot with a transport error
    pub fn fail_on(&mut self, seq: Option<OperationId>) {
        self.fail_on_after(seq, 0);
    }

    /// Fail transfers of the given slot after letting `pass` of them through
    pub fn fail_on_after(&mut self, seq: Option<OperationId>, pass: u32) {
        self.fail_seq = seq;
        self.fail_after = pass;
    }

    fn resolve_opcode(&self, seq: OperationId) -> Option<u8> {
        let words = self.lut.as_ref()?.get(seq.index())?;
        for word in words {
            for half in [*word as u16, (*word >> 16) as u16] {
                let instr = Instruction::decode(half)?;
                match instr.phase {
                    Phase::Command => return Some(instr.operand),
                    Phase::Stop => return None,
                    _ => {}
                }
            }
        }
        None
    }

    fn begin_operation(&mut self) {
        self.busy_left = self.config.busy_polls;
        self.write_enabled = false;
    }

    fn fill_erased(&mut self, offset: u32, len: u32) {
        let start = offset as usize;
        let end = start + len as usize;
        for byte in &mut self.memory[start..end] {
            *byte = 0xFF;
        }
    }

    /// Program with the device's intra-page wrap behavior
    fn program_wrapping(&mut self, offset: u32, data: &[u8]) {
        let page = self.config.geometry.page_size as usize;
        let addr = offset as usize;
        let base = addr / page * page;
        for (i, byte) in data.iter().enumerate() {
            let dst = base + (addr - base + i) % page;
            self.memory[dst] &= byte;
        }
    }
}

#[cfg(feature = "alloc")]
impl Controller for SimController {
    fn transfer(&mut self, xfer: &mut Transfer<'_>) -> Result<()> {
        let opcode = match self.resolve_opcode(xfer.seq) {
            Some(opcode) => opcode,
            None => {
                log::error!("transfer on slot {:?} with no installed command", xfer.seq);
                return Err(Error::Transport);
            }
        };
        let direction_consistent = match xfer.direction {
            TransferDirection::Command => xfer.write_data.is_empty() && xfer.read_buf.is_empty(),
            TransferDirection::Read => !xfer.read_buf.is_empty(),
            TransferDirection::Write => !xfer.write_data.is_empty(),
        };
        if !direction_consistent {
            log::error!("transfer direction does not match its data phase");
            return Err(Error::Transport);
        }

        let len = xfer.write_data.len().max(xfer.read_buf.len());
        self.events.push(SimEvent::Transfer {
            seq: xfer.seq,
            opcode,
            offset: xfer.offset,
            len,
        });

        if self.fail_seq == Some(xfer.seq) {
            if self.fail_after == 0 {
                return Err(Error::Transport);
            }
            self.fail_after -= 1;
        }

        // The device accepts only a status poll while an internal cycle runs
        if self.busy_left > 0 && opcode != opcodes::RDSR {
            self.hazards += 1;
            return Ok(());
        }

        match opcode {
            opcodes::RDSR => {
                let busy = if self.busy_left > 0 {
                    self.busy_left -= 1;
                    opcodes::Status1::BUSY.bits()
                } else {
                    0
                };
                xfer.read_buf[0] = self.sr1 | busy;
            }
            opcodes::RDSR2 => xfer.read_buf[0] = self.sr2,
            opcodes::RDID => xfer.read_buf[0] = self.config.vendor_id,
            opcodes::WREN => self.write_enabled = true,
            opcodes::WRSR => {
                if self.write_enabled {
                    if let Some(&sr1) = xfer.write_data.first() {
                        self.sr1 = sr1;
                    }
                    if self.config.quad_sticks {
                        if let Some(&sr2) = xfer.write_data.get(1) {
                            self.sr2 = sr2;
                        }
                    }
                }
                self.begin_operation();
            }
            opcodes::PP | opcodes::QPP => {
                if self.write_enabled {
                    self.program_wrapping(xfer.offset, xfer.write_data);
                }
                self.begin_operation();
            }
            opcodes::SE => {
                if self.write_enabled {
                    let sector = self.config.geometry.sector_size;
                    self.fill_erased(xfer.offset / sector * sector, sector);
                }
                self.begin_operation();
            }
            opcodes::BE => {
                if self.write_enabled {
                    let block = self.config.geometry.block_size;
                    self.fill_erased(xfer.offset / block * block, block);
                }
                self.begin_operation();
            }
            opcodes::BULKE => {
                if self.write_enabled {
                    let total = self.config.geometry.total_size;
                    self.fill_erased(0, total);
                }
                self.begin_operation();
            }
            _ => {
                log::error!("unmodeled opcode {:#04x}", opcode);
                return Err(Error::Transport);
            }
        }

        Ok(())
    }

    fn mapped_slice(&self, _port: Port, offset: u32, len: usize) -> &[u8] {
        &self.window[offset as usize..offset as usize + len]
    }

    fn reset(&mut self) {
        self.events.push(SimEvent::Reset);
    }

    fn wait_bus_idle(&mut self) {
        self.events.push(SimEvent::WaitBusIdle);
    }

    fn set_device_config(
        &mut self,
        _config: &DeviceConfig,
        table: &SequenceTable,
        _port: Port,
    ) -> Result<()> {
        if self.config.reject_config {
            return Err(Error::ConfigRejected);
        }
        let mut lut = [[0u32; SEQUENCE_WORDS]; SEQUENCE_COUNT];
        for (slot, seq) in lut.iter_mut().zip(table.iter()) {
            *slot = seq.words();
        }
        self.lut = Some(lut);
        self.events.push(SimEvent::SetDeviceConfig);
        Ok(())
    }

    fn is_xip_active(&self) -> bool {
        self.xip_active
    }

    fn invalidate_dcache(&mut self, _port: Port, offset: u32, len: usize) {
        self.events.push(SimEvent::CacheInvalidate { offset, len });
        let start = offset as usize;
        self.window[start..start + len].copy_from_slice(&self.memory[start..start + len]);
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;
    use flexnor_core::flash::NorFlash;
    use flexnor_core::protocol;
    use flexnor_core::seq::SEQUENCE_TABLE;

    fn small_geometry() -> Geometry {
        Geometry {
            total_size: 256 * 1024,
            sector_size: 4096,
            block_size: 64 * 1024,
            page_size: 256,
        }
    }

    fn small_sim() -> SimController {
        SimController::new(SimConfig {
            geometry: small_geometry(),
            ..SimConfig::default()
        })
    }

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 31 + 7) as u8).collect()
    }

    #[test]
    fn bring_up_configures_then_probes_then_enables_quad() {
        let mut sim = small_sim();
        let mut flash = NorFlash::new(&mut sim, Port::A1, small_geometry()).unwrap();

        flash.init().unwrap();

        assert!(flash.is_ready());
        assert_eq!(flash.vendor_id(), Some(0xEF));
        let sim = flash.controller();
        assert_eq!(sim.events()[0], SimEvent::SetDeviceConfig);
        assert_eq!(sim.status2(), 0x02);
        assert_eq!(sim.hazard_count(), 0);
    }

    #[test]
    fn bring_up_waits_for_the_bus_under_xip() {
        let mut sim = small_sim();
        sim.set_xip_active(true);
        let mut flash = NorFlash::new(&mut sim, Port::A1, small_geometry()).unwrap();

        flash.init().unwrap();

        let events = flash.controller().events();
        assert_eq!(events[0], SimEvent::WaitBusIdle);
        assert_eq!(events[1], SimEvent::SetDeviceConfig);
    }

    #[test]
    fn bring_up_fails_when_quad_bit_does_not_stick() {
        let mut sim = SimController::new(SimConfig {
            geometry: small_geometry(),
            quad_sticks: false,
            ..SimConfig::default()
        });
        let mut flash = NorFlash::new(&mut sim, Port::A1, small_geometry()).unwrap();

        assert_eq!(flash.init(), Err(Error::QuadEnableFailed { status: 0 }));
        assert!(!flash.is_ready());
    }

    #[test]
    fn sub_page_write_at_unaligned_offset_round_trips() {
        let mut sim = small_sim();
        let mut flash = NorFlash::new(&mut sim, Port::A1, small_geometry()).unwrap();
        flash.init().unwrap();

        let data = pattern(100);
        flash.program(4321, &data).unwrap();

        let mut back = vec![0u8; 100];
        flash.read(4321, &mut back).unwrap();
        assert_eq!(back, data);
        assert_eq!(flash.controller().hazard_count(), 0);
    }

    #[test]
    fn multi_page_write_round_trips_byte_for_byte() {
        let mut sim = small_sim();
        let mut flash = NorFlash::new(&mut sim, Port::A1, small_geometry()).unwrap();
        flash.init().unwrap();

        // Spans four page boundaries from an arbitrary offset
        let data = pattern(1000);
        flash.program(777, &data).unwrap();

        let mut back = vec![0u8; 1000];
        flash.read(777, &mut back).unwrap();
        assert_eq!(back, data);
        assert_eq!(flash.controller().hazard_count(), 0);
    }

    #[test]
    fn chip_erase_is_selected_for_the_whole_device() {
        let mut sim = small_sim();
        let mut flash = NorFlash::new(&mut sim, Port::A1, small_geometry()).unwrap();
        flash.init().unwrap();

        flash.program(0, &pattern(512)).unwrap();
        flash.erase(0, small_geometry().total_size).unwrap();

        let sim = flash.controller();
        assert_eq!(sim.transfer_count(OperationId::EraseChip), 1);
        assert_eq!(sim.transfer_count(OperationId::EraseBlock), 0);
        assert_eq!(sim.transfer_count(OperationId::EraseSector), 0);
        assert!(sim.memory().iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn erasing_an_erased_region_reads_back_fill() {
        let mut sim = small_sim();
        let mut flash = NorFlash::new(&mut sim, Port::A1, small_geometry()).unwrap();
        flash.init().unwrap();

        flash.erase(8192, 8192).unwrap();

        let mut buf = vec![0u8; 8192];
        flash.read(8192, &mut buf).unwrap();
        assert!(buf.iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn window_updates_only_on_cache_invalidation() {
        let mut sim = small_sim();
        sim.set_device_config(&DeviceConfig::default(), &SEQUENCE_TABLE, Port::A1)
            .unwrap();

        protocol::write_enable(&mut sim, Port::A1).unwrap();
        protocol::page_program(&mut sim, Port::A1, 0, &[0xAA]).unwrap();
        protocol::wait_until_idle(&mut sim, Port::A1).unwrap();

        assert_eq!(sim.memory()[0], 0xAA);
        assert_eq!(sim.mapped_slice(Port::A1, 0, 1)[0], 0xFF);

        sim.invalidate_dcache(Port::A1, 0, 1);
        assert_eq!(sim.mapped_slice(Port::A1, 0, 1)[0], 0xAA);
    }

    #[test]
    fn programs_without_write_enable_are_ignored() {
        let mut sim = small_sim();
        sim.set_device_config(&DeviceConfig::default(), &SEQUENCE_TABLE, Port::A1)
            .unwrap();

        protocol::page_program(&mut sim, Port::A1, 0, &[0x00]).unwrap();
        protocol::wait_until_idle(&mut sim, Port::A1).unwrap();

        assert_eq!(sim.memory()[0], 0xFF);
    }

    #[test]
    fn transfers_fail_before_the_table_is_installed() {
        let mut sim = small_sim();
        assert_eq!(
            protocol::write_enable(&mut sim, Port::A1),
            Err(Error::Transport)
        );
    }

    #[test]
    fn busy_device_rejects_early_commands() {
        let mut sim = small_sim();
        sim.set_device_config(&DeviceConfig::default(), &SEQUENCE_TABLE, Port::A1)
            .unwrap();

        protocol::write_enable(&mut sim, Port::A1).unwrap();
        protocol::page_program(&mut sim, Port::A1, 0, &[0xAA]).unwrap();
        // Second program issued without draining the busy bit
        protocol::write_enable(&mut sim, Port::A1).unwrap();

        assert_eq!(sim.hazard_count(), 1);
    }

    #[test]
    fn driver_workload_never_trips_the_busy_device() {
        let mut sim = SimController::new(SimConfig {
            geometry: small_geometry(),
            busy_polls: 5,
            ..SimConfig::default()
        });
        let mut flash = NorFlash::new(&mut sim, Port::A1, small_geometry()).unwrap();
        flash.init().unwrap();

        flash.program(250, &pattern(300)).unwrap();
        flash.erase(0, 4096).unwrap();
        flash.erase(64 * 1024, 128 * 1024).unwrap();

        assert_eq!(flash.controller().hazard_count(), 0);
    }

    #[test]
    fn xip_workload_completes_inside_critical_sections() {
        let mut sim = small_sim();
        sim.set_xip_active(true);
        let mut flash = NorFlash::new(&mut sim, Port::A1, small_geometry()).unwrap();
        flash.init().unwrap();

        let data = pattern(300);
        flash.program(250, &data).unwrap();
        flash.erase(4096, 4096).unwrap();

        let mut back = vec![0u8; 300];
        flash.read(250, &mut back).unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn failed_erase_leaves_partial_state() {
        let mut sim = small_sim();
        {
            let mut flash = NorFlash::new(&mut sim, Port::A1, small_geometry()).unwrap();
            flash.init().unwrap();
            flash.program(0, &[0u8; 256]).unwrap();
            flash.program(4096, &[0u8; 256]).unwrap();
        }

        // Let the first sector erase through, fail the second
        sim.fail_on_after(Some(OperationId::EraseSector), 1);
        let mut flash = NorFlash::new(&mut sim, Port::A1, small_geometry()).unwrap();
        let journal_before = flash.controller().events().len();
        assert_eq!(flash.erase(0, 8192), Err(Error::Transport));

        // First sector erased, second untouched, and no cache invalidation
        // happened on the way out
        let sim = flash.controller();
        assert_eq!(sim.memory()[0], 0xFF);
        assert_eq!(sim.memory()[4096], 0x00);
        assert!(!sim.events()[journal_before..]
            .iter()
            .any(|e| matches!(e, SimEvent::CacheInvalidate { .. })));
    }
}

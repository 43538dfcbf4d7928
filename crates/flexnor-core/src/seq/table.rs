//! The fixed operation-to-sequence lookup table

use super::instruction::{Instruction, Pads, Phase, Sequence};
use super::opcodes;

/// Number of sequence slots in the installed table
///
/// The controller's table has 16 slots; the last four are unpopulated.
pub const SEQUENCE_COUNT: usize = 16;

/// The installed sequence table type
pub type SequenceTable = [Sequence; SEQUENCE_COUNT];

/// Identifies one logical flash operation and its slot in the table
///
/// The discriminants are load-bearing: slot 0 must hold the quad I/O read
/// sequence the controller uses for memory-mapped fetches, and the remaining
/// slots match the layout the boot image was built against. Do not reorder.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum OperationId {
    /// Quad I/O fast read; also the memory-mapped fetch sequence
    ReadQuadIo = 0,
    /// Read status register 1
    ReadStatus1 = 1,
    /// Quad output fast read
    ReadQuadOutput = 2,
    /// Set the write-enable latch
    WriteEnable = 3,
    /// Read the JEDEC id
    ReadId = 4,
    /// Erase one sector
    EraseSector = 5,
    /// Write status registers 1-2
    WriteStatus = 6,
    /// Read status register 2
    ReadStatus2 = 7,
    /// Erase one block
    EraseBlock = 8,
    /// Single-wire page program
    ProgramSingle = 9,
    /// Quad-wire page program
    ProgramQuad = 10,
    /// Erase the entire device
    EraseChip = 11,
}

impl OperationId {
    /// All operations, in table order
    pub const ALL: [Self; 12] = [
        Self::ReadQuadIo,
        Self::ReadStatus1,
        Self::ReadQuadOutput,
        Self::WriteEnable,
        Self::ReadId,
        Self::EraseSector,
        Self::WriteStatus,
        Self::ReadStatus2,
        Self::EraseBlock,
        Self::ProgramSingle,
        Self::ProgramQuad,
        Self::EraseChip,
    ];

    /// Slot index of this operation in the sequence table
    pub const fn index(self) -> usize {
        self as usize
    }

    /// The sequence installed for this operation
    pub fn sequence(self) -> &'static Sequence {
        &SEQUENCE_TABLE[self.index()]
    }
}

const fn cmd(pads: Pads, opcode: u8) -> Instruction {
    Instruction::new(Phase::Command, pads, opcode)
}

const fn addr24(pads: Pads) -> Instruction {
    Instruction::new(Phase::RowAddress, pads, 0x18)
}

const fn dummy(pads: Pads, cycles: u8) -> Instruction {
    Instruction::new(Phase::Dummy, pads, cycles)
}

const fn read(pads: Pads) -> Instruction {
    Instruction::new(Phase::Read, pads, 0x04)
}

const fn write(pads: Pads) -> Instruction {
    Instruction::new(Phase::Write, pads, 0x04)
}

/// The command sequence table, one sequence per [`OperationId`]
///
/// Built once at compile time and installed unchanged into the controller at
/// bring-up.
pub static SEQUENCE_TABLE: SequenceTable = {
    let mut table = [Sequence::EMPTY; SEQUENCE_COUNT];

    // Quad I/O fast read, used for memory-mapped fetches
    table[OperationId::ReadQuadIo as usize] = Sequence::pairs(
        cmd(Pads::Single, opcodes::QIOR),
        addr24(Pads::Quad),
        dummy(Pads::Quad, 0x06),
        read(Pads::Quad),
    );

    table[OperationId::ReadStatus1 as usize] = Sequence::pair(
        cmd(Pads::Single, opcodes::RDSR),
        read(Pads::Single),
    );

    table[OperationId::ReadQuadOutput as usize] = Sequence::pairs(
        cmd(Pads::Single, opcodes::QREAD),
        addr24(Pads::Single),
        dummy(Pads::Quad, 0x08),
        read(Pads::Quad),
    );

    table[OperationId::WriteEnable as usize] = Sequence::pair(
        cmd(Pads::Single, opcodes::WREN),
        Instruction::STOP,
    );

    table[OperationId::ReadId as usize] = Sequence::pair(
        cmd(Pads::Single, opcodes::RDID),
        read(Pads::Single),
    );

    table[OperationId::EraseSector as usize] = Sequence::pair(
        cmd(Pads::Single, opcodes::SE),
        addr24(Pads::Single),
    );

    table[OperationId::WriteStatus as usize] = Sequence::pairs(
        cmd(Pads::Single, opcodes::WRSR),
        write(Pads::Single),
        Instruction::STOP,
        Instruction::STOP,
    );

    table[OperationId::ReadStatus2 as usize] = Sequence::pair(
        cmd(Pads::Single, opcodes::RDSR2),
        read(Pads::Single),
    );

    table[OperationId::EraseBlock as usize] = Sequence::pair(
        cmd(Pads::Single, opcodes::BE),
        addr24(Pads::Single),
    );

    table[OperationId::ProgramSingle as usize] = Sequence::pairs(
        cmd(Pads::Single, opcodes::PP),
        addr24(Pads::Single),
        write(Pads::Single),
        Instruction::STOP,
    );

    table[OperationId::ProgramQuad as usize] = Sequence::pairs(
        cmd(Pads::Single, opcodes::QPP),
        addr24(Pads::Single),
        write(Pads::Quad),
        Instruction::STOP,
    );

    table[OperationId::EraseChip as usize] = Sequence::pair(
        cmd(Pads::Single, opcodes::BULKE),
        Instruction::STOP,
    );

    table
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discriminants_match_table_order() {
        for (i, op) in OperationId::ALL.iter().enumerate() {
            assert_eq!(op.index(), i);
        }
    }

    #[test]
    fn every_operation_has_a_command_phase() {
        for op in OperationId::ALL {
            let opcode = op.sequence().command_opcode();
            assert!(opcode.is_some(), "{:?} has no command phase", op);
        }
    }

    #[test]
    fn table_opcodes_match_jedec_assignments() {
        let expect = [
            (OperationId::ReadQuadIo, opcodes::QIOR),
            (OperationId::ReadStatus1, opcodes::RDSR),
            (OperationId::ReadQuadOutput, opcodes::QREAD),
            (OperationId::WriteEnable, opcodes::WREN),
            (OperationId::ReadId, opcodes::RDID),
            (OperationId::EraseSector, opcodes::SE),
            (OperationId::WriteStatus, opcodes::WRSR),
            (OperationId::ReadStatus2, opcodes::RDSR2),
            (OperationId::EraseBlock, opcodes::BE),
            (OperationId::ProgramSingle, opcodes::PP),
            (OperationId::ProgramQuad, opcodes::QPP),
            (OperationId::EraseChip, opcodes::BULKE),
        ];
        for (op, opcode) in expect {
            assert_eq!(op.sequence().command_opcode(), Some(opcode), "{:?}", op);
        }
    }

    #[test]
    fn address_bearing_sequences_use_24_bit_addresses() {
        for op in [
            OperationId::ReadQuadIo,
            OperationId::ReadQuadOutput,
            OperationId::EraseSector,
            OperationId::EraseBlock,
            OperationId::ProgramSingle,
            OperationId::ProgramQuad,
        ] {
            let addr = op
                .sequence()
                .records()
                .iter()
                .find(|r| r.phase == Phase::RowAddress)
                .unwrap_or_else(|| panic!("{:?} has no address phase", op));
            assert_eq!(addr.operand, 0x18);
        }
    }

    #[test]
    fn unpopulated_slots_are_empty() {
        for slot in &SEQUENCE_TABLE[OperationId::ALL.len()..] {
            assert_eq!(*slot, Sequence::EMPTY);
        }
    }
}

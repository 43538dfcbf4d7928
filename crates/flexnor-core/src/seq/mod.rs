//! Command sequence table
//!
//! This module provides the types for describing bus instruction sequences
//! and the fixed lookup table mapping each logical flash operation to the
//! sequence the controller executes for it.

mod instruction;
pub mod opcodes;
mod table;

pub use instruction::{Instruction, Pads, Phase, Sequence, SEQUENCE_WORDS};
pub use table::{OperationId, SequenceTable, SEQUENCE_COUNT, SEQUENCE_TABLE};

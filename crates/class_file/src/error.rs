use thiserror::Error;

use crate::constant_pool;

#[derive(Error, Debug)]
pub enum ClassFileError {
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    #[error("Expected {0}, found {1:?}")]
    UnexpectedConstantPoolEntry(&'static str, constant_pool::CpInfo),
    #[error("Invalid cp info tag: {0}")]
    InvalidCpInfoTag(u8),
    #[error("Invalid magic identifier: 0x{0:X}")]
    InvalidMagicIdentifier(u32),
    #[error("Invalid constant pool index: {0}")]
    InvalidConstantPoolIndex(u16),
    #[error("Constant pool cannot hold more than 65534 entries")]
    ConstantPoolOverflow,
    #[error("Invalid method handle reference kind: {0}")]
    InvalidReferenceKind(u8),
    #[error("Modified UTF-8 string of {0} bytes does not fit a constant pool entry")]
    StringTooLong(usize),
    #[error("Unrecognized {name} attribute layout: {reason}")]
    UnrecognizedAttributeLayout { name: String, reason: String },
    #[error("Invalid opcode 0x{opcode:02X} at offset {offset}")]
    InvalidOpcode { opcode: u8, offset: u32 },
    #[error("Instruction at offset {0} lies outside of the code array")]
    InvalidInstructionOffset(u32),
    #[error("Constant pool index {index} does not fit the operand of the instruction at offset {offset}")]
    ConstantIndexOverflow { index: u16, offset: u32 },
}

// https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-6.html

use std::io::{self, Cursor};

use byteorder::{BigEndian, ByteOrder, ReadBytesExt};

use crate::{ClassFileError, Result};

pub mod opcodes {
    pub const LDC: u8 = 0x12;
    pub const LDC_W: u8 = 0x13;
    pub const LDC2_W: u8 = 0x14;
    pub const IINC: u8 = 0x84;
    pub const TABLESWITCH: u8 = 0xaa;
    pub const LOOKUPSWITCH: u8 = 0xab;
    pub const GETSTATIC: u8 = 0xb2;
    pub const PUTSTATIC: u8 = 0xb3;
    pub const GETFIELD: u8 = 0xb4;
    pub const PUTFIELD: u8 = 0xb5;
    pub const INVOKEVIRTUAL: u8 = 0xb6;
    pub const INVOKESPECIAL: u8 = 0xb7;
    pub const INVOKESTATIC: u8 = 0xb8;
    pub const INVOKEINTERFACE: u8 = 0xb9;
    pub const INVOKEDYNAMIC: u8 = 0xba;
    pub const NEW: u8 = 0xbb;
    pub const ANEWARRAY: u8 = 0xbd;
    pub const CHECKCAST: u8 = 0xc0;
    pub const INSTANCEOF: u8 = 0xc1;
    pub const WIDE: u8 = 0xc4;
    pub const MULTIANEWARRAY: u8 = 0xc5;
}

use opcodes::*;

/// An instruction of a Code attribute. Only instructions that refer to the constant pool carry
/// structured operands; everything else is [`InstructionKind::Other`] and is written back from
/// the original code bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub offset: u32,
    pub opcode: u8,
    pub kind: InstructionKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstructionKind {
    /// `ldc`, `ldc_w` and `ldc2_w`.
    Constant { index: u16 },
    Field { index: u16 },
    /// `invokevirtual`, `invokespecial`, `invokestatic` and `invokeinterface`.
    Invoke { index: u16 },
    InvokeDynamic { index: u16 },
    /// `new`, `checkcast` and `instanceof`.
    Type { index: u16 },
    /// `anewarray` and `multianewarray`.
    Array { index: u16 },
    Other,
}
impl InstructionKind {
    pub fn constant_pool_index(&self) -> Option<u16> {
        match *self {
            InstructionKind::Constant { index }
            | InstructionKind::Field { index }
            | InstructionKind::Invoke { index }
            | InstructionKind::InvokeDynamic { index }
            | InstructionKind::Type { index }
            | InstructionKind::Array { index } => Some(index),
            InstructionKind::Other => None,
        }
    }

    pub fn set_constant_pool_index(&mut self, new_index: u16) {
        match self {
            InstructionKind::Constant { index }
            | InstructionKind::Field { index }
            | InstructionKind::Invoke { index }
            | InstructionKind::InvokeDynamic { index }
            | InstructionKind::Type { index }
            | InstructionKind::Array { index } => *index = new_index,
            InstructionKind::Other => {}
        }
    }
}

pub fn decode_instructions(code: &[u8]) -> Result<Vec<Instruction>> {
    let mut r = Cursor::new(code);
    let mut instructions = Vec::new();

    while (r.position() as usize) < code.len() {
        let offset = r.position() as u32;
        let opcode = r.read_u8()?;

        let kind = match opcode {
            LDC => InstructionKind::Constant {
                index: r.read_u8()? as u16,
            },
            LDC_W | LDC2_W => InstructionKind::Constant {
                index: r.read_u16::<BigEndian>()?,
            },
            GETSTATIC | PUTSTATIC | GETFIELD | PUTFIELD => InstructionKind::Field {
                index: r.read_u16::<BigEndian>()?,
            },
            INVOKEVIRTUAL | INVOKESPECIAL | INVOKESTATIC => InstructionKind::Invoke {
                index: r.read_u16::<BigEndian>()?,
            },
            INVOKEINTERFACE => {
                let index = r.read_u16::<BigEndian>()?;
                skip(&mut r, 2)?; // count, 0
                InstructionKind::Invoke { index }
            }
            INVOKEDYNAMIC => {
                let index = r.read_u16::<BigEndian>()?;
                skip(&mut r, 2)?; // 0, 0
                InstructionKind::InvokeDynamic { index }
            }
            NEW | CHECKCAST | INSTANCEOF => InstructionKind::Type {
                index: r.read_u16::<BigEndian>()?,
            },
            ANEWARRAY => InstructionKind::Array {
                index: r.read_u16::<BigEndian>()?,
            },
            MULTIANEWARRAY => {
                let index = r.read_u16::<BigEndian>()?;
                skip(&mut r, 1)?; // dimensions
                InstructionKind::Array { index }
            }
            TABLESWITCH => {
                skip_switch_padding(&mut r)?;
                let _default = r.read_i32::<BigEndian>()?;
                let low = r.read_i32::<BigEndian>()?;
                let high = r.read_i32::<BigEndian>()?;
                if high < low {
                    return Err(malformed_switch());
                }
                skip(&mut r, (high as i64 - low as i64 + 1) as u64 * 4)?;
                InstructionKind::Other
            }
            LOOKUPSWITCH => {
                skip_switch_padding(&mut r)?;
                let _default = r.read_i32::<BigEndian>()?;
                let npairs = r.read_i32::<BigEndian>()?;
                if npairs < 0 {
                    return Err(malformed_switch());
                }
                skip(&mut r, npairs as u64 * 8)?;
                InstructionKind::Other
            }
            WIDE => {
                let modified = r.read_u8()?;
                skip(&mut r, if modified == IINC { 4 } else { 2 })?;
                InstructionKind::Other
            }
            _ => {
                let operand_size = operand_size(opcode)
                    .ok_or(ClassFileError::InvalidOpcode { opcode, offset })?;
                skip(&mut r, operand_size)?;
                InstructionKind::Other
            }
        };

        instructions.push(Instruction {
            offset,
            opcode,
            kind,
        });
    }

    Ok(instructions)
}

/// Copies `code` and patches the constant pool operands of `instructions` into it.
pub fn encode_instructions(code: &[u8], instructions: &[Instruction]) -> Result<Vec<u8>> {
    let mut out = code.to_vec();

    for instruction in instructions {
        let Some(index) = instruction.kind.constant_pool_index() else {
            continue;
        };

        let offset = instruction.offset;
        let at = offset as usize + 1;
        if instruction.opcode == LDC {
            let index = u8::try_from(index)
                .map_err(|_| ClassFileError::ConstantIndexOverflow { index, offset })?;
            *out
                .get_mut(at)
                .ok_or(ClassFileError::InvalidInstructionOffset(offset))? = index;
        } else {
            let operand = out
                .get_mut(at..at + 2)
                .ok_or(ClassFileError::InvalidInstructionOffset(offset))?;
            BigEndian::write_u16(operand, index);
        }
    }

    Ok(out)
}

// Sizes of the fixed-length operands, for the opcodes without a structured operand.
fn operand_size(opcode: u8) -> Option<u64> {
    let size = match opcode {
        0x00..=0x0f => 0,
        0x10 => 1,        // bipush
        0x11 => 2,        // sipush
        0x15..=0x19 => 1, // iload..aload
        0x1a..=0x35 => 0,
        0x36..=0x3a => 1, // istore..astore
        0x3b..=0x83 => 0,
        IINC => 2,
        0x85..=0x98 => 0,
        0x99..=0xa8 => 2, // branches, goto, jsr
        0xa9 => 1,        // ret
        0xac..=0xb1 => 0, // returns
        0xbc => 1,        // newarray
        0xbe | 0xbf | 0xc2 | 0xc3 => 0,
        0xc6 | 0xc7 => 2, // ifnull, ifnonnull
        0xc8 | 0xc9 => 4, // goto_w, jsr_w
        _ => return None,
    };

    Some(size)
}

// Switch operands start at the next multiple of four from the start of the code array.
fn skip_switch_padding(r: &mut Cursor<&[u8]>) -> Result<()> {
    let padding = (4 - r.position() % 4) % 4;
    skip(r, padding)
}

fn skip(r: &mut Cursor<&[u8]>, n: u64) -> Result<()> {
    let position = r.position() + n;
    if position > r.get_ref().len() as u64 {
        return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
    }
    r.set_position(position);
    Ok(())
}

fn malformed_switch() -> ClassFileError {
    io::Error::new(io::ErrorKind::InvalidData, "malformed switch table").into()
}

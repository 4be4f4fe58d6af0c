//! Module emitter: serializes a [`Module`] into the host VM's binary layout.
//!
//! # Module format, version 1 (pinned)
//!
//! All multi-byte fields are little-endian.
//!
//! ```text
//! header:  magic b"MTRI" | version u16 | entry_offset u32 | local_slots u16
//! pool:    count u16, then tagged entries in first-use order:
//!            0x01 int   i64
//!            0x02 str   len u16 + UTF-8 bytes
//!            0x03 code  offset u32 + arity u8 + local_slots u16
//! code:    length u32, then the instruction stream: opcode byte followed by
//!          that opcode's fixed-width operand (none / u16 index or slot /
//!          i16 jump displacement / u16 pool index + u8 arity for calls)
//! ```
//!
//! Jump displacements are relative to the jump instruction's own offset.
//!
//! # Two-pass resolution
//!
//! Pass 1 walks every block and computes each instruction's absolute byte
//! offset from the per-opcode encoded sizes, which fixes every label's and
//! every block's offset. Pass 2 writes the stream, patching jump operands
//! with `target - instruction_offset` and code-object constants with their
//! block's offset.
//!
//! Every error this module can produce indicates a generator bug or a
//! capacity overflow, never a user mistake; callers surface them as
//! internal-consistency failures.

use crate::constant::Constant;
use crate::opcode::{Opcode, Operand};
use crate::program::BlockId;
use crate::Module;

/// Magic number opening every emitted module.
pub const MAGIC: [u8; 4] = *b"MTRI";

/// Module format version this emitter produces.
pub const VERSION: u16 = 1;

/// Emission failure. See the module docs: these are internal-consistency
/// errors, not user errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EmitError {
    /// A jump referenced a label that was never bound.
    #[error("unresolved label {label} in block {block}")]
    UnresolvedLabel { block: u32, label: u32 },

    /// A block was reserved but never filled.
    #[error("block {0} was reserved but never generated")]
    UnfilledBlock(u32),

    /// A constant pool entry was reserved but never filled.
    #[error("constant {0} was reserved but never filled")]
    UnfilledConstant(u16),

    /// A jump displacement does not fit the signed 16-bit operand.
    #[error("jump displacement {displacement} out of range in block {block}")]
    JumpOutOfRange { block: u32, displacement: i64 },

    /// An instruction carried an operand its opcode cannot encode.
    #[error("operand mismatch: {0}")]
    OperandMismatch(String),

    /// A string constant exceeds the u16 length field.
    #[error("string constant too long ({0} bytes)")]
    StringTooLong(usize),
}

/// Serialize a module into its binary form.
///
/// The module is read-only here; emission never mutates generator output,
/// so emitting twice yields identical bytes.
pub fn emit(module: &Module) -> Result<Vec<u8>, EmitError> {
    // Pass 1: absolute byte offset of every block and every instruction.
    let mut block_offsets: Vec<u32> = Vec::with_capacity(module.program.len());
    let mut instr_offsets: Vec<Vec<u32>> = Vec::with_capacity(module.program.len());
    let mut offset: u32 = 0;

    for (index, block) in module.program.iter().enumerate() {
        let block = block.ok_or(EmitError::UnfilledBlock(index as u32))?;
        block_offsets.push(offset);

        let mut offsets = Vec::with_capacity(block.instructions.len() + 1);
        for instr in &block.instructions {
            offsets.push(offset);
            offset += instr.op.encoded_size() as u32;
        }
        // Boundary entry so labels bound at block end resolve too.
        offsets.push(offset);
        instr_offsets.push(offsets);
    }
    let code_len = offset;

    let entry = module
        .program
        .block(BlockId::new(0))
        .ok_or(EmitError::UnfilledBlock(0))?;

    // Header.
    let mut out = Vec::new();
    out.extend_from_slice(&MAGIC);
    put_u16(&mut out, VERSION);
    put_u32(&mut out, block_offsets[0]);
    put_u16(&mut out, entry.local_slot_count);

    // Constant pool.
    put_u16(&mut out, module.pool.len() as u16);
    for (index, constant) in module.pool.iter().enumerate() {
        let constant = constant.ok_or(EmitError::UnfilledConstant(index as u16))?;
        match constant {
            Constant::Int(value) => {
                out.push(0x01);
                put_i64(&mut out, *value);
            }
            Constant::Str(value) => {
                out.push(0x02);
                let len = value.len();
                if len > u16::MAX as usize {
                    return Err(EmitError::StringTooLong(len));
                }
                put_u16(&mut out, len as u16);
                out.extend_from_slice(value.as_bytes());
            }
            Constant::Code(code) => {
                let block_offset = *block_offsets
                    .get(code.block.id() as usize)
                    .ok_or(EmitError::UnfilledBlock(code.block.id()))?;
                out.push(0x03);
                put_u32(&mut out, block_offset);
                out.push(code.arity);
                put_u16(&mut out, code.local_slot_count);
            }
        }
    }

    // Pass 2: the instruction stream, with jumps patched.
    put_u32(&mut out, code_len);
    for (block_index, block) in module.program.iter().enumerate() {
        let block = block.ok_or(EmitError::UnfilledBlock(block_index as u32))?;
        for (instr_index, instr) in block.instructions.iter().enumerate() {
            out.push(instr.op as u8);
            match (instr.op, instr.operand) {
                (Opcode::LoadConst, Operand::Const(index)) => {
                    if module.pool.get(index).is_none() {
                        return Err(EmitError::UnfilledConstant(index));
                    }
                    put_u16(&mut out, index);
                }
                (
                    Opcode::LoadLocal
                    | Opcode::StoreLocal
                    | Opcode::LoadGlobal
                    | Opcode::StoreGlobal,
                    Operand::Slot(slot),
                ) => put_u16(&mut out, slot),
                (Opcode::Jump | Opcode::JumpIfFalse, Operand::Label(label)) => {
                    let target_index =
                        block
                            .label_target(label)
                            .ok_or(EmitError::UnresolvedLabel {
                                block: block_index as u32,
                                label: label.id(),
                            })?;
                    let instr_abs = instr_offsets[block_index][instr_index];
                    let target_abs = instr_offsets[block_index][target_index as usize];
                    let displacement = i64::from(target_abs) - i64::from(instr_abs);
                    let displacement =
                        i16::try_from(displacement).map_err(|_| EmitError::JumpOutOfRange {
                            block: block_index as u32,
                            displacement,
                        })?;
                    put_i16(&mut out, displacement);
                }
                (Opcode::Call, Operand::Code { pool, arity }) => {
                    match module.pool.get(pool) {
                        Some(Constant::Code(_)) => {}
                        Some(_) => {
                            return Err(EmitError::OperandMismatch(format!(
                                "call target {} is not a code constant",
                                pool
                            )))
                        }
                        None => return Err(EmitError::UnfilledConstant(pool)),
                    }
                    put_u16(&mut out, pool);
                    out.push(arity);
                }
                (op, Operand::None) if op.operand_width() == 0 => {}
                (op, operand) => {
                    return Err(EmitError::OperandMismatch(format!(
                        "{:?} cannot encode {:?}",
                        op, operand
                    )))
                }
            }
        }
    }

    Ok(out)
}

fn put_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn put_i16(out: &mut Vec<u8>, value: i16) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn put_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn put_i64(out: &mut Vec<u8>, value: i64) {
    out.extend_from_slice(&value.to_le_bytes());
}

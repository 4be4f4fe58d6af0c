//! Opcode definitions and metadata.
//!
//! # Design Rules
//!
//! 1. **Explicit numbering** — wire values are assigned, never derived from
//!    declaration order, so reordering variants cannot change the format
//! 2. **Metadata over behavior** — operand widths and stack effects are
//!    tables on the enum; the emitter and the generator both read them
//! 3. **Fail loudly** — an operand that doesn't fit its opcode is an
//!    internal-consistency error at emission, never silently encoded

use crate::program::LabelId;

/// Bytecode operation, one byte on the wire.
///
/// The assigned discriminant IS the serialized opcode byte of module format
/// version 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    // === Stack / storage ===
    /// Push the constant at the pool index in the operand.
    LoadConst = 0x01,
    /// Push the value of a current-frame slot.
    LoadLocal = 0x02,
    /// Pop into a current-frame slot.
    StoreLocal = 0x03,
    /// Push the value of a module-frame slot.
    LoadGlobal = 0x04,
    /// Pop into a module-frame slot.
    StoreGlobal = 0x05,
    /// Discard the top of the stack.
    Pop = 0x06,

    // === Arithmetic / comparison ===
    /// Pop two integers, push their sum.
    Add = 0x10,
    /// Pop two integers, push their difference.
    Sub = 0x11,
    /// Pop two integers, push their product.
    Mul = 0x12,
    /// Pop two integers, push their quotient.
    Div = 0x13,
    /// Pop two integers, push the remainder.
    Mod = 0x14,
    /// Pop one integer, push its negation.
    Neg = 0x15,
    /// Pop two integers, push the boolean `left < right`.
    CmpLt = 0x16,
    /// Pop two integers, push the boolean `left > right`.
    CmpGt = 0x17,
    /// Pop two values of one type, push the boolean `left = right`.
    CmpEq = 0x18,

    // === Control flow ===
    /// Unconditional jump by the signed displacement in the operand,
    /// relative to this instruction's own offset.
    Jump = 0x20,
    /// Pop a boolean; jump by the displacement when it is false.
    JumpIfFalse = 0x21,
    /// Call the code object at the pool index in the operand; the operand
    /// also carries the arity. Arguments are popped, one result is pushed.
    Call = 0x22,
    /// Return the top of the stack from the current code object.
    Return = 0x23,
    /// Stop execution of the module's entry code.
    Halt = 0x24,

    // === Host I/O ===
    /// Pop an integer and print it on the host's standard output.
    Print = 0x30,
    /// Read an integer from the host's standard input and push it.
    Read = 0x31,
}

impl Opcode {
    /// Width in bytes of this opcode's operand on the wire.
    ///
    /// The full encoded instruction is `1 + operand_width()` bytes.
    pub fn operand_width(self) -> usize {
        match self {
            Opcode::LoadConst
            | Opcode::LoadLocal
            | Opcode::StoreLocal
            | Opcode::LoadGlobal
            | Opcode::StoreGlobal => 2,
            Opcode::Jump | Opcode::JumpIfFalse => 2,
            Opcode::Call => 3,
            Opcode::Pop
            | Opcode::Add
            | Opcode::Sub
            | Opcode::Mul
            | Opcode::Div
            | Opcode::Mod
            | Opcode::Neg
            | Opcode::CmpLt
            | Opcode::CmpGt
            | Opcode::CmpEq
            | Opcode::Return
            | Opcode::Halt
            | Opcode::Print
            | Opcode::Read => 0,
        }
    }

    /// Encoded size of a full instruction with this opcode.
    pub fn encoded_size(self) -> usize {
        1 + self.operand_width()
    }

    /// Decode an opcode byte back into an `Opcode`.
    ///
    /// Used by tests and tooling that walk an emitted instruction stream.
    pub fn from_byte(byte: u8) -> Option<Opcode> {
        use Opcode::*;
        Some(match byte {
            0x01 => LoadConst,
            0x02 => LoadLocal,
            0x03 => StoreLocal,
            0x04 => LoadGlobal,
            0x05 => StoreGlobal,
            0x06 => Pop,
            0x10 => Add,
            0x11 => Sub,
            0x12 => Mul,
            0x13 => Div,
            0x14 => Mod,
            0x15 => Neg,
            0x16 => CmpLt,
            0x17 => CmpGt,
            0x18 => CmpEq,
            0x20 => Jump,
            0x21 => JumpIfFalse,
            0x22 => Call,
            0x23 => Return,
            0x24 => Halt,
            0x30 => Print,
            0x31 => Read,
            _ => return None,
        })
    }
}

/// Operand carried by an instruction before emission.
///
/// Jump targets stay symbolic ([`LabelId`]) until the emitter patches them;
/// everything else is already concrete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    /// No operand.
    None,
    /// Constant pool index.
    Const(u16),
    /// Storage slot index.
    Slot(u16),
    /// Symbolic jump target, resolved by the emitter.
    Label(LabelId),
    /// Call target: pool index of a code object plus the call's arity.
    Code { pool: u16, arity: u8 },
}

/// A single instruction: an opcode paired with its operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub op: Opcode,
    pub operand: Operand,
}

impl Instruction {
    pub fn new(op: Opcode, operand: Operand) -> Self {
        Self { op, operand }
    }

    /// An instruction with no operand.
    pub fn simple(op: Opcode) -> Self {
        Self::new(op, Operand::None)
    }

    /// Net effect of this instruction on the operand stack depth.
    ///
    /// The generator sums these to enforce the stack-balance invariant:
    /// zero net effect per command, exactly +1 per expression.
    pub fn stack_effect(&self) -> i32 {
        match self.op {
            Opcode::LoadConst | Opcode::LoadLocal | Opcode::LoadGlobal | Opcode::Read => 1,
            Opcode::StoreLocal
            | Opcode::StoreGlobal
            | Opcode::Pop
            | Opcode::Print
            | Opcode::JumpIfFalse
            | Opcode::Return => -1,
            Opcode::Add
            | Opcode::Sub
            | Opcode::Mul
            | Opcode::Div
            | Opcode::Mod
            | Opcode::CmpLt
            | Opcode::CmpGt
            | Opcode::CmpEq => -1,
            Opcode::Neg | Opcode::Jump | Opcode::Halt => 0,
            Opcode::Call => match self.operand {
                Operand::Code { arity, .. } => 1 - arity as i32,
                // Operand mismatch is caught at emission; treat as no-op here.
                _ => 0,
            },
        }
    }
}

//! Constant pool: deduplicated literals and code-object references.

use indexmap::IndexMap;

use crate::program::BlockId;

/// Hard limit on pool entries: indices and the serialized entry count are
/// `u16` on the wire.
const MAX_ENTRIES: usize = u16::MAX as usize;

/// A reference to a compiled code object.
///
/// `block` stays symbolic until the emitter lays the program out and knows
/// each block's byte offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeRef {
    /// Block holding the code object's instructions.
    pub block: BlockId,
    /// Declared parameter count.
    pub arity: u8,
    /// High-water mark of live slots in the code object's frame.
    pub local_slot_count: u16,
}

/// A constant pool entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constant {
    /// Integer literal.
    Int(i64),
    /// String literal.
    Str(String),
    /// Code object (procedure or function body).
    Code(CodeRef),
}

/// The pool index space is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("constant pool limit exceeded")]
pub struct CapacityError;

/// Ordered, deduplicated constant pool.
///
/// Literals are deduplicated by value; entries keep first-use order, which
/// is also their serialization order. Code objects are never deduplicated:
/// each declaration reserves its own entry, before its body is generated,
/// so recursive calls can reference it.
#[derive(Debug, Clone, Default)]
pub struct ConstantPool {
    entries: Vec<Option<Constant>>,
    ints: IndexMap<i64, u16>,
    strs: IndexMap<String, u16>,
}

impl ConstantPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern an integer literal, returning its pool index.
    pub fn add_int(&mut self, value: i64) -> Result<u16, CapacityError> {
        if let Some(&index) = self.ints.get(&value) {
            return Ok(index);
        }
        let index = self.push(Constant::Int(value))?;
        self.ints.insert(value, index);
        Ok(index)
    }

    /// Intern a string literal, returning its pool index.
    pub fn add_str(&mut self, value: &str) -> Result<u16, CapacityError> {
        if let Some(&index) = self.strs.get(value) {
            return Ok(index);
        }
        let index = self.push(Constant::Str(value.to_string()))?;
        self.strs.insert(value.to_string(), index);
        Ok(index)
    }

    /// Reserve an entry for a code object whose body is not yet generated.
    pub fn reserve_code(&mut self) -> Result<u16, CapacityError> {
        if self.entries.len() >= MAX_ENTRIES {
            return Err(CapacityError);
        }
        let index = self.entries.len() as u16;
        self.entries.push(None);
        Ok(index)
    }

    /// Fill a previously reserved code entry.
    ///
    /// # Panics
    /// Panics if the index was not produced by [`reserve_code`] or was
    /// already filled; both indicate a generator bug.
    ///
    /// [`reserve_code`]: ConstantPool::reserve_code
    pub fn set_code(&mut self, index: u16, code: CodeRef) {
        let slot = self
            .entries
            .get_mut(index as usize)
            .expect("BUG: set_code index out of bounds");
        assert!(slot.is_none(), "BUG: code entry {} filled twice", index);
        *slot = Some(Constant::Code(code));
    }

    /// Number of entries, reserved ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry at an index; `None` for a reserved-but-unfilled entry.
    pub fn get(&self, index: u16) -> Option<&Constant> {
        self.entries.get(index as usize).and_then(|e| e.as_ref())
    }

    /// Iterate entries in serialization order.
    ///
    /// Yields `None` for reserved-but-unfilled entries so the emitter can
    /// report them as internal-consistency failures.
    pub fn iter(&self) -> impl Iterator<Item = Option<&Constant>> {
        self.entries.iter().map(|e| e.as_ref())
    }

    fn push(&mut self, constant: Constant) -> Result<u16, CapacityError> {
        if self.entries.len() >= MAX_ENTRIES {
            return Err(CapacityError);
        }
        let index = self.entries.len() as u16;
        self.entries.push(Some(constant));
        Ok(index)
    }
}

//! Forward-jump recording and label resolution (spec §4.4, §4.8).
//!
//! Grounded on the teacher's `compiler/bytecode.rs` `jump_placeholder` /
//! `label` / `patch_jump` trio, generalized to the spec's operand-patch
//! strategy (spec §9: "the simpler approach (operand patch) is preferred"
//! over constant-pool back-patching).

use hashbrown::HashMap;

use crate::error::{CompileError, ErrorKind};
use crate::instruction::Instruction;
use crate::{String, Vec};

/// Which field of a recorded instruction a pending forward jump patches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandSlot {
    Op1,
    Op2,
    /// The jump target was encoded as a constant-pool index; patch that
    /// pool entry instead of the instruction (spec §4.4, an accepted but
    /// non-default strategy — see spec §9).
    ConstantSlot,
}

#[derive(Debug, Clone, Copy)]
struct PendingPatch {
    instruction_index: usize,
    slot: OperandSlot,
}

/// Tracks label placements and the forward jumps still waiting on them
/// (spec §3: "label table", "forward-jump table").
#[derive(Debug, Default)]
pub struct LabelTable {
    placed: HashMap<String, u32>,
    pending: HashMap<String, Vec<PendingPatch>>,
    next_label_id: u32,
}

impl LabelTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// `next-label()`: a fresh, never-reused label name (spec §4.4).
    pub fn next_label(&mut self) -> String {
        let id = self.next_label_id;
        self.next_label_id += 1;
        crate::format!("L{}", id)
    }

    /// Returns the instruction index `name` was placed at, if it already
    /// has been. Used to distinguish a backward jump (target already
    /// known) from a forward jump (target pending) at emission time.
    pub fn placed_index(&self, name: &str) -> Option<u32> {
        self.placed.get(name).copied()
    }

    /// `add-forward-jump(name, instr_idx, operand_slot)` (spec §4.4).
    pub fn add_forward_jump(&mut self, name: impl Into<String>, instruction_index: usize, slot: OperandSlot) {
        self.pending
            .entry(name.into())
            .or_insert_with(Vec::new)
            .push(PendingPatch { instruction_index, slot });
    }

    /// `place-label(name)`: records the current instruction index and
    /// patches every pending forward jump targeting it. Placing an
    /// already-placed label is an error (spec §3, §4.4).
    pub fn place_label(
        &mut self,
        name: impl Into<String>,
        index: u32,
        instructions: &mut [Instruction],
        constants: &mut [crate::value::Value],
        line: u32,
    ) -> Result<(), CompileError> {
        let name = name.into();
        if self.placed.contains_key(&name) {
            return Err(CompileError::new(
                ErrorKind::UnresolvedLabel,
                line,
                crate::format!("label `{}` placed twice", name),
            ));
        }
        self.placed.insert(name.clone(), index);
        if let Some(patches) = self.pending.remove(&name) {
            for patch in patches {
                match patch.slot {
                    OperandSlot::Op1 => instructions[patch.instruction_index].op1 = index,
                    OperandSlot::Op2 => instructions[patch.instruction_index].op2 = index,
                    OperandSlot::ConstantSlot => {
                        let constant_index = instructions[patch.instruction_index].op1 as usize;
                        constants[constant_index] = crate::value::Value::Int(index as i64);
                    }
                }
            }
        }
        Ok(())
    }

    /// A single pass at unit close (spec §4.8): any label referenced by a
    /// forward jump but never placed is `UnresolvedLabel`.
    pub fn verify_all_resolved(&self, line: u32) -> Result<(), CompileError> {
        if let Some(name) = self.pending.keys().next() {
            return Err(CompileError::new(
                ErrorKind::UnresolvedLabel,
                line,
                crate::format!("label `{}` was never placed", name),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::{Instruction, OperandType};
    use crate::opcode::Opcode;
    use crate::value::Value;

    fn jmp_placeholder() -> Instruction {
        Instruction::new(
            Opcode::Jmp,
            OperandType::Unused,
            0,
            OperandType::Unused,
            0,
            OperandType::Unused,
            0,
        )
    }

    #[test]
    fn place_label_patches_pending_forward_jump() {
        let mut table = LabelTable::new();
        let mut instructions = alloc::vec![jmp_placeholder()];
        let mut constants: Vec<Value> = Vec::new();
        table.add_forward_jump("L_end", 0, OperandSlot::Op1);
        table.place_label("L_end", 5, &mut instructions, &mut constants, 1).unwrap();
        assert_eq!(instructions[0].op1, 5);
    }

    #[test]
    fn placing_same_label_twice_errors() {
        let mut table = LabelTable::new();
        let mut instructions: Vec<Instruction> = Vec::new();
        let mut constants: Vec<Value> = Vec::new();
        table.place_label("L", 0, &mut instructions, &mut constants, 1).unwrap();
        let err = table.place_label("L", 1, &mut instructions, &mut constants, 1).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnresolvedLabel);
    }

    #[test]
    fn unresolved_label_detected_at_unit_close() {
        let mut table = LabelTable::new();
        table.add_forward_jump("L_never", 0, OperandSlot::Op1);
        assert!(table.verify_all_resolved(1).is_err());
    }

    #[test]
    fn next_label_is_monotonic_and_unique() {
        let mut table = LabelTable::new();
        let a = table.next_label();
        let b = table.next_label();
        assert_ne!(a, b);
    }
}

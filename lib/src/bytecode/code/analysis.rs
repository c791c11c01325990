use super::{opcodes, Instruction, InstructionStream, LabelId};
use crate::util::Width;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    /// A branch jumps to a label that is not in the stream
    UndefinedLabel(LabelId),

    /// A label is placed more than once
    DuplicateLabel(LabelId),

    /// An instruction pops more than is on the stack
    StackUnderflow { index: usize, instruction: String },

    /// Two paths reach the same instruction with different stack depths
    InconsistentDepth {
        index: usize,
        expected: usize,
        found: usize,
    },

    /// Control can run past the last instruction
    FallsOffEnd,
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisError::UndefinedLabel(label) => write!(f, "branch to undefined label {}", label),
            AnalysisError::DuplicateLabel(label) => write!(f, "label {} placed twice", label),
            AnalysisError::StackUnderflow { index, instruction } => {
                write!(f, "stack underflow at #{} ({})", index, instruction)
            }
            AnalysisError::InconsistentDepth {
                index,
                expected,
                found,
            } => write!(
                f,
                "inconsistent stack depth at #{}: {} vs {}",
                index, expected, found
            ),
            AnalysisError::FallsOffEnd => write!(f, "control falls off the end of the method"),
        }
    }
}

/// Result of simulating the stack over a whole method body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackSummary {
    /// Deepest the stack ever gets, in slots
    pub max_stack: usize,

    /// Stack depth on entry to each instruction, in program order (`None` when unreachable)
    pub entry_depths: Vec<Option<usize>>,
}

/// Check that every label is placed exactly once and every branch target is placed
pub fn check_labels(stream: &InstructionStream) -> Result<HashMap<LabelId, usize>, AnalysisError> {
    let mut placed = HashMap::new();
    for (index, instruction) in stream.instructions().enumerate() {
        if let Instruction::Label(label) = instruction {
            if placed.insert(*label, index).is_some() {
                return Err(AnalysisError::DuplicateLabel(*label));
            }
        }
    }
    for instruction in stream.instructions() {
        if let Some(target) = instruction.jump_target() {
            if !placed.contains_key(&target) {
                return Err(AnalysisError::UndefinedLabel(target));
            }
        }
    }
    Ok(placed)
}

/// Simulate stack depths along every path through the method
///
/// Only depths are tracked, not types. Exception edges do not exist in this model, so code that
/// is only reachable through them is reported as unreachable.
pub fn simulate(stream: &InstructionStream) -> Result<StackSummary, AnalysisError> {
    let labels = check_labels(stream)?;
    let instructions: Vec<&Instruction> = stream.instructions().collect();
    let mut entry_depths: Vec<Option<usize>> = vec![None; instructions.len()];
    if instructions.is_empty() {
        return Ok(StackSummary {
            max_stack: 0,
            entry_depths,
        });
    }

    let mut max_stack = 0;
    let mut worklist = vec![0];
    entry_depths[0] = Some(0);

    while let Some(index) = worklist.pop() {
        let instruction = instructions[index];
        let depth = entry_depths[index].unwrap_or(0);
        let effect = instruction.stack_effect();
        if effect.pops > depth {
            return Err(AnalysisError::StackUnderflow {
                index,
                instruction: instruction.to_string(),
            });
        }
        let after = depth - effect.pops + effect.pushes;
        max_stack = max_stack.max(after).max(depth);

        let mut successors = vec![];
        if !instruction.is_terminal() {
            if index + 1 == instructions.len() {
                return Err(AnalysisError::FallsOffEnd);
            }
            successors.push(index + 1);
        }
        if let Some(target) = instruction.jump_target() {
            successors.push(labels[&target]);
        }

        for successor in successors {
            match entry_depths[successor] {
                None => {
                    entry_depths[successor] = Some(after);
                    worklist.push(successor);
                }
                Some(expected) if expected != after => {
                    return Err(AnalysisError::InconsistentDepth {
                        index: successor,
                        expected,
                        found: after,
                    })
                }
                Some(_) => (),
            }
        }
    }

    Ok(StackSummary {
        max_stack,
        entry_depths,
    })
}

/// Peak stack depth reached by the method
pub fn compute_max_stack(stream: &InstructionStream) -> Result<usize, AnalysisError> {
    simulate(stream).map(|summary| summary.max_stack)
}

/// Number of local slots the body touches, never less than the parameter length
pub fn compute_max_locals(stream: &InstructionStream, parameter_length: usize) -> usize {
    stream
        .instructions()
        .map(|instruction| match instruction {
            Instruction::LoadLocal(slot, kind) | Instruction::StoreLocal(slot, kind) => {
                *slot as usize + kind.width()
            }
            Instruction::Raw(raw) if raw.opcode == opcodes::IINC => {
                raw.operands.first().map_or(0, |slot| *slot as usize + 1)
            }
            _ => 0,
        })
        .fold(parameter_length, usize::max)
}

/// Upper bound on how much a straight-line sequence grows the stack beyond its entry depth
///
/// Pops below the entry depth are ignored (they consume values already on the stack), so
/// adding this to the entry depth never undershoots.
pub fn sequence_peak<'a>(sequence: impl IntoIterator<Item = &'a Instruction>) -> usize {
    let mut depth: usize = 0;
    let mut peak = 0;
    for instruction in sequence {
        let effect = instruction.stack_effect();
        depth = depth.saturating_sub(effect.pops) + effect.pushes;
        peak = peak.max(depth);
    }
    peak
}

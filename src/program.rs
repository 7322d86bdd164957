use std::io::Read;
use crate::BrainfuckError;
use crate::parser::{self, Instruction, SymbolPolicy};

/// Bidirectional map between matching `[` and `]` positions of a filtered stream.
///
/// Every position holding a loop instruction maps to its partner; every other
/// position maps to nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopMap {
    partners: Vec<Option<usize>>,
    pairs: usize
}

impl LoopMap {

    /// Number of matched loop pairs.
    pub fn len(&self) -> usize {
        self.pairs
    }

    pub fn is_empty(&self) -> bool {
        self.pairs == 0
    }

    /// Position of the `]` matching the `[` at `start`.
    pub fn end_of(&self, start: usize) -> Option<usize> {
        self.partner(start).filter(|&end| end > start)
    }

    /// Position of the `[` matching the `]` at `end`.
    pub fn start_of(&self, end: usize) -> Option<usize> {
        self.partner(end).filter(|&start| start < end)
    }

    /// Partner of the loop instruction at `index`, in whichever direction.
    pub fn partner(&self, index: usize) -> Option<usize> {
        self.partners.get(index).cloned().flatten()
    }

    /// All `(start, end)` pairs, ordered by start position.
    pub fn pairs<'a>(&'a self) -> impl Iterator<Item = (usize, usize)> + 'a {
        self.partners.iter()
            .enumerate()
            .filter_map(|(i, p)| match p {
                Some(j) if *j > i => Some((i, *j)),
                _ => None
            })
    }

}

/// Pairs every `[` with its `]` in a single left-to-right scan.
///
/// Pending starts live on an explicit stack, so nesting depth costs heap and not call stack.
/// A stray `]` fails at its own position; leftover starts fail at the outermost one.
pub fn resolve_loops(instructions: &[Instruction]) -> Result<LoopMap, BrainfuckError> {
    let mut partners = vec![None; instructions.len()];
    let mut pending = Vec::new();
    let mut pairs = 0;

    for (index, inst) in instructions.iter().enumerate() {
        match inst {
            Instruction::LoopStart => pending.push(index),
            Instruction::LoopEnd => {
                let start = pending.pop().ok_or(BrainfuckError::UnmatchedLoopEnd(index))?;
                partners[start] = Some(index);
                partners[index] = Some(start);
                pairs += 1;
            },
            _ => {}
        }
    }

    if let Some(&start) = pending.first() {
        return Err(BrainfuckError::UnmatchedLoopStart(start));
    }

    trace!("Resolved {} loop pairs over {} instructions.", pairs, instructions.len());
    Ok(LoopMap { partners, pairs })
}

/// A filtered instruction stream together with its resolved loops.
///
/// A `Program` can only be obtained through successful bracket matching,
/// so every loop instruction in it has a partner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    instructions: Vec<Instruction>,
    loops: LoopMap
}

impl Program {

    /// Translates `source`, rejecting any character outside the alphabet.
    pub fn parse(source: &str) -> Result<Program, BrainfuckError> {
        Program::parse_with(source, SymbolPolicy::Reject)
    }

    /// Translates `source` with an explicit policy for unknown characters.
    pub fn parse_with(source: &str, policy: SymbolPolicy) -> Result<Program, BrainfuckError> {
        let instructions = parser::filter(source, policy)?;
        Program::from_instructions(instructions)
    }

    /// Reads the whole stream and translates it.
    pub fn from_reader(mut r: impl Read, policy: SymbolPolicy) -> Result<Program, BrainfuckError> {
        let mut source = String::new();
        r.read_to_string(&mut source)?;
        Program::parse_with(&source, policy)
    }

    /// Builds a program from an already filtered stream.
    pub fn from_instructions(instructions: Vec<Instruction>) -> Result<Program, BrainfuckError> {
        let loops = resolve_loops(&instructions)?;
        Ok(Program { instructions, loops })
    }

    pub fn instructions(&self) -> &[Instruction] {
        &*self.instructions
    }

    pub fn loops(&self) -> &LoopMap {
        &self.loops
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

}

/// A consumer of a resolved [`Program`](crate::program::Program).
///
/// Both the compiler and the interpreter sit behind this trait, so the same
/// front end feeds either of them.
pub trait Backend {

    /// What consuming a program produces.
    type Output;

    /// Consumes the given program.
    fn consume(&mut self, program: &Program) -> Result<Self::Output, BrainfuckError>;

}

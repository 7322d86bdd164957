use std::fmt;
use std::io::Write;
use std::num::Wrapping;
use itertools::Itertools;
use crate::BrainfuckError;

/// Default number of cells on a tape.
pub const DEFAULT_TAPE_SIZE: usize = 30_000;

/// What happens when the data pointer is moved past either end of the tape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerPolicy {
    /// Leaving the tape is fatal and reported as
    /// [`PointerOutOfRange`](crate::BrainfuckError::PointerOutOfRange).
    Checked,
    /// The pointer wraps around modulo the tape length.
    Wrap
}

impl Default for PointerPolicy {
    fn default() -> Self {
        PointerPolicy::Checked
    }
}

/// Fixed-size array of 8-bit cells plus the data pointer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tape {
    cells: Vec<u8>,
    position: usize,
    policy: PointerPolicy
}

impl Tape {

    /// Creates a zeroed tape with the pointer on the first cell.
    /// Panics if `size` is zero.
    pub fn new(size: usize, policy: PointerPolicy) -> Tape {
        if size == 0 {
            panic!("Tape size must be at least 1.");
        }
        Tape {
            cells: vec![0; size],
            position: 0,
            policy
        }
    }

    pub fn cells(&self) -> &[u8] {
        &*self.cells
    }

    /// Returns the position of the data pointer.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn policy(&self) -> PointerPolicy {
        self.policy
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Value of the current cell.
    pub fn get(&self) -> u8 {
        self.cells[self.position]
    }

    pub fn set(&mut self, value: u8) {
        self.cells[self.position] = value;
    }

    /// Adds `amount` to the current cell, modulo 256.
    pub fn add(&mut self, amount: Wrapping<u8>) {
        let value = &mut self.cells[self.position];
        *value = value.wrapping_add(amount.0);
    }

    /// Moves the pointer by `offset` cells. `index` is the instruction doing the move,
    /// used only for error reporting.
    pub fn shift(&mut self, offset: isize, index: usize) -> Result<(), BrainfuckError> {
        let len = self.cells.len() as isize;
        let target = self.position as isize + offset;
        match self.policy {
            PointerPolicy::Checked => {
                if target < 0 || target >= len {
                    return Err(BrainfuckError::PointerOutOfRange { pointer: target, index });
                }
                self.position = target as usize;
            },
            PointerPolicy::Wrap => {
                self.position = target.rem_euclid(len) as usize;
            }
        }
        Ok(())
    }

    /// Number of leading cells worth showing: up to the last non-zero cell or the pointer.
    fn used_len(&self) -> usize {
        let last = self.cells.iter().rposition(|&c| c != 0).unwrap_or(0);
        last.max(self.position) + 1
    }

    /// Dumps the used part of the tape to the given stream.
    pub fn dump(&self, target: &mut impl Write) -> Result<(), BrainfuckError> {
        writeln!(target, "{}", self)?;
        Ok(())
    }

}

/// Prints the cells up to the last interesting one, the current cell in brackets.
impl fmt::Display for Tape {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let cells = self.cells[..self.used_len()].iter()
            .enumerate()
            .map(|(i, c)| if i == self.position { format!("[{}]", c) } else { c.to_string() })
            .join(" ");
        write!(f, "memory: [ {} ] pointer: {}", cells, self.position)
    }
}

impl Default for Tape {
    fn default() -> Self {
        Tape::new(DEFAULT_TAPE_SIZE, PointerPolicy::default())
    }
}

use std::fmt;
use std::io::Read;
use std::num::Wrapping;
use crate::BrainfuckError;
use crate::program::Program;

/// A single Brainfuck instruction.
///
/// Pointer moves and cell adjustments always come out of the filter with a unit
/// offset: `Move { offset: 1 }` is `>`, `Add { amount: Wrapping(255) }` is `-`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Instruction {
    Move { offset: isize },
    Add { amount: Wrapping<u8> },
    Output,
    Input,
    LoopStart,
    LoopEnd
}

impl Instruction {

    /// Maps a source character to its instruction, if it is part of the alphabet.
    pub fn from_symbol(c: char) -> Option<Instruction> {
        use Instruction::*;
        match c {
            '>' => Some(Move { offset: 1 }),
            '<' => Some(Move { offset: -1 }),
            '+' => Some(Add { amount: Wrapping(1) }),
            '-' => Some(Add { amount: Wrapping(255) }),
            '.' => Some(Output),
            ',' => Some(Input),
            '[' => Some(LoopStart),
            ']' => Some(LoopEnd),
            _ => None
        }
    }

    /// The source symbol this instruction was parsed from.
    pub fn symbol(self) -> char {
        use Instruction::*;
        match self {
            Move { offset } if offset < 0 => '<',
            Move { .. } => '>',
            Add { amount: Wrapping(255) } => '-',
            Add { .. } => '+',
            Output => '.',
            Input => ',',
            LoopStart => '[',
            LoopEnd => ']'
        }
    }

}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// What the filter does with a character that is neither an instruction nor whitespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolPolicy {
    /// Fail the whole translation with [`InvalidSymbol`](crate::BrainfuckError::InvalidSymbol).
    Reject,
    /// Drop the character and log a warning.
    Skip
}

impl Default for SymbolPolicy {
    fn default() -> Self {
        SymbolPolicy::Reject
    }
}

fn is_whitespace(c: char) -> bool {
    match c {
        ' ' | '\t' | '\n' | '\r' => true,
        _ => false
    }
}

/// Strips whitespace from `source` and turns the remaining characters into instructions.
pub fn filter(source: &str, policy: SymbolPolicy) -> Result<Vec<Instruction>, BrainfuckError> {
    let mut v = Vec::with_capacity(source.len());
    for (index, c) in source.char_indices() {
        if let Some(inst) = Instruction::from_symbol(c) {
            v.push(inst);
        } else if is_whitespace(c) {
            continue;
        } else {
            match policy {
                SymbolPolicy::Reject => {
                    return Err(BrainfuckError::InvalidSymbol { symbol: c, index });
                },
                SymbolPolicy::Skip => {
                    warn!("Skipping invalid symbol {:?} at offset {}", c, index);
                }
            }
        }
    }
    Ok(v)
}

/// Parses a Brainfuck program from the given stream, rejecting unknown symbols.
pub fn parse(r: impl Read) -> Result<Program, BrainfuckError> {
    Program::from_reader(r, SymbolPolicy::Reject)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use Instruction::*;

    #[test]
    fn test_empty_source() {
        assert_eq!(filter("", SymbolPolicy::Reject).unwrap(), vec![]);
        assert_eq!(filter(" \t\r\n", SymbolPolicy::Reject).unwrap(), vec![]);
    }

    #[test]
    fn test_simple_filter() {
        assert_eq!(filter("+-><.,[]", SymbolPolicy::Reject).unwrap(), vec![
            Add { amount: Wrapping(1) },
            Add { amount: Wrapping(255) },
            Move { offset: 1 },
            Move { offset: -1 },
            Output,
            Input,
            LoopStart,
            LoopEnd
        ]);
    }

    #[test]
    fn test_whitespace_is_dropped() {
        assert_eq!(
            filter("+ +\n\t.\r\n", SymbolPolicy::Reject).unwrap(),
            filter("++.", SymbolPolicy::Reject).unwrap()
        );
    }

    #[test]
    fn test_reject_reports_offset() {
        match filter("++ a+", SymbolPolicy::Reject) {
            Err(BrainfuckError::InvalidSymbol { symbol: 'a', index: 3 }) => {},
            r => panic!("Expected invalid symbol error. Got: {:?}", r)
        }

        // Offsets are in bytes, so multibyte characters shift them
        match filter("é!", SymbolPolicy::Reject) {
            Err(BrainfuckError::InvalidSymbol { symbol: 'é', index: 0 }) => {},
            r => panic!("Expected invalid symbol error. Got: {:?}", r)
        }
    }

    #[test]
    fn test_skip_ignores_comments() {
        let insts = filter("add two: ++ then print.", SymbolPolicy::Skip).unwrap();
        assert_eq!(insts, vec![
            Add { amount: Wrapping(1) },
            Add { amount: Wrapping(1) },
            Output
        ]);
    }

    #[test]
    fn test_symbols_print_back() {
        let source = "><+-.,[]";
        let printed: String = filter(source, SymbolPolicy::Reject).unwrap()
            .iter()
            .map(|i| i.to_string())
            .collect();
        assert_eq!(printed, source);
    }

    #[test]
    fn test_parse_from_stream() {
        let program = parse(Cursor::new("+[-]\n")).unwrap();
        assert_eq!(program.len(), 4);
        assert!(parse(Cursor::new("+x")).is_err());
    }
}

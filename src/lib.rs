//! Brainfuck front end shared by a basic-block compiler and an interpreter.
//!
//! Source text is filtered into a flat instruction stream, loops are resolved once
//! into a [`LoopMap`](crate::program::LoopMap), and the resulting
//! [`Program`](crate::program::Program) is consumed by either backend.
//! Both backends run against a [`Machine`](crate::machine::Machine) and agree on
//! output, consumed input and final tape contents.

#[macro_use] extern crate log;

pub mod compiler;
pub mod interpreter;
pub mod io;
pub mod machine;
pub mod parser;
pub mod program;
pub mod tape;
mod error;

pub use error::BrainfuckError;
pub use compiler::{Compiler, CompiledProgram};
pub use interpreter::Interpreter;
pub use machine::{EofPolicy, Machine, Outcome};
pub use parser::{Instruction, SymbolPolicy};
pub use program::{Backend, LoopMap, Program};
pub use tape::{PointerPolicy, Tape};

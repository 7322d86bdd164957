use crate::BrainfuckError;
use crate::io::{ByteSink, ByteSource};
use crate::machine::{Machine, Outcome};
use crate::parser::Instruction;
use crate::program::{Backend, Program};

/// Executes a [`Program`](crate::program::Program) directly on a [`Machine`](crate::machine::Machine).
pub struct Interpreter<'m, R, W>
    where R: ByteSource,
          W: ByteSink
{
    machine: &'m mut Machine<R, W>
}

impl<'m, R, W> Interpreter<'m, R, W>
    where R: ByteSource,
          W: ByteSink
{

    /// Creates an [`Interpreter`](crate::interpreter::Interpreter) running on the given machine.
    pub fn new(machine: &'m mut Machine<R, W>) -> Interpreter<'m, R, W> {
        Interpreter { machine }
    }

    /// Returns a reference to the machine used by this [`Interpreter`](crate::interpreter::Interpreter).
    pub fn machine(&self) -> &Machine<R, W> {
        &*self.machine
    }

    /// Executes the given program until the program counter falls off its end.
    ///
    /// Jumps go through the precomputed loop map, so they cost the same whatever the body length.
    pub fn run(&mut self, program: &Program) -> Result<Outcome, BrainfuckError> {
        let instructions = program.instructions();
        let loops = program.loops();
        let mut pc = 0;

        while pc < instructions.len() {
            self.machine.tick()?;
            match instructions[pc] {

                Instruction::Move { offset } => {
                    self.machine.shift(offset, pc)?;
                },

                Instruction::Add { amount } => {
                    self.machine.add(amount);
                },

                Instruction::Output => {
                    self.machine.write()?;
                },

                Instruction::Input => {
                    self.machine.read()?;
                },

                Instruction::LoopStart => {
                    if self.machine.is_zero() {
                        pc = loops.end_of(pc).ok_or(BrainfuckError::UnmatchedLoopStart(pc))?;
                    }
                },

                Instruction::LoopEnd => {
                    if !self.machine.is_zero() {
                        pc = loops.start_of(pc).ok_or(BrainfuckError::UnmatchedLoopEnd(pc))?;
                    }
                }

            }
            pc += 1;
        }

        Ok(self.machine.outcome())
    }

}

impl<'m, R, W> Backend for Interpreter<'m, R, W>
    where R: ByteSource,
          W: ByteSink
{
    type Output = Outcome;

    fn consume(&mut self, program: &Program) -> Result<Outcome, BrainfuckError> {
        debug!("Interpreting {} instructions.", program.len());
        self.run(program)
    }
}

use std::io::{Empty, Sink};
use std::num::Wrapping;
use crate::BrainfuckError;
use crate::io::{ByteSink, ByteSource};
use crate::tape::{PointerPolicy, Tape, DEFAULT_TAPE_SIZE};

/// Value stored by `,` once the input source has nothing left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EofPolicy {
    /// Store 0.
    Zero,
    /// Store a fixed byte, e.g. 255 to mimic C's `EOF`.
    Value(u8),
    /// Leave the current cell untouched.
    Unchanged
}

impl Default for EofPolicy {
    fn default() -> Self {
        EofPolicy::Zero
    }
}

/// Summary of a run that reached the end of the program.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Outcome {
    /// Bytes actually consumed from the input source.
    pub bytes_read: usize,
    /// Bytes sent to the output sink.
    pub bytes_written: usize,
    /// How many `,` executions found the input exhausted.
    pub eof_reads: usize
}

impl Outcome {

    /// `true` if at least one read hit the end of the input.
    pub fn input_exhausted(&self) -> bool {
        self.eof_reads > 0
    }

}

/// Builder for the [`Machine`](crate::machine::Machine) struct.
pub struct MachineBuilder<R, W>
    where R: ByteSource,
          W: ByteSink
{
    tape_size: usize,
    pointer_policy: PointerPolicy,
    eof_policy: EofPolicy,
    step_limit: Option<u64>,
    input: Option<R>,
    output: Option<W>
}

impl<R, W> Default for MachineBuilder<R, W>
    where R: ByteSource,
          W: ByteSink
{
    fn default() -> Self {
        MachineBuilder::new()
    }
}

impl<R, W> MachineBuilder<R, W>
    where R: ByteSource,
          W: ByteSink
{

    /// Creates a new [`MachineBuilder`](crate::machine::MachineBuilder) with the default settings.
    pub fn new() -> MachineBuilder<R, W> {
        MachineBuilder {
            tape_size: DEFAULT_TAPE_SIZE,
            pointer_policy: PointerPolicy::default(),
            eof_policy: EofPolicy::default(),
            step_limit: None,
            input: None,
            output: None
        }
    }

    /// Sets the tape size.
    /// Panics if the size is set to zero.
    pub fn tape_size(&mut self, tape_size: usize) -> &mut Self {
        if tape_size == 0 {
            panic!("Tape size must be at least 1.");
        }
        self.tape_size = tape_size;
        self
    }

    /// Sets what happens when the data pointer leaves the tape.
    pub fn pointer_policy(&mut self, policy: PointerPolicy) -> &mut Self {
        self.pointer_policy = policy;
        self
    }

    /// Sets the value stored by `,` when the input is exhausted.
    pub fn eof_policy(&mut self, policy: EofPolicy) -> &mut Self {
        self.eof_policy = policy;
        self
    }

    /// Caps the number of steps a run may take.
    pub fn step_limit(&mut self, limit: u64) -> &mut Self {
        self.step_limit = Some(limit);
        self
    }

    /// Sets the source that will be used as input for the `,` instruction.
    pub fn input(&mut self, input: R) -> &mut Self {
        self.input = Some(input);
        self
    }

    /// Sets the sink that will be used as output for the `.` instruction.
    pub fn output(&mut self, output: W) -> &mut Self {
        self.output = Some(output);
        self
    }

    /// Builds the actual [`Machine`](crate::machine::Machine).
    pub fn build(&mut self) -> Machine<R, W> {
        Machine {
            tape: Tape::new(self.tape_size, self.pointer_policy),
            eof_policy: self.eof_policy,
            step_limit: self.step_limit,
            steps: 0,
            outcome: Outcome::default(),
            input: self.input.take(),
            output: self.output.take()
        }
    }

}

/// The state a single execution owns: the tape, its I/O endpoints and run counters.
///
/// Both backends drive a program exclusively through the primitives below,
/// which is what keeps their observable behavior identical.
/// A missing input behaves as an exhausted one, a missing output discards bytes.
pub struct Machine<R, W>
    where R: ByteSource,
          W: ByteSink
{
    tape: Tape,
    eof_policy: EofPolicy,
    step_limit: Option<u64>,
    steps: u64,
    outcome: Outcome,
    input: Option<R>,
    output: Option<W>
}

impl Default for Machine<Empty, Sink> {
    fn default() -> Self {
        MachineBuilder::new().build()
    }
}

impl<R, W> Machine<R, W>
    where R: ByteSource,
          W: ByteSink
{

    /// Creates a [`MachineBuilder`](crate::machine::MachineBuilder) to configure
    /// a new [`Machine`](crate::machine::Machine).
    pub fn builder() -> MachineBuilder<R, W> {
        MachineBuilder::new()
    }

    /// Returns a reference to the tape of this [`Machine`](crate::machine::Machine).
    pub fn tape(&self) -> &Tape {
        &self.tape
    }

    /// Returns a reference to the input source.
    pub fn input(&self) -> Option<&R> {
        self.input.as_ref()
    }

    /// Returns a reference to the output sink.
    pub fn output(&self) -> Option<&W> {
        self.output.as_ref()
    }

    /// Counters accumulated so far.
    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    /// Steps taken so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Accounts for one step, failing once the limit is passed.
    pub fn tick(&mut self) -> Result<(), BrainfuckError> {
        self.steps += 1;
        match self.step_limit {
            Some(limit) if self.steps > limit => Err(BrainfuckError::StepLimitExceeded(limit)),
            _ => Ok(())
        }
    }

    pub fn shift(&mut self, offset: isize, index: usize) -> Result<(), BrainfuckError> {
        self.tape.shift(offset, index)
    }

    pub fn add(&mut self, amount: Wrapping<u8>) {
        self.tape.add(amount);
    }

    pub fn is_zero(&self) -> bool {
        self.tape.get() == 0
    }

    /// Sends the current cell to the output sink.
    pub fn write(&mut self) -> Result<(), BrainfuckError> {
        if let Some(ref mut output) = self.output {
            output.write_byte(self.tape.get())?;
        }
        self.outcome.bytes_written += 1;
        Ok(())
    }

    /// Reads one byte into the current cell, applying the EOF policy if there is none.
    pub fn read(&mut self) -> Result<(), BrainfuckError> {
        let next = match self.input {
            Some(ref mut input) => input.read_byte()?,
            None => None
        };
        match next {
            Some(value) => {
                self.outcome.bytes_read += 1;
                self.tape.set(value);
            },
            None => {
                self.outcome.eof_reads += 1;
                match self.eof_policy {
                    EofPolicy::Zero => self.tape.set(0),
                    EofPolicy::Value(value) => self.tape.set(value),
                    EofPolicy::Unchanged => {}
                }
            }
        }
        Ok(())
    }

}

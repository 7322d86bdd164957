use std::collections::HashSet;
use std::fmt;
use std::io::Write;
use std::mem;
use std::num::Wrapping;
use itertools::Itertools;
use crate::BrainfuckError;
use crate::io::{ByteSink, ByteSource};
use crate::machine::{Machine, Outcome};
use crate::parser::Instruction;
use crate::program::{Backend, Program};

/// Index of a block inside a [`Cfg`](crate::compiler::Cfg).
pub type BlockId = usize;

/// The block every compiled program starts from.
pub const ENTRY: BlockId = 0;

/// A non-branching operation inside a basic block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    /// Moves the data pointer. `index` is the source instruction, kept for error reports.
    Move { offset: isize, index: usize },
    Add { amount: Wrapping<u8> },
    Output,
    Input
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Op::Move { offset, .. } => write!(f, "move {}", offset),
            Op::Add { amount: Wrapping(amount) } => write!(f, "add {}", amount),
            Op::Output => write!(f, "output"),
            Op::Input => write!(f, "input")
        }
    }
}

/// The single control transfer ending a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminator {
    Jump(BlockId),
    /// Goes to `nonzero` if the current cell is not 0, to `zero` otherwise.
    Branch { nonzero: BlockId, zero: BlockId },
    Return
}

impl Terminator {

    pub fn successors(&self) -> Vec<BlockId> {
        match *self {
            Terminator::Jump(target) => vec![target],
            Terminator::Branch { nonzero, zero } => vec![nonzero, zero],
            Terminator::Return => vec![]
        }
    }

}

/// Role of a block in the graph, also used as its label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Entry,
    LoopGuard,
    LoopBody,
    LoopEnd
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            BlockKind::Entry => "entry",
            BlockKind::LoopGuard => "loop_guard",
            BlockKind::LoopBody => "loop_body",
            BlockKind::LoopEnd => "loop_end"
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicBlock {
    id: BlockId,
    kind: BlockKind,
    ops: Vec<Op>,
    terminator: Terminator
}

impl BasicBlock {

    pub fn id(&self) -> BlockId {
        self.id
    }

    pub fn kind(&self) -> BlockKind {
        self.kind
    }

    pub fn ops(&self) -> &[Op] {
        &*self.ops
    }

    pub fn terminator(&self) -> Terminator {
        self.terminator
    }

    /// Label used when dumping the graph.
    pub fn label(&self) -> String {
        if self.kind == BlockKind::Entry {
            self.kind.to_string()
        } else {
            format!("{}.{}", self.kind, self.id)
        }
    }

}

/// The blocks generated for one matched `[` `]` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopRegion {
    /// Position of the `[` in the program.
    pub start: usize,
    /// Position of the matching `]`.
    pub end: usize,
    /// Block testing the current cell. The only way into the body.
    pub header: BlockId,
    /// First block of the body.
    pub body: BlockId,
    /// Block carrying the back edge to `header`.
    pub latch: BlockId,
    /// Continuation after the loop, reached only from `header`.
    pub exit: BlockId
}

/// Control-flow graph of a whole program.
///
/// Blocks are numbered in creation order, so every edge goes to a higher id
/// except the back edge of each loop, from its latch to its header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cfg {
    blocks: Vec<BasicBlock>,
    loops: Vec<LoopRegion>
}

impl Cfg {

    pub fn blocks(&self) -> &[BasicBlock] {
        &*self.blocks
    }

    pub fn block(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id]
    }

    /// Loop regions, ordered by the position of their `[`.
    pub fn loops(&self) -> &[LoopRegion] {
        &*self.loops
    }

    /// Blocks that branch to `id`.
    pub fn predecessors(&self, id: BlockId) -> Vec<BlockId> {
        self.blocks.iter()
            .filter(|b| b.terminator.successors().contains(&id))
            .map(|b| b.id)
            .collect()
    }

    /// Blocks reachable from the body of `region` without going back through its header.
    pub fn body_blocks(&self, region: &LoopRegion) -> HashSet<BlockId> {
        let mut seen = HashSet::new();
        let mut stack = vec![region.body];
        while let Some(id) = stack.pop() {
            if id == region.header || !seen.insert(id) {
                continue;
            }
            stack.extend(self.blocks[id].terminator.successors());
        }
        seen
    }

    /// Checks the structural guarantees of the graph.
    ///
    /// - every edge goes forward, except the back edge from each latch to its header;
    /// - a loop body and a loop exit are entered from the loop header only;
    /// - two loop bodies share blocks exactly when one loop is nested in the other.
    pub fn verify(&self) -> Result<(), BrainfuckError> {
        let mut predecessors = vec![Vec::new(); self.blocks.len()];
        for block in &self.blocks {
            for target in block.terminator.successors() {
                if target >= self.blocks.len() {
                    return Err(format!("Block {} branches to missing block {}", block.id, target).into());
                }
                predecessors[target].push(block.id);
            }
        }

        let back_edges: HashSet<(BlockId, BlockId)> = self.loops.iter()
            .map(|r| (r.latch, r.header))
            .collect();
        for block in &self.blocks {
            for target in block.terminator.successors() {
                if target <= block.id && !back_edges.contains(&(block.id, target)) {
                    return Err(format!("Edge {} -> {} goes backwards", block.id, target).into());
                }
            }
        }

        for region in &self.loops {
            if [region.header, region.body, region.latch, region.exit].iter().any(|&b| b >= self.blocks.len()) {
                return Err(format!("Loop at {} refers to a missing block", region.start).into());
            }
        }

        let bodies: Vec<HashSet<BlockId>> = self.loops.iter().map(|r| self.body_blocks(r)).collect();
        for (region, body) in self.loops.iter().zip(&bodies) {
            let header = &self.blocks[region.header];
            if header.terminator != (Terminator::Branch { nonzero: region.body, zero: region.exit }) {
                return Err(format!("Loop at {} has a malformed guard", region.start).into());
            }
            if self.blocks[region.latch].terminator != Terminator::Jump(region.header) {
                return Err(format!("Loop at {} has a malformed latch", region.start).into());
            }
            if predecessors[region.body] != [region.header] || predecessors[region.exit] != [region.header] {
                return Err(format!("Loop at {} has more than one entry", region.start).into());
            }
            if body.contains(&region.exit) {
                return Err(format!("Loop at {} reaches its exit from the body", region.start).into());
            }
        }

        for ((a, body_a), (b, body_b)) in self.loops.iter().zip(&bodies).tuple_combinations() {
            let shared = !body_a.is_disjoint(body_b);
            let nested = (a.start < b.start && b.end < a.end) || (b.start < a.start && a.end < b.end);
            if shared != nested {
                return Err(format!("Loops at {} and {} overlap without nesting", a.start, b.start).into());
            }
        }

        Ok(())
    }

}

impl fmt::Display for BasicBlock {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}:", self.label())?;
        for op in &self.ops {
            writeln!(f, "    {}", op)?;
        }
        match self.terminator {
            Terminator::Jump(target) => {
                writeln!(f, "    br {}", target)
            },
            Terminator::Branch { nonzero, zero } => {
                writeln!(f, "    br_nonzero {}, {}", nonzero, zero)
            },
            Terminator::Return => {
                writeln!(f, "    ret")
            }
        }
    }
}

impl fmt::Display for Cfg {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.blocks.iter().join("\n"))
    }
}

struct PendingBlock {
    kind: BlockKind,
    ops: Vec<Op>,
    terminator: Option<Terminator>
}

/// Appends blocks and fills the one it is positioned at.
struct CfgBuilder {
    blocks: Vec<PendingBlock>,
    current: BlockId
}

impl CfgBuilder {

    /// Creates a builder positioned at an empty entry block.
    fn new() -> CfgBuilder {
        let mut builder = CfgBuilder {
            blocks: Vec::new(),
            current: ENTRY
        };
        builder.append_block(BlockKind::Entry);
        builder
    }

    fn append_block(&mut self, kind: BlockKind) -> BlockId {
        self.blocks.push(PendingBlock {
            kind,
            ops: Vec::new(),
            terminator: None
        });
        self.blocks.len() - 1
    }

    fn position_at_end(&mut self, id: BlockId) {
        self.current = id;
    }

    fn current_block(&self) -> BlockId {
        self.current
    }

    fn build_op(&mut self, op: Op) {
        self.blocks[self.current].ops.push(op);
    }

    fn terminate(&mut self, terminator: Terminator) -> Result<(), BrainfuckError> {
        let block = &mut self.blocks[self.current];
        if block.terminator.is_some() {
            return Err(format!("Block {} already has a terminator", self.current).into());
        }
        block.terminator = Some(terminator);
        Ok(())
    }

    fn build_unconditional_branch(&mut self, target: BlockId) -> Result<(), BrainfuckError> {
        self.terminate(Terminator::Jump(target))
    }

    fn build_conditional_branch(&mut self, nonzero: BlockId, zero: BlockId) -> Result<(), BrainfuckError> {
        self.terminate(Terminator::Branch { nonzero, zero })
    }

    fn build_return(&mut self) -> Result<(), BrainfuckError> {
        self.terminate(Terminator::Return)
    }

    /// Seals the graph. Every block must have been terminated.
    fn finish(self, loops: Vec<LoopRegion>) -> Result<Cfg, BrainfuckError> {
        let blocks = self.blocks.into_iter()
            .enumerate()
            .map(|(id, b)| match b.terminator {
                Some(terminator) => Ok(BasicBlock { id, kind: b.kind, ops: b.ops, terminator }),
                None => Err(BrainfuckError::from(format!("Block {} has no terminator", id)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Cfg { blocks, loops })
    }

}

struct LoopFrame {
    start: usize,
    end: usize,
    header: BlockId,
    body: BlockId,
    exit: BlockId
}

/// Compiler from a [`Program`](crate::program::Program) to a graph of basic blocks.
pub struct Compiler {
    builder: CfgBuilder,
    pending: Vec<LoopFrame>,
    loops: Vec<LoopRegion>
}

impl Default for Compiler {
    fn default() -> Self {
        Compiler::new()
    }
}

impl Compiler {

    /// Creates a new compiler positioned at the entry block.
    pub fn new() -> Compiler {
        Compiler {
            builder: CfgBuilder::new(),
            pending: Vec::new(),
            loops: Vec::new()
        }
    }

    /// Compiles the given program.
    ///
    /// Loops are opened and closed against the program's loop map with an explicit
    /// stack of open frames, so nesting depth never turns into call depth.
    pub fn compile(&mut self, program: &Program) -> Result<CompiledProgram, BrainfuckError> {
        let map = program.loops();
        self.builder = CfgBuilder::new();
        self.pending.clear();
        self.loops.clear();

        for (index, instruction) in program.instructions().iter().enumerate() {
            match *instruction {

                Instruction::Move { offset } => {
                    self.builder.build_op(Op::Move { offset, index });
                },

                Instruction::Add { amount } => {
                    self.builder.build_op(Op::Add { amount });
                },

                Instruction::Output => {
                    self.builder.build_op(Op::Output);
                },

                Instruction::Input => {
                    self.builder.build_op(Op::Input);
                },

                Instruction::LoopStart => {
                    // The idea is having three blocks like this:
                    //
                    // ```
                    //     br loop_guard
                    //
                    // loop_guard:
                    //     <jump to loop_body if *ptr != 0, to loop_end otherwise>
                    //
                    // loop_body:
                    //     <loop body>
                    //     br loop_guard
                    //
                    // loop_end:
                    //     <continue generation from here>
                    // ```
                    let end = map.end_of(index).ok_or(BrainfuckError::UnmatchedLoopStart(index))?;
                    let header = self.builder.append_block(BlockKind::LoopGuard);
                    let body = self.builder.append_block(BlockKind::LoopBody);
                    let exit = self.builder.append_block(BlockKind::LoopEnd);

                    self.builder.build_unconditional_branch(header)?;
                    self.builder.position_at_end(header);
                    self.builder.build_conditional_branch(body, exit)?;
                    self.builder.position_at_end(body);

                    self.pending.push(LoopFrame { start: index, end, header, body, exit });
                },

                Instruction::LoopEnd => {
                    let frame = match self.pending.pop() {
                        Some(frame) if frame.end == index => frame,
                        _ => return Err(BrainfuckError::UnmatchedLoopEnd(index))
                    };

                    // Close the body and let generation continue after the loop
                    let latch = self.builder.current_block();
                    self.builder.build_unconditional_branch(frame.header)?;
                    self.builder.position_at_end(frame.exit);

                    self.loops.push(LoopRegion {
                        start: frame.start,
                        end: frame.end,
                        header: frame.header,
                        body: frame.body,
                        latch,
                        exit: frame.exit
                    });
                }

            }
        }

        if let Some(frame) = self.pending.first() {
            return Err(BrainfuckError::UnmatchedLoopStart(frame.start));
        }

        self.builder.build_return()?;

        let builder = mem::replace(&mut self.builder, CfgBuilder::new());
        let mut loops = mem::replace(&mut self.loops, Vec::new());
        loops.sort_by_key(|region| region.start);

        let cfg = builder.finish(loops)?;
        debug!("Compiled {} instructions into {} blocks.", program.len(), cfg.blocks().len());
        Ok(CompiledProgram { cfg })
    }

}

impl Backend for Compiler {
    type Output = CompiledProgram;

    fn consume(&mut self, program: &Program) -> Result<CompiledProgram, BrainfuckError> {
        self.compile(program)
    }
}

/// Compiled Brainfuck program, ready to be handed to an emitter or run in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledProgram {
    cfg: Cfg
}

impl CompiledProgram {

    pub fn cfg(&self) -> &Cfg {
        &self.cfg
    }

    /// Walks the graph from the entry block on the given machine until a `ret`.
    ///
    /// Steps are charged like the interpreter charges them: one per operation and one
    /// per `br`. A jump into a guard stands for the `[`, a latch jump for the `]`;
    /// conditional branches and `ret` are free.
    pub fn run<R, W>(&self, machine: &mut Machine<R, W>) -> Result<Outcome, BrainfuckError>
        where R: ByteSource,
              W: ByteSink
    {
        let mut current = ENTRY;
        loop {
            let block = self.cfg.block(current);
            for op in block.ops() {
                machine.tick()?;
                match *op {
                    Op::Move { offset, index } => machine.shift(offset, index)?,
                    Op::Add { amount } => machine.add(amount),
                    Op::Output => machine.write()?,
                    Op::Input => machine.read()?
                }
            }

            current = match block.terminator() {
                Terminator::Jump(target) => {
                    machine.tick()?;
                    target
                },
                Terminator::Branch { nonzero, zero } => {
                    if machine.is_zero() { zero } else { nonzero }
                },
                Terminator::Return => break
            };
        }

        Ok(machine.outcome())
    }

    /// Dumps the compiled graph as text to the given stream.
    pub fn dump(&self, target: &mut impl Write) -> Result<(), BrainfuckError> {
        writeln!(target, "{}", self.cfg)?;
        Ok(())
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use crate::tape::PointerPolicy;

    fn compile(source: &str) -> CompiledProgram {
        Compiler::new().compile(&Program::parse(source).unwrap()).unwrap()
    }

    fn run(source: &str, input: &'static [u8]) -> (Machine<Cursor<&'static [u8]>, Vec<u8>>, Outcome) {
        let mut machine = Machine::builder()
            .input(Cursor::new(input))
            .output(Vec::new())
            .build();
        let outcome = compile(source).run(&mut machine).unwrap();
        (machine, outcome)
    }

    #[test]
    fn test_straight_line() {
        let compiled = compile("+++.");
        let cfg = compiled.cfg();
        assert_eq!(cfg.blocks().len(), 1);
        assert_eq!(cfg.block(ENTRY).ops().len(), 4);
        assert_eq!(cfg.block(ENTRY).terminator(), Terminator::Return);
        assert!(cfg.loops().is_empty());
    }

    #[test]
    fn test_nested_loop_layout() {
        let compiled = compile("[[]]");
        let cfg = compiled.cfg();
        assert_eq!(cfg.blocks().len(), 7);
        assert_eq!(cfg.loops(), &[
            LoopRegion { start: 0, end: 3, header: 1, body: 2, latch: 6, exit: 3 },
            LoopRegion { start: 1, end: 2, header: 4, body: 5, latch: 5, exit: 6 }
        ]);
        assert_eq!(cfg.block(ENTRY).terminator(), Terminator::Jump(1));
        assert_eq!(cfg.block(2).terminator(), Terminator::Jump(4));
        assert_eq!(cfg.block(3).terminator(), Terminator::Return);
        assert_eq!(cfg.block(6).terminator(), Terminator::Jump(1));
        cfg.verify().unwrap();
    }

    #[test]
    fn test_structure_of_larger_programs() {
        for source in &[
            "[]",
            "+[-]>[-]",
            "[+[,][+[.]-]-]",
            "++++++++[>++++[>++>+++>+++>+<<<<-]>+>+>->>+[<]<-]>>.>---.+++++++..+++.>>.<-.<.+++.------.--------.>>+.>++.",
        ] {
            let program = Program::parse(source).unwrap();
            let compiled = Compiler::new().compile(&program).unwrap();
            assert_eq!(compiled.cfg().loops().len(), program.loops().len());
            assert_eq!(
                compiled.cfg().loops().iter().map(|r| (r.start, r.end)).collect::<Vec<_>>(),
                program.loops().pairs().collect::<Vec<_>>()
            );
            compiled.cfg().verify().unwrap();
        }
    }

    #[test]
    fn test_compiler_is_reusable() {
        let program = Program::parse("+[>+<-]").unwrap();
        let mut compiler = Compiler::new();
        let first = compiler.compile(&program).unwrap();
        let second = compiler.compile(&program).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_verify_rejects_broken_graphs() {
        let compiled = compile("+[>[-]<-]");
        compiled.cfg().verify().unwrap();

        // A second way into a loop body
        let mut cfg = compiled.cfg().clone();
        let inner = cfg.loops()[1];
        cfg.blocks[ENTRY].terminator = Terminator::Jump(inner.body);
        assert!(cfg.verify().is_err());

        // A backwards edge that is not a latch
        let mut cfg = compiled.cfg().clone();
        let outer = cfg.loops()[0];
        cfg.blocks[outer.exit].terminator = Terminator::Jump(ENTRY);
        assert!(cfg.verify().is_err());
    }

    #[test]
    fn test_steps_match_the_interpreter() {
        // `[` is charged on the jump into the guard, `]` on the latch jump
        for source in &["+++[-]", "[-]", "+++[-].", "++[>++[-]<-]", "+[>]"] {
            let program = Program::parse(source).unwrap();

            let mut interpreted: Machine<Cursor<&[u8]>, Vec<u8>> = Machine::builder().tape_size(8).build();
            let expected = crate::interpreter::Interpreter::new(&mut interpreted).run(&program);

            let mut compiled: Machine<Cursor<&[u8]>, Vec<u8>> = Machine::builder().tape_size(8).build();
            let actual = Compiler::new().compile(&program).unwrap().run(&mut compiled);

            assert_eq!(format!("{:?}", actual), format!("{:?}", expected), "for {:?}", source);
            assert_eq!(compiled.steps(), interpreted.steps(), "for {:?}", source);
        }
    }

    #[test]
    fn test_run_output() {
        let (machine, outcome) = run("+++.", b"");
        assert_eq!(machine.output().unwrap().as_slice(), &[3]);
        assert_eq!(machine.tape().position(), 0);
        assert_eq!(outcome.bytes_written, 1);
    }

    #[test]
    fn test_run_loops() {
        let (machine, _) = run("+++[-]", b"");
        assert_eq!(machine.tape().cells()[0], 0);

        let (machine, _) = run("[-]", b"");
        assert!(machine.tape().cells().iter().all(|&c| c == 0));
    }

    #[test]
    fn test_run_input_and_eof() {
        let (machine, outcome) = run(",+.,+.,", b"AB");
        assert_eq!(machine.output().unwrap().as_slice(), b"BC");
        assert_eq!(machine.tape().cells()[0], 0);
        assert_eq!(outcome, Outcome { bytes_read: 2, bytes_written: 2, eof_reads: 1 });
    }

    #[test]
    fn test_run_reports_instruction_index() {
        let mut machine: Machine<Cursor<&[u8]>, Vec<u8>> = Machine::builder()
            .tape_size(3)
            .pointer_policy(PointerPolicy::Checked)
            .build();
        match compile("+[>>>]").run(&mut machine) {
            Err(BrainfuckError::PointerOutOfRange { pointer: 3, index: 4 }) => {},
            r => panic!("Expected pointer out of range. Got: {:?}", r)
        }
    }

    #[test]
    fn test_dump() {
        let mut out = Vec::new();
        compile("+[-]").dump(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "\
entry:
    add 1
    br 1

loop_guard.1:
    br_nonzero 2, 3

loop_body.2:
    add 255
    br 1

loop_end.3:
    ret

");
    }
}

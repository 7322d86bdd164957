use std::collections::BTreeSet;
use std::io::Cursor;
use std::path::Path;
use bfkit::{Backend, BrainfuckError, Compiler, Interpreter, Machine, Program, SymbolPolicy};

type TestMachine<'a> = Machine<Cursor<&'a [u8]>, Vec<u8>>;

fn machine(input: &[u8]) -> TestMachine {
    Machine::builder()
        .input(Cursor::new(input))
        .output(Vec::new())
        .build()
}

fn parse(program: &[u8]) -> Result<Program, BrainfuckError> {
    // Sample programs may carry comments
    Program::from_reader(Cursor::new(program), SymbolPolicy::Skip)
}

fn run(program: &[u8], input: &[u8], expected: &[u8]) -> Result<(), BrainfuckError> {

    // Parse the file
    let program = parse(program)?;

    // Prepare an interpreter to run the instructions
    let mut m = machine(input);

    // Aaaaand, run!
    Interpreter::new(&mut m).consume(&program)?;

    // Check that the output of the interpreter matches the expected one
    if m.output().unwrap().as_slice() != expected {
        return Err("Mismatching output".into());
    }

    Ok(())

}

fn run_compiled(program: &[u8], input: &[u8], expected: &[u8]) -> Result<(), BrainfuckError> {

    // Parse the file
    let program = parse(program)?;

    // Compile the instructions and run the resulting blocks
    let compiled = Compiler::new().consume(&program)?;
    let mut m = machine(input);
    compiled.run(&mut m)?;

    // Check that the output of the compiled program matches the expected one
    if m.output().unwrap().as_slice() != expected {
        return Err("Mismatching output".into());
    }

    Ok(())

}

// A test for each program

macro_rules! test_program {
    ($name:ident) => {
        paste::item! {
            #[test]
            fn [<test_ $name>]() {
                let program = include_bytes!(concat!("./programs/", stringify!($name), ".b"));
                let input = include_bytes!(concat!("./programs/", stringify!($name), ".b.in"));
                let output = include_bytes!(concat!("./programs/", stringify!($name), ".b.out"));
                run(program, input, output).unwrap();
            }

            #[test]
            fn [<test_ $name _compiled>]() {
                let program = include_bytes!(concat!("./programs/", stringify!($name), ".b"));
                let input = include_bytes!(concat!("./programs/", stringify!($name), ".b.in"));
                let output = include_bytes!(concat!("./programs/", stringify!($name), ".b.out"));
                run_compiled(program, input, output).unwrap();
            }
        }
    };
}

const PROGRAMS: &[&str] = &["cat", "hello_world", "reverse", "seven"];

test_program!(cat);
test_program!(hello_world);
test_program!(reverse);
test_program!(seven);

#[test]
fn test_every_program_is_covered() {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/programs");
    let pattern = format!("{}/*.b", dir.display());

    let mut found = BTreeSet::new();
    for entry in glob::glob(&pattern).unwrap() {
        let path = entry.unwrap();
        assert!(path.with_extension("b.in").exists(), "missing input for {}", path.display());
        assert!(path.with_extension("b.out").exists(), "missing output for {}", path.display());
        found.insert(path.file_stem().unwrap().to_string_lossy().into_owned());
    }

    let listed: BTreeSet<String> = PROGRAMS.iter().map(|s| s.to_string()).collect();
    assert_eq!(found, listed);
}

#[macro_use] extern crate log;

use std::fs::File;
use std::io::{self, Stdin, Stdout, Write};
use clap::{App, Arg, ArgMatches};
use bfkit::{Backend, BrainfuckError, Compiler, EofPolicy, Interpreter, Machine, Outcome, PointerPolicy, Program, SymbolPolicy};

fn load(path: &str, policy: SymbolPolicy) -> Result<Program, BrainfuckError> {
    debug!("Opening {}.", path);
    let file = File::open(path)?;
    debug!("Parsing source file.");
    Program::from_reader(file, policy)
}

fn machine(matches: &ArgMatches) -> Result<Machine<Stdin, Stdout>, BrainfuckError> {
    let mut builder = Machine::builder();
    builder
        .input(io::stdin())
        .output(io::stdout());

    if let Some(size) = matches.value_of("tape-size") {
        let size: usize = size.parse().map_err(|_| format!("Invalid tape size: {}", size))?;
        if size == 0 {
            return Err("Tape size must be at least 1.".into());
        }
        builder.tape_size(size);
    }

    if matches.is_present("wrap") {
        builder.pointer_policy(PointerPolicy::Wrap);
    }

    if let Some(eof) = matches.value_of("eof") {
        let policy = match eof {
            "zero" => EofPolicy::Zero,
            "unchanged" => EofPolicy::Unchanged,
            value => EofPolicy::Value(value.parse().map_err(|_| format!("Invalid EOF policy: {}", value))?)
        };
        builder.eof_policy(policy);
    }

    if let Some(steps) = matches.value_of("max-steps") {
        builder.step_limit(steps.parse().map_err(|_| format!("Invalid step limit: {}", steps))?);
    }

    Ok(builder.build())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Execute,
    Compile,
    Dump
}

fn select_mode(execute: bool, compile: bool, dump: bool) -> Result<Mode, BrainfuckError> {
    match (execute, compile, dump) {
        (true, true, _) => {
            Err("Both switches for compile and execute mode cannot be present at the same time.".into())
        },
        (true, false, true) => {
            Err("Dumping basic blocks is only available in compile mode.".into())
        },
        (true, false, false) => Ok(Mode::Execute),
        // Default to compile mode
        (false, _, true) => Ok(Mode::Dump),
        (false, _, false) => Ok(Mode::Compile)
    }
}

// Flushes the output and, if requested, prints the final tape even when the run failed
fn finish(machine: &Machine<Stdin, Stdout>, result: Result<Outcome, BrainfuckError>, matches: &ArgMatches) -> Result<(), BrainfuckError> {
    io::stdout().flush()?;
    if matches.is_present("dump-tape") {
        machine.tape().dump(&mut io::stderr())?;
    }
    let outcome = result?;
    debug!("Done: {:?}.", outcome);
    Ok(())
}

fn main_execute(program: &Program, matches: &ArgMatches) -> Result<(), BrainfuckError> {

    // Prepare a machine for the interpreter to run on
    let mut machine = machine(matches)?;

    // Aaaaand, run!
    debug!("Running program.");
    let result = Interpreter::new(&mut machine).consume(program);
    finish(&machine, result, matches)

}

fn main_compile(program: &Program, matches: &ArgMatches, dump: bool) -> Result<(), BrainfuckError> {

    debug!("Compiling program.");
    let compiled = Compiler::new().consume(program)?;

    if dump {
        compiled.dump(&mut io::stdout())?;
        return Ok(());
    }

    let mut machine = machine(matches)?;
    debug!("Running compiled program.");
    let result = compiled.run(&mut machine);
    finish(&machine, result, matches)

}

fn main() {

    // All the cli options are here
    let matches = App::new("bfkit")
        .version("0.1.0")
        .author("Marco Cameriero")
        .about("Brainfuck compiler and interpreter")
        .arg(
            Arg::with_name("INPUT")
                .help("Sets the input file to use")
                .required(true)
                .index(1)
        )
        .arg(
            Arg::with_name("execute")
                .short("e")
                .long("execute")
                .help("Executes the given Brainfuck file with the interpreter")
        )
        .arg(
            Arg::with_name("compile")
                .short("c")
                .long("compile")
                .help("Compiles the given Brainfuck file to basic blocks and runs them")
        )
        .arg(
            Arg::with_name("dump")
                .long("dump")
                .help("Prints the compiled basic blocks instead of running them")
        )
        .arg(
            Arg::with_name("dump-tape")
                .long("dump-tape")
                .help("Prints the final tape to stderr after running")
        )
        .arg(
            Arg::with_name("tape-size")
                .long("tape-size")
                .takes_value(true)
                .help("Number of cells on the tape")
        )
        .arg(
            Arg::with_name("wrap")
                .long("wrap")
                .help("Wraps the data pointer around the tape instead of failing")
        )
        .arg(
            Arg::with_name("eof")
                .long("eof")
                .takes_value(true)
                .help("Value stored on end of input: zero, unchanged or a byte")
        )
        .arg(
            Arg::with_name("allow-comments")
                .long("allow-comments")
                .help("Skips unknown characters instead of rejecting the program")
        )
        .arg(
            Arg::with_name("max-steps")
                .long("max-steps")
                .takes_value(true)
                .help("Aborts the run after this many steps")
        )
        .arg(
            Arg::with_name("v")
                .short("v")
                .multiple(true)
                .help("Sets the level of verbosity. Repeat to increase.")
        )
        .get_matches();

    // Initialize logger as soon as possible
    let verbosity = match matches.occurrences_of("v") {
        0     => "warn",
        1     => "info",
        2     => "debug",
        _     => "trace"
    };
    env_logger::Builder::from_env(
        env_logger::Env::new()
            .filter_or("BFKIT_LOG", format!("bfkit={}", verbosity))
            .write_style_or("BFKIT_LOG_STYLE", "auto")
    )
    .init();

    let policy = if matches.is_present("allow-comments") {
        SymbolPolicy::Skip
    } else {
        SymbolPolicy::Reject
    };

    // Check if we are in compile or execute mode
    let file = matches.value_of("INPUT").unwrap_or_default();
    let mode = select_mode(
        matches.is_present("execute"),
        matches.is_present("compile"),
        matches.is_present("dump")
    );
    let res = mode.and_then(|mode| {
        let program = load(file, policy)?;
        match mode {
            Mode::Execute => main_execute(&program, &matches),
            Mode::Compile => main_compile(&program, &matches, false),
            Mode::Dump => main_compile(&program, &matches, true)
        }
    });

    if let Err(e) = res {
        error!("{}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_mode_is_compile() {
        assert_eq!(select_mode(false, false, false).unwrap(), Mode::Compile);
        assert_eq!(select_mode(false, true, false).unwrap(), Mode::Compile);
        assert_eq!(select_mode(true, false, false).unwrap(), Mode::Execute);
    }

    #[test]
    fn test_dump_implies_compile() {
        assert_eq!(select_mode(false, false, true).unwrap(), Mode::Dump);
        assert_eq!(select_mode(false, true, true).unwrap(), Mode::Dump);
    }

    #[test]
    fn test_conflicting_switches() {
        assert!(select_mode(true, true, false).is_err());
        assert!(select_mode(true, true, true).is_err());
        assert!(select_mode(true, false, true).is_err());
    }
}

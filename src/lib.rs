use std::{fs, io::Write, path::Path};

use chunk::Chunk;
use interner::Interner;
use parser::{CompilationError, Parser};
use scanner::Scanner;
use typed_arena::Arena;
use vm::{InterpretResult, Vm};

pub mod chunk;
pub mod compiler;
pub mod interner;
pub mod object;
pub mod opcodes;
pub mod parser;
pub mod repl;
pub mod scanner;
pub mod token;
pub mod value;
pub mod vm;

/// Options chosen on the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Config {
    /// Print the compiled chunk before running it.
    pub disassemble: bool,
    /// Log every executed instruction.
    pub trace: bool,
}

/// Compiles `source` into a fresh chunk. The chunk is only returned when no
/// error was reported.
pub fn compile(source: &str, interner: &mut Interner) -> Result<Chunk, CompilationError> {
    let mut chunk = Chunk::init();
    Parser::new(Scanner::new(source), &mut chunk, interner).compile()?;
    Ok(chunk)
}

/// Compiles and runs `source` on a fresh heap, writing program output to `out`.
pub fn interpret<W: Write>(source: &str, out: W) -> InterpretResult {
    let arena = Arena::new();
    let mut vm = Vm::with_output(Interner::new(&arena), out);
    vm.interpret_source(source)
}

pub fn run_script(source: &str, config: &Config) -> InterpretResult {
    let arena = Arena::new();
    let mut interner = Interner::new(&arena);
    let chunk = compile(source, &mut interner)?;

    if config.disassemble {
        print!("{}", chunk.disassemble("script", &interner));
    }

    let mut vm = Vm::new(interner);
    vm.interpret(chunk)
}

pub fn run_file(path: impl AsRef<Path>, config: &Config) -> InterpretResult {
    let source = fs::read_to_string(path)?;
    run_script(&source, config)
}

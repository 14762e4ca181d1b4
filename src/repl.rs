use std::io::Write;

use rustyline::{error::ReadlineError, Editor};
use typed_arena::Arena;

use crate::{
    compile,
    interner::Interner,
    vm::{InterpretResult, Vm},
    Config,
};

const PROMPT: &str = "> ";

/// Interactive session. Each line is compiled and run on the same vm, so
/// globals defined on one line are visible on the next.
pub fn run_repl(config: &Config) -> Result<(), ReadlineError> {
    let arena = Arena::new();
    let mut vm = Vm::new(Interner::new(&arena));
    let mut rl = Editor::<()>::new();

    loop {
        match rl.readline(PROMPT) {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                rl.add_history_entry(line.as_str());
                if let Err(err) = eval_line(&mut vm, &line, config) {
                    eprintln!("{}", err);
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(err) => return Err(err),
        }
    }

    log::debug!("repl closed, {} strings interned", vm.interner().len());
    Ok(())
}

/// Compiles one line against the session heap and runs it.
pub fn eval_line<W: Write>(vm: &mut Vm<'_, W>, line: &str, config: &Config) -> InterpretResult {
    let chunk = compile(line, vm.interner_mut())?;
    if config.disassemble {
        print!("{}", chunk.disassemble("line", vm.interner()));
    }
    vm.interpret(chunk)
}

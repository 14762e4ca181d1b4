use std::process;

use bytelox::{
    repl::run_repl,
    run_file,
    vm::{InterpretStatus, InterpreterError},
    Config,
};
use clap::{App, Arg};
use log::{Level, LevelFilter, Log, Metadata, Record};

const EX_DATAERR: i32 = 65;
const EX_SOFTWARE: i32 = 70;
const EX_IOERR: i32 = 74;

struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            match record.level() {
                Level::Trace => eprintln!("{}", record.args()),
                level => eprintln!("[{}] {}", level, record.args()),
            }
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn main() {
    let matches = App::new("bytelox")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Bytecode compiler and virtual machine for a small scripting language")
        .arg(
            Arg::with_name("script")
                .help("Script to run. Starts a REPL when omitted.")
                .index(1),
        )
        .arg(
            Arg::with_name("disassemble")
                .short("d")
                .long("disassemble")
                .help("Prints the compiled bytecode before running it"),
        )
        .arg(
            Arg::with_name("trace")
                .short("t")
                .long("trace")
                .help("Logs every instruction and the stack as it executes"),
        )
        .get_matches();

    let config = Config {
        disassemble: matches.is_present("disassemble"),
        trace: matches.is_present("trace"),
    };

    let level = if config.trace {
        LevelFilter::Trace
    } else {
        LevelFilter::Warn
    };
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }

    match matches.value_of("script") {
        Some(path) => {
            let result = run_file(path, &config);
            if let Err(err) = &result {
                eprintln!("{}", err);
            }
            let code = match &result {
                Err(InterpreterError::Io(_)) => EX_IOERR,
                _ => match InterpretStatus::of(&result) {
                    InterpretStatus::Ok => 0,
                    InterpretStatus::CompileError => EX_DATAERR,
                    InterpretStatus::RuntimeError => EX_SOFTWARE,
                },
            };
            process::exit(code);
        }
        None => {
            if let Err(err) = run_repl(&config) {
                eprintln!("{}", err);
                process::exit(EX_IOERR);
            }
        }
    }
}

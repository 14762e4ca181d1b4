use std::io::{self, Stdout, Write};

use ahash::AHashMap;
use thiserror::Error;

use crate::{
    chunk::Chunk,
    compiler::LOCALS_MAX,
    interner::Interner,
    object::{ObjString, Object},
    opcodes::Op,
    parser::{CompilationError, Parser},
    scanner::Scanner,
    value::Value,
};

/// Capacity of the operand stack. Leaves room for temporaries above a full set of locals.
pub const STACK_MAX: usize = LOCALS_MAX * 64;

const STACK_OVERFLOW: &str = "Stack overflow.";
const STACK_UNDERFLOW: &str = "Stack underflow.";

macro_rules! binary_op {
    ($self:ident, $operator:tt, $variant:ident) => {{
        let b = $self.pop()?;
        let a = $self.pop()?;
        match (a, b) {
            (Value::Number(n1), Value::Number(n2)) => $self.push(Value::$variant(n1 $operator n2))?,
            _ => return Err($self.runtime_error("Operands must be numbers.")),
        }
    }};
}

pub type InterpretResult = Result<(), InterpreterError>;

pub struct Vm<'heap, W = Stdout> {
    chunk: Chunk,
    ip: usize,
    stack: Vec<Value>,
    globals: AHashMap<ObjString, Value>,
    interner: Interner<'heap>,
    out: W,
}

impl<'heap> Vm<'heap> {
    pub fn new(interner: Interner<'heap>) -> Self {
        Vm::with_output(interner, io::stdout())
    }
}

impl<'heap, W: Write> Vm<'heap, W> {
    /// A vm whose `print` output goes to `out`.
    pub fn with_output(interner: Interner<'heap>, out: W) -> Self {
        Vm {
            chunk: Chunk::init(),
            ip: 0,
            stack: Vec::with_capacity(LOCALS_MAX),
            globals: AHashMap::new(),
            interner,
            out,
        }
    }

    /// Compiles `source` against this vm's heap, then runs it.
    pub fn interpret_source(&mut self, source: &str) -> InterpretResult {
        let mut chunk = Chunk::init();
        Parser::new(Scanner::new(source), &mut chunk, &mut self.interner).compile()?;
        self.interpret(chunk)
    }

    /// Runs `chunk` from its first instruction.
    ///
    /// Globals survive between calls; the operand stack does not.
    pub fn interpret(&mut self, chunk: Chunk) -> InterpretResult {
        self.chunk = chunk;
        self.ip = 0;
        self.stack.clear();

        let result = self.run();
        if result.is_err() {
            self.stack.clear();
        }
        result
    }

    pub fn interner(&self) -> &Interner<'heap> {
        &self.interner
    }

    pub fn interner_mut(&mut self) -> &mut Interner<'heap> {
        &mut self.interner
    }

    pub fn global(&self, name: &str) -> Option<Value> {
        self.globals
            .iter()
            .find(|(handle, _)| self.interner.lookup(**handle) == Some(name))
            .map(|(_, value)| *value)
    }

    pub fn stack(&self) -> &[Value] {
        &self.stack
    }

    pub fn into_output(self) -> W {
        self.out
    }

    fn run(&mut self) -> InterpretResult {
        loop {
            if log::log_enabled!(log::Level::Trace) {
                self.trace_instruction();
            }

            let instruction = self.next_op()?;
            match instruction {
                Op::Constant => {
                    let constant = self.read_constant()?;
                    self.push(constant)?;
                }
                Op::Nil => self.push(Value::Nil)?,
                Op::True => self.push(Value::Bool(true))?,
                Op::False => self.push(Value::Bool(false))?,
                Op::Pop => {
                    self.pop()?;
                }
                Op::GetLocal => {
                    let slot = self.next_byte()? as usize;
                    match self.stack.get(slot) {
                        Some(&value) => self.push(value)?,
                        None => return Err(self.runtime_error("Invalid local slot.")),
                    }
                }
                Op::SetLocal => {
                    let slot = self.next_byte()? as usize;
                    let value = self.peek(0)?;
                    match self.stack.get_mut(slot) {
                        Some(local) => *local = value,
                        None => return Err(self.runtime_error("Invalid local slot.")),
                    }
                }
                Op::GetGlobal => {
                    let name = self.read_string()?;
                    match self.globals.get(&name) {
                        Some(&value) => self.push(value)?,
                        None => return Err(self.undefined_variable(name)),
                    }
                }
                Op::DefineGlobal => {
                    let name = self.read_string()?;
                    let value = self.peek(0)?;
                    self.globals.insert(name, value);
                    self.pop()?;
                }
                Op::SetGlobal => {
                    let name = self.read_string()?;
                    let value = self.peek(0)?;
                    match self.globals.get_mut(&name) {
                        Some(global) => *global = value,
                        None => return Err(self.undefined_variable(name)),
                    }
                }
                Op::Equal => {
                    let b = self.pop()?;
                    let a = self.pop()?;
                    self.push(Value::Bool(a == b))?
                }
                Op::Greater => binary_op!(self, >, Bool),
                Op::Less => binary_op!(self, <, Bool),
                Op::Add => {
                    let b = self.pop()?;
                    let a = self.pop()?;
                    match (a, b) {
                        (Value::Number(n1), Value::Number(n2)) => {
                            self.push(Value::Number(n1 + n2))?
                        }
                        (Value::Obj(Object::String(s1)), Value::Obj(Object::String(s2))) => {
                            let joined = self.concatenate(s1, s2)?;
                            self.push(joined)?
                        }
                        _ => {
                            return Err(
                                self.runtime_error("Operands must be two numbers or two strings.")
                            )
                        }
                    }
                }
                Op::Subtract => binary_op!(self, -, Number),
                Op::Multiply => binary_op!(self, *, Number),
                Op::Divide => binary_op!(self, /, Number),
                Op::Not => {
                    let val = self.pop()?;
                    self.push(Value::Bool(val.is_falsey()))?
                }
                Op::Negate => match self.peek_mut()? {
                    Value::Number(n) => *n = -*n,
                    _ => return Err(self.runtime_error("Operand must be a number.")),
                },
                Op::Print => {
                    let val = self.pop()?;
                    writeln!(self.out, "{}", val.display(&self.interner))?;
                }
                Op::Jump => {
                    let offset = self.read_short()?;
                    self.jump_to(self.ip + offset)?;
                }
                Op::JumpIfFalse => {
                    let offset = self.read_short()?;
                    if self.peek(0)?.is_falsey() {
                        self.jump_to(self.ip + offset)?;
                    }
                }
                Op::Loop => {
                    let offset = self.read_short()?;
                    match self.ip.checked_sub(offset) {
                        Some(target) => self.jump_to(target)?,
                        None => return Err(self.runtime_error("Jump target out of bounds.")),
                    }
                }
                Op::Return => {
                    if let Some(result) = self.stack.pop() {
                        writeln!(self.out, "{}", result.display(&self.interner))?;
                    }
                    self.out.flush()?;
                    return Ok(());
                }
            }
        }
    }

    fn concatenate(&mut self, a: ObjString, b: ObjString) -> Result<Value, InterpreterError> {
        let (a, b) = match (self.interner.lookup(a), self.interner.lookup(b)) {
            (Some(a), Some(b)) => (a, b),
            _ => return Err(self.runtime_error("Dangling string reference.")),
        };
        let mut joined = String::with_capacity(a.len() + b.len());
        joined.push_str(a);
        joined.push_str(b);
        Ok(Value::Obj(Object::take_string(joined, &mut self.interner)))
    }

    fn jump_to(&mut self, target: usize) -> InterpretResult {
        if target > self.chunk.len() {
            return Err(self.runtime_error("Jump target out of bounds."));
        }
        self.ip = target;
        Ok(())
    }

    fn peek(&self, distance: usize) -> Result<Value, InterpreterError> {
        self.stack
            .len()
            .checked_sub(1 + distance)
            .map(|idx| self.stack[idx])
            .ok_or_else(|| self.runtime_error(STACK_UNDERFLOW))
    }

    fn peek_mut(&mut self) -> Result<&mut Value, InterpreterError> {
        if self.stack.is_empty() {
            return Err(self.runtime_error(STACK_UNDERFLOW));
        }
        let top = self.stack.len() - 1;
        Ok(&mut self.stack[top])
    }

    #[inline]
    fn pop(&mut self) -> Result<Value, InterpreterError> {
        match self.stack.pop() {
            Some(value) => Ok(value),
            None => Err(self.runtime_error(STACK_UNDERFLOW)),
        }
    }

    #[inline]
    fn push(&mut self, value: Value) -> InterpretResult {
        if self.stack.len() == STACK_MAX {
            return Err(self.runtime_error(STACK_OVERFLOW));
        }
        self.stack.push(value);
        Ok(())
    }

    fn next_byte(&mut self) -> Result<u8, InterpreterError> {
        match self.chunk.byte(self.ip) {
            Some(byte) => {
                self.ip += 1;
                Ok(byte)
            }
            None => Err(self.runtime_error("Ran past the end of the chunk.")),
        }
    }

    fn next_op(&mut self) -> Result<Op, InterpreterError> {
        let byte = self.next_byte()?;
        Op::from_u8(byte).ok_or_else(|| self.runtime_error(&format!("Unknown opcode {}.", byte)))
    }

    fn read_short(&mut self) -> Result<usize, InterpreterError> {
        let hi = self.next_byte()?;
        let lo = self.next_byte()?;
        Ok(u16::from_be_bytes([hi, lo]) as usize)
    }

    fn read_constant(&mut self) -> Result<Value, InterpreterError> {
        let index = self.next_byte()?;
        self.chunk
            .constant(index)
            .ok_or_else(|| self.runtime_error(&format!("Missing constant {}.", index)))
    }

    fn read_string(&mut self) -> Result<ObjString, InterpreterError> {
        self.read_constant()?
            .as_string()
            .ok_or_else(|| self.runtime_error("Variable name must be a string."))
    }

    fn undefined_variable(&self, name: ObjString) -> InterpreterError {
        let name = self.interner.lookup(name).unwrap_or("?");
        self.runtime_error(&format!("Undefined variable '{}'.", name))
    }

    fn runtime_error(&self, message: &str) -> InterpreterError {
        let line = self
            .chunk
            .line(self.ip.saturating_sub(1))
            .unwrap_or_default();
        log::debug!("runtime error at ip {}: {}", self.ip, message);
        InterpreterError::Runtime {
            message: message.to_owned(),
            line,
        }
    }

    fn trace_instruction(&self) {
        let stack = self
            .stack
            .iter()
            .map(|value| format!("[ {} ]", value.display(&self.interner)))
            .collect::<String>();
        let (instruction, _) = self.chunk.disassemble_instruction(self.ip, &self.interner);
        log::trace!("          {}", stack);
        log::trace!("{}", instruction);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpretStatus {
    Ok,
    CompileError,
    RuntimeError,
}

impl InterpretStatus {
    pub fn of(result: &InterpretResult) -> Self {
        match result {
            Ok(()) => InterpretStatus::Ok,
            Err(InterpreterError::Compile(_)) => InterpretStatus::CompileError,
            Err(_) => InterpretStatus::RuntimeError,
        }
    }
}

#[derive(Debug, Error)]
pub enum InterpreterError {
    #[error("{0}")]
    Compile(#[from] CompilationError),
    #[error("{message}\n[line {line}] in script")]
    Runtime { message: String, line: usize },
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

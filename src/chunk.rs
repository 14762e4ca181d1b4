use std::fmt::Write;

use crate::{interner::Interner, opcodes::Op, value::Value};

/// A compiled unit of bytecode.
///
/// `lines[i]` is the source line that produced `code[i]`; the two vectors always
/// have the same length. Chunks are append-only while compiling and read-only
/// once handed to the vm.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Chunk {
    code: Vec<u8>,
    lines: Vec<usize>,
    constants: Vec<Value>,
}

impl Chunk {
    pub fn init() -> Self {
        Self::default()
    }

    pub fn write(&mut self, byte: u8, line: usize) {
        self.code.push(byte);
        self.lines.push(line);
    }

    pub fn write_op(&mut self, op: Op, line: usize) {
        self.write(op.u8(), line)
    }

    /// Appends to the constant pool. Callers enforce the one-byte operand limit.
    pub fn add_constant(&mut self, value: Value) -> usize {
        self.constants.push(value);
        self.constants.len() - 1
    }

    /// Overwrites an already written code byte. Used for back-patching jumps.
    pub fn patch(&mut self, offset: usize, byte: u8) {
        self.code[offset] = byte;
    }

    pub fn code(&self) -> &[u8] {
        &self.code
    }

    pub fn lines(&self) -> &[usize] {
        &self.lines
    }

    pub fn constants(&self) -> &[Value] {
        &self.constants
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    pub fn byte(&self, offset: usize) -> Option<u8> {
        self.code.get(offset).copied()
    }

    pub fn line(&self, offset: usize) -> Option<usize> {
        self.lines.get(offset).copied()
    }

    pub fn constant(&self, index: u8) -> Option<Value> {
        self.constants.get(index as usize).copied()
    }

    /// Reads a big-endian jump operand starting at `offset`.
    pub fn read_u16(&self, offset: usize) -> Option<u16> {
        let hi = self.byte(offset)?;
        let lo = self.byte(offset + 1)?;
        Some(u16::from_be_bytes([hi, lo]))
    }

    pub fn disassemble(&self, name: &str, interner: &Interner) -> String {
        let mut out = format!("== {} ==\n", name);
        let mut offset = 0;
        while offset < self.code.len() {
            let (line, next) = self.disassemble_instruction(offset, interner);
            out.push_str(&line);
            out.push('\n');
            offset = next;
        }
        out
    }

    /// Renders the instruction at `offset` and returns the offset of the next one.
    pub fn disassemble_instruction(&self, offset: usize, interner: &Interner) -> (String, usize) {
        let mut out = format!("{:04} ", offset);
        if offset >= self.code.len() {
            out.push_str("<end of chunk>");
            return (out, offset + 1);
        }
        if offset > 0 && self.lines.get(offset) == self.lines.get(offset - 1) {
            out.push_str("   | ");
        } else {
            let _ = write!(out, "{:4} ", self.lines[offset]);
        }

        let op = match Op::from_u8(self.code[offset]) {
            Some(op) => op,
            None => {
                let _ = write!(out, "Unknown opcode {}", self.code[offset]);
                return (out, offset + 1);
            }
        };

        match op.operand_width() {
            1 => {
                let operand = self.byte(offset + 1).unwrap_or_default();
                match op {
                    Op::GetLocal | Op::SetLocal => {
                        let _ = write!(out, "{:<16} {:4}", op.name(), operand);
                    }
                    _ => {
                        let rendered = self
                            .constant(operand)
                            .map(|value| value.display(interner).to_string())
                            .unwrap_or_else(|| String::from("<missing>"));
                        let _ = write!(out, "{:<16} {:4} '{}'", op.name(), operand, rendered);
                    }
                }
            }
            2 => {
                let jump = self.read_u16(offset + 1).unwrap_or_default() as usize;
                let after = offset + 3;
                let target = if op == Op::Loop {
                    after.wrapping_sub(jump)
                } else {
                    after + jump
                };
                let _ = write!(out, "{:<16} {:4} -> {}", op.name(), offset, target);
            }
            _ => out.push_str(op.name()),
        }

        (out, offset + 1 + op.operand_width())
    }
}

use std::{
    convert::{TryFrom, TryInto},
    fmt::Display,
};

#[repr(u8)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Op {
    Constant = 0,
    Nil,
    True,
    False,
    Pop,
    GetLocal,
    SetLocal,
    GetGlobal,
    DefineGlobal,
    SetGlobal,
    Equal,
    Greater,
    Less,
    Add,
    Subtract,
    Multiply,
    Divide,
    Not,
    Negate,
    Print,
    Jump,
    JumpIfFalse,
    Loop,
    Return,
}

impl Op {
    pub const fn u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(byte: u8) -> Option<Self> {
        byte.try_into().ok()
    }

    /// Number of operand bytes following the opcode.
    pub const fn operand_width(self) -> usize {
        match self {
            Op::Constant
            | Op::GetLocal
            | Op::SetLocal
            | Op::GetGlobal
            | Op::DefineGlobal
            | Op::SetGlobal => 1,
            Op::Jump | Op::JumpIfFalse | Op::Loop => 2,
            _ => 0,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Op::Constant => "OP_CONSTANT",
            Op::Nil => "OP_NIL",
            Op::True => "OP_TRUE",
            Op::False => "OP_FALSE",
            Op::Pop => "OP_POP",
            Op::GetLocal => "OP_GET_LOCAL",
            Op::SetLocal => "OP_SET_LOCAL",
            Op::GetGlobal => "OP_GET_GLOBAL",
            Op::DefineGlobal => "OP_DEFINE_GLOBAL",
            Op::SetGlobal => "OP_SET_GLOBAL",
            Op::Equal => "OP_EQUAL",
            Op::Greater => "OP_GREATER",
            Op::Less => "OP_LESS",
            Op::Add => "OP_ADD",
            Op::Subtract => "OP_SUBTRACT",
            Op::Multiply => "OP_MULTIPLY",
            Op::Divide => "OP_DIVIDE",
            Op::Not => "OP_NOT",
            Op::Negate => "OP_NEGATE",
            Op::Print => "OP_PRINT",
            Op::Jump => "OP_JUMP",
            Op::JumpIfFalse => "OP_JUMP_IF_FALSE",
            Op::Loop => "OP_LOOP",
            Op::Return => "OP_RETURN",
        }
    }
}

impl TryFrom<u8> for Op {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value > Op::Return as u8 {
            Err(())
        } else {
            // SAFETY: `Op` is `repr(u8)` with contiguous discriminants from 0 to `Return`.
            unsafe { Ok(core::mem::transmute(value)) }
        }
    }
}

impl Display for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

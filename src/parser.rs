use std::{convert::TryFrom, fmt};

use ahash::AHashMap;
use thiserror::Error;

use crate::{
    chunk::Chunk,
    compiler::{Compiler, ScopeError},
    interner::Interner,
    object::{ObjString, Object},
    opcodes::Op,
    scanner::Scanner,
    token::{Token, TokenKind},
    value::Value,
};

/// Constants addressable by a one-byte operand.
pub const CONSTANTS_MAX: usize = u8::MAX as usize + 1;

/// Deepest combined statement and expression nesting the parser recurses into.
pub const NESTING_MAX: usize = 256;

pub type CompilationResult = Result<(), CompilationError>;

/// Single-pass compiler: parses tokens and emits bytecode into `chunk` as it goes.
pub struct Parser<'source, 'chunk, 'heap> {
    scanner: Scanner<'source>,
    current: Token<'source>,
    previous: Token<'source>,
    chunk: &'chunk mut Chunk,
    interner: &'chunk mut Interner<'heap>,
    compiler: Compiler<'source>,
    identifiers: AHashMap<ObjString, u8>,
    errors: Vec<CompileError>,
    panic_mode: bool,
    nesting: usize,
}

impl<'source, 'chunk, 'heap> Parser<'source, 'chunk, 'heap> {
    pub fn new(
        scanner: Scanner<'source>,
        chunk: &'chunk mut Chunk,
        interner: &'chunk mut Interner<'heap>,
    ) -> Self {
        let start = Token::new(TokenKind::Eof, "", 1);
        Self {
            scanner,
            current: start,
            previous: start,
            chunk,
            interner,
            compiler: Compiler::new(),
            identifiers: AHashMap::new(),
            errors: Vec::new(),
            panic_mode: false,
            nesting: 0,
        }
    }

    /// Compiles the whole token stream. Every diagnostic found on the way is
    /// returned, not only the first one.
    pub fn compile(&mut self) -> CompilationResult {
        self.advance();
        while !self.match_current(TokenKind::Eof) {
            self.declaration();
        }
        self.end_compiler();

        if self.had_error() {
            Err(CompilationError(std::mem::take(&mut self.errors)))
        } else {
            Ok(())
        }
    }

    fn had_error(&self) -> bool {
        !self.errors.is_empty()
    }

    fn match_current(&mut self, kind: TokenKind) -> bool {
        if !self.check(kind) {
            false
        } else {
            self.advance();
            true
        }
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    fn advance(&mut self) {
        self.previous = self.current;
        loop {
            self.current = self.scanner.scan_token();
            if self.current.kind != TokenKind::Error {
                break;
            }
            let message = self.current.lexeme;
            self.error_at_current(message)
        }
    }

    fn consume(&mut self, kind: TokenKind, error_msg: &str) {
        if self.check(kind) {
            self.advance();
            return;
        }
        self.error_at_current(error_msg);
    }

    // declarations and statements

    fn declaration(&mut self) {
        if self.match_current(TokenKind::Var) {
            self.var_declaration();
        } else {
            self.statement();
        }
        if self.panic_mode {
            self.synchronize();
        }
    }

    fn var_declaration(&mut self) {
        let global = self.parse_variable("Expect variable name.");

        if self.match_current(TokenKind::Equal) {
            self.expression();
        } else {
            self.emit_op(Op::Nil)
        }

        self.consume(
            TokenKind::Semicolon,
            "Expect ';' after variable declaration.",
        );

        self.define_variable(global);
    }

    fn statement(&mut self) {
        if !self.enter_nesting() {
            return;
        }
        self.nested_statement();
        self.nesting -= 1;
    }

    fn nested_statement(&mut self) {
        if self.match_current(TokenKind::Print) {
            self.print_statement();
        } else if self.match_current(TokenKind::For) {
            self.for_statement();
        } else if self.match_current(TokenKind::If) {
            self.if_statement();
        } else if self.match_current(TokenKind::While) {
            self.while_statement();
        } else if self.match_current(TokenKind::LeftBrace) {
            self.begin_scope();
            self.block();
            self.end_scope();
        } else {
            self.expression_statement();
        }
    }

    fn expression_statement(&mut self) {
        self.expression();
        self.consume(TokenKind::Semicolon, "Expect ';' after expression.");
        self.emit_op(Op::Pop);
    }

    fn print_statement(&mut self) {
        self.expression();
        self.consume(TokenKind::Semicolon, "Expect ';' after value.");
        self.emit_op(Op::Print)
    }

    fn block(&mut self) {
        while !self.check(TokenKind::RightBrace) && !self.check(TokenKind::Eof) {
            self.declaration();
        }
        self.consume(TokenKind::RightBrace, "Expect '}' after block.");
    }

    fn if_statement(&mut self) {
        self.consume(TokenKind::LeftParen, "Expect '(' after 'if'.");
        self.expression();
        self.consume(TokenKind::RightParen, "Expect ')' after condition.");

        let then_jump = self.emit_jump(Op::JumpIfFalse);
        self.emit_op(Op::Pop);
        self.statement();

        let else_jump = self.emit_jump(Op::Jump);
        self.patch_jump(then_jump);
        self.emit_op(Op::Pop);

        if self.match_current(TokenKind::Else) {
            self.statement();
        }
        self.patch_jump(else_jump);
    }

    fn while_statement(&mut self) {
        let loop_start = self.chunk.len();
        self.consume(TokenKind::LeftParen, "Expect '(' after 'while'.");
        self.expression();
        self.consume(TokenKind::RightParen, "Expect ')' after condition.");

        let exit_jump = self.emit_jump(Op::JumpIfFalse);
        self.emit_op(Op::Pop);
        self.statement();
        self.emit_loop(loop_start);

        self.patch_jump(exit_jump);
        self.emit_op(Op::Pop);
    }

    fn for_statement(&mut self) {
        self.begin_scope();
        self.consume(TokenKind::LeftParen, "Expect '(' after 'for'.");
        if self.match_current(TokenKind::Semicolon) {
            // no initializer
        } else if self.match_current(TokenKind::Var) {
            self.var_declaration();
        } else {
            self.expression_statement();
        }

        let mut loop_start = self.chunk.len();
        let mut exit_jump = None;
        if !self.match_current(TokenKind::Semicolon) {
            self.expression();
            self.consume(TokenKind::Semicolon, "Expect ';' after loop condition.");

            exit_jump = Some(self.emit_jump(Op::JumpIfFalse));
            self.emit_op(Op::Pop);
        }

        if !self.match_current(TokenKind::RightParen) {
            let body_jump = self.emit_jump(Op::Jump);
            let increment_start = self.chunk.len();
            self.expression();
            self.emit_op(Op::Pop);
            self.consume(TokenKind::RightParen, "Expect ')' after for clauses.");

            self.emit_loop(loop_start);
            loop_start = increment_start;
            self.patch_jump(body_jump);
        }

        self.statement();
        self.emit_loop(loop_start);

        if let Some(exit_jump) = exit_jump {
            self.patch_jump(exit_jump);
            self.emit_op(Op::Pop);
        }

        self.end_scope();
    }

    fn synchronize(&mut self) {
        self.panic_mode = false;

        while !self.check(TokenKind::Eof) {
            if self.previous.kind == TokenKind::Semicolon {
                return;
            }
            if self.current.kind.starts_statement() {
                return;
            }
            self.advance();
        }
    }

    // expressions

    fn expression(&mut self) {
        self.parse_precedence(Precedence::Assignment);
    }

    fn parse_precedence(&mut self, precedence: Precedence) {
        if !self.enter_nesting() {
            return;
        }
        self.parse_nested(precedence);
        self.nesting -= 1;
    }

    fn parse_nested(&mut self, precedence: Precedence) {
        self.advance();
        let can_assign = precedence <= Precedence::Assignment;

        match ParseRule::of(self.previous.kind).prefix {
            Some(prefix) => self.apply(prefix, can_assign),
            None => {
                self.error("Expect expression.");
                return;
            }
        }

        while precedence <= ParseRule::of(self.current.kind).precedence {
            self.advance();
            if let Some(infix) = ParseRule::of(self.previous.kind).infix {
                self.apply(infix, can_assign);
            }
        }

        if can_assign && self.match_current(TokenKind::Equal) {
            self.error("Invalid assignment target.")
        }
    }

    fn enter_nesting(&mut self) -> bool {
        if self.nesting == NESTING_MAX {
            self.error_at_current("Too much nesting.");
            return false;
        }
        self.nesting += 1;
        true
    }

    fn apply(&mut self, rule: ParseFn, can_assign: bool) {
        match rule {
            ParseFn::Grouping => self.grouping(),
            ParseFn::Unary => self.unary(),
            ParseFn::Binary => self.binary(),
            ParseFn::Number => self.number(),
            ParseFn::String => self.string(),
            ParseFn::Literal => self.literal(),
            ParseFn::Variable => self.variable(can_assign),
            ParseFn::And => self.and(),
            ParseFn::Or => self.or(),
        }
    }

    fn grouping(&mut self) {
        self.expression();
        self.consume(TokenKind::RightParen, "Expect ')' after expression.")
    }

    fn number(&mut self) {
        match self.previous.lexeme.parse::<f64>() {
            Ok(value) => self.emit_constant(Value::Number(value)),
            Err(_) => self.error("Invalid number literal."),
        }
    }

    fn string(&mut self) {
        let lexeme = self.previous.lexeme;
        let contents = &lexeme[1..lexeme.len() - 1];
        let string = Object::copy_string(contents, self.interner);
        self.emit_constant(Value::Obj(string));
    }

    fn literal(&mut self) {
        match self.previous.kind {
            TokenKind::False => self.emit_op(Op::False),
            TokenKind::True => self.emit_op(Op::True),
            TokenKind::Nil => self.emit_op(Op::Nil),
            _ => unreachable!("literal rule on non-literal token"),
        }
    }

    fn unary(&mut self) {
        let op_kind = self.previous.kind;

        // compile operand
        self.parse_precedence(Precedence::Unary);

        match op_kind {
            TokenKind::Minus => self.emit_op(Op::Negate),
            TokenKind::Bang => self.emit_op(Op::Not),
            _ => unreachable!("unary rule on non-unary token"),
        }
    }

    fn binary(&mut self) {
        let op_kind = self.previous.kind;
        let rule = ParseRule::of(op_kind);
        self.parse_precedence(rule.precedence.next());

        match op_kind {
            TokenKind::Plus => self.emit_op(Op::Add),
            TokenKind::Minus => self.emit_op(Op::Subtract),
            TokenKind::Star => self.emit_op(Op::Multiply),
            TokenKind::Slash => self.emit_op(Op::Divide),
            TokenKind::BangEqual => self.emit_ops(Op::Equal, Op::Not),
            TokenKind::EqualEqual => self.emit_op(Op::Equal),
            TokenKind::Greater => self.emit_op(Op::Greater),
            TokenKind::GreaterEqual => self.emit_ops(Op::Less, Op::Not),
            TokenKind::Less => self.emit_op(Op::Less),
            TokenKind::LessEqual => self.emit_ops(Op::Greater, Op::Not),
            _ => unreachable!("binary rule on non-binary token"),
        }
    }

    fn and(&mut self) {
        let end_jump = self.emit_jump(Op::JumpIfFalse);
        self.emit_op(Op::Pop);
        self.parse_precedence(Precedence::And);
        self.patch_jump(end_jump);
    }

    fn or(&mut self) {
        let else_jump = self.emit_jump(Op::JumpIfFalse);
        let end_jump = self.emit_jump(Op::Jump);

        self.patch_jump(else_jump);
        self.emit_op(Op::Pop);

        self.parse_precedence(Precedence::Or);
        self.patch_jump(end_jump);
    }

    fn variable(&mut self, can_assign: bool) {
        let name = self.previous.lexeme;
        self.named_variable(name, can_assign);
    }

    fn named_variable(&mut self, name: &str, can_assign: bool) {
        let (get_op, set_op, arg) = match self.compiler.resolve_local(name) {
            Some(slot) => {
                if !slot.initialized {
                    self.error("Can't read local variable in its own initializer.");
                }
                (Op::GetLocal, Op::SetLocal, slot.index)
            }
            None => {
                let arg = self.identifier_constant(name);
                (Op::GetGlobal, Op::SetGlobal, arg)
            }
        };

        if can_assign && self.match_current(TokenKind::Equal) {
            self.expression();
            self.emit_op_with(set_op, arg);
        } else {
            self.emit_op_with(get_op, arg);
        }
    }

    // variables and scopes

    fn parse_variable(&mut self, error_msg: &str) -> u8 {
        self.consume(TokenKind::Identifier, error_msg);

        self.declare_variable();
        if !self.compiler.is_global_scope() {
            return 0;
        }

        let name = self.previous.lexeme;
        self.identifier_constant(name)
    }

    fn declare_variable(&mut self) {
        if self.compiler.is_global_scope() {
            return;
        }

        let name = self.previous.lexeme;
        match self.compiler.declare_local(name) {
            Ok(()) => {}
            Err(ScopeError::AlreadyDeclared) => {
                self.error("Already a variable with this name in this scope.")
            }
            Err(ScopeError::TooManyLocals) => self.error("Too many local variables in function."),
        }
    }

    fn define_variable(&mut self, global: u8) {
        if !self.compiler.is_global_scope() {
            self.compiler.mark_initialized();
            return;
        }
        self.emit_op_with(Op::DefineGlobal, global)
    }

    /// Identifier names share one constant slot per chunk.
    fn identifier_constant(&mut self, name: &str) -> u8 {
        let handle = self.interner.intern(name);
        if let Some(&index) = self.identifiers.get(&handle) {
            return index;
        }
        let index = self.make_constant(Value::string(handle));
        self.identifiers.insert(handle, index);
        index
    }

    fn begin_scope(&mut self) {
        self.compiler.begin_scope();
    }

    fn end_scope(&mut self) {
        for _ in 0..self.compiler.end_scope() {
            self.emit_op(Op::Pop);
        }
    }

    // emitting

    fn emit_byte(&mut self, byte: u8) {
        self.chunk.write(byte, self.previous.line)
    }

    fn emit_op(&mut self, op: Op) {
        self.emit_byte(op.u8())
    }

    fn emit_ops(&mut self, op1: Op, op2: Op) {
        self.emit_op(op1);
        self.emit_op(op2)
    }

    fn emit_op_with(&mut self, op: Op, operand: u8) {
        self.emit_op(op);
        self.emit_byte(operand)
    }

    /// Emits `op` with a placeholder offset and returns where the offset lives.
    fn emit_jump(&mut self, op: Op) -> usize {
        self.emit_op(op);
        self.emit_byte(0xff);
        self.emit_byte(0xff);
        self.chunk.len() - 2
    }

    fn patch_jump(&mut self, offset: usize) {
        // -2 to skip over the jump offset itself
        let jump = self.chunk.len() - offset - 2;
        let jump = match u16::try_from(jump) {
            Ok(jump) => jump,
            Err(_) => {
                self.error("Too much code to jump over.");
                return;
            }
        };
        let [hi, lo] = jump.to_be_bytes();
        self.chunk.patch(offset, hi);
        self.chunk.patch(offset + 1, lo);
    }

    fn emit_loop(&mut self, loop_start: usize) {
        self.emit_op(Op::Loop);

        // +2 for the operand about to be written
        let offset = self.chunk.len() - loop_start + 2;
        let offset = u16::try_from(offset).unwrap_or_else(|_| {
            self.error("Loop body too large.");
            0
        });
        let [hi, lo] = offset.to_be_bytes();
        self.emit_byte(hi);
        self.emit_byte(lo);
    }

    fn emit_return(&mut self) {
        self.emit_op(Op::Return)
    }

    fn emit_constant(&mut self, val: Value) {
        let konst = self.make_constant(val);
        self.emit_op_with(Op::Constant, konst)
    }

    fn make_constant(&mut self, val: Value) -> u8 {
        let constant_idx = self.chunk.add_constant(val);
        if constant_idx >= CONSTANTS_MAX {
            self.error("Too many constants in one chunk.");
            return 0;
        }
        constant_idx as u8
    }

    fn end_compiler(&mut self) {
        self.emit_return();
        if !self.had_error() && log::log_enabled!(log::Level::Debug) {
            log::debug!("{}", self.chunk.disassemble("code", self.interner));
        }
    }

    // errors

    fn error(&mut self, message: &str) {
        self.error_at(self.previous, message)
    }

    fn error_at_current(&mut self, message: &str) {
        self.error_at(self.current, message);
    }

    fn error_at(&mut self, token: Token, message: &str) {
        if self.panic_mode {
            return;
        }
        self.panic_mode = true;

        let location = match token.kind {
            TokenKind::Eof => Location::End,
            TokenKind::Error => Location::Unknown,
            _ => Location::At(token.lexeme.to_owned()),
        };
        let error = CompileError {
            line: token.line,
            location,
            message: message.to_owned(),
        };
        log::debug!("{}", error);
        self.errors.push(error);
    }
}

/// Where in the source a compile error was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    At(String),
    End,
    Unknown,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::At(lexeme) => write!(f, " at '{}'", lexeme),
            Location::End => write!(f, " at end"),
            Location::Unknown => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[line {line}] Error{location}: {message}")]
pub struct CompileError {
    pub line: usize,
    pub location: Location,
    pub message: String,
}

/// Every diagnostic reported by one compile pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", one_per_line(.0))]
pub struct CompilationError(pub Vec<CompileError>);

impl CompilationError {
    pub fn errors(&self) -> &[CompileError] {
        &self.0
    }
}

fn one_per_line(errors: &[CompileError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    None,
    Assignment, // =
    Or,         // or
    And,        // and
    Equality,   // == !=
    Comparison, // < > <= >=
    Term,       // + -
    Factor,     // * /
    Unary,      // ! -
    Call,       // . ()
    Primary,
}

impl Precedence {
    fn next(self) -> Self {
        match self {
            Precedence::None => Precedence::Assignment,
            Precedence::Assignment => Precedence::Or,
            Precedence::Or => Precedence::And,
            Precedence::And => Precedence::Equality,
            Precedence::Equality => Precedence::Comparison,
            Precedence::Comparison => Precedence::Term,
            Precedence::Term => Precedence::Factor,
            Precedence::Factor => Precedence::Unary,
            Precedence::Unary => Precedence::Call,
            Precedence::Call | Precedence::Primary => Precedence::Primary,
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum ParseFn {
    Grouping,
    Unary,
    Binary,
    Number,
    String,
    Literal,
    Variable,
    And,
    Or,
}

struct ParseRule {
    prefix: Option<ParseFn>,
    infix: Option<ParseFn>,
    precedence: Precedence,
}

impl ParseRule {
    fn new(prefix: Option<ParseFn>, infix: Option<ParseFn>, precedence: Precedence) -> Self {
        Self {
            prefix,
            infix,
            precedence,
        }
    }

    fn none() -> Self {
        Self::new(None, None, Precedence::None)
    }

    fn of(kind: TokenKind) -> Self {
        use ParseFn as F;

        match kind {
            TokenKind::LeftParen => Self::new(Some(F::Grouping), None, Precedence::None),
            TokenKind::Minus => Self::new(Some(F::Unary), Some(F::Binary), Precedence::Term),
            TokenKind::Plus => Self::new(None, Some(F::Binary), Precedence::Term),
            TokenKind::Slash | TokenKind::Star => {
                Self::new(None, Some(F::Binary), Precedence::Factor)
            }
            TokenKind::Bang => Self::new(Some(F::Unary), None, Precedence::None),
            TokenKind::BangEqual | TokenKind::EqualEqual => {
                Self::new(None, Some(F::Binary), Precedence::Equality)
            }
            TokenKind::Greater
            | TokenKind::GreaterEqual
            | TokenKind::Less
            | TokenKind::LessEqual => Self::new(None, Some(F::Binary), Precedence::Comparison),
            TokenKind::Identifier => Self::new(Some(F::Variable), None, Precedence::None),
            TokenKind::String => Self::new(Some(F::String), None, Precedence::None),
            TokenKind::Number => Self::new(Some(F::Number), None, Precedence::None),
            TokenKind::False | TokenKind::Nil | TokenKind::True => {
                Self::new(Some(F::Literal), None, Precedence::None)
            }
            TokenKind::And => Self::new(None, Some(F::And), Precedence::And),
            TokenKind::Or => Self::new(None, Some(F::Or), Precedence::Or),
            TokenKind::RightParen
            | TokenKind::LeftBrace
            | TokenKind::RightBrace
            | TokenKind::Comma
            | TokenKind::Dot
            | TokenKind::Semicolon
            | TokenKind::Equal
            | TokenKind::Var
            | TokenKind::While
            | TokenKind::Print
            | TokenKind::Eof
            | TokenKind::Error
            | TokenKind::Class
            | TokenKind::Else
            | TokenKind::Fun
            | TokenKind::For
            | TokenKind::If
            | TokenKind::Return
            | TokenKind::Super
            | TokenKind::This => Self::none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{chunk::Chunk, interner::Interner, opcodes::Op, value::Value};
    use pretty_assertions::assert_eq;
    use typed_arena::Arena;

    fn compile(source: &str) -> Chunk {
        let arena = Arena::new();
        let mut interner = Interner::new(&arena);
        crate::compile(source, &mut interner).unwrap()
    }

    fn errors(source: &str) -> Vec<String> {
        let arena = Arena::new();
        let mut interner = Interner::new(&arena);
        match crate::compile(source, &mut interner) {
            Ok(_) => Vec::new(),
            Err(err) => err.errors().iter().map(ToString::to_string).collect(),
        }
    }

    fn ops(bytes: &[Op]) -> Vec<u8> {
        bytes.iter().map(|op| op.u8()).collect()
    }

    #[test]
    fn desugared_comparisons() {
        let chunk = compile("print 1 != 2;");
        let mut expected = ops(&[Op::Constant]);
        expected.push(0);
        expected.push(Op::Constant.u8());
        expected.push(1);
        expected.extend(ops(&[Op::Equal, Op::Not, Op::Print, Op::Return]));
        assert_eq!(chunk.code(), expected.as_slice());

        let chunk = compile("1 <= 2;");
        assert_eq!(&chunk.code()[4..6], ops(&[Op::Greater, Op::Not]).as_slice());
        let chunk = compile("1 >= 2;");
        assert_eq!(&chunk.code()[4..6], ops(&[Op::Less, Op::Not]).as_slice());
    }

    #[test]
    fn global_definition() {
        let chunk = compile("var a = 1;");
        assert_eq!(
            chunk.code(),
            &[
                Op::Constant.u8(),
                1,
                Op::DefineGlobal.u8(),
                0,
                Op::Return.u8()
            ]
        );
        assert_eq!(chunk.constants()[1], Value::Number(1.0));
    }

    #[test]
    fn identifier_constants_are_deduplicated() {
        let chunk = compile("a = 1; a = a; print a;");
        assert_eq!(chunk.constants().len(), 2);
    }

    #[test]
    fn locals_live_on_the_stack() {
        let chunk = compile("{ var a = 1; print a; }");
        assert_eq!(
            chunk.code(),
            &[
                Op::Constant.u8(),
                0,
                Op::GetLocal.u8(),
                0,
                Op::Print.u8(),
                Op::Pop.u8(),
                Op::Return.u8()
            ]
        );
    }

    #[test]
    fn lines_follow_tokens() {
        let chunk = compile("print 1;\n\nprint 2;");
        assert_eq!(chunk.lines(), &[1, 1, 1, 3, 3, 3, 3]);
    }

    #[test]
    fn redeclaring_in_the_same_block() {
        assert_eq!(
            errors("{ var a = 1; var a = 2; }"),
            vec!["[line 1] Error at 'a': Already a variable with this name in this scope."]
        );
        assert!(errors("{ var a = 1; { var a = 2; } }").is_empty());
        assert!(errors("var a = 1; var a = 2;").is_empty());
    }

    #[test]
    fn reading_a_local_in_its_own_initializer() {
        assert_eq!(
            errors("{ var a = a; }"),
            vec!["[line 1] Error at 'a': Can't read local variable in its own initializer."]
        );
    }

    #[test]
    fn shadowing_initializer_reads_the_enclosing_local() {
        let chunk = compile("{ var a = 1; { var a = a + 1; } }");
        assert_eq!(&chunk.code()[2..4], &[Op::GetLocal.u8(), 0]);
        assert!(errors("{ var a = 1; { var a = a; } }").is_empty());
        assert_eq!(
            errors("var a = 1; { var a = a; }"),
            vec!["[line 1] Error at 'a': Can't read local variable in its own initializer."]
        );
    }

    #[test]
    fn invalid_assignment_target() {
        assert_eq!(
            errors("var a; var b; var c; a + b = c;"),
            vec!["[line 1] Error at '=': Invalid assignment target."]
        );
    }

    #[test]
    fn reports_every_error_in_one_pass() {
        assert_eq!(
            errors("print ;\nvar = 1;\nprint 2;\nprint 3"),
            vec![
                "[line 1] Error at ';': Expect expression.",
                "[line 2] Error at '=': Expect variable name.",
                "[line 4] Error at end: Expect ';' after value.",
            ]
        );
    }

    #[test]
    fn scanner_errors_have_no_location() {
        assert_eq!(
            errors("print \"abc"),
            vec!["[line 1] Error: Unterminated string."]
        );
        assert_eq!(errors("print 1 # 2;"), vec!["[line 1] Error: Unexpected character."]);
    }

    #[test]
    fn too_many_constants() {
        let source: String = (0..=256).map(|i| format!("print {};", i)).collect();
        assert_eq!(
            errors(&source),
            vec!["[line 1] Error at '256': Too many constants in one chunk."]
        );
    }

    #[test]
    fn too_many_locals() {
        let body: String = (0..=256).map(|i| format!("var v{};", i)).collect();
        assert_eq!(
            errors(&format!("{{{}}}", body)),
            vec!["[line 1] Error at 'v256': Too many local variables in function."]
        );

        let body: String = (0..256).map(|i| format!("var v{};", i)).collect();
        assert!(errors(&format!("{{{}}}", body)).is_empty());
    }

    #[test]
    fn oversized_jumps() {
        let body = "nil;".repeat(32_768);
        assert_eq!(
            errors(&format!("if (true) {{{}}}", body)),
            vec!["[line 1] Error at '}': Too much code to jump over."]
        );
        assert_eq!(
            errors(&format!("while (false) {{{}}}", body)),
            vec!["[line 1] Error at '}': Loop body too large."]
        );
    }

    #[test]
    fn deep_nesting_is_a_compile_error() {
        let source = format!("print {}1;", "(".repeat(100_000));
        assert_eq!(
            errors(&source),
            vec!["[line 1] Error at '(': Too much nesting."]
        );

        let source = format!("print {};", "-".repeat(100_000));
        assert_eq!(errors(&source), vec!["[line 1] Error at '-': Too much nesting."]);

        let blocks = errors(&"{".repeat(100_000));
        assert_eq!(blocks[0], "[line 1] Error at '{': Too much nesting.");

        let source = format!("print {}1{};", "(".repeat(200), ")".repeat(200));
        assert!(errors(&source).is_empty());
    }

    #[test]
    fn jumps_land_on_instruction_boundaries() {
        let chunk = compile(
            "var total = 0;
             for (var i = 0; i < 10; i = i + 1) {
                 if (i == 3 or i == 5 and true) print i; else { var j = i; total = total + j; }
                 while (false) print \"never\";
             }
             for (;;) { }
             print total;",
        );

        let code = chunk.code();
        let mut starts = Vec::new();
        let mut jumps = Vec::new();
        let mut offset = 0;
        while offset < code.len() {
            starts.push(offset);
            let op = Op::from_u8(code[offset]).unwrap();
            let next = offset + 1 + op.operand_width();
            if op.operand_width() == 2 {
                let distance = chunk.read_u16(offset + 1).unwrap() as usize;
                let target = match op {
                    Op::Loop => next - distance,
                    _ => next + distance,
                };
                jumps.push(target);
            }
            offset = next;
        }

        assert!(!jumps.is_empty());
        for target in jumps {
            assert!(
                starts.contains(&target) || target == code.len(),
                "jump to {} is not an instruction boundary",
                target
            );
        }
    }

    #[test]
    fn compiling_twice_is_deterministic() {
        let source = "var a = \"x\"; { var b = a + \"y\"; print b; } print a == \"x\";";
        assert_eq!(compile(source), compile(source));
    }
}

use crate::token::{Token, TokenKind};

const UNEXPECTED_CHARACTER: &str = "Unexpected character.";
const UNTERMINATED_STRING: &str = "Unterminated string.";

/// Single-pass lexer over a borrowed source buffer.
///
/// Tokens are produced on demand by [`Scanner::scan_token`]. Once the input is
/// exhausted every further call yields an `Eof` token.
pub struct Scanner<'source> {
    source: &'source str,
    start: usize,
    current: usize,
    line: usize,
    finished: bool,
}

impl<'source> Scanner<'source> {
    pub fn new(source: &'source str) -> Self {
        Scanner {
            source,
            start: 0,
            current: 0,
            line: 1,
            finished: false,
        }
    }

    pub fn scan_token(&mut self) -> Token<'source> {
        self.skip_whitespace();
        self.start = self.current;

        let c = match self.advance() {
            Some(c) => c,
            None => return self.make_token(TokenKind::Eof),
        };

        match c {
            b'(' => self.make_token(TokenKind::LeftParen),
            b')' => self.make_token(TokenKind::RightParen),
            b'{' => self.make_token(TokenKind::LeftBrace),
            b'}' => self.make_token(TokenKind::RightBrace),
            b';' => self.make_token(TokenKind::Semicolon),
            b',' => self.make_token(TokenKind::Comma),
            b'.' => self.make_token(TokenKind::Dot),
            b'-' => self.make_token(TokenKind::Minus),
            b'+' => self.make_token(TokenKind::Plus),
            b'/' => self.make_token(TokenKind::Slash),
            b'*' => self.make_token(TokenKind::Star),
            b'!' => self.make_operator(TokenKind::BangEqual, TokenKind::Bang),
            b'=' => self.make_operator(TokenKind::EqualEqual, TokenKind::Equal),
            b'<' => self.make_operator(TokenKind::LessEqual, TokenKind::Less),
            b'>' => self.make_operator(TokenKind::GreaterEqual, TokenKind::Greater),
            b'"' => self.string(),
            c if c.is_ascii_digit() => self.number(),
            c if is_ident_head(c) => self.identifier(),
            _ => {
                // skip the rest of a multi-byte character
                while matches!(self.peek(), Some(b) if b & 0xC0 == 0x80) {
                    self.current += 1;
                }
                self.error_token(UNEXPECTED_CHARACTER)
            }
        }
    }

    fn make_operator(&mut self, paired: TokenKind, single: TokenKind) -> Token<'source> {
        let kind = if self.matches(b'=') { paired } else { single };
        self.make_token(kind)
    }

    fn string(&mut self) -> Token<'source> {
        loop {
            match self.advance() {
                Some(b'"') => return self.make_token(TokenKind::String),
                Some(b'\n') => self.line += 1,
                Some(_) => {}
                None => return self.error_token(UNTERMINATED_STRING),
            }
        }
    }

    fn number(&mut self) -> Token<'source> {
        self.advance_while(|c| c.is_ascii_digit());

        if self.peek() == Some(b'.') && matches!(self.peek_next(), Some(c) if c.is_ascii_digit())
        {
            self.current += 1;
            self.advance_while(|c| c.is_ascii_digit());
        }

        self.make_token(TokenKind::Number)
    }

    fn identifier(&mut self) -> Token<'source> {
        self.advance_while(is_ident_tail);
        let kind = TokenKind::keyword(self.lexeme()).unwrap_or(TokenKind::Identifier);
        self.make_token(kind)
    }

    fn skip_whitespace(&mut self) {
        loop {
            match self.peek() {
                Some(b' ') | Some(b'\r') | Some(b'\t') => self.current += 1,
                Some(b'\n') => {
                    self.line += 1;
                    self.current += 1;
                }
                Some(b'/') if self.peek_next() == Some(b'/') => {
                    self.advance_while(|c| c != b'\n');
                }
                _ => break,
            }
        }
    }

    fn advance(&mut self) -> Option<u8> {
        let c = self.peek()?;
        self.current += 1;
        Some(c)
    }

    fn advance_while<F>(&mut self, mut pred: F)
    where
        F: FnMut(u8) -> bool,
    {
        while let Some(c) = self.peek() {
            if pred(c) {
                self.current += 1;
            } else {
                break;
            }
        }
    }

    fn matches(&mut self, expected: u8) -> bool {
        if self.peek() == Some(expected) {
            self.current += 1;
            true
        } else {
            false
        }
    }

    fn peek(&self) -> Option<u8> {
        self.source.as_bytes().get(self.current).copied()
    }

    fn peek_next(&self) -> Option<u8> {
        self.source.as_bytes().get(self.current + 1).copied()
    }

    fn lexeme(&self) -> &'source str {
        &self.source[self.start..self.current]
    }

    fn make_token(&self, kind: TokenKind) -> Token<'source> {
        Token::new(kind, self.lexeme(), self.line)
    }

    fn error_token(&self, message: &'static str) -> Token<'source> {
        Token::new(TokenKind::Error, message, self.line)
    }
}

impl<'source> Iterator for Scanner<'source> {
    type Item = Token<'source>;

    /// Yields every token up to and including the first `Eof`.
    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let token = self.scan_token();
        if token.kind == TokenKind::Eof {
            self.finished = true;
        }
        Some(token)
    }
}

fn is_ident_head(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_'
}

fn is_ident_tail(c: u8) -> bool {
    is_ident_head(c) || c.is_ascii_digit()
}

#[cfg(test)]
mod tests {
    use crate::token::{Token, TokenKind};
    use pretty_assertions::assert_eq;

    use super::Scanner;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Scanner::new(src).map(|t| t.kind).collect()
    }

    #[test]
    fn arithmetic_expression() {
        let tokens: Vec<Token> = Scanner::new("1 + 2 * 3").collect();
        assert_eq!(
            tokens,
            vec![
                Token::new(TokenKind::Number, "1", 1),
                Token::new(TokenKind::Plus, "+", 1),
                Token::new(TokenKind::Number, "2", 1),
                Token::new(TokenKind::Star, "*", 1),
                Token::new(TokenKind::Number, "3", 1),
                Token::new(TokenKind::Eof, "", 1),
            ]
        );
    }

    #[test]
    fn every_token_kind() {
        use TokenKind::*;

        assert_eq!(
            kinds("( ) { } , . - + ; / * ! != = == > >= < <= foo _bar9 \"str\" 1 1.2 and class else false for fun if nil or print return super this true var while"),
            vec![
                LeftParen, RightParen, LeftBrace, RightBrace, Comma, Dot, Minus, Plus,
                Semicolon, Slash, Star, Bang, BangEqual, Equal, EqualEqual, Greater,
                GreaterEqual, Less, LessEqual, Identifier, Identifier, String, Number,
                Number, And, Class, Else, False, For, Fun, If, Nil, Or, Print, Return,
                Super, This, True, Var, While, Eof,
            ]
        );
    }

    #[test]
    fn keywords_need_maximal_munch() {
        let tokens: Vec<Token> = Scanner::new("orchid variable").collect();
        assert_eq!(tokens[0].kind, TokenKind::Identifier);
        assert_eq!(tokens[0].lexeme, "orchid");
        assert_eq!(tokens[1].kind, TokenKind::Identifier);
    }

    #[test]
    fn eof_repeats_forever() {
        let mut scanner = Scanner::new("x");
        assert_eq!(scanner.scan_token().kind, TokenKind::Identifier);
        for _ in 0..3 {
            assert_eq!(scanner.scan_token().kind, TokenKind::Eof);
        }
    }

    #[test]
    fn comments_and_lines() {
        let tokens: Vec<Token> = Scanner::new("// nothing here\nprint\n\n  1; // trailing").collect();
        assert_eq!(
            tokens,
            vec![
                Token::new(TokenKind::Print, "print", 2),
                Token::new(TokenKind::Number, "1", 4),
                Token::new(TokenKind::Semicolon, ";", 4),
                Token::new(TokenKind::Eof, "", 4),
            ]
        );
    }

    #[test]
    fn multiline_string_counts_lines() {
        let tokens: Vec<Token> = Scanner::new("\"a\nb\" x").collect();
        assert_eq!(tokens[0], Token::new(TokenKind::String, "\"a\nb\"", 2));
        assert_eq!(tokens[1], Token::new(TokenKind::Identifier, "x", 2));
    }

    #[test]
    fn trailing_dot_is_not_part_of_number() {
        assert_eq!(
            kinds("12."),
            vec![TokenKind::Number, TokenKind::Dot, TokenKind::Eof]
        );
    }

    #[test]
    fn errors_carry_a_message() {
        let tokens: Vec<Token> = Scanner::new("@ \"open").collect();
        assert_eq!(tokens[0], Token::new(TokenKind::Error, "Unexpected character.", 1));
        assert_eq!(tokens[1], Token::new(TokenKind::Error, "Unterminated string.", 1));
        assert_eq!(tokens[2].kind, TokenKind::Eof);
    }

    #[test]
    fn non_ascii_character_is_one_error() {
        assert_eq!(
            kinds("é 1"),
            vec![TokenKind::Error, TokenKind::Number, TokenKind::Eof]
        );
    }
}

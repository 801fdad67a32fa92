use std::fmt;

pub struct Lexer<'a> {
    source: &'a str,
    start: usize,
    current: usize,
    line: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Token<'a> {
    pub tok_type: TokenType,
    pub source: &'a str,
    pub line: u32,
}

impl<'a> Token<'a> {
    fn new(tok_type: TokenType, source: &'a str, line: u32) -> Self {
        Self {
            tok_type,
            source,
            line,
        }
    }

    /// Contents of a string literal without the surrounding quotes.
    pub fn string_value(&self) -> &'a str {
        if self.tok_type == TokenType::Str && self.source.len() >= 2 {
            &self.source[1..self.source.len() - 1]
        } else {
            self.source
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
    LeftParen, RightParen,
    LeftBrace, RightBrace,
    LeftBracket, RightBracket,
    Comma, Dot, SemiColon,
    Plus, Minus, Star, Slash,
    Amp, Pipe, Tilde,
    Less, Greater, Equal,

    Identifier, Str, Integer,

    Class, Constructor, Function, Method,
    Field, Static, Var,
    Int, Char, Boolean, Void,
    True, False, Null, This,
    Let, Do, If, Else, While, Return,

    Error,
    Eof,
}

impl TokenType {
    pub fn is_keyword(self) -> bool {
        use TokenType::*;
        matches!(
            self,
            Class | Constructor | Function | Method | Field | Static | Var | Int | Char
                | Boolean | Void | True | False | Null | This | Let | Do | If | Else
                | While | Return
        )
    }

    /// Category name used by the grammar trace.
    pub fn category(self) -> &'static str {
        match self {
            TokenType::Identifier => "identifier",
            TokenType::Str => "stringConstant",
            TokenType::Integer => "integerConstant",
            TokenType::Error => "error",
            TokenType::Eof => "eof",
            t if t.is_keyword() => "keyword",
            _ => "symbol",
        }
    }

    fn spelling(self) -> &'static str {
        use TokenType::*;
        match self {
            LeftParen => "(",
            RightParen => ")",
            LeftBrace => "{",
            RightBrace => "}",
            LeftBracket => "[",
            RightBracket => "]",
            Comma => ",",
            Dot => ".",
            SemiColon => ";",
            Plus => "+",
            Minus => "-",
            Star => "*",
            Slash => "/",
            Amp => "&",
            Pipe => "|",
            Tilde => "~",
            Less => "<",
            Greater => ">",
            Equal => "=",
            Identifier => "identifier",
            Str => "string constant",
            Integer => "integer constant",
            Class => "class",
            Constructor => "constructor",
            Function => "function",
            Method => "method",
            Field => "field",
            Static => "static",
            Var => "var",
            Int => "int",
            Char => "char",
            Boolean => "boolean",
            Void => "void",
            True => "true",
            False => "false",
            Null => "null",
            This => "this",
            Let => "let",
            Do => "do",
            If => "if",
            Else => "else",
            While => "while",
            Return => "return",
            Error => "error",
            Eof => "end of input",
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenType::Identifier
            | TokenType::Str
            | TokenType::Integer
            | TokenType::Error
            | TokenType::Eof => write!(f, "{}", self.spelling()),
            _ => write!(f, "'{}'", self.spelling()),
        }
    }
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            start: 0,
            current: 0,
            line: 1,
        }
    }

    pub fn next(&mut self) -> Token<'a> {
        if let Err(message) = self.skip_whitespace() {
            return self.error_token(message);
        }
        self.start = self.current;
        if self.is_at_end() {
            return self.make_token(TokenType::Eof);
        }
        match self.advance() {
            b'(' => self.make_token(TokenType::LeftParen),
            b')' => self.make_token(TokenType::RightParen),
            b'{' => self.make_token(TokenType::LeftBrace),
            b'}' => self.make_token(TokenType::RightBrace),
            b'[' => self.make_token(TokenType::LeftBracket),
            b']' => self.make_token(TokenType::RightBracket),
            b',' => self.make_token(TokenType::Comma),
            b'.' => self.make_token(TokenType::Dot),
            b';' => self.make_token(TokenType::SemiColon),
            b'+' => self.make_token(TokenType::Plus),
            b'-' => self.make_token(TokenType::Minus),
            b'*' => self.make_token(TokenType::Star),
            b'/' => self.make_token(TokenType::Slash),
            b'&' => self.make_token(TokenType::Amp),
            b'|' => self.make_token(TokenType::Pipe),
            b'~' => self.make_token(TokenType::Tilde),
            b'<' => self.make_token(TokenType::Less),
            b'>' => self.make_token(TokenType::Greater),
            b'=' => self.make_token(TokenType::Equal),
            b'"' => self.string(),
            c if c.is_ascii_digit() => self.number(),
            c if is_ident_start(c) => self.identifier(),
            _ => self.error_token("Unexpected character."),
        }
    }

    fn skip_whitespace(&mut self) -> Result<(), &'static str> {
        loop {
            match self.peek() {
                b' ' | b'\r' | b'\t' => self.current += 1,
                b'\n' => {
                    self.current += 1;
                    self.line += 1;
                }
                b'/' if self.peek_2() == b'/' => {
                    // comment until the end of the line
                    while self.peek() != b'\n' && !self.is_at_end() {
                        self.current += 1;
                    }
                }
                b'/' if self.peek_2() == b'*' => self.block_comment()?,
                _ => return Ok(()),
            }
        }
    }

    // Covers both `/* ... */` and `/** ... */`.
    fn block_comment(&mut self) -> Result<(), &'static str> {
        self.current += 2;
        loop {
            if self.is_at_end() {
                return Err("Unterminated comment.");
            }
            match self.peek() {
                b'*' if self.peek_2() == b'/' => {
                    self.current += 2;
                    return Ok(());
                }
                b'\n' => self.line += 1,
                _ => (),
            }
            self.current += 1;
        }
    }

    fn peek(&self) -> u8 {
        self.source.as_bytes().get(self.current).copied().unwrap_or(b'\0')
    }

    fn peek_2(&self) -> u8 {
        self.source
            .as_bytes()
            .get(self.current + 1)
            .copied()
            .unwrap_or(b'\0')
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    fn advance(&mut self) -> u8 {
        self.current += 1;
        self.source.as_bytes()[self.current - 1]
    }

    fn make_token(&self, tok_type: TokenType) -> Token<'a> {
        let text = self.source.get(self.start..self.current).unwrap_or("");
        Token::new(tok_type, text, self.line)
    }

    pub fn error_token(&self, message: &'static str) -> Token<'a> {
        Token::new(TokenType::Error, message, self.line)
    }

    fn string(&mut self) -> Token<'a> {
        while self.peek() != b'"' && self.peek() != b'\n' && !self.is_at_end() {
            self.current += 1;
        }

        if self.peek() != b'"' {
            self.error_token("Unterminated string.")
        } else {
            self.current += 1; // consume closing quote
            self.make_token(TokenType::Str)
        }
    }

    fn number(&mut self) -> Token<'a> {
        while self.peek().is_ascii_digit() {
            self.current += 1;
        }
        self.make_token(TokenType::Integer)
    }

    fn identifier(&mut self) -> Token<'a> {
        while is_ident_start(self.peek()) || self.peek().is_ascii_digit() {
            self.current += 1;
        }
        self.make_token(self.identifier_type())
    }

    fn identifier_type(&self) -> TokenType {
        let bytes = self.source.as_bytes();
        let second = || {
            if self.current - self.start > 1 {
                bytes[self.start + 1]
            } else {
                b'\0'
            }
        };
        match bytes[self.start] {
            b'b' => self.check_keyword(1, "oolean", TokenType::Boolean),
            b'c' => match second() {
                b'h' => self.check_keyword(2, "ar", TokenType::Char),
                b'l' => self.check_keyword(2, "ass", TokenType::Class),
                b'o' => self.check_keyword(2, "nstructor", TokenType::Constructor),
                _ => TokenType::Identifier,
            },
            b'd' => self.check_keyword(1, "o", TokenType::Do),
            b'e' => self.check_keyword(1, "lse", TokenType::Else),
            b'f' => match second() {
                b'a' => self.check_keyword(2, "lse", TokenType::False),
                b'i' => self.check_keyword(2, "eld", TokenType::Field),
                b'u' => self.check_keyword(2, "nction", TokenType::Function),
                _ => TokenType::Identifier,
            },
            b'i' => match second() {
                b'f' => self.check_keyword(2, "", TokenType::If),
                b'n' => self.check_keyword(2, "t", TokenType::Int),
                _ => TokenType::Identifier,
            },
            b'l' => self.check_keyword(1, "et", TokenType::Let),
            b'm' => self.check_keyword(1, "ethod", TokenType::Method),
            b'n' => self.check_keyword(1, "ull", TokenType::Null),
            b'r' => self.check_keyword(1, "eturn", TokenType::Return),
            b's' => self.check_keyword(1, "tatic", TokenType::Static),
            b't' => match second() {
                b'h' => self.check_keyword(2, "is", TokenType::This),
                b'r' => self.check_keyword(2, "ue", TokenType::True),
                _ => TokenType::Identifier,
            },
            b'v' => match second() {
                b'a' => self.check_keyword(2, "r", TokenType::Var),
                b'o' => self.check_keyword(2, "id", TokenType::Void),
                _ => TokenType::Identifier,
            },
            b'w' => self.check_keyword(1, "hile", TokenType::While),
            _ => TokenType::Identifier,
        }
    }

    fn check_keyword(&self, start: usize, rest: &'static str, tok_type: TokenType) -> TokenType {
        let lexeme = &self.source[self.start..self.current];
        if lexeme.len() == start + rest.len() && &lexeme[start..] == rest {
            tok_type
        } else {
            TokenType::Identifier
        }
    }
}

fn is_ident_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_'
}

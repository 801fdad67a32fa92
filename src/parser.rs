use std::mem::swap;

use tracing::{debug, trace};

use crate::chunk::{Chunk, Command, Segment};
use crate::code_gen::Generator;
use crate::common::{CompileError, CompileResult, Location};
use crate::lexer::{Lexer, Token, TokenType};
use crate::symbol_table::{Kind, SymbolTable};
use crate::trace::Trace;

const MAX_CONSTANT: u16 = 32767;

const VAR_TYPES: &[TokenType] = &[
    TokenType::Int,
    TokenType::Char,
    TokenType::Boolean,
    TokenType::Identifier,
];

/// Single-pass translator: recognizes the grammar and emits code as it goes.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token<'a>,
    peek: Token<'a>,
    class_name: String,
    symbols: SymbolTable,
    generator: Generator,
    if_label: usize,
    while_label: usize,
    trace: Option<Trace>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Operator {
    Arithmetic(Command),
    Call(&'static str),
}

fn binary_operator(tok_type: TokenType) -> Option<Operator> {
    match tok_type {
        TokenType::Plus => Some(Operator::Arithmetic(Command::Add)),
        TokenType::Minus => Some(Operator::Arithmetic(Command::Sub)),
        TokenType::Less => Some(Operator::Arithmetic(Command::Lt)),
        TokenType::Greater => Some(Operator::Arithmetic(Command::Gt)),
        TokenType::Equal => Some(Operator::Arithmetic(Command::Eq)),
        TokenType::Amp => Some(Operator::Arithmetic(Command::And)),
        TokenType::Pipe => Some(Operator::Arithmetic(Command::Or)),
        TokenType::Star => Some(Operator::Call("Math.multiply")),
        TokenType::Slash => Some(Operator::Call("Math.divide")),
        _ => None,
    }
}

fn kind_segment(kind: Kind) -> Segment {
    match kind {
        Kind::Static => Segment::Static,
        Kind::Field => Segment::This,
        Kind::Arg => Segment::Argument,
        Kind::Var => Segment::Local,
    }
}

impl<'a> Parser<'a> {
    pub fn new(lexer: Lexer<'a>) -> Self {
        let current = lexer.error_token("Before start");
        let peek = lexer.error_token("Before start");
        Self {
            lexer,
            current,
            peek,
            class_name: String::new(),
            symbols: SymbolTable::new(),
            generator: Generator::new(),
            if_label: 0,
            while_label: 0,
            trace: None,
        }
    }

    pub fn with_trace(lexer: Lexer<'a>) -> Self {
        let mut parser = Self::new(lexer);
        parser.trace = Some(Trace::new());
        parser
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Consumes the parser, yielding the emitted code and the grammar trace if one was kept.
    pub fn finish(self) -> (Chunk, Option<String>) {
        (self.generator.end(), self.trace.map(Trace::finish))
    }

    /// Slides the lookahead window by one token. Call once before `class` to fill it.
    pub fn advance(&mut self) -> CompileResult<()> {
        swap(&mut self.current, &mut self.peek);
        self.peek = self.lexer.next();
        trace!(line = self.peek.line, kind = ?self.peek.tok_type, text = self.peek.source, "token");

        if self.peek.tok_type == TokenType::Error {
            return Err(CompileError::Lexical {
                line: self.peek.line,
                message: self.peek.source.to_string(),
            });
        }
        Ok(())
    }

    fn peek_is(&self, tok_type: TokenType) -> bool {
        self.peek.tok_type == tok_type
    }

    fn expect_peek(&mut self, tok_type: TokenType) -> CompileResult<()> {
        if self.peek_is(tok_type) {
            self.consume()
        } else {
            Err(self.error_at_peek(&format!("Expected {}", tok_type)))
        }
    }

    fn expect_peek_any(&mut self, tok_types: &[TokenType]) -> CompileResult<()> {
        if tok_types.contains(&self.peek.tok_type) {
            self.consume()
        } else {
            let expected: Vec<String> = tok_types.iter().map(|t| t.to_string()).collect();
            Err(self.error_at_peek(&format!("Expected one of {}", expected.join(", "))))
        }
    }

    fn consume(&mut self) -> CompileResult<()> {
        self.advance()?;
        let token = self.current;
        if let Some(trace) = self.trace.as_mut() {
            trace.token(&token);
        }
        Ok(())
    }

    fn error_at_peek(&self, message: &str) -> CompileError {
        error_at(&self.peek, message)
    }

    fn error_at_current(&self, message: &str) -> CompileError {
        error_at(&self.current, message)
    }

    fn open(&mut self, production: &str) {
        if let Some(trace) = self.trace.as_mut() {
            trace.open(production);
        }
    }

    fn close(&mut self) {
        if let Some(trace) = self.trace.as_mut() {
            trace.close();
        }
    }

    fn define(&mut self, name: &str, data_type: &str, kind: Kind) -> CompileResult<()> {
        let defined = self.symbols.define(name, data_type, kind).map(|_| ());
        defined.map_err(|err| self.error_at_current(&err.to_string()))
    }

    /// Segment and index of the variable named by the current token.
    /// Only used where a variable is required; call prefixes never come through here.
    fn variable(&self) -> CompileResult<(Segment, u16)> {
        match self.symbols.resolve(self.current.source) {
            Some(symbol) => Ok((kind_segment(symbol.kind), symbol.index)),
            None => Err(self.error_at_current(&format!(
                "Undefined variable '{}'",
                self.current.source
            ))),
        }
    }

    pub fn class(&mut self) -> CompileResult<()> {
        self.open("class");
        self.expect_peek(TokenType::Class)?;
        self.expect_peek(TokenType::Identifier)?;
        self.class_name = self.current.source.to_string();
        self.symbols.start_class();
        self.expect_peek(TokenType::LeftBrace)?;

        while self.peek_is(TokenType::Static) || self.peek_is(TokenType::Field) {
            self.class_var_dec()?;
        }
        while matches!(
            self.peek.tok_type,
            TokenType::Constructor | TokenType::Function | TokenType::Method
        ) {
            self.subroutine_dec()?;
        }

        self.expect_peek(TokenType::RightBrace)?;
        self.close();

        if !self.peek_is(TokenType::Eof) {
            return Err(self.error_at_peek("Expected end of input"));
        }
        Ok(())
    }

    fn class_var_dec(&mut self) -> CompileResult<()> {
        self.open("classVarDec");
        self.expect_peek_any(&[TokenType::Field, TokenType::Static])?;
        let kind = if self.current.tok_type == TokenType::Field {
            Kind::Field
        } else {
            Kind::Static
        };

        self.expect_peek_any(VAR_TYPES)?;
        let data_type = self.current.source;
        self.expect_peek(TokenType::Identifier)?;
        let name = self.current.source;
        self.define(name, data_type, kind)?;

        while self.peek_is(TokenType::Comma) {
            self.expect_peek(TokenType::Comma)?;
            self.expect_peek(TokenType::Identifier)?;
            let name = self.current.source;
            self.define(name, data_type, kind)?;
        }

        self.expect_peek(TokenType::SemiColon)?;
        self.close();
        Ok(())
    }

    fn subroutine_dec(&mut self) -> CompileResult<()> {
        self.open("subroutineDec");
        self.if_label = 0;
        self.while_label = 0;
        self.symbols.start_subroutine();

        self.expect_peek_any(&[
            TokenType::Constructor,
            TokenType::Function,
            TokenType::Method,
        ])?;
        let subroutine_type = self.current.tok_type;
        if subroutine_type == TokenType::Method {
            let class_name = self.class_name.clone();
            self.define("this", &class_name, Kind::Arg)?;
        }

        self.expect_peek_any(&[
            TokenType::Void,
            TokenType::Int,
            TokenType::Char,
            TokenType::Boolean,
            TokenType::Identifier,
        ])?;
        self.expect_peek(TokenType::Identifier)?;
        let function_name = format!("{}.{}", self.class_name, self.current.source);

        self.expect_peek(TokenType::LeftParen)?;
        self.parameter_list()?;
        self.expect_peek(TokenType::RightParen)?;
        self.subroutine_body(&function_name, subroutine_type)?;

        debug!(
            function = %function_name,
            arguments = self.symbols.var_count(Kind::Arg),
            locals = self.symbols.var_count(Kind::Var),
            "translated subroutine"
        );
        self.close();
        Ok(())
    }

    fn parameter_list(&mut self) -> CompileResult<()> {
        self.open("parameterList");
        if !self.peek_is(TokenType::RightParen) {
            self.parameter()?;
            while self.peek_is(TokenType::Comma) {
                self.expect_peek(TokenType::Comma)?;
                self.parameter()?;
            }
        }
        self.close();
        Ok(())
    }

    fn parameter(&mut self) -> CompileResult<()> {
        self.expect_peek_any(VAR_TYPES)?;
        let data_type = self.current.source;
        self.expect_peek(TokenType::Identifier)?;
        let name = self.current.source;
        self.define(name, data_type, Kind::Arg)
    }

    fn subroutine_body(&mut self, function_name: &str, subroutine_type: TokenType) -> CompileResult<()> {
        self.open("subroutineBody");
        self.expect_peek(TokenType::LeftBrace)?;
        while self.peek_is(TokenType::Var) {
            self.var_dec()?;
        }

        let line = self.current.line;
        let n_locals = self.symbols.var_count(Kind::Var);
        self.generator.emit_function(function_name, n_locals, line);

        match subroutine_type {
            TokenType::Constructor => {
                let n_fields = self.symbols.var_count(Kind::Field);
                self.generator.emit_push(Segment::Constant, n_fields, line);
                self.generator.emit_call("Memory.alloc", 1, line);
                self.generator.emit_pop(Segment::Pointer, 0, line);
            }
            TokenType::Method => {
                self.generator.emit_push(Segment::Argument, 0, line);
                self.generator.emit_pop(Segment::Pointer, 0, line);
            }
            _ => (),
        }

        self.statements()?;
        self.expect_peek(TokenType::RightBrace)?;
        self.close();
        Ok(())
    }

    fn var_dec(&mut self) -> CompileResult<()> {
        self.open("varDec");
        self.expect_peek(TokenType::Var)?;
        self.expect_peek_any(VAR_TYPES)?;
        let data_type = self.current.source;

        self.expect_peek(TokenType::Identifier)?;
        let name = self.current.source;
        self.define(name, data_type, Kind::Var)?;

        while self.peek_is(TokenType::Comma) {
            self.expect_peek(TokenType::Comma)?;
            self.expect_peek(TokenType::Identifier)?;
            let name = self.current.source;
            self.define(name, data_type, Kind::Var)?;
        }

        self.expect_peek(TokenType::SemiColon)?;
        self.close();
        Ok(())
    }

    fn statements(&mut self) -> CompileResult<()> {
        self.open("statements");
        while matches!(
            self.peek.tok_type,
            TokenType::Let | TokenType::If | TokenType::While | TokenType::Do | TokenType::Return
        ) {
            self.statement()?;
        }
        self.close();
        Ok(())
    }

    fn statement(&mut self) -> CompileResult<()> {
        match self.peek.tok_type {
            TokenType::Let => self.let_statement(),
            TokenType::If => self.if_statement(),
            TokenType::While => self.while_statement(),
            TokenType::Do => self.do_statement(),
            TokenType::Return => self.return_statement(),
            _ => Err(self.error_at_peek("Expected a statement")),
        }
    }

    fn let_statement(&mut self) -> CompileResult<()> {
        self.open("letStatement");
        self.expect_peek(TokenType::Let)?;
        self.expect_peek(TokenType::Identifier)?;
        let (segment, index) = self.variable()?;

        let is_array = self.peek_is(TokenType::LeftBracket);
        if is_array {
            self.expect_peek(TokenType::LeftBracket)?;
            self.expression()?;
            let line = self.current.line;
            self.generator.emit_push(segment, index, line);
            self.generator.emit_arithmetic(Command::Add, line);
            self.expect_peek(TokenType::RightBracket)?;
        }

        self.expect_peek(TokenType::Equal)?;
        self.expression()?;

        let line = self.current.line;
        if is_array {
            // the right-hand side may itself have moved `pointer 1`
            self.generator.emit_pop(Segment::Temp, 0, line);
            self.generator.emit_pop(Segment::Pointer, 1, line);
            self.generator.emit_push(Segment::Temp, 0, line);
            self.generator.emit_pop(Segment::That, 0, line);
        } else {
            self.generator.emit_pop(segment, index, line);
        }

        self.expect_peek(TokenType::SemiColon)?;
        self.close();
        Ok(())
    }

    fn if_statement(&mut self) -> CompileResult<()> {
        self.open("ifStatement");
        let label_num = self.if_label;
        self.if_label += 1;
        let label_true = format!("IF_TRUE{}", label_num);
        let label_false = format!("IF_FALSE{}", label_num);

        self.expect_peek(TokenType::If)?;
        self.expect_peek(TokenType::LeftParen)?;
        self.expression()?;
        self.expect_peek(TokenType::RightParen)?;

        let line = self.current.line;
        self.generator.emit_if(&label_true, line);
        self.generator.emit_goto(&label_false, line);
        self.generator.emit_label(&label_true, line);

        self.expect_peek(TokenType::LeftBrace)?;
        self.statements()?;
        self.expect_peek(TokenType::RightBrace)?;

        let line = self.current.line;
        if self.peek_is(TokenType::Else) {
            let label_end = format!("IF_END{}", label_num);
            self.generator.emit_goto(&label_end, line);
            self.generator.emit_label(&label_false, line);

            self.expect_peek(TokenType::Else)?;
            self.expect_peek(TokenType::LeftBrace)?;
            self.statements()?;
            self.expect_peek(TokenType::RightBrace)?;
            self.generator.emit_label(&label_end, self.current.line);
        } else {
            self.generator.emit_label(&label_false, line);
        }

        self.close();
        Ok(())
    }

    fn while_statement(&mut self) -> CompileResult<()> {
        self.open("whileStatement");
        let label_exp = format!("WHILE_EXP{}", self.while_label);
        let label_end = format!("WHILE_END{}", self.while_label);
        self.while_label += 1;

        self.generator.emit_label(&label_exp, self.peek.line);
        self.expect_peek(TokenType::While)?;
        self.expect_peek(TokenType::LeftParen)?;
        self.expression()?;

        let line = self.current.line;
        self.generator.emit_arithmetic(Command::Not, line);
        self.generator.emit_if(&label_end, line);

        self.expect_peek(TokenType::RightParen)?;
        self.expect_peek(TokenType::LeftBrace)?;
        self.statements()?;

        let line = self.peek.line;
        self.generator.emit_goto(&label_exp, line);
        self.generator.emit_label(&label_end, line);

        self.expect_peek(TokenType::RightBrace)?;
        self.close();
        Ok(())
    }

    fn do_statement(&mut self) -> CompileResult<()> {
        self.open("doStatement");
        self.expect_peek(TokenType::Do)?;
        self.expect_peek(TokenType::Identifier)?;
        self.subroutine_call()?;
        self.expect_peek(TokenType::SemiColon)?;
        self.generator.emit_pop(Segment::Temp, 0, self.current.line);
        self.close();
        Ok(())
    }

    fn return_statement(&mut self) -> CompileResult<()> {
        self.open("returnStatement");
        self.expect_peek(TokenType::Return)?;
        if !self.peek_is(TokenType::SemiColon) {
            self.expression()?;
        } else {
            self.generator.emit_push(Segment::Constant, 0, self.current.line);
        }

        self.expect_peek(TokenType::SemiColon)?;
        self.generator.emit_return(self.current.line);
        self.close();
        Ok(())
    }

    /// Translates a call whose first identifier is the current token.
    fn subroutine_call(&mut self) -> CompileResult<()> {
        let ident = self.current.source;
        let line = self.current.line;

        let (function_name, n_args) = if self.peek_is(TokenType::LeftParen) {
            // implicit method call on the current object
            self.expect_peek(TokenType::LeftParen)?;
            self.generator.emit_push(Segment::Pointer, 0, line);
            let n_args = self.expression_list()?;
            let n_args = self.count_argument(n_args, 1)?;
            self.expect_peek(TokenType::RightParen)?;
            (format!("{}.{}", self.class_name, ident), n_args)
        } else {
            self.expect_peek(TokenType::Dot)?;
            self.expect_peek(TokenType::Identifier)?;
            let subroutine = self.current.source;

            let receiver = self
                .symbols
                .resolve(ident)
                .map(|symbol| (kind_segment(symbol.kind), symbol.index, symbol.data_type.clone()));
            let (function_name, receiver_args) = match receiver {
                Some((segment, index, data_type)) => {
                    self.generator.emit_push(segment, index, line);
                    (format!("{}.{}", data_type, subroutine), 1)
                }
                None => (format!("{}.{}", ident, subroutine), 0),
            };

            self.expect_peek(TokenType::LeftParen)?;
            let n_args = self.expression_list()?;
            let n_args = self.count_argument(n_args, receiver_args)?;
            self.expect_peek(TokenType::RightParen)?;
            (function_name, n_args)
        };

        self.generator.emit_call(&function_name, n_args, line);
        Ok(())
    }

    fn count_argument(&self, n_args: u16, extra: u16) -> CompileResult<u16> {
        n_args
            .checked_add(extra)
            .ok_or_else(|| self.error_at_current("Too many arguments"))
    }

    fn expression_list(&mut self) -> CompileResult<u16> {
        self.open("expressionList");
        let mut n_args = 0;
        if !self.peek_is(TokenType::RightParen) {
            self.expression()?;
            n_args = 1;
            while self.peek_is(TokenType::Comma) {
                self.expect_peek(TokenType::Comma)?;
                self.expression()?;
                n_args = self.count_argument(n_args, 1)?;
            }
        }
        self.close();
        Ok(n_args)
    }

    /// Operators apply strictly left to right; there is no precedence.
    fn expression(&mut self) -> CompileResult<()> {
        self.open("expression");
        self.term()?;
        while let Some(operator) = binary_operator(self.peek.tok_type) {
            let op_type = self.peek.tok_type;
            self.expect_peek(op_type)?;
            let line = self.current.line;
            self.term()?;
            match operator {
                Operator::Arithmetic(command) => self.generator.emit_arithmetic(command, line),
                Operator::Call(name) => self.generator.emit_call(name, 2, line),
            }
        }
        self.close();
        Ok(())
    }

    fn term(&mut self) -> CompileResult<()> {
        self.open("term");
        match self.peek.tok_type {
            TokenType::Integer => {
                self.expect_peek(TokenType::Integer)?;
                let value = self.integer_constant()?;
                self.generator.emit_push(Segment::Constant, value, self.current.line);
            }
            TokenType::Str => {
                self.expect_peek(TokenType::Str)?;
                self.string_constant()?;
            }
            TokenType::False | TokenType::Null | TokenType::True => {
                self.expect_peek_any(&[TokenType::False, TokenType::Null, TokenType::True])?;
                let line = self.current.line;
                self.generator.emit_push(Segment::Constant, 0, line);
                if self.current.tok_type == TokenType::True {
                    self.generator.emit_arithmetic(Command::Not, line);
                }
            }
            TokenType::This => {
                self.expect_peek(TokenType::This)?;
                self.generator.emit_push(Segment::Pointer, 0, self.current.line);
            }
            TokenType::Identifier => {
                self.expect_peek(TokenType::Identifier)?;
                if self.peek_is(TokenType::LeftParen) || self.peek_is(TokenType::Dot) {
                    self.subroutine_call()?;
                } else {
                    let (segment, index) = self.variable()?;
                    if self.peek_is(TokenType::LeftBracket) {
                        self.expect_peek(TokenType::LeftBracket)?;
                        self.expression()?;
                        let line = self.current.line;
                        self.generator.emit_push(segment, index, line);
                        self.generator.emit_arithmetic(Command::Add, line);
                        self.expect_peek(TokenType::RightBracket)?;
                        self.generator.emit_pop(Segment::Pointer, 1, line);
                        self.generator.emit_push(Segment::That, 0, line);
                    } else {
                        self.generator.emit_push(segment, index, self.current.line);
                    }
                }
            }
            TokenType::LeftParen => {
                self.expect_peek(TokenType::LeftParen)?;
                self.expression()?;
                self.expect_peek(TokenType::RightParen)?;
            }
            TokenType::Minus | TokenType::Tilde => {
                self.expect_peek_any(&[TokenType::Minus, TokenType::Tilde])?;
                let op_type = self.current.tok_type;
                let line = self.current.line;
                self.term()?;
                let command = if op_type == TokenType::Minus {
                    Command::Neg
                } else {
                    Command::Not
                };
                self.generator.emit_arithmetic(command, line);
            }
            _ => return Err(self.error_at_peek("Expected term")),
        }
        self.close();
        Ok(())
    }

    fn integer_constant(&self) -> CompileResult<u16> {
        match self.current.source.parse::<u16>() {
            Ok(value) if value <= MAX_CONSTANT => Ok(value),
            _ => Err(self.error_at_current("Integer constant too large")),
        }
    }

    fn string_constant(&mut self) -> CompileResult<()> {
        let value = self.current.string_value();
        let line = self.current.line;
        let length = u16::try_from(value.chars().count())
            .map_err(|_| self.error_at_current("String constant too long"))?;

        self.generator.emit_push(Segment::Constant, length, line);
        self.generator.emit_call("String.new", 1, line);
        for c in value.chars() {
            let code = u16::try_from(u32::from(c))
                .map_err(|_| self.error_at_current("Character out of range"))?;
            self.generator.emit_push(Segment::Constant, code, line);
            self.generator.emit_call("String.appendChar", 2, line);
        }
        Ok(())
    }
}

fn error_at(token: &Token, message: &str) -> CompileError {
    let at = match token.tok_type {
        TokenType::Eof => Location::End,
        _ => Location::Token(token.source.to_string()),
    };
    CompileError::Syntax {
        line: token.line,
        at,
        message: message.to_string(),
    }
}

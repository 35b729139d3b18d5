//parser state and the top level script loop

use std::rc::Rc;

use crate::ast::*;
use crate::error_handler::{ErrorKind, WichError};
use crate::lexer_tokenizer::{PositionedToken, Token};
use crate::parser::parser_error::ParseResult;

pub struct Parser<'a> {
    pub tokens: &'a [PositionedToken],
    pub pos: usize,
    pub src: Option<Rc<str>>,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [PositionedToken], src: Option<Rc<str>>) -> Self {
        Self {
            tokens,
            pos: 0,
            src,
        }
    }

    pub fn current(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|t| &t.token)
    }

    pub fn peek(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset).map(|t| &t.token)
    }

    pub fn current_span(&self) -> Span {
        match self.tokens.get(self.pos) {
            Some(t) => t.span.clone(),
            None => {
                let end = self.src.as_ref().map_or(0, |s| s.len());
                end..end
            }
        }
    }

    //span from a start offset up to the end of the last consumed token
    pub fn span_from(&self, start: usize) -> Span {
        let end = self
            .pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map_or(start, |t| t.span.end);
        start..end.max(start)
    }

    pub fn advance(&mut self) {
        self.pos += 1;
    }

    pub fn match_token(&mut self, expected: &Token) -> bool {
        if self.current() == Some(expected) {
            self.advance();
            return true;
        }
        false
    }

    pub fn error_here(&self, message: impl Into<String>) -> WichError {
        WichError::new(ErrorKind::ParseError, message, self.current_span(), self.src.clone())
    }

    pub fn expect(&mut self, expected: &Token, what: &str) -> Result<Span, WichError> {
        let span = self.current_span();
        match self.current() {
            Some(token) if token == expected => {
                self.advance();
                Ok(span)
            }
            Some(token) => Err(self.error_here(format!("expected {}, found {:?}", what, token))),
            None => Err(self.error_here(format!("expected {}, found end of input", what))),
        }
    }

    pub fn expect_identifier(&mut self) -> Result<(String, Span), WichError> {
        let span = self.current_span();
        match self.current().cloned() {
            Some(Token::Identifier(name)) => {
                self.advance();
                Ok((name, span))
            }
            Some(token) => Err(self.error_here(format!("expected identifier, found {:?}", token))),
            None => Err(self.error_here("expected identifier, found end of input")),
        }
    }

    //skip to the next token that can begin a statement
    pub fn recover(&mut self, statement_start: usize) {
        if self.pos == statement_start {
            self.advance();
        }
        while let Some(token) = self.current() {
            if token.starts_statement() {
                break;
            }
            self.advance();
        }
    }

    pub fn parse_script(&mut self) -> ParseResult<Script> {
        let mut script = Script::default();
        let mut errors = Vec::new();

        while self.current().is_some() {
            let start = self.pos;
            if self.current() == Some(&Token::Func) {
                let res = self.parse_function();
                let failed = res.result.is_none();
                if let Some(function) = res.result {
                    script.items.push(Item::Function(function));
                }
                errors.extend(res.errors);
                if failed {
                    self.recover(start);
                }
                continue;
            }

            let res = self.parse_statement();
            let failed = res.result.is_none();
            if let Some(stmt) = res.result {
                script.items.push(Item::Statement(stmt));
            }
            errors.extend(res.errors);
            if failed {
                self.recover(start);
            }
        }

        ParseResult::with_result(Some(script), errors)
    }

    pub fn parse_function(&mut self) -> ParseResult<Function> {
        let start = self.current_span().start;
        let header = self.parse_function_header();
        let (name, params, return_type) = match header {
            Ok(header) => header,
            Err(err) => return ParseResult::err(err),
        };
        let body = self.parse_block();
        let span = self.span_from(start);
        body.map(|body| Function {
            name,
            params,
            return_type,
            body,
            span,
            scope: None,
            symbol: None,
        })
    }

    fn parse_function_header(&mut self) -> Result<(String, Vec<Param>, Option<TypeName>), WichError> {
        self.expect(&Token::Func, "'func'")?;
        let (name, _) = self.expect_identifier()?;
        self.expect(&Token::LParen, "'('")?;
        let mut params = Vec::new();
        if self.current() != Some(&Token::RParen) {
            loop {
                let (param, span) = self.expect_identifier()?;
                self.expect(&Token::Colon, "':' after parameter name")?;
                let ty = self.parse_type()?;
                params.push(Param {
                    name: param,
                    ty,
                    span: span.start..self.span_from(span.start).end,
                });
                if !self.match_token(&Token::Comma) {
                    break;
                }
            }
        }
        self.expect(&Token::RParen, "')'")?;
        let return_type = if self.match_token(&Token::Colon) {
            Some(self.parse_type()?)
        } else {
            None
        };
        Ok((name, params, return_type))
    }

    pub fn parse_type(&mut self) -> Result<TypeName, WichError> {
        let span = self.current_span();
        let name = match self.current() {
            Some(Token::TypeInt) => "int",
            Some(Token::TypeFloat) => "float",
            Some(Token::TypeString) => "string",
            Some(Token::TypeBoolean) => "boolean",
            Some(Token::LBracket) => {
                self.advance();
                self.expect(&Token::RBracket, "']' in vector type")?;
                return Ok(TypeName {
                    name: "[]".to_string(),
                    span: self.span_from(span.start),
                });
            }
            _ => {
                return Err(self
                    .error_here("expected a type")
                    .with_suggestion("types are int, float, string, boolean and []"));
            }
        };
        self.advance();
        Ok(TypeName {
            name: name.to_string(),
            span,
        })
    }
}

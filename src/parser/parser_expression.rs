//parsing expressions: precedence climbing for binary operators,
//then unary, postfix indexing and primaries

use crate::ast::{Expr, ExprKind, Operator};
use crate::error_handler::WichError;
use crate::lexer_tokenizer::Token;
use crate::parser::parser_kernel::Parser;

impl<'a> Parser<'a> {
    pub fn parse_expr(&mut self) -> Result<Expr, WichError> {
        self.parse_binary_op(0)
    }

    fn parse_binary_op(&mut self, min_precedence: i32) -> Result<Expr, WichError> {
        let mut result = self.parse_unary()?;

        while let Some(op) = self.current().and_then(token_to_operator) {
            let (prec, assoc) = operator_precedence(op);
            if prec < min_precedence {
                break;
            }
            self.advance();
            let next_min_prec = if assoc == Assoc::Left { prec + 1 } else { prec };
            let right = self.parse_binary_op(next_min_prec)?;
            let span = result.span.start..right.span.end;
            result = Expr::new(
                ExprKind::Binary {
                    left: Box::new(result),
                    op,
                    right: Box::new(right),
                },
                span,
            );
        }
        Ok(result)
    }

    fn parse_unary(&mut self) -> Result<Expr, WichError> {
        let start = self.current_span().start;
        if self.match_token(&Token::Minus) {
            let operand = self.parse_unary()?;
            return Ok(Expr::new(ExprKind::Negate(Box::new(operand)), self.span_from(start)));
        }
        if self.match_token(&Token::Bang) {
            let operand = self.parse_unary()?;
            return Ok(Expr::new(ExprKind::Not(Box::new(operand)), self.span_from(start)));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr, WichError> {
        let mut expr = self.parse_term()?;
        while self.match_token(&Token::LBracket) {
            let index = self.parse_expr()?;
            self.expect(&Token::RBracket, "']'")?;
            let span = self.span_from(expr.span.start);
            expr = Expr::new(
                ExprKind::Index {
                    target: Box::new(expr),
                    index: Box::new(index),
                },
                span,
            );
        }
        Ok(expr)
    }

    pub fn parse_term(&mut self) -> Result<Expr, WichError> {
        let span = self.current_span();
        let current = self.current().cloned();
        match current {
            Some(Token::Number(n)) => {
                self.advance();
                Ok(Expr::new(ExprKind::Int(n), span))
            }
            Some(Token::Float(f)) => {
                self.advance();
                Ok(Expr::new(ExprKind::Float(f), span))
            }
            Some(Token::StringLiteral(s)) => {
                self.advance();
                Ok(Expr::new(ExprKind::Str(s), span))
            }
            Some(Token::True) => {
                self.advance();
                Ok(Expr::new(ExprKind::Bool(true), span))
            }
            Some(Token::False) => {
                self.advance();
                Ok(Expr::new(ExprKind::Bool(false), span))
            }
            Some(Token::Identifier(name)) => {
                self.advance();
                if self.current() == Some(&Token::LParen) {
                    let args = self.parse_args()?;
                    return Ok(Expr::new(
                        ExprKind::Call {
                            name,
                            args,
                            symbol: None,
                        },
                        self.span_from(span.start),
                    ));
                }
                Ok(Expr::new(ExprKind::Identifier { name, symbol: None }, span))
            }
            Some(Token::Len) => {
                self.advance();
                self.expect(&Token::LParen, "'(' after len")?;
                let arg = self.parse_expr()?;
                self.expect(&Token::RParen, "')'")?;
                Ok(Expr::new(ExprKind::Len(Box::new(arg)), self.span_from(span.start)))
            }
            Some(Token::LBracket) => self.parse_vector(),
            Some(Token::LParen) => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(&Token::RParen, "')'")?;
                Ok(expr)
            }
            Some(token) => Err(self
                .error_here(format!("unexpected token {:?} in expression", token))
                .with_suggestion(
                    "expected a number, string, boolean, identifier, call, vector, or parenthesized expression",
                )),
            None => Err(self.error_here("unexpected end of input, expected an expression")),
        }
    }

    fn parse_args(&mut self) -> Result<Vec<Expr>, WichError> {
        self.expect(&Token::LParen, "'('")?;
        let mut args = Vec::new();
        if self.current() != Some(&Token::RParen) {
            loop {
                args.push(self.parse_expr()?);
                if !self.match_token(&Token::Comma) {
                    break;
                }
            }
        }
        self.expect(&Token::RParen, "')' after arguments")?;
        Ok(args)
    }

    fn parse_vector(&mut self) -> Result<Expr, WichError> {
        let start = self.current_span().start;
        self.expect(&Token::LBracket, "'['")?;
        let mut elements = Vec::new();
        if self.current() != Some(&Token::RBracket) {
            loop {
                elements.push(self.parse_expr()?);
                if !self.match_token(&Token::Comma) {
                    break;
                }
            }
        }
        self.expect(&Token::RBracket, "']' to close the vector")?;
        Ok(Expr::new(ExprKind::Vector(elements), self.span_from(start)))
    }
}

fn token_to_operator(token: &Token) -> Option<Operator> {
    match token {
        Token::Plus => Some(Operator::Plus),
        Token::Minus => Some(Operator::Minus),
        Token::Star => Some(Operator::Multiply),
        Token::Slash => Some(Operator::Divide),
        Token::Less => Some(Operator::Less),
        Token::LessEqual => Some(Operator::LessEqual),
        Token::Greater => Some(Operator::Greater),
        Token::GreaterEqual => Some(Operator::GreaterEqual),
        Token::Equal => Some(Operator::Equal),
        Token::NotEqual => Some(Operator::NotEqual),
        Token::And => Some(Operator::And),
        Token::Or => Some(Operator::Or),
        _ => None,
    }
}

fn operator_precedence(op: Operator) -> (i32, Assoc) {
    match op {
        Operator::Or => (1, Assoc::Left),
        Operator::And => (2, Assoc::Left),
        Operator::Equal | Operator::NotEqual => (3, Assoc::Left),
        Operator::Less | Operator::LessEqual | Operator::Greater | Operator::GreaterEqual => {
            (4, Assoc::Left)
        }
        Operator::Plus | Operator::Minus => (5, Assoc::Left),
        Operator::Multiply | Operator::Divide => (6, Assoc::Left),
    }
}

#[derive(PartialEq)]
enum Assoc {
    Left,
    #[allow(dead_code)]
    Right,
}

//statements and blocks

use crate::ast::*;
use crate::error_handler::WichError;
use crate::lexer_tokenizer::Token;
use crate::parser::{parser_error::ParseResult, parser_kernel::Parser};

impl<'a> Parser<'a> {
    pub fn parse_statement(&mut self) -> ParseResult<Statement> {
        let start = self.current_span().start;
        match self.current() {
            Some(Token::If) => self.parse_if(),
            Some(Token::While) => self.parse_while(),
            Some(Token::LBrace) => {
                let res = self.parse_block();
                let span = self.span_from(start);
                res.map(|block| Statement {
                    kind: StatementKind::Block(block),
                    span,
                })
            }
            Some(Token::Var) => self.parse_var_def().into(),
            Some(Token::Print) => self.parse_print().into(),
            Some(Token::Return) => self.parse_return().into(),
            Some(Token::Identifier(_)) => self.parse_identifier_statement().into(),
            Some(Token::Func) => ParseResult::err(
                self.error_here("functions can only be defined at the top level")
                    .with_suggestion("move this function out of the enclosing block"),
            ),
            Some(token) => {
                let message = format!("unexpected token {:?}, expected a statement", token);
                ParseResult::err(self.error_here(message))
            }
            None => ParseResult::err(self.error_here("unexpected end of input, expected a statement")),
        }
    }

    pub fn parse_block(&mut self) -> ParseResult<Block> {
        let start = self.current_span().start;
        if let Err(err) = self.expect(&Token::LBrace, "'{'") {
            return ParseResult::err(err);
        }
        let mut statements = Vec::new();
        let mut errors = Vec::new();
        while self.current().is_some() && self.current() != Some(&Token::RBrace) {
            let statement_start = self.pos;
            let res = self.parse_statement();
            let failed = res.result.is_none();
            if let Some(stmt) = res.result {
                statements.push(stmt);
            }
            errors.extend(res.errors);
            if failed {
                self.recover(statement_start);
            }
        }
        if let Err(err) = self.expect(&Token::RBrace, "'}'") {
            errors.push(err);
        }
        let block = Block {
            statements,
            span: self.span_from(start),
            scope: None,
        };
        ParseResult::with_result(Some(block), errors)
    }

    //body of if/while: a bare statement gets its own block
    fn parse_body(&mut self) -> ParseResult<Block> {
        if self.current() == Some(&Token::LBrace) {
            return self.parse_block();
        }
        let res = self.parse_statement();
        res.map(|stmt| Block {
            span: stmt.span.clone(),
            statements: vec![stmt],
            scope: None,
        })
    }

    fn parse_condition(&mut self) -> Result<Expr, WichError> {
        self.expect(&Token::LParen, "'('")?;
        let cond = self.parse_expr()?;
        self.expect(&Token::RParen, "')'")?;
        Ok(cond)
    }

    fn parse_if(&mut self) -> ParseResult<Statement> {
        let start = self.current_span().start;
        self.advance();
        let cond = match self.parse_condition() {
            Ok(cond) => cond,
            Err(err) => return ParseResult::err(err),
        };
        let then_res = self.parse_body();
        let mut errors = then_res.errors;
        let else_block = if self.match_token(&Token::Else) {
            let else_res = self.parse_body();
            errors.extend(else_res.errors);
            match else_res.result {
                Some(block) => Some(block),
                None => return ParseResult::with_result(None, errors),
            }
        } else {
            None
        };
        let Some(then_block) = then_res.result else {
            return ParseResult::with_result(None, errors);
        };
        let stmt = Statement {
            kind: StatementKind::If {
                cond,
                then_block,
                else_block,
            },
            span: self.span_from(start),
        };
        ParseResult::with_result(Some(stmt), errors)
    }

    fn parse_while(&mut self) -> ParseResult<Statement> {
        let start = self.current_span().start;
        self.advance();
        let cond = match self.parse_condition() {
            Ok(cond) => cond,
            Err(err) => return ParseResult::err(err),
        };
        let res = self.parse_body();
        let span = self.span_from(start);
        res.map(|body| Statement {
            kind: StatementKind::While { cond, body },
            span,
        })
    }

    fn parse_var_def(&mut self) -> Result<Statement, WichError> {
        let start = self.current_span().start;
        self.advance();
        let (name, _) = self.expect_identifier()?;
        self.expect(&Token::Assign, "'=' after variable name")?;
        let value = self.parse_expr()?;
        Ok(Statement {
            kind: StatementKind::VarDef {
                name,
                value,
                symbol: None,
            },
            span: self.span_from(start),
        })
    }

    fn parse_print(&mut self) -> Result<Statement, WichError> {
        let start = self.current_span().start;
        self.advance();
        self.expect(&Token::LParen, "'(' after print")?;
        let value = if self.current() == Some(&Token::RParen) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect(&Token::RParen, "')'")?;
        Ok(Statement {
            kind: StatementKind::Print(value),
            span: self.span_from(start),
        })
    }

    fn parse_return(&mut self) -> Result<Statement, WichError> {
        let start = self.current_span().start;
        self.advance();
        let value = self.parse_expr()?;
        Ok(Statement {
            kind: StatementKind::Return(value),
            span: self.span_from(start),
        })
    }

    //assignment, element assignment or call, decided by the token after the name
    fn parse_identifier_statement(&mut self) -> Result<Statement, WichError> {
        let start = self.current_span().start;
        match self.peek(1) {
            Some(Token::Assign) => {
                let (name, _) = self.expect_identifier()?;
                self.advance();
                let value = self.parse_expr()?;
                Ok(Statement {
                    kind: StatementKind::Assign {
                        name,
                        value,
                        symbol: None,
                    },
                    span: self.span_from(start),
                })
            }
            Some(Token::LBracket) => {
                let (name, _) = self.expect_identifier()?;
                self.advance();
                let index = self.parse_expr()?;
                self.expect(&Token::RBracket, "']'")?;
                self.expect(&Token::Assign, "'=' after indexed element")?;
                let value = self.parse_expr()?;
                Ok(Statement {
                    kind: StatementKind::ElementAssign {
                        name,
                        index,
                        value,
                        symbol: None,
                    },
                    span: self.span_from(start),
                })
            }
            Some(Token::LParen) => {
                let call = self.parse_expr()?;
                Ok(Statement {
                    kind: StatementKind::Call(call),
                    span: self.span_from(start),
                })
            }
            _ => {
                let name = match self.current() {
                    Some(Token::Identifier(name)) => name.clone(),
                    _ => String::new(),
                };
                Err(self
                    .error_here(format!("invalid statement: '{}'", name))
                    .with_suggestion(format!("did you mean 'var {} = ...'?", name)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{ExprKind, StatementKind};
    use crate::error_handler::ErrorHandler;
    use crate::parser::parse_script;

    #[test]
    fn if_else_with_bare_statement_bodies() {
        let src = "if (x > 1) print(x) else { print(0) }";
        let mut errors = ErrorHandler::new(src);
        let script = parse_script(src, &mut errors);
        assert!(!errors.has_errors());
        let first = script.statements().next().unwrap();
        let StatementKind::If { then_block, else_block, .. } = &first.kind else {
            panic!("expected if statement");
        };
        assert_eq!(then_block.statements.len(), 1);
        assert_eq!(else_block.as_ref().map(|b| b.statements.len()), Some(1));
    }

    #[test]
    fn element_assignment_and_call_statements() {
        let src = "v[2] = 3.0\nf(v, 1)";
        let mut errors = ErrorHandler::new(src);
        let script = parse_script(src, &mut errors);
        assert!(!errors.has_errors());
        let statements: Vec<_> = script.statements().collect();
        assert!(matches!(statements[0].kind, StatementKind::ElementAssign { .. }));
        let StatementKind::Call(call) = &statements[1].kind else {
            panic!("expected call statement");
        };
        assert!(matches!(&call.kind, ExprKind::Call { args, .. } if args.len() == 2));
    }

    #[test]
    fn empty_print_prints_a_newline() {
        let mut errors = ErrorHandler::new("");
        let script = parse_script("print()", &mut errors);
        let first = script.statements().next().unwrap();
        assert!(matches!(first.kind, StatementKind::Print(None)));
    }

    #[test]
    fn nested_function_is_rejected() {
        let src = "func f() { func g() { } }";
        let mut errors = ErrorHandler::new(src);
        parse_script(src, &mut errors);
        assert!(errors.has_errors());
    }

    #[test]
    fn bare_identifier_is_not_a_statement() {
        let src = "x\nvar y = 1";
        let mut errors = ErrorHandler::new(src);
        let script = parse_script(src, &mut errors);
        assert_eq!(errors.error_count(), 1);
        assert_eq!(script.statements().count(), 1);
    }
}

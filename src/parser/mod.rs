pub mod parser_error;
pub mod parser_expression;
pub mod parser_kernel;
pub mod parser_statement;

use crate::ast::Script;
use crate::error_handler::ErrorHandler;
use crate::lexer_tokenizer::lex_with_span;

pub use parser_kernel::Parser;

//lex and parse a whole script, reporting syntax errors into the handler
pub fn parse_script(source: &str, errors: &mut ErrorHandler) -> Script {
    let tokens = lex_with_span(source);
    let mut parser = Parser::new(&tokens, errors.src());
    let res = parser.parse_script();
    for err in res.errors {
        errors.push(err);
    }
    res.result.unwrap_or_default()
}

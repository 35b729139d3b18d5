//wich -> C translator
//lexing, parsing, the two semantic passes and code generation through the output model

pub mod ast;
pub mod compiler;
pub mod driver;
pub mod error_handler;
pub mod lexer_tokenizer;
pub mod parser;
pub mod semantic;

use thiserror::Error;

use crate::ast::Script;
use crate::compiler::CodegenError;
use crate::error_handler::{ErrorHandler, ErrorKind};
use crate::semantic::semantic_symbols::SymbolTable;

pub use crate::compiler::Backend;

#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("{0} error(s) reported, no code generated")]
    Rejected(usize),
    #[error(transparent)]
    Codegen(#[from] CodegenError),
}

//parse and type a script; the tree and table are usable even when errors were reported
pub fn analyze_source(source: &str, errors: &mut ErrorHandler) -> (Script, SymbolTable) {
    let mut script = parser::parse_script(source, errors);
    let symtab = semantic::analyze(&mut script, errors);
    (script, symtab)
}

//the C translation unit for a script, refused when any error was reported
pub fn translate(
    source: &str,
    backend: Backend,
    errors: &mut ErrorHandler,
) -> Result<String, TranslateError> {
    let (script, symtab) = analyze_source(source, errors);
    if errors.has_errors() {
        return Err(TranslateError::Rejected(errors.error_count()));
    }
    Ok(compiler::generate(&script, &symtab, backend, errors)?)
}

pub fn backend_from_name(name: &str, errors: &mut ErrorHandler) -> Option<Backend> {
    let backend = Backend::from_name(name);
    if backend.is_none() {
        errors.internal_error(
            ErrorKind::UnknownTarget,
            format!("unknown target: {} (expected plain or refcounting)", name),
        );
    }
    backend
}

pub mod compiler_converter;
pub mod compiler_expr_templates;
pub mod compiler_model;
pub mod compiler_model_builder;
pub mod compiler_model_walker;
pub mod compiler_refcount;
pub mod compiler_templates;

use thiserror::Error;

use crate::ast::Script;
use crate::error_handler::ErrorHandler;
use crate::semantic::semantic_symbols::SymbolTable;
use crate::semantic::semantic_types::WichType;

#[derive(Debug, Error)]
pub enum CodegenError {
    #[error("expression at {start}..{end} has no type")]
    UntypedExpression { start: usize, end: usize },
    #[error("variable {0} has no type")]
    UntypedVariable(String),
    #[error("{0} was never attached to a scope")]
    MissingScope(String),
    #[error("cannot promote {from} to {to}")]
    UnsupportedPromotion { from: WichType, to: WichType },
    #[error("root of the output model is not a file")]
    NotAFile,
    #[error("failed to format generated C")]
    Format(#[from] std::fmt::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    #[default]
    Plain,
    Refcounting,
}

impl Backend {
    pub fn name(self) -> &'static str {
        match self {
            Backend::Plain => "plain",
            Backend::Refcounting => "refcounting",
        }
    }

    pub fn from_name(name: &str) -> Option<Backend> {
        match name {
            "plain" => Some(Backend::Plain),
            "refcounting" | "rc" => Some(Backend::Refcounting),
            _ => None,
        }
    }
}

//model, optional rc injection, template rendering
//model mismatches found while rendering are reported as warnings into the handler
pub fn generate(
    script: &Script,
    symtab: &SymbolTable,
    backend: Backend,
    errors: &mut ErrorHandler,
) -> Result<String, CodegenError> {
    let mut model = compiler_model_builder::build_model(script, symtab)?;
    let group = match backend {
        Backend::Plain => compiler_templates::plain(),
        Backend::Refcounting => {
            compiler_refcount::inject(&mut model, symtab);
            compiler_templates::refcounting()
        }
    };
    let tokens = compiler_converter::convert(&model, &group, errors);
    Ok(tokens.to_file_string()?)
}

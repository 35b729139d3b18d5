pub mod semantic_def_symbols;
pub mod semantic_symbols;
pub mod semantic_type_setter;
pub mod semantic_types;

use crate::ast::Script;
use crate::error_handler::ErrorHandler;
use semantic_symbols::SymbolTable;

//both semantic passes, in order; errors from either are collected and analysis keeps going
pub fn analyze(script: &mut Script, errors: &mut ErrorHandler) -> SymbolTable {
    let mut symtab = SymbolTable::new();
    semantic_def_symbols::define_symbols(script, &mut symtab, errors);
    semantic_type_setter::set_types(script, &mut symtab, errors);
    symtab
}

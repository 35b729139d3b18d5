//C templates for the output model, one render function per omo kind
//the plain group emits no memory management, the refcounting group adds
//NULL-initialized heap slots, REF/DEREF and the block cleanup

use genco::prelude::*;

use crate::compiler::compiler_converter::{TemplateArgs, TemplateGroup};
use crate::compiler::compiler_expr_templates as expr;
use crate::compiler::compiler_model::{Func, Omo};
use crate::semantic::semantic_types::WichType;

const INCLUDES: [&str; 3] = [
    "#include <stdio.h>",
    "#include <stdbool.h>",
    "#include \"wich.h\"",
];

const INT_FORMAT: &str = r#""%d\n""#;
const FLOAT_FORMAT: &str = r#""%1.2f\n""#;
const BOOL_FORMAT: &str = r#""%s\n""#;
const NEWLINE_FORMAT: &str = r#""\n""#;
const TRUE_TEXT: &str = r#""true""#;
const FALSE_TEXT: &str = r#""false""#;

pub fn c_type(ty: WichType) -> &'static str {
    match ty {
        WichType::Int => "int",
        WichType::Float => "double",
        WichType::Boolean => "bool",
        WichType::String => "String *",
        WichType::Vector => "Vector *",
        WichType::Void | WichType::Error => "void",
    }
}

//declarator text, pointer types keep the star next to the name
pub fn c_decl(ty: WichType, name: &str) -> String {
    if ty.is_heap() {
        format!("{}{}", c_type(ty), name)
    } else {
        format!("{} {}", c_type(ty), name)
    }
}

fn signature(func: &Func) -> String {
    let args: Vec<String> = func
        .args
        .iter()
        .filter_map(|arg| match arg {
            Omo::ArgDef(a) => Some(c_decl(a.ty, &a.name)),
            _ => None,
        })
        .collect();
    format!("{} {}({})", c_type(func.return_type), func.name, args.join(", "))
}

pub fn plain() -> TemplateGroup {
    let mut group = TemplateGroup::new("plain");
    common(&mut group);
    group.define("Block", &["locals", "temps", "stats"], plain_block);
    group.define("VarDecl", &[], plain_var_decl);
    group
}

pub fn refcounting() -> TemplateGroup {
    let mut group = TemplateGroup::new("refcounting");
    common(&mut group);
    group.define("Block", &["locals", "stats", "cleanup"], refcounting_block);
    group.define("VarDecl", &[], refcounting_var_decl);
    group.define("TempVarDef", &["expr"], temp_var_def);
    group.define("Ref", &[], ref_stat);
    group.define("Deref", &[], deref_stat);
    group
}

fn common(group: &mut TemplateGroup) {
    group.define("File", &["globals", "funcs", "main"], file);
    group.define("Func", &["args", "body"], func);
    group.define("MainFunc", &["body"], main_func);
    group.define("ArgDef", &[], arg_def);
    group.define("VarDefStat", &["expr"], assign_like);
    group.define("AssignStat", &["expr"], assign_like);
    group.define("ElementAssignStat", &["index", "expr"], element_assign);
    group.define("IfStat", &["cond", "then", "else_branch"], if_stat);
    group.define("WhileStat", &["cond", "body"], while_stat);
    group.define("ReturnStat", &["expr"], return_stat);
    group.define("PrintStat", &["expr"], print_stat);
    group.define("CallStat", &["call"], call_stat);
    group.define("BlockStat", &["block"], block_stat);
    group.define("BreakStat", &[], break_stat);
    expr::define(group);
}

fn file(omo: &Omo, args: &TemplateArgs) -> Tokens {
    let Omo::File(f) = omo else {
        return Tokens::new();
    };
    let prototypes: Vec<String> = f
        .funcs
        .iter()
        .filter_map(|func| match func {
            Omo::Func(func) => Some(format!("{};", signature(func))),
            _ => None,
        })
        .collect();
    let globals = args.map("globals");
    let funcs = args.repeated("funcs");
    let main = args.get("main");
    quote! {
        $(for include in INCLUDES join ($['\r']) => $include)
        $['\n']
        $(for global in globals join ($['\r']) => $global)
        $['\n']
        $(for proto in prototypes join ($['\r']) => $proto)
        $['\n']
        $(for f in funcs join ($['\n']) => $f)
        $['\n']
        $main
    }
}

fn func(omo: &Omo, args: &TemplateArgs) -> Tokens {
    let Omo::Func(f) = omo else {
        return Tokens::new();
    };
    let ret = c_type(f.return_type);
    let name = &f.name;
    let params = args.repeated("args");
    let body = args.get("body");
    quote! {
        $ret $name($(for p in params join (, ) => $p)) {
            $body
        }
    }
}

fn main_func(_: &Omo, args: &TemplateArgs) -> Tokens {
    let body = args.get("body");
    quote! {
        int main(int argc, char *argv[]) {
            $body
            return 0;
        }
    }
}

fn arg_def(omo: &Omo, _: &TemplateArgs) -> Tokens {
    match omo {
        Omo::ArgDef(a) => {
            let decl = c_decl(a.ty, &a.name);
            quote!($decl)
        }
        _ => Tokens::new(),
    }
}

fn plain_block(_: &Omo, args: &TemplateArgs) -> Tokens {
    let locals = args.map("locals");
    let temps = args.map("temps");
    let stats = args.repeated("stats");
    quote! {
        $(for l in locals join ($['\r']) => $l)
        $(for t in temps join ($['\r']) => $t)
        $(for s in stats join ($['\r']) => $s)
    }
}

fn refcounting_block(_: &Omo, args: &TemplateArgs) -> Tokens {
    let locals = args.map("locals");
    let stats = args.repeated("stats");
    let cleanup = args.repeated("cleanup");
    quote! {
        $(for l in locals join ($['\r']) => $l)
        $(for s in stats join ($['\r']) => $s)
        $(for c in cleanup join ($['\r']) => $c)
    }
}

fn plain_var_decl(omo: &Omo, _: &TemplateArgs) -> Tokens {
    match omo {
        Omo::VarDecl(d) => {
            let decl = c_decl(d.ty, &d.name);
            quote!($decl;)
        }
        _ => Tokens::new(),
    }
}

fn refcounting_var_decl(omo: &Omo, _: &TemplateArgs) -> Tokens {
    match omo {
        Omo::VarDecl(d) if d.ty.is_heap() => {
            let decl = c_decl(d.ty, &d.name);
            quote!($decl = NULL;)
        }
        Omo::VarDecl(d) => {
            let decl = c_decl(d.ty, &d.name);
            quote!($decl;)
        }
        _ => Tokens::new(),
    }
}

fn assign_like(omo: &Omo, args: &TemplateArgs) -> Tokens {
    let name = match omo {
        Omo::VarDefStat(s) => &s.name,
        Omo::AssignStat(s) => &s.name,
        _ => return Tokens::new(),
    };
    let value = args.get("expr");
    quote!($name = $value;)
}

fn temp_var_def(omo: &Omo, args: &TemplateArgs) -> Tokens {
    let Omo::TempVarDef(t) = omo else {
        return Tokens::new();
    };
    let name = &t.name;
    let value = args.get("expr");
    quote!($name = $value;)
}

fn element_assign(omo: &Omo, args: &TemplateArgs) -> Tokens {
    let Omo::ElementAssignStat(s) = omo else {
        return Tokens::new();
    };
    let name = &s.name;
    let index = args.get("index");
    let value = args.get("expr");
    quote!(set_ith($name, ($index) - 1, $value);)
}

fn if_stat(_: &Omo, args: &TemplateArgs) -> Tokens {
    let cond = args.get("cond");
    let then = args.get("then");
    match args.single("else_branch") {
        Some(else_branch) => quote! {
            if ($cond) {
                $then
            }
            else {
                $else_branch
            }
        },
        None => quote! {
            if ($cond) {
                $then
            }
        },
    }
}

fn while_stat(_: &Omo, args: &TemplateArgs) -> Tokens {
    let cond = args.get("cond");
    let body = args.get("body");
    quote! {
        while ($cond) {
            $body
        }
    }
}

fn return_stat(_: &Omo, args: &TemplateArgs) -> Tokens {
    let value = args.get("expr");
    quote!(return $value;)
}

fn print_stat(omo: &Omo, args: &TemplateArgs) -> Tokens {
    let Omo::PrintStat(p) = omo else {
        return Tokens::new();
    };
    let value = args.get("expr");
    match p.ty {
        Some(WichType::Int) => quote!(printf($INT_FORMAT, $value);),
        Some(WichType::Float) => quote!(printf($FLOAT_FORMAT, $value);),
        Some(WichType::Boolean) => {
            quote!(printf($BOOL_FORMAT, ($value) ? $TRUE_TEXT : $FALSE_TEXT);)
        }
        Some(WichType::String) => quote!(print_string($value);),
        Some(WichType::Vector) => quote!(print_vector($value);),
        _ => quote!(printf($NEWLINE_FORMAT);),
    }
}

fn call_stat(_: &Omo, args: &TemplateArgs) -> Tokens {
    let call = args.get("call");
    quote!($call;)
}

fn block_stat(_: &Omo, args: &TemplateArgs) -> Tokens {
    let block = args.get("block");
    quote! {
        {
            $block
        }
    }
}

fn break_stat(_: &Omo, _: &TemplateArgs) -> Tokens {
    quote!(break;)
}

fn ref_stat(omo: &Omo, _: &TemplateArgs) -> Tokens {
    match omo {
        Omo::Ref(r) => {
            let name = &r.var_ref;
            quote!(REF($name);)
        }
        _ => Tokens::new(),
    }
}

fn deref_stat(omo: &Omo, _: &TemplateArgs) -> Tokens {
    match omo {
        Omo::Deref(r) => {
            let name = &r.var_ref;
            quote!(DEREF($name);)
        }
        _ => Tokens::new(),
    }
}

//expression templates, shared by both groups
//wich indexes from 1, the runtime from 0

use genco::prelude::*;

use crate::compiler::compiler_converter::{TemplateArgs, TemplateGroup};
use crate::compiler::compiler_model::Omo;
use crate::semantic::semantic_types::WichType;

pub fn define(group: &mut TemplateGroup) {
    group.define("IntLiteral", &[], literal);
    group.define("FloatLiteral", &[], literal);
    group.define("BoolLiteral", &[], literal);
    group.define("StringLiteral", &[], string_literal);
    group.define("VectorLiteral", &["elems"], vector_literal);
    group.define("VarRef", &[], var_ref);
    group.define("FuncCall", &["args"], func_call);
    group.define("IntBinary", &["left", "right"], primitive_binary);
    group.define("FloatBinary", &["left", "right"], primitive_binary);
    group.define("StrBinary", &["left", "right"], runtime_binary);
    group.define("VectorBinary", &["left", "right"], runtime_binary);
    group.define("NegateExpr", &["expr"], negate);
    group.define("NotExpr", &["expr"], not);
    group.define("VectorIndex", &["expr", "index"], vector_index);
    group.define("StrIndex", &["expr", "index"], string_index);
    group.define("VectorLen", &["expr"], len);
    group.define("IntToFloat", &["expr"], int_to_float);
    group.define("IntToVector", &["expr", "len"], broadcast);
    group.define("FloatToVector", &["expr", "len"], broadcast);
    group.define("Bind", &["value", "body"], bind);
}

//C string literal for a raw wich string value
pub fn c_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

//runtime function implementing a string or vector operator
fn runtime_op(operand_ty: WichType, op: &str) -> Option<&'static str> {
    match (operand_ty, op) {
        (WichType::String, "+") => Some("String_add"),
        (WichType::String, "==") => Some("String_eq"),
        (WichType::String, "!=") => Some("String_neq"),
        (WichType::Vector, "+") => Some("Vector_add"),
        (WichType::Vector, "-") => Some("Vector_sub"),
        (WichType::Vector, "*") => Some("Vector_mul"),
        (WichType::Vector, "/") => Some("Vector_div"),
        (WichType::Vector, "==") => Some("Vector_eq"),
        (WichType::Vector, "!=") => Some("Vector_neq"),
        _ => None,
    }
}

fn literal(omo: &Omo, _: &TemplateArgs) -> Tokens {
    match omo {
        Omo::IntLiteral(l) | Omo::FloatLiteral(l) | Omo::BoolLiteral(l) => {
            let value = &l.value;
            quote!($value)
        }
        _ => Tokens::new(),
    }
}

fn string_literal(omo: &Omo, _: &TemplateArgs) -> Tokens {
    let Omo::StringLiteral(l) = omo else {
        return Tokens::new();
    };
    let text = c_string(&l.value);
    quote!(String_new($text))
}

fn vector_literal(_: &Omo, args: &TemplateArgs) -> Tokens {
    let elems = args.repeated("elems");
    if elems.is_empty() {
        return quote!(Vector_new(NULL, 0));
    }
    let count = elems.len().to_string();
    quote!(Vector_new((double []){$(for e in elems join (, ) => $e)}, $count))
}

fn var_ref(omo: &Omo, _: &TemplateArgs) -> Tokens {
    match omo {
        Omo::VarRef(v) => {
            let name = &v.name;
            quote!($name)
        }
        _ => Tokens::new(),
    }
}

fn func_call(omo: &Omo, args: &TemplateArgs) -> Tokens {
    let Omo::FuncCall(call) = omo else {
        return Tokens::new();
    };
    let name = &call.name;
    let actuals = args.repeated("args");
    quote!($name($(for a in actuals join (, ) => $a)))
}

fn primitive_binary(omo: &Omo, args: &TemplateArgs) -> Tokens {
    let (Omo::IntBinary(b) | Omo::FloatBinary(b)) = omo else {
        return Tokens::new();
    };
    let op = &b.op;
    let left = args.get("left");
    let right = args.get("right");
    quote!(($left $op $right))
}

fn runtime_binary(omo: &Omo, args: &TemplateArgs) -> Tokens {
    let (Omo::StrBinary(b) | Omo::VectorBinary(b)) = omo else {
        return Tokens::new();
    };
    let left = args.get("left");
    let right = args.get("right");
    match runtime_op(b.operand_ty, &b.op) {
        Some(function) => quote!($function($left, $right)),
        None => {
            let op = &b.op;
            quote!(($left $op $right))
        }
    }
}

fn negate(omo: &Omo, args: &TemplateArgs) -> Tokens {
    let value = args.get("expr");
    match omo {
        Omo::NegateExpr(e) if e.ty == WichType::Vector => quote!(Vector_neg($value)),
        _ => quote!((-$value)),
    }
}

fn not(_: &Omo, args: &TemplateArgs) -> Tokens {
    let value = args.get("expr");
    quote!((!$value))
}

fn vector_index(_: &Omo, args: &TemplateArgs) -> Tokens {
    let vector = args.get("expr");
    let index = args.get("index");
    quote!(ith($vector, ($index) - 1))
}

fn string_index(_: &Omo, args: &TemplateArgs) -> Tokens {
    let string = args.get("expr");
    let index = args.get("index");
    quote!(String_from_char($string->str[($index) - 1]))
}

fn len(omo: &Omo, args: &TemplateArgs) -> Tokens {
    let value = args.get("expr");
    match omo {
        Omo::VectorLen(l) if l.arg_ty == WichType::String => quote!(String_len($value)),
        _ => quote!(Vector_len($value)),
    }
}

fn int_to_float(_: &Omo, args: &TemplateArgs) -> Tokens {
    let value = args.get("expr");
    quote!(((double)$value))
}

fn broadcast(omo: &Omo, args: &TemplateArgs) -> Tokens {
    let value = args.get("expr");
    let len = args.get("len");
    match omo {
        Omo::IntToVector(_) => quote!(Vector_from_int($value, $len)),
        _ => quote!(Vector_from_float($value, $len)),
    }
}

//comma expression: the value is stored first, then the body is the result
fn bind(omo: &Omo, args: &TemplateArgs) -> Tokens {
    let Omo::Bind(b) = omo else {
        return Tokens::new();
    };
    let name = &b.name;
    let value = args.get("value");
    let body = args.get("body");
    quote!(($name = $value, $body))
}

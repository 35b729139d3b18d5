use std::collections::BTreeMap;

use wich::compiler::compiler_converter::convert;
use wich::compiler::compiler_model_builder::build_model;
use wich::compiler::compiler_refcount::inject;
use wich::compiler::compiler_templates;
use wich::error_handler::{ErrorHandler, ErrorKind};
use wich::{Backend, analyze_source, translate};

const PRELUDE: &str = r#"#include<stdio.h>#include<stdbool.h>#include"wich.h""#;

fn squash(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

fn rc_c(src: &str) -> String {
    let mut errors = ErrorHandler::new(src);
    let c = translate(src, Backend::Refcounting, &mut errors)
        .unwrap_or_else(|e| panic!("{}: {:?}", e, errors.diagnostics()));
    assert!(errors.diagnostics().is_empty(), "{:?}", errors.diagnostics());
    squash(&c)
}

//(refs, derefs) per slot, counted over the statements of squashed C
fn ref_counts(c: &str) -> BTreeMap<String, (usize, usize)> {
    let mut counts: BTreeMap<String, (usize, usize)> = BTreeMap::new();
    for piece in c.split(';') {
        let stat = piece.rsplit(['{', '}']).next().unwrap_or(piece);
        if let Some(name) = stat.strip_prefix("DEREF(").and_then(|s| s.strip_suffix(')')) {
            counts.entry(name.to_string()).or_default().1 += 1;
        } else if let Some(name) = stat.strip_prefix("REF(").and_then(|s| s.strip_suffix(')')) {
            counts.entry(name.to_string()).or_default().0 += 1;
        }
    }
    counts
}

#[test]
fn empty_program() {
    assert_eq!(rc_c(""), format!("{}intmain(intargc,char*argv[]){{return0;}}", PRELUDE));
}

#[test]
fn int_global_needs_no_counting() {
    let c = rc_c("var x = 1\n");
    assert_eq!(c, format!("{}intx;intmain(intargc,char*argv[]){{x=1;return0;}}", PRELUDE));
}

#[test]
fn string_global_is_released_before_main_returns() {
    assert_eq!(
        rc_c("var s = \"hi\"\n"),
        format!(
            r#"{}String*s=NULL;intmain(intargc,char*argv[]){{s=String_new("hi");REF(s);DEREF(s);return0;}}"#,
            PRELUDE
        )
    );
}

#[test]
fn vector_global_has_one_ref_pair() {
    let c = rc_c("var i = [1,2,3]\n");
    assert!(c.contains("Vector*i=NULL;"), "{}", c);
    assert!(
        c.contains("i=Vector_new((double[]){1.0,2.0,3.0},3);REF(i);DEREF(i);return0;"),
        "{}",
        c
    );
    assert_eq!(ref_counts(&c).get("i"), Some(&(1, 1)));
}

#[test]
fn boolean_global() {
    let c = rc_c("var b = (1 == 1)\n");
    assert!(c.contains("boolb;"), "{}", c);
    assert!(c.contains("b=(1==1);return0;"), "{}", c);
}

#[test]
fn parameters_and_nested_block_locals() {
    let c = rc_c("func f(x:int,y:[]) { var i = 3 if (i>3) { var c = \"hi\" } }");
    assert!(
        c.contains(
            r#"voidf(intx,Vector*y){inti;REF(y);i=3;if((i>3)){String*c=NULL;c=String_new("hi");REF(c);DEREF(c);}DEREF(y);}"#
        ),
        "{}",
        c
    );
}

#[test]
fn straight_line_programs_balance_every_slot() {
    let c = rc_c(
        "var a = \"x\"\nvar b = a\nb = a + \"y\"\nvar v = [1, 2]\nv = v * 2\n\
         if (len(b) > 1) { var c = b + \"z\" print(c) }\nprint(b)\nprint(v[1])",
    );
    let counts = ref_counts(&c);
    assert!(counts.len() > 5, "{:?}", counts);
    for (slot, (refs, derefs)) in &counts {
        assert_eq!(refs, derefs, "{} in {}", slot, c);
    }
}

#[test]
fn returned_string_keeps_a_reference_for_the_caller() {
    let c = rc_c("func f(s:string):string { var t = s + \"!\" return t }\nvar r = f(\"a\")");
    assert!(
        c.contains(
            r#"String*f(String*s){String*t=NULL;String*t0=NULL;String*t2=NULL;REF(s);t0=String_new("!");REF(t0);t=String_add(s,t0);REF(t);t2=t;REF(t2);REF(t2);DEREF(t2);DEREF(t0);DEREF(t);DEREF(s);returnt2;}"#
        ),
        "{}",
        c
    );
    assert!(
        c.contains(r#"t0=String_new("a");REF(t0);t1=f(t0);r=t1;REF(r);DEREF(t1);DEREF(t0);DEREF(r);return0;"#),
        "{}",
        c
    );
}

#[test]
fn injection_is_idempotent() {
    let src = "func g(v : []) : [] { return v * 2 }\nvar w = g([1, 2])\nwhile (len(\"ab\") > len(w)) { w = w + 1 }";
    let mut errors = ErrorHandler::new(src);
    let (script, symtab) = analyze_source(src, &mut errors);
    assert!(!errors.has_errors());
    let mut model = build_model(&script, &symtab).unwrap();
    inject(&mut model, &symtab);
    let once = model.clone();
    inject(&mut model, &symtab);
    assert_eq!(once, model);
}

#[test]
fn plain_templates_on_an_injected_model_warn_but_still_render() {
    let src = "var s = \"a\" + \"b\"\nprint(s)";
    let mut errors = ErrorHandler::new(src);
    let (script, symtab) = analyze_source(src, &mut errors);
    let mut model = build_model(&script, &symtab).unwrap();
    inject(&mut model, &symtab);
    let c = squash(
        &convert(&model, &compiler_templates::plain(), &mut errors)
            .to_file_string()
            .unwrap(),
    );
    let warnings: Vec<_> = errors.warnings().collect();
    assert_eq!(warnings.len(), 2, "{:?}", warnings);
    assert!(warnings.iter().all(|w| w.kind == ErrorKind::ModelMismatch));
    assert!(!errors.has_errors());
    assert!(c.contains("[TempVarDefinvalid]"), "{}", c);
    assert!(c.contains("print_string(s);"), "{}", c);
}

//text of main's body
fn main_part(c: &str) -> &str {
    &c[c.find("intmain(").unwrap_or(0)..]
}

#[test]
fn return_inside_a_shadowing_block_releases_each_object_once() {
    let c = rc_c("func f() : string { var s = \"a\" if (true) { var s = \"b\" return s } return s }\nprint(f())");
    let inner = r#"if(true){String*s_1=NULL;String*t2=NULL;s_1=String_new("b");REF(s_1);t2=s_1;REF(t2);REF(t2);DEREF(t2);DEREF(s_1);DEREF(t3);DEREF(s);returnt2;}"#;
    assert!(c.contains(inner), "{}", c);
    let counts = ref_counts(inner);
    assert_eq!(counts.get("s_1"), Some(&(1, 1)));
    assert_eq!(counts.get("s"), Some(&(0, 1)));
    // one reference travels to the caller
    assert_eq!(counts.get("t2"), Some(&(2, 1)));
    assert!(c.contains("t3=s;REF(t3);REF(t3);DEREF(t3);DEREF(s);returnt3;}"), "{}", c);
}

#[test]
fn nested_returns_sweep_every_enclosing_slot_once() {
    let c = rc_c(
        "func f(p : string) : string { var a = p + \"1\" if (len(a) > 1) { var b = a + \"2\" \
         while (true) { var c = b + \"3\" return c } } return a }\nprint(f(\"x\"))",
    );
    let body = &c[c.find("String*f(String*p){").unwrap_or(0)..c.find("intmain(").unwrap_or(c.len())];
    let start = body.find("while(true){").unwrap_or(0);
    let innermost = &body[start..];
    let innermost = &innermost[..innermost.find("returnt").unwrap_or(innermost.len())];
    let counts = ref_counts(innermost);
    for slot in ["c", "b", "a", "p"] {
        assert_eq!(counts.get(slot).map(|(_, derefs)| *derefs), Some(1), "{} in {}", slot, innermost);
    }
}

#[test]
fn right_operand_of_and_is_only_evaluated_when_needed() {
    let c = rc_c(
        "func g() : string { print(\"side effect\") return \"x\" }\n\
         if (false && g() == \"x\") { print(\"yes\") }",
    );
    let main = main_part(&c);
    assert!(
        main.contains(
            r#"t3=false;if(t3){String*t0=NULL;String*t1=NULL;t0=g();t1=String_new("x");REF(t1);t3=String_eq(t0,t1);DEREF(t1);DEREF(t0);}if(t3){"#
        ),
        "{}",
        c
    );
    assert!(main.contains("boolt3;"), "{}", c);
    let counts = ref_counts(main);
    assert_eq!(counts.get("t1"), Some(&(1, 1)));
    assert_eq!(counts.get("t4"), Some(&(1, 1)));
    // the call result is adopted, its reference comes from g
    assert_eq!(counts.get("t0"), Some(&(0, 1)));
}

#[test]
fn broadcast_operand_with_side_effects_runs_once() {
    let c = rc_c("func f() : [] { print(\"called\") return [1, 2] }\nvar v = f() + 1");
    let main = main_part(&c);
    assert_eq!(main.matches("f()").count(), 1, "{}", c);
    assert!(
        main.contains(
            "t0=f();t1=t0;REF(t1);t3=Vector_from_int(1,Vector_len(t1));REF(t3);v=Vector_add(t1,t3);REF(v);DEREF(t3);DEREF(t1);DEREF(t0);DEREF(v);return0;"
        ),
        "{}",
        c
    );
}

#[test]
fn variable_named_like_a_temporary_is_not_reused() {
    let c = rc_c("var t1 = \"x\"\nprint(\"y\")\nprint(t1)");
    assert_eq!(c.matches("String*t1=NULL;").count(), 1, "{}", c);
    assert!(
        main_part(&c).contains(
            r#"String*t2=NULL;t1=String_new("x");REF(t1);t2=String_new("y");REF(t2);print_string(t2);print_string(t1);DEREF(t2);DEREF(t1);return0;"#
        ),
        "{}",
        c
    );
    for (slot, (refs, derefs)) in ref_counts(&c) {
        assert_eq!(refs, derefs, "{} in {}", slot, c);
    }
}

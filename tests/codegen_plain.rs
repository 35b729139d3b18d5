use wich::error_handler::{ErrorHandler, ErrorKind};
use wich::{Backend, TranslateError, backend_from_name, translate};

const PRELUDE: &str = r#"#include<stdio.h>#include<stdbool.h>#include"wich.h""#;
const EMPTY_MAIN: &str = "intmain(intargc,char*argv[]){return0;}";

fn squash(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

fn plain_c(src: &str) -> String {
    let mut errors = ErrorHandler::new(src);
    let c = translate(src, Backend::Plain, &mut errors)
        .unwrap_or_else(|e| panic!("{}: {:?}", e, errors.diagnostics()));
    assert!(errors.diagnostics().is_empty(), "{:?}", errors.diagnostics());
    squash(&c)
}

#[test]
fn empty_program_is_an_empty_main() {
    assert_eq!(plain_c(""), format!("{}{}", PRELUDE, EMPTY_MAIN));
}

#[test]
fn globals_are_declared_before_main() {
    assert_eq!(
        plain_c("var x = 1\n"),
        format!("{}intx;intmain(intargc,char*argv[]){{x=1;return0;}}", PRELUDE)
    );
    assert_eq!(
        plain_c("var s = \"hi\"\n"),
        format!(r#"{}String*s;intmain(intargc,char*argv[]){{s=String_new("hi");return0;}}"#, PRELUDE)
    );
}

#[test]
fn plain_output_has_no_reference_counting() {
    let c = plain_c("var s = \"a\" + \"b\"\nvar v = [1, 2] * 3\nprint(s)\nprint(v)");
    assert!(!c.contains("REF("), "{}", c);
    assert!(c.contains(r#"s=String_add(String_new("a"),String_new("b"));"#), "{}", c);
    assert!(c.contains("print_string(s);"), "{}", c);
    assert!(c.contains("print_vector(v);"), "{}", c);
}

#[test]
fn vector_literals_store_floats() {
    let c = plain_c("var i = [1,2,3]\n");
    assert!(c.contains("Vector*i;"), "{}", c);
    assert!(c.contains("i=Vector_new((double[]){1.0,2.0,3.0},3);"), "{}", c);
}

#[test]
fn boolean_globals_print_as_words() {
    let c = plain_c("var b = (1 == 1)\nprint(b)");
    assert!(c.contains("boolb;"), "{}", c);
    assert!(c.contains("b=(1==1);"), "{}", c);
    assert!(c.contains(r#"printf("%s\n",(b)?"true":"false");"#), "{}", c);
}

#[test]
fn functions_get_prototypes_and_definitions() {
    let c = plain_c("func f(x : int, y : []) : float { return y[x] }\nprint(f(1, [2.5]))");
    assert!(c.contains("doublef(intx,Vector*y);"), "{}", c);
    assert!(c.contains("doublef(intx,Vector*y){returnith(y,(x)-1);}"), "{}", c);
    assert!(
        c.contains(r#"printf("%1.2f\n",f(1,Vector_new((double[]){2.5},1)));"#),
        "{}",
        c
    );
    let proto = c.find("doublef(intx,Vector*y);").unwrap_or(usize::MAX);
    let main = c.find("intmain(").unwrap_or(0);
    assert!(proto < main);
}

#[test]
fn nested_blocks_declare_their_own_locals() {
    let c = plain_c("func f(x:int,y:[]) { var i = 3 if (i>3) { var c = \"hi\" } }");
    assert!(
        c.contains(r#"voidf(intx,Vector*y){inti;i=3;if((i>3)){String*c;c=String_new("hi");}}"#),
        "{}",
        c
    );
}

#[test]
fn mixed_arithmetic_is_promoted() {
    let c = plain_c("var i = 2\nvar f = i * 1.5\nvar v = [1, 2] + i");
    assert!(c.contains("f=(((double)i)*1.5);"), "{}", c);
    assert!(c.contains("Vector*t3;"), "{}", c);
    assert!(
        c.contains("v=(t3=Vector_new((double[]){1.0,2.0},2),Vector_add(t3,Vector_from_int(i,Vector_len(t3))));"),
        "{}",
        c
    );
}

#[test]
fn broadcast_operand_is_evaluated_once() {
    let c = plain_c("func f() : [] { print(\"called\") return [1, 2] }\nvar v = f() + 1");
    let main = &c[c.find("intmain(").unwrap_or(0)..];
    assert_eq!(main.matches("f()").count(), 1, "{}", c);
    assert!(
        main.contains("Vector*t1;v=(t1=f(),Vector_add(t1,Vector_from_int(1,Vector_len(t1))));return0;"),
        "{}",
        c
    );
}

#[test]
fn variable_named_like_a_temporary_keeps_its_value() {
    let c = plain_c("var t1 = \"x\"\nprint(\"y\")\nprint(t1)");
    assert_eq!(c.matches("String*t1;").count(), 1, "{}", c);
    assert!(c.contains(r#"print_string(String_new("y"));print_string(t1);"#), "{}", c);
}

#[test]
fn shadowed_locals_are_renamed() {
    let c = plain_c("func f() : string { var s = \"a\" if (true) { var s = \"b\" return s } return s }");
    assert!(
        c.contains(r#"String*f(){String*s;s=String_new("a");if(true){String*s_1;s_1=String_new("b");returns_1;}returns;}"#),
        "{}",
        c
    );
}

#[test]
fn loops_and_strings_index_from_one() {
    let c = plain_c("var s = \"abc\"\nvar i = 1\nwhile (i <= len(s)) { print(s[i]) i = i + 1 }");
    assert!(c.contains("while((i<=String_len(s))){"), "{}", c);
    assert!(c.contains("print_string(String_from_char(s->str[(i)-1]));"), "{}", c);
    assert!(c.contains("i=(i+1);"), "{}", c);
}

#[test]
fn semantic_errors_stop_code_generation() {
    let src = "var x = 1\nx = \"s\"";
    let mut errors = ErrorHandler::new(src);
    let result = translate(src, Backend::Plain, &mut errors);
    assert!(matches!(result, Err(TranslateError::Rejected(_))));
    assert_eq!(errors.kinds(), vec![ErrorKind::IncompatibleTypes]);
}

#[test]
fn unknown_target_is_reported() {
    let mut errors = ErrorHandler::default();
    assert_eq!(backend_from_name("llvm", &mut errors), None);
    assert_eq!(errors.kinds(), vec![ErrorKind::UnknownTarget]);
    assert_eq!(backend_from_name("plain", &mut errors), Some(Backend::Plain));
}

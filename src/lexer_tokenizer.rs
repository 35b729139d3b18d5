//lexical analysis of wich source,
//breaks the text into positioned tokens for the parser
//built on the logos library

use logos::Logos;

#[derive(Logos, Debug, PartialEq, Clone)]
pub enum Token {
    // Types
    #[token("int")]
    TypeInt,
    #[token("float")]
    TypeFloat,
    #[token("string")]
    TypeString,
    #[token("boolean")]
    TypeBoolean,

    // Keywords
    #[token("var")]
    Var,
    #[token("func")]
    Func,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("while")]
    While,
    #[token("return")]
    Return,
    #[token("print")]
    Print,
    #[token("len")]
    Len,
    #[token("true")]
    True,
    #[token("false")]
    False,

    // Punctuation
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token("=")]
    Assign,

    // Arithmetic
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,

    // Logic and comparisons
    #[token("==")]
    Equal,
    #[token("!=")]
    NotEqual,
    #[token(">=")]
    GreaterEqual,
    #[token("<=")]
    LessEqual,
    #[token(">")]
    Greater,
    #[token("<")]
    Less,
    #[token("&&")]
    And,
    #[token("||")]
    Or,
    #[token("!")]
    Bang,

    #[regex(r"\s+", logos::skip)]
    Whitespace,

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Identifier(String),

    #[regex(r"[0-9]+\.[0-9]*([eE][+-]?[0-9]+)?", |lex| lex.slice().parse().ok())]
    #[regex(r"\.[0-9]+([eE][+-]?[0-9]+)?", |lex| lex.slice().parse().ok())]
    Float(f64),

    #[regex("[0-9]+", |lex| lex.slice().parse().ok())]
    Number(i64),

    #[regex(r#""([^"\\]|\\.)*""#, |lex| unescape(lex.slice()))]
    StringLiteral(String),

    #[regex(r"//[^\r\n]*", logos::skip)]
    #[regex(r"/\*([^*]|\*+[^*/])*\*+/", logos::skip)]
    Comment,
    Error,
}

impl Token {
    //tokens that may begin a statement, used by the parser to resynchronize
    pub fn starts_statement(&self) -> bool {
        matches!(
            self,
            Token::Var
                | Token::Func
                | Token::If
                | Token::While
                | Token::Return
                | Token::Print
                | Token::LBrace
                | Token::RBrace
        )
    }
}

#[derive(Debug, Clone)]
pub struct PositionedToken {
    pub token: Token,
    pub span: std::ops::Range<usize>,
}

pub fn lex_with_span(source: &str) -> Vec<PositionedToken> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        match result {
            Ok(token) => tokens.push(PositionedToken { token, span }),
            Err(_) => tokens.push(PositionedToken {
                token: Token::Error,
                span,
            }),
        }
    }

    tokens
}

// Converts a quoted literal with escapes like \n, \t, \" into its value
fn unescape(s: &str) -> String {
    let mut chars = s[1..s.len() - 1].chars();
    let mut result = String::new();

    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => result.push('\n'),
                Some('t') => result.push('\t'),
                Some('\\') => result.push('\\'),
                Some('"') => result.push('"'),
                Some(other) => {
                    result.push('\\');
                    result.push(other);
                }
                None => break,
            }
        } else {
            result.push(c);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(src: &str) -> Vec<Token> {
        lex_with_span(src).into_iter().map(|t| t.token).collect()
    }

    #[test]
    fn keywords_and_identifiers() {
        assert_eq!(
            tokens("var variable = len(x)"),
            vec![
                Token::Var,
                Token::Identifier("variable".into()),
                Token::Assign,
                Token::Len,
                Token::LParen,
                Token::Identifier("x".into()),
                Token::RParen,
            ]
        );
    }

    #[test]
    fn numbers_and_operators() {
        assert_eq!(
            tokens("1 <= 3.14 && !(2 != 2)"),
            vec![
                Token::Number(1),
                Token::LessEqual,
                Token::Float(3.14),
                Token::And,
                Token::Bang,
                Token::LParen,
                Token::Number(2),
                Token::NotEqual,
                Token::Number(2),
                Token::RParen,
            ]
        );
    }

    #[test]
    fn strings_are_unescaped_and_comments_skipped() {
        let toks = tokens("print(\"a\\tb\\\"\") // trailing\n/* block */ x");
        assert_eq!(toks[2], Token::StringLiteral("a\tb\"".into()));
        assert_eq!(toks.last(), Some(&Token::Identifier("x".into())));
    }

    #[test]
    fn spans_cover_source_bytes() {
        let toks = lex_with_span("var s = \"hi\"");
        assert_eq!(toks[3].span, 8..12);
    }

    #[test]
    fn unknown_characters_become_error_tokens() {
        assert_eq!(tokens("x @ y")[1], Token::Error);
    }
}

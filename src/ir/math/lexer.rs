//! Lexer for the expression mini-language.
//!
//! Uses Logos for tokenization. Tokens carry only their kind; the source
//! text is recovered from the byte span, which lets the text rewriting passes
//! splice replacements into the source without re-rendering it.

use logos::{Logos, Span};

use crate::ir::error::{ModelError, Result};

#[derive(Logos, Debug, Clone, Copy, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum Token {
    // === Literals ===
    #[regex(r"[0-9]+\.[0-9]*([eE][+-]?[0-9]+)?", parse_number)]
    #[regex(r"\.[0-9]+([eE][+-]?[0-9]+)?", parse_number)]
    #[regex(r"[0-9]+([eE][+-]?[0-9]+)?", parse_number)]
    Number(f64),
    #[token("true")]
    True,
    #[token("false")]
    False,

    // === Boolean operators ===
    #[token("&")]
    #[token("&&")]
    #[token("and")]
    And,
    #[token("|")]
    #[token("||")]
    #[token("or")]
    Or,
    #[token("!")]
    #[token("not")]
    Not,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident,

    // === Punctuation ===
    #[token("(")]
    ParenOpen,
    #[token(")")]
    ParenClose,
    #[token(",")]
    Comma,

    // === Arithmetic ===
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("**")]
    #[token("^")]
    Power,

    // === Comparison ===
    #[token("<")]
    Less,
    #[token(">")]
    Greater,
    #[token("<=")]
    LessEq,
    #[token(">=")]
    GreaterEq,
    #[token("==")]
    DoubleEq,
    #[token("!=")]
    NotEq,
}

fn parse_number(lex: &mut logos::Lexer<Token>) -> Option<f64> {
    lex.slice().parse().ok()
}

/// A token with its source span.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub span: Span,
}

/// Tokenize expression text.
pub fn lex(text: &str) -> Result<Vec<Spanned>> {
    let mut lexer = Token::lexer(text);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        match result {
            Ok(token) => tokens.push(Spanned {
                token,
                span: lexer.span(),
            }),
            Err(()) => {
                return Err(ModelError::Lex {
                    text: text.to_string(),
                    slice: lexer.slice().to_string(),
                    span: lexer.span(),
                });
            }
        }
    }

    Ok(tokens)
}

/// Rewrite identifiers in `text`, leaving everything else byte-for-byte intact.
///
/// `replace` receives the index of each identifier token and the token list,
/// so callers can look at neighbouring tokens (e.g. to tell calls from
/// symbol references).
pub fn rewrite_identifiers<F>(text: &str, mut replace: F) -> Result<String>
where
    F: FnMut(&str, usize, &[Spanned]) -> Option<String>,
{
    let tokens = lex(text)?;
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;

    for (i, tok) in tokens.iter().enumerate() {
        if tok.token != Token::Ident {
            continue;
        }
        if let Some(replacement) = replace(&text[tok.span.clone()], i, &tokens) {
            out.push_str(&text[cursor..tok.span.start]);
            out.push_str(&replacement);
            cursor = tok.span.end;
        }
    }
    out.push_str(&text[cursor..]);
    Ok(out)
}

/// Is this a valid symbol name?
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_') && !is_keyword(s)
}

fn is_keyword(s: &str) -> bool {
    matches!(s, "true" | "false" | "and" | "or" | "not")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(text: &str) -> Vec<Token> {
        lex(text).unwrap().into_iter().map(|t| t.token).collect()
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("1 1. .1 1.0 1e-3 2.5E4"),
            vec![
                Token::Number(1.0),
                Token::Number(1.0),
                Token::Number(0.1),
                Token::Number(1.0),
                Token::Number(1e-3),
                Token::Number(2.5e4),
            ]
        );
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds("** ^ <= >= == != & && and | or ! not"),
            vec![
                Token::Power,
                Token::Power,
                Token::LessEq,
                Token::GreaterEq,
                Token::DoubleEq,
                Token::NotEq,
                Token::And,
                Token::And,
                Token::And,
                Token::Or,
                Token::Or,
                Token::Not,
                Token::Not,
            ]
        );
    }

    #[test]
    fn test_keyword_prefix_is_identifier() {
        assert_eq!(kinds("android"), vec![Token::Ident]);
        assert_eq!(kinds("e1"), vec![Token::Ident]);
    }

    #[test]
    fn test_stray_dot_is_an_error() {
        let err = lex("..0").unwrap_err();
        assert!(matches!(err, ModelError::Lex { span, .. } if span.start == 0));
    }

    #[test]
    fn test_rewrite_keeps_numbers_with_exponents() {
        let out = rewrite_identifiers("1e5*e + x", |name, _, _| {
            (name == "e" || name == "x").then(|| format!("<{name}>"))
        })
        .unwrap();
        assert_eq!(out, "1e5*<e> + <x>");
    }

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("tau_r"));
        assert!(is_identifier("_x1"));
        assert!(!is_identifier("1x"));
        assert!(!is_identifier("a b"));
        assert!(!is_identifier("and"));
        assert!(!is_identifier(""));
    }
}

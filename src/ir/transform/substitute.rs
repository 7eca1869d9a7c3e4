//! Macro expansion of bindings inside expression text.
//!
//! Substitution works on token spans, so everything outside a replaced
//! reference is kept byte-for-byte. Given a binding `B`:
//!
//! - a symbol binding `B := rhs` replaces every reference `B` with `(rhs)`,
//! - a function binding `B(a, b) := rhs` replaces every call `B(x, y)` with
//!   `(rhs[a -> x, b -> y])`. Arguments are expanded first, so nested calls
//!   such as `B(B(x, y), z)` are handled, and an argument that is not an atom
//!   is wrapped in parentheses before it is spliced in.
//!
//! A bare reference to a function binding is left untouched. Calling a
//! binding with the wrong number of arguments, or calling a symbol binding
//! at all, is an [`ArityMismatch`](ModelError::ArityMismatch).

use std::ops::Range;

use crate::ir::ast::expression::Binding;
use crate::ir::error::{ModelError, Result};
use crate::ir::math::lexer::{lex, rewrite_identifiers, Spanned, Token};

/// Expand every use of `binding` in `text`.
pub fn substitute_binding(text: &str, binding: &Binding) -> Result<String> {
    let tokens = lex(text)?;
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    let mut i = 0;

    while i < tokens.len() {
        let tok = &tokens[i];
        if tok.token != Token::Ident || &text[tok.span.clone()] != binding.name() {
            i += 1;
            continue;
        }

        let is_call = tokens
            .get(i + 1)
            .is_some_and(|t| t.token == Token::ParenOpen);

        if !is_call {
            if !binding.is_function() {
                out.push_str(&text[cursor..tok.span.start]);
                out.push('(');
                out.push_str(binding.rhs());
                out.push(')');
                cursor = tok.span.end;
            }
            i += 1;
            continue;
        }

        let close = matching_paren(text, &tokens, i + 1)?;
        let arg_spans = split_arguments(text, &tokens, i + 1, close)?;
        if !binding.is_function() || arg_spans.len() != binding.args().len() {
            return Err(ModelError::ArityMismatch {
                binding: binding.name().to_string(),
                expected: binding.args().len(),
                found: arg_spans.len(),
                expr: text.to_string(),
            });
        }

        let args = arg_spans
            .into_iter()
            .map(|span| substitute_binding(text[span].trim(), binding).and_then(protect))
            .collect::<Result<Vec<_>>>()?;

        let body = rewrite_identifiers(binding.rhs(), |name, idx, toks| {
            if is_called(toks, idx) {
                return None;
            }
            binding
                .args()
                .iter()
                .position(|a| a == name)
                .map(|k| args[k].clone())
        })?;

        out.push_str(&text[cursor..tok.span.start]);
        out.push('(');
        out.push_str(&body);
        out.push(')');
        cursor = tokens[close].span.end;
        i = close + 1;
    }

    out.push_str(&text[cursor..]);
    Ok(out)
}

fn is_called(tokens: &[Spanned], idx: usize) -> bool {
    tokens
        .get(idx + 1)
        .is_some_and(|t| t.token == Token::ParenOpen)
}

/// Index of the `)` closing the `(` at `open`.
fn matching_paren(text: &str, tokens: &[Spanned], open: usize) -> Result<usize> {
    let mut depth = 0usize;
    for (idx, tok) in tokens.iter().enumerate().skip(open) {
        match tok.token {
            Token::ParenOpen => depth += 1,
            Token::ParenClose => {
                depth -= 1;
                if depth == 0 {
                    return Ok(idx);
                }
            }
            _ => {}
        }
    }
    Err(ModelError::Parse {
        text: text.to_string(),
        message: "unmatched '('".to_string(),
        span: tokens[open].span.clone(),
    })
}

/// Byte ranges of the top-level comma separated arguments between `open`
/// and `close`.
fn split_arguments(
    text: &str,
    tokens: &[Spanned],
    open: usize,
    close: usize,
) -> Result<Vec<Range<usize>>> {
    if open + 1 == close {
        return Ok(Vec::new());
    }

    let mut spans = Vec::new();
    let mut depth = 0usize;
    let mut start = open + 1;

    for idx in open + 1..=close {
        let tok = &tokens[idx];
        let at_boundary = match tok.token {
            Token::ParenOpen => {
                depth += 1;
                false
            }
            Token::ParenClose if depth > 0 => {
                depth -= 1;
                false
            }
            Token::ParenClose => true,
            Token::Comma => depth == 0,
            _ => false,
        };
        if !at_boundary {
            continue;
        }
        if start == idx {
            return Err(ModelError::Parse {
                text: text.to_string(),
                message: "empty argument".to_string(),
                span: tok.span.clone(),
            });
        }
        spans.push(tokens[start].span.start..tokens[idx - 1].span.end);
        start = idx + 1;
    }
    Ok(spans)
}

/// Wrap `arg` in parentheses unless it is already an atom.
fn protect(arg: String) -> Result<String> {
    if is_atom(&arg)? {
        Ok(arg)
    } else {
        Ok(format!("({arg})"))
    }
}

/// A single identifier or number, a call, or a fully parenthesized group.
fn is_atom(text: &str) -> Result<bool> {
    let tokens = lex(text)?;
    let last = tokens.len().saturating_sub(1);
    Ok(match tokens.first().map(|t| t.token) {
        None => false,
        Some(Token::Ident | Token::Number(_)) if tokens.len() == 1 => true,
        Some(Token::Ident) if tokens.len() > 2 && tokens[1].token == Token::ParenOpen => {
            matching_paren(text, &tokens, 1)? == last
        }
        Some(Token::ParenOpen) => matching_paren(text, &tokens, 0)? == last,
        _ => false,
    })
}

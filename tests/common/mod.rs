#![allow(dead_code)]

use rewrite_conf::{
    Error, ParseError, ResolvedConfig, Statement, TokenKind, Value, compile, parse, tokenize,
};

/// Token values of `input`, in order.
pub fn values(input: &str) -> Vec<String> {
    tokenize(input)
        .expect("tokenize failed")
        .into_iter()
        .map(|t| t.value)
        .collect()
}

/// Token kinds of `input`, in order.
pub fn kinds(input: &str) -> Vec<TokenKind> {
    tokenize(input)
        .expect("tokenize failed")
        .into_iter()
        .map(|t| t.kind)
        .collect()
}

pub fn body(input: &str) -> Vec<Statement> {
    parse(input)
        .unwrap_or_else(|e| panic!("parse failed: {e}\n--- input ---\n{input}"))
        .body
}

pub fn parse_error(input: &str) -> ParseError {
    match parse(input) {
        Err(Error::Parse(e)) => e,
        other => panic!("expected parse error, got {other:?}\n--- input ---\n{input}"),
    }
}

pub fn resolved(input: &str) -> ResolvedConfig {
    compile(input).unwrap_or_else(|e| panic!("compile failed: {e}\n--- input ---\n{input}"))
}

pub fn scalar(s: &str) -> Value {
    Value::Scalar(s.to_string())
}

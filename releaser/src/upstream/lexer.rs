//! Tokenizer for Starlark build files.
//!
//! Only the shapes needed to classify top-level statements are
//! distinguished. Whitespace, comments and backslash continuations are
//! skipped; newlines are kept so the parser can find statement boundaries.

use logos::Logos;
use std::ops::Range;

/// The kind of token produced by the lexer.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\f]+")]
#[logos(skip r"#[^\n]*")]
#[logos(skip r"\\\r?\n")]
pub enum TokenKind {
    /// End of a physical line.
    #[token("\n")]
    Newline,

    /// `def` keyword.
    #[token("def")]
    Def,
    /// `load` statement keyword.
    #[token("load")]
    Load,
    /// `if` keyword.
    #[token("if")]
    If,
    /// `elif` keyword.
    #[token("elif")]
    Elif,
    /// `else` keyword.
    #[token("else")]
    Else,
    /// `for` keyword.
    #[token("for")]
    For,

    /// Identifier.
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident,

    /// Integer or float literal.
    #[regex(r"[0-9][0-9_]*(\.[0-9_]*)?([eE][+-]?[0-9]+)?")]
    #[regex(r"0[xXoObB][0-9a-fA-F_]+")]
    Number,

    /// Single-line string literal with either quote.
    #[regex(r#"[rRbB]?"([^"\\\n]|\\.)*""#)]
    #[regex(r"[rRbB]?'([^'\\\n]|\\.)*'")]
    String,

    /// Triple-quoted string literal, possibly spanning lines.
    #[regex(r#"[rRbB]?"""([^"\\]|\\(.|\n)|"[^"\\]|""[^"\\])*""""#)]
    #[regex(r"[rRbB]?'''([^'\\]|\\(.|\n)|'[^'\\]|''[^'\\])*'''")]
    TripleString,

    /// Plain assignment.
    #[token("=")]
    Assign,

    /// Augmented assignment such as `+=`.
    #[regex(r"(\+|-|\*|/|//|%|&|\||\^|<<|>>)=")]
    AugAssign,

    /// `(`
    #[token("(")]
    LParen,
    /// `)`
    #[token(")")]
    RParen,
    /// `[`
    #[token("[")]
    LBracket,
    /// `]`
    #[token("]")]
    RBracket,
    /// `{`
    #[token("{")]
    LBrace,
    /// `}`
    #[token("}")]
    RBrace,
    /// `,`
    #[token(",")]
    Comma,
    /// `:`
    #[token(":")]
    Colon,
    /// `;`
    #[token(";")]
    Semicolon,
    /// `.`
    #[token(".")]
    Dot,

    /// Any other operator.
    #[regex(r"==|!=|<=|>=|<|>|\*\*|\+|-|\*|//|/|%|&|\||\^|~|<<|>>|->")]
    Operator,
}

impl TokenKind {
    /// True for tokens that open a bracketed group.
    #[must_use]
    pub fn opens(self) -> bool {
        matches!(self, Self::LParen | Self::LBracket | Self::LBrace)
    }

    /// True for tokens that close a bracketed group.
    #[must_use]
    pub fn closes(self) -> bool {
        matches!(self, Self::RParen | Self::RBracket | Self::RBrace)
    }

    /// True for either form of string literal.
    #[must_use]
    pub fn is_string(self) -> bool {
        matches!(self, Self::String | Self::TripleString)
    }
}

/// A token with its source slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'src> {
    /// What was matched.
    pub kind: TokenKind,
    /// Byte range in the source.
    pub span: Range<usize>,
    /// The matched text.
    pub text: &'src str,
}

/// A character sequence no token matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    /// Byte offset of the offending text.
    pub offset: usize,
    /// The offending text.
    pub text: String,
}

/// Split `source` into tokens.
///
/// # Errors
///
/// Returns [`LexError`] at the first unrecognized input, including
/// unterminated strings.
pub fn tokenize(source: &str) -> Result<Vec<Token<'_>>, LexError> {
    let mut lexer = TokenKind::lexer(source);
    let mut tokens = Vec::new();
    while let Some(kind) = lexer.next() {
        let span = lexer.span();
        match kind {
            Ok(kind) => tokens.push(Token {
                kind,
                span,
                text: lexer.slice(),
            }),
            Err(()) => {
                return Err(LexError {
                    offset: span.start,
                    text: lexer.slice().to_owned(),
                });
            }
        }
    }
    Ok(tokens)
}

/// Decode the value of a string literal token.
///
/// Raw literals keep backslashes verbatim. Escapes that Starlark does not
/// define are kept as written.
#[must_use]
pub fn string_value(text: &str) -> String {
    let (raw, body) = strip_prefix(text);
    let quote_len = if body.starts_with("\"\"\"") || body.starts_with("'''") {
        3
    } else {
        1
    };
    let inner = body
        .get(quote_len..body.len().saturating_sub(quote_len))
        .unwrap_or_default();
    if raw {
        inner.to_owned()
    } else {
        unescape(inner)
    }
}

fn strip_prefix(text: &str) -> (bool, &str) {
    match text.chars().next() {
        Some('r' | 'R') => (true, &text[1..]),
        Some('b' | 'B') => (false, &text[1..]),
        _ => (false, text),
    }
}

fn unescape(inner: &str) -> String {
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('\n') => {}
            Some(escaped @ ('\\' | '"' | '\'')) => out.push(escaped),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

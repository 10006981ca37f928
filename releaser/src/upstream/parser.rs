//! Grouping of tokens into top-level Starlark statements.
//!
//! Statements are split at newlines and semicolons outside brackets. Lines
//! indented past column zero belong to the body of the preceding compound
//! statement and are not classified on their own.

use super::lexer::{LexError, Token, TokenKind, string_value, tokenize};

/// A top-level statement, classified by shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    /// `target = value` or an augmented assignment.
    Assign {
        /// Source text of the assignment target.
        target: String,
        /// The right-hand side.
        value: Expr,
        /// 1-based source line.
        line: usize,
    },
    /// `def name(...): ...`
    Def {
        /// The function name.
        name: String,
        /// 1-based source line.
        line: usize,
    },
    /// `load(...)`
    Load,
    /// A bare expression, usually a macro call.
    Expr,
    /// `if`, `for` and their continuation clauses.
    Compound,
}

/// The right-hand side of an assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// One string literal, or adjacent literals concatenated.
    Str(String),
    /// Anything else, described by its leading shape.
    Other(&'static str),
}

/// A malformed file, located by line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    /// 1-based source line.
    pub line: usize,
    /// What is wrong.
    pub message: String,
}

/// Parse `source` into its top-level statements.
///
/// # Errors
///
/// Returns [`SyntaxError`] for unrecognized characters, unbalanced brackets,
/// unexpected indentation, or statements of an unknown shape.
pub fn parse(source: &str) -> Result<Vec<Statement>, SyntaxError> {
    let tokens = tokenize(source).map_err(|err| lex_error(source, &err))?;
    let mut statements: Vec<Statement> = Vec::new();
    let mut in_block = false;

    for line in logical_lines(source, &tokens)? {
        let Some(first) = line.tokens.first() else {
            continue;
        };
        if line.indent > 0 {
            if !in_block {
                return Err(error_at(source, first, "unexpected indentation"));
            }
            continue;
        }

        let statement = classify(source, &line.tokens)?;
        in_block = ends_with_block(&line.tokens);
        if matches!(first.kind, TokenKind::Elif | TokenKind::Else) {
            if statements.last() != Some(&Statement::Compound) {
                return Err(error_at(source, first, "else clause without a matching if"));
            }
            continue;
        }
        statements.push(statement);
    }
    Ok(statements)
}

/// One statement's worth of tokens plus the column it starts in.
struct LogicalLine<'t, 'src> {
    indent: usize,
    tokens: Vec<&'t Token<'src>>,
}

fn logical_lines<'t, 'src>(
    source: &'src str,
    tokens: &'t [Token<'src>],
) -> Result<Vec<LogicalLine<'t, 'src>>, SyntaxError> {
    let mut lines = Vec::new();
    let mut current: Vec<&Token<'src>> = Vec::new();
    let mut indent = 0;
    let mut open: Vec<&Token<'src>> = Vec::new();

    for token in tokens {
        if token.kind.opens() {
            open.push(token);
        } else if token.kind.closes() && open.pop().is_none() {
            return Err(error_at(source, token, "unmatched closing bracket"));
        }

        let at_boundary = open.is_empty()
            && matches!(token.kind, TokenKind::Newline | TokenKind::Semicolon);
        if at_boundary {
            let after_semicolon = token.kind == TokenKind::Semicolon;
            lines.push(LogicalLine {
                indent,
                tokens: std::mem::take(&mut current),
            });
            if !after_semicolon {
                indent = 0;
            }
            continue;
        }
        if token.kind == TokenKind::Newline {
            continue;
        }
        if current.is_empty() && starts_physical_line(source, token) {
            indent = column(source, token.span.start);
        }
        current.push(token);
    }

    if let Some(unclosed) = open.first() {
        return Err(error_at(source, unclosed, "unclosed bracket"));
    }
    lines.push(LogicalLine {
        indent,
        tokens: current,
    });
    Ok(lines)
}

fn classify(source: &str, tokens: &[&Token<'_>]) -> Result<Statement, SyntaxError> {
    let first = tokens[0];
    match first.kind {
        TokenKind::Def => match tokens.get(1) {
            Some(name) if name.kind == TokenKind::Ident => Ok(Statement::Def {
                name: name.text.to_owned(),
                line: line_of(source, first.span.start),
            }),
            _ => Err(error_at(source, first, "expected a function name after def")),
        },
        TokenKind::Load => {
            if tokens.get(1).is_some_and(|t| t.kind == TokenKind::LParen) {
                Ok(Statement::Load)
            } else {
                Err(error_at(source, first, "expected ( after load"))
            }
        }
        TokenKind::If | TokenKind::For | TokenKind::Elif | TokenKind::Else => {
            Ok(Statement::Compound)
        }
        _ => classify_simple(source, tokens),
    }
}

fn classify_simple(source: &str, tokens: &[&Token<'_>]) -> Result<Statement, SyntaxError> {
    let first = tokens[0];
    if !starts_expression(first.kind) {
        return Err(error_at(
            source,
            first,
            &format!("unexpected {:?} at start of statement", first.text),
        ));
    }

    let mut depth = 0usize;
    for (index, token) in tokens.iter().enumerate() {
        if token.kind.opens() {
            depth += 1;
        } else if token.kind.closes() {
            depth = depth.saturating_sub(1);
        } else if depth == 0 && matches!(token.kind, TokenKind::Assign | TokenKind::AugAssign) {
            let rhs = &tokens[index + 1..];
            if rhs.is_empty() {
                return Err(error_at(source, token, "missing value after assignment"));
            }
            let target = source[first.span.start..token.span.start].trim().to_owned();
            let value = if token.kind == TokenKind::AugAssign {
                Expr::Other("augmented assignment")
            } else {
                expression(rhs)
            };
            return Ok(Statement::Assign {
                target,
                value,
                line: line_of(source, first.span.start),
            });
        }
    }
    Ok(Statement::Expr)
}

/// Reduce an assignment's right-hand side to a string or a shape name.
fn expression(tokens: &[&Token<'_>]) -> Expr {
    let inner = match (tokens.first(), tokens.last()) {
        (Some(open), Some(close))
            if tokens.len() > 2
                && open.kind == TokenKind::LParen
                && close.kind == TokenKind::RParen =>
        {
            &tokens[1..tokens.len() - 1]
        }
        _ => tokens,
    };

    if inner.iter().all(|t| t.kind.is_string()) {
        return Expr::Str(inner.iter().map(|t| string_value(t.text)).collect());
    }
    Expr::Other(match (inner[0].kind, inner.get(1).map(|t| t.kind)) {
        (TokenKind::Number, None) => "number",
        (TokenKind::LBracket, _) => "list",
        (TokenKind::LBrace, _) => "dict",
        (TokenKind::Ident, Some(TokenKind::LParen)) => "call",
        (TokenKind::Ident, None) => "identifier",
        _ => "expression",
    })
}

fn starts_expression(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Ident
            | TokenKind::Number
            | TokenKind::String
            | TokenKind::TripleString
            | TokenKind::LParen
            | TokenKind::LBracket
            | TokenKind::LBrace
            | TokenKind::Operator
    )
}

fn ends_with_block(tokens: &[&Token<'_>]) -> bool {
    matches!(
        tokens.first().map(|t| t.kind),
        Some(TokenKind::Def | TokenKind::If | TokenKind::For | TokenKind::Elif | TokenKind::Else)
    ) && tokens.last().is_some_and(|t| t.kind == TokenKind::Colon)
}

fn starts_physical_line(source: &str, token: &Token<'_>) -> bool {
    source[..token.span.start]
        .rsplit('\n')
        .next()
        .is_none_or(|prefix| prefix.trim().is_empty())
}

fn column(source: &str, offset: usize) -> usize {
    offset - source[..offset].rfind('\n').map_or(0, |newline| newline + 1)
}

fn line_of(source: &str, offset: usize) -> usize {
    source[..offset].matches('\n').count() + 1
}

fn error_at(source: &str, token: &Token<'_>, message: &str) -> SyntaxError {
    SyntaxError {
        line: line_of(source, token.span.start),
        message: message.to_owned(),
    }
}

fn lex_error(source: &str, err: &LexError) -> SyntaxError {
    SyntaxError {
        line: line_of(source, err.offset),
        message: format!("unrecognized input {:?}", err.text),
    }
}

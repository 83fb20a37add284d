//! The restricted boolean grammar of IF comments.
//!
//! An expression is one clause, or clauses joined entirely by `&&` or
//!  entirely by `||`. A clause is `operand op operand` or a single boolean
//!  operand, optionally negated with `!`. There is no grouping.

use std::sync::LazyLock;

use regex::Regex;

pub mod lex;

use lex::{Lexer, Token, TokenType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connector {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
}

impl TryFrom<&Token> for CompareOp {
    type Error = ();
    fn try_from(value: &Token) -> Result<Self, Self::Error> {
        match value.ty {
            TokenType::Equals => Ok(CompareOp::Eq),
            TokenType::NotEquals => Ok(CompareOp::Ne),
            TokenType::GT => Ok(CompareOp::Gt),
            TokenType::LT => Ok(CompareOp::Lt),
            TokenType::GTE => Ok(CompareOp::Ge),
            TokenType::LTE => Ok(CompareOp::Le),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for CompareOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Gt => ">",
            CompareOp::Lt => "<",
            CompareOp::Ge => ">=",
            CompareOp::Le => "<=",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand<'input> {
    Null,
    Bool(bool),
    Text(String),
    /// The literal of `date '...'`; its concrete type comes from the other side.
    Date(&'input str),
    Number(&'input str),
    Path(&'input str),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Clause<'input> {
    Compare {
        left: Operand<'input>,
        op: CompareOp,
        right: Operand<'input>,
    },
    Truth {
        negated: bool,
        operand: Operand<'input>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfExpression<'input> {
    pub connector: Option<Connector>,
    pub clauses: Vec<Clause<'input>>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("empty expression")]
    Empty,
    #[error("{0}")]
    Unsupported(String),
}

fn unsupported(reason: impl Into<String>) -> ParseError {
    ParseError::Unsupported(reason.into())
}

static STRING_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"'(?:[^']|'')*'").expect("valid regex"));
static METHOD_CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z_$][\w$]*\(\)").expect("valid regex"));
static LIST_INDEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(^|[.\s])get\([^()]*\)").expect("valid regex"));
static SINGLE_EQUAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[^=!<>])=(?:$|[^=])").expect("valid regex"));

/// Rejects the forms the grammar deliberately leaves out, before any
///  tokenizing happens.
pub fn validate(expression: &str) -> Result<(), ParseError> {
    if expression.trim().is_empty() {
        return Err(ParseError::Empty);
    }
    if expression.contains("&&") && expression.contains("||") {
        return Err(unsupported("'&&' and '||' cannot be mixed in one expression"));
    }

    let stripped = STRING_LITERAL.replace_all(expression, "''");
    if stripped.contains('"') {
        return Err(unsupported("double-quoted strings are not supported, use '...'"));
    }
    let stripped = METHOD_CALL.replace_all(&stripped, "m");
    // `get(N)` only as a whole segment, `pmb.target(1)` is a call with arguments
    let stripped = LIST_INDEX.replace_all(&stripped, "${1}g");
    if stripped.contains('(') || stripped.contains(')') {
        return Err(unsupported(
            "parentheses are only allowed as 'name()' or 'get(N)'",
        ));
    }
    if stripped.contains("<>") {
        return Err(unsupported("'<>' is not supported, use '!='"));
    }
    if SINGLE_EQUAL.is_match(&stripped) {
        return Err(unsupported("'=' is not supported, use '=='"));
    }
    Ok(())
}

pub fn parse(expression: &str) -> Result<IfExpression<'_>, ParseError> {
    validate(expression)?;

    let mut lexer = Lexer::new(expression);
    let mut tokens = Vec::with_capacity(8);
    while let Some(tok) = lexer
        .next_token()
        .map_err(|e| unsupported(e.to_string()))?
    {
        tokens.push(tok);
    }

    let connector = tokens.iter().find_map(|t| match t.ty {
        TokenType::And => Some(Connector::And),
        TokenType::Or => Some(Connector::Or),
        _ => None,
    });

    let clauses = tokens
        .split(|t| matches!(t.ty, TokenType::And | TokenType::Or))
        .map(|clause| parse_clause(&lexer, clause))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(IfExpression { connector, clauses })
}

fn parse_clause<'input>(
    lexer: &Lexer<'input>,
    tokens: &[Token],
) -> Result<Clause<'input>, ParseError> {
    match tokens {
        [] => Err(unsupported("a connector is missing an operand")),
        [operand] => Ok(Clause::Truth {
            negated: false,
            operand: parse_operand(lexer, operand)?,
        }),
        [not, operand] if not.ty == TokenType::Not => Ok(Clause::Truth {
            negated: true,
            operand: parse_operand(lexer, operand)?,
        }),
        [left, op, right] => {
            let op = CompareOp::try_from(op).map_err(|()| {
                unsupported(format!("'{}' is not a comparison operator", lexer.source_of(op)))
            })?;
            Ok(Clause::Compare {
                left: parse_operand(lexer, left)?,
                op,
                right: parse_operand(lexer, right)?,
            })
        }
        _ => {
            let text: Vec<&str> = tokens.iter().map(|t| lexer.source_of(t)).collect();
            Err(unsupported(format!("cannot read clause '{}'", text.join(" "))))
        }
    }
}

fn parse_operand<'input>(
    lexer: &Lexer<'input>,
    token: &Token,
) -> Result<Operand<'input>, ParseError> {
    match token.ty {
        TokenType::Null => Ok(Operand::Null),
        TokenType::True => Ok(Operand::Bool(true)),
        TokenType::False => Ok(Operand::Bool(false)),
        TokenType::String => Ok(Operand::Text(lexer.contents(token).replace("''", "'"))),
        TokenType::Date => Ok(Operand::Date(lexer.contents(token))),
        TokenType::Number => Ok(Operand::Number(lexer.contents(token))),
        TokenType::Path => Ok(Operand::Path(lexer.contents(token))),
        _ => Err(unsupported(format!(
            "'{}' is not an operand",
            lexer.source_of(token)
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_comparison() {
        let expr = parse("pmb.memberId != null").expect("a valid parse");
        assert_eq!(expr.connector, None);
        assert_eq!(
            expr.clauses,
            vec![Clause::Compare {
                left: Operand::Path("pmb.memberId"),
                op: CompareOp::Ne,
                right: Operand::Null,
            }]
        );
    }

    #[test]
    fn connected_clauses() {
        let expr = parse("pmb.a == 'x''y' && !pmb.isPaging() && pmb.list.get(0) >= -2.5")
            .expect("a valid parse");
        assert_eq!(expr.connector, Some(Connector::And));
        assert_eq!(expr.clauses.len(), 3);
        assert_eq!(
            expr.clauses[0],
            Clause::Compare {
                left: Operand::Path("pmb.a"),
                op: CompareOp::Eq,
                right: Operand::Text("x'y".to_string()),
            }
        );
        assert_eq!(
            expr.clauses[1],
            Clause::Truth {
                negated: true,
                operand: Operand::Path("pmb.isPaging()"),
            }
        );
        assert_eq!(
            expr.clauses[2],
            Clause::Compare {
                left: Operand::Path("pmb.list.get(0)"),
                op: CompareOp::Ge,
                right: Operand::Number("-2.5"),
            }
        );
    }

    #[test]
    fn date_literal() {
        let expr = parse("pmb.birthdate < date '2000-01-01'").expect("a valid parse");
        assert_eq!(
            expr.clauses[0],
            Clause::Compare {
                left: Operand::Path("pmb.birthdate"),
                op: CompareOp::Lt,
                right: Operand::Date("2000-01-01"),
            }
        );
    }

    #[test]
    fn rejected_forms() {
        assert_eq!(parse("  "), Err(ParseError::Empty));
        let unsupported = |e: &str| matches!(parse(e), Err(ParseError::Unsupported(_)));
        assert!(unsupported("pmb.a != null && pmb.b != null || pmb.c != null"));
        assert!(unsupported("(pmb.a != null)"));
        assert!(unsupported("pmb.a == \"x\""));
        assert!(unsupported("pmb.a = 1"));
        assert!(unsupported("pmb.a <> 1"));
        assert!(unsupported("pmb.call(1) == 1"));
        assert!(unsupported("pmb.target(1) == 1"));
        assert!(unsupported("pmb.budget(5) > 0"));
        assert!(unsupported("pmb.a == 1 &&"));
        assert!(unsupported("pmb.a == 1 2"));
        assert!(unsupported("pmb.a ! pmb.b"));
    }

    #[test]
    fn quoted_text_is_not_validated() {
        assert!(parse("pmb.a == '(x) = \"y\" <> z'").is_ok());
    }
}

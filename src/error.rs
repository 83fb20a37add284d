use std::{fmt, sync::Arc};

use crate::parser::AnalyzeError;

/// Which directive raised the error. Only the wording depends on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentKind {
    Bind,
    Embedded,
    For,
    If,
}

impl fmt::Display for CommentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bind => write!(f, "bind variable comment"),
            Self::Embedded => write!(f, "embedded variable comment"),
            Self::For => write!(f, "FOR comment"),
            Self::If => write!(f, "IF comment"),
        }
    }
}

/// Where an error happened: the directive's expression and the SQL it sits in.
///  Nodes build theirs at analysis time and share the SQL text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub expression: Arc<str>,
    pub sql: Arc<str>,
}

impl Location {
    pub fn new(expression: impl Into<Arc<str>>, sql: impl Into<Arc<str>>) -> Self {
        Self {
            expression: expression.into(),
            sql: sql.into(),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\n  expression: {}\n  sql: {}", self.expression, self.sql)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("The property '{property}' of the {kind} was not found on {owner}.{at}")]
    PathNotFound {
        kind: CommentKind,
        property: String,
        owner: String,
        at: Location,
    },

    #[error("Failed to read the property '{property}' of the {kind} on {owner}: {cause}{at}")]
    PathReadFailure {
        kind: CommentKind,
        property: String,
        owner: String,
        cause: String,
        at: Location,
    },

    #[error("The list index in the {kind} is not a number: '{index}'{at}")]
    ListIndexNotNumber {
        kind: CommentKind,
        index: String,
        at: Location,
    },

    #[error("The list index {index} in the {kind} is out of bounds (size {size}){at}")]
    ListIndexOutOfBounds {
        kind: CommentKind,
        index: usize,
        size: usize,
        at: Location,
    },

    #[error("The {kind} resolved to null, which is not allowed here.{at}")]
    NullValueNotAllowed { kind: CommentKind, at: Location },

    #[error("The {kind} expects a list but the value is {actual}.{at}")]
    NotAListOrArray {
        kind: CommentKind,
        actual: String,
        at: Location,
    },

    #[error("The {kind} resolved to an empty list.{at}")]
    EmptyList { kind: CommentKind, at: Location },

    #[error("The {kind} resolved to a list whose elements are all null.{at}")]
    AllNullList { kind: CommentKind, at: Location },

    #[error("The embedded variable value contains a bind symbol '?': {value}{at}")]
    BindSymbolInEmbedded { value: String, at: Location },

    #[error("Illegal parameter bean reference in the {kind}: {reason}{at}")]
    IllegalParameterBeanReference {
        kind: CommentKind,
        reason: String,
        at: Location,
    },

    #[error("The option '{option}' of the {kind} is only allowed inside a FOR comment.{at}")]
    InLoopOptionOutsideLoop {
        kind: CommentKind,
        option: String,
        at: Location,
    },

    #[error("The IF comment has an empty expression.{at}")]
    IfExpressionEmpty { at: Location },

    #[error("The IF comment expression is unsupported: {reason}{at}")]
    IfExpressionUnsupported { reason: String, at: Location },

    #[error("The IF comment compares incompatible types: {left} and {right}{at}")]
    IfTypeMismatch {
        left: String,
        right: String,
        at: Location,
    },

    #[error("The IF comment clause is not a boolean: {value}{at}")]
    IfNotBoolean { value: String, at: Location },

    #[error("The IF comment navigated through null before '{property}'.{at}")]
    IfNullPointer { property: String, at: Location },

    #[error("The date literal '{literal}' cannot be read as {target}.{at}")]
    IfIllegalDateLiteral {
        literal: String,
        target: String,
        at: Location,
    },

    #[error("Embedded SQL nested deeper than {depth} levels.{at}")]
    DynamicBindingTooDeep { depth: usize, at: Location },

    #[error(transparent)]
    Analyze(#[from] AnalyzeError),
}

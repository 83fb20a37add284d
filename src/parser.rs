use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::debug;

use crate::error::Location;
use crate::lex::{Error as LexerError, Lexer, Token, TokenType};
use crate::node::{
    BindVariableNode, ChildList, EmbeddedMode, EmbeddedVariableNode, ForNode, Node, NodeId,
    NodeTree, VariableNode,
};
use crate::option::{InLoopOption, parse_in_loop_options};

/// Settings copied into the nodes when a statement is analyzed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalyzerConfig {
    /// Fail when a scalar bind or embedded comment resolves to null.
    pub block_null_parameter: bool,
    /// Allow `?` inside embedded values.
    pub overlook_native_binding: bool,
    /// How many times an embedded value may itself contain comments.
    pub max_dynamic_depth: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            block_null_parameter: false,
            overlook_native_binding: false,
            max_dynamic_depth: 8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnalyzeError {
    #[error("Lexical error: {0}")]
    Lexical(#[from] LexerError),
    #[error("The END comment for '{comment}' at {position} was not found.")]
    EndCommentNotFound { comment: String, position: usize },
    #[error("Unexpected END comment at {position}")]
    UnexpectedEnd { position: usize },
    #[error("--ELSE at {position} is not directly inside an IF comment")]
    ElseOutsideIf { position: usize },
    #[error("'{marker}' at {position} is only allowed inside a FOR comment")]
    LoopMarkerOutsideFor { marker: String, position: usize },
    #[error("Empty comment at {position}")]
    EmptyComment { position: usize },
    #[error("NEXT at {position} needs a quoted literal: '{comment}'")]
    NextWithoutLiteral { comment: String, position: usize },
    #[error("Unknown option '{option}' in '{comment}' at {position}")]
    UnknownInLoopOption {
        option: String,
        comment: String,
        position: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Block {
    Root,
    If,
    Else,
    Begin,
    For,
    First,
    Last,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Terminator {
    Eof,
    End,
    Else,
}

static CONNECTOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(?:and|or)\s+").expect("valid regex"));

/// Analyzes a 2-way SQL statement into its node tree.
pub fn analyze(sql: &str, config: &AnalyzerConfig) -> Result<NodeTree, AnalyzeError> {
    let mut parser = Parser {
        lexer: Lexer::new(sql),
        tree: NodeTree::new(),
        scratch: Vec::with_capacity(32),
        sql: Arc::from(sql),
        config: *config,
        for_depth: 0,
    };
    let (children, _) = parser.parse_block(Block::Root)?;
    let root = parser.tree.push_node(Node::Root(children));
    parser.tree.set_root(root);

    debug!(nodes = parser.tree.len(), sql_len = sql.len(), "SQL analyzed");
    Ok(parser.tree)
}

struct Parser<'input> {
    lexer: Lexer<'input>,
    tree: NodeTree,
    /// Children of the blocks being parsed. Each block drains its own span
    ///  into the tree before returning, leaving the parent's span on top.
    scratch: Vec<NodeId>,
    sql: Arc<str>,
    config: AnalyzerConfig,
    for_depth: usize,
}

impl<'input> Parser<'input> {
    fn parse_block(&mut self, block: Block) -> Result<(ChildList, Terminator), AnalyzeError> {
        let scratch_start = self.scratch.len();
        let mut first = true;

        let terminator = loop {
            let Some(tok) = self.lexer.next_token()? else {
                break Terminator::Eof;
            };
            match tok.ty {
                TokenType::Sql => {
                    let text = self.lexer.source_of(&tok);
                    let node = match CONNECTOR.find(text) {
                        Some(m) if first && matches!(block, Block::If | Block::Else) => {
                            Node::SqlConnector {
                                connector: m.as_str().to_string(),
                                sql: text[m.end()..].to_string(),
                            }
                        }
                        _ => Node::SqlParts(text.to_string()),
                    };
                    let id = self.tree.push_node(node);
                    self.scratch.push(id);
                }
                TokenType::Else if block == Block::If => break Terminator::Else,
                TokenType::Else => return Err(AnalyzeError::ElseOutsideIf { position: tok.start }),
                TokenType::Comment => {
                    if self.lexer.contents(&tok).trim() == "END" {
                        if block == Block::Root {
                            return Err(AnalyzeError::UnexpectedEnd {
                                position: tok.start,
                            });
                        }
                        break Terminator::End;
                    }
                    let id = self.parse_comment(&tok)?;
                    self.scratch.push(id);
                }
            }
            first = false;
        };

        let children = self
            .tree
            .push_children(self.scratch.drain(scratch_start..));
        Ok((children, terminator))
    }

    /// Parses a block that has to be closed by `/*END*/`.
    fn parse_closed_block(
        &mut self,
        block: Block,
        tok: &Token,
    ) -> Result<(ChildList, Terminator), AnalyzeError> {
        let (children, terminator) = self.parse_block(block)?;
        if terminator == Terminator::Eof {
            return Err(AnalyzeError::EndCommentNotFound {
                comment: self.lexer.contents(tok).trim().to_string(),
                position: tok.start,
            });
        }
        Ok((children, terminator))
    }

    fn parse_comment(&mut self, tok: &Token) -> Result<NodeId, AnalyzeError> {
        let contents = self.lexer.contents(tok).trim();
        if contents.is_empty() {
            return Err(AnalyzeError::EmptyComment {
                position: tok.start,
            });
        }

        if let Some(expression) = strip_keyword(contents, "IF") {
            let (children, terminator) = self.parse_closed_block(Block::If, tok)?;
            let else_node = if terminator == Terminator::Else {
                let (else_children, _) = self.parse_closed_block(Block::Else, tok)?;
                Some(self.tree.push_node(Node::Else(else_children)))
            } else {
                None
            };
            return Ok(self.tree.push_node(Node::If {
                at: Location::new(expression, Arc::clone(&self.sql)),
                children,
                else_node,
            }));
        }

        if contents == "BEGIN" {
            let (children, _) = self.parse_closed_block(Block::Begin, tok)?;
            return Ok(self.tree.push_node(Node::Begin(children)));
        }

        if let Some(expression) = strip_keyword(contents, "FOR") {
            let variable = self.variable(expression, "", contents, tok)?;
            self.for_depth += 1;
            let block = self.parse_closed_block(Block::For, tok);
            self.for_depth -= 1;
            let (children, _) = block?;
            return Ok(self.tree.push_node(Node::For(ForNode::new(variable, children))));
        }

        if contents == "FIRST" || contents == "LAST" {
            self.require_loop(contents, tok)?;
            let block = if contents == "FIRST" {
                Block::First
            } else {
                Block::Last
            };
            let (children, _) = self.parse_closed_block(block, tok)?;
            let node = if block == Block::First {
                Node::LoopFirst(children)
            } else {
                Node::LoopLast(children)
            };
            return Ok(self.tree.push_node(node));
        }

        if strip_keyword(contents, "NEXT").is_some() {
            self.require_loop("NEXT", tok)?;
            let literal = strip_keyword(contents, "NEXT")
                .and_then(|rest| rest.strip_prefix('\''))
                .and_then(|rest| rest.strip_suffix('\''))
                .ok_or_else(|| AnalyzeError::NextWithoutLiteral {
                    comment: contents.to_string(),
                    position: tok.start,
                })?;
            return Ok(self
                .tree
                .push_node(Node::LoopNext(literal.replace("''", "'"))));
        }

        let test_value = self.lexer.skip_test_value()?;
        if let Some(embedded) = contents.strip_prefix('$') {
            let (mode, expression) = match embedded.strip_prefix('$') {
                Some(expression) => (EmbeddedMode::ReplaceOnly, expression),
                None => match embedded.strip_suffix('.') {
                    Some(expression) => (EmbeddedMode::TerminalDot, expression),
                    None if test_value.starts_with('.') => (EmbeddedMode::TerminalDot, embedded),
                    None => (EmbeddedMode::Normal, embedded),
                },
            };
            let variable = self.variable(expression, test_value, contents, tok)?;
            return Ok(self
                .tree
                .push_node(Node::Embedded(EmbeddedVariableNode::new(variable, mode))));
        }

        let variable = self.variable(contents, test_value, contents, tok)?;
        Ok(self
            .tree
            .push_node(Node::Bind(BindVariableNode::new(variable))))
    }

    /// Splits `path:option|option` and builds the shared variable part.
    fn variable(
        &self,
        expression: &str,
        test_value: &str,
        comment: &str,
        tok: &Token,
    ) -> Result<VariableNode, AnalyzeError> {
        let (path, options) = match expression.split_once(':') {
            Some((path, def)) => (path.trim(), self.in_loop_options(def, comment, tok)?),
            None => (expression.trim(), Vec::new()),
        };
        if path.is_empty() {
            return Err(AnalyzeError::EmptyComment {
                position: tok.start,
            });
        }
        Ok(VariableNode::new(
            path,
            test_value,
            options,
            Location::new(comment, Arc::clone(&self.sql)),
            self.config,
        ))
    }

    fn in_loop_options(
        &self,
        def: &str,
        comment: &str,
        tok: &Token,
    ) -> Result<Vec<InLoopOption>, AnalyzeError> {
        parse_in_loop_options(def).map_err(|option| AnalyzeError::UnknownInLoopOption {
            option,
            comment: comment.to_string(),
            position: tok.start,
        })
    }

    fn require_loop(&self, marker: &str, tok: &Token) -> Result<(), AnalyzeError> {
        if self.for_depth == 0 {
            return Err(AnalyzeError::LoopMarkerOutsideFor {
                marker: marker.to_string(),
                position: tok.start,
            });
        }
        Ok(())
    }
}

/// `IF pmb.x != null` → `pmb.x != null`. The keyword must stand alone or be
///  followed by whitespace, so `IFFY` stays a bind comment.
fn strip_keyword<'a>(contents: &'a str, keyword: &str) -> Option<&'a str> {
    let rest = contents.strip_prefix(keyword)?;
    if rest.is_empty() || rest.starts_with(|c: char| c.is_ascii_whitespace()) {
        Some(rest.trim())
    } else {
        None
    }
}

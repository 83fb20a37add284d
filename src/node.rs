use tracing::trace;

use crate::{
    context::EmissionContext,
    error::{Error, Location},
    evaluate::IfCommentEvaluator,
    loop_info::LoopInfo,
};

mod bind;
mod embedded;
mod for_loop;
mod variable;

pub use bind::BindVariableNode;
pub use embedded::{EmbeddedMode, EmbeddedVariableNode};
pub use for_loop::ForNode;
pub use variable::VariableNode;

/// The first path segment that stands for the element of the enclosing loop.
pub const CURRENT_VARIABLE: &str = "#current";

#[derive(Debug, Clone)]
pub enum Node {
    Root(ChildList),
    SqlParts(String),
    /// `and `/`or ` opening an IF or ELSE block, dropped when it would
    ///  start the output of a BEGIN block.
    SqlConnector {
        connector: String,
        sql: String,
    },
    Bind(BindVariableNode),
    Embedded(EmbeddedVariableNode),
    If {
        at: Location,
        children: ChildList,
        else_node: Option<NodeId>,
    },
    Else(ChildList),
    Begin(ChildList),
    For(ForNode),
    LoopFirst(ChildList),
    LoopNext(String),
    LoopLast(ChildList),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeId(usize);

/// A contiguous span of [NodeTree::child_lists], the same trick the
///  expression parser uses for argument lists.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ChildList {
    start: usize,
    len: usize,
}

impl ChildList {
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// The analyzed form of one 2-way SQL statement.
///
/// Nodes are packed into a flat array and refer to each other by [NodeId];
///  child lists are stored contiguously in [child_lists]. A built tree is
///  never mutated, so one tree can serve any number of concurrent builds:
///  all per-build state lives in the [EmissionContext] and the [LoopInfo]
///  frames passed down by [accept].
#[derive(Debug, Clone)]
pub struct NodeTree {
    nodes: Vec<Node>,
    child_lists: Vec<NodeId>,
    root: NodeId,
}

impl NodeTree {
    pub(crate) fn new() -> Self {
        Self {
            nodes: Vec::with_capacity(32),
            child_lists: Vec::with_capacity(32),
            root: NodeId(0),
        }
    }

    pub(crate) fn push_node(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    pub(crate) fn push_children(&mut self, ids: impl ExactSizeIterator<Item = NodeId>) -> ChildList {
        let start = self.child_lists.len();
        let len = ids.len();
        self.child_lists.extend(ids);
        ChildList { start, len }
    }

    pub(crate) fn set_root(&mut self, root: NodeId) {
        self.root = root;
    }

    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    #[inline]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    #[inline]
    pub fn get_unchecked(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    #[inline]
    pub fn children(&self, list: &ChildList) -> &[NodeId] {
        &self.child_lists[list.start..list.start + list.len]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn accept(&self, ctx: &mut EmissionContext<'_>) -> Result<(), Error> {
        self.accept_node(self.root, ctx, None)
    }

    pub(crate) fn accept_children(
        &self,
        list: &ChildList,
        ctx: &mut EmissionContext<'_>,
        loop_info: Option<&LoopInfo<'_>>,
    ) -> Result<(), Error> {
        for id in self.children(list) {
            self.accept_node(*id, ctx, loop_info)?;
        }
        Ok(())
    }

    pub(crate) fn accept_node(
        &self,
        id: NodeId,
        ctx: &mut EmissionContext<'_>,
        loop_info: Option<&LoopInfo<'_>>,
    ) -> Result<(), Error> {
        match self.get_unchecked(id) {
            Node::Root(children) => self.accept_children(children, ctx, loop_info),
            Node::SqlParts(sql) => {
                ctx.add_sql(sql);
                Ok(())
            }
            Node::SqlConnector { connector, sql } => {
                if ctx.is_begin_child() && !ctx.is_enabled() && !ctx.is_already_skipped_connector()
                {
                    ctx.set_already_skipped_connector(true);
                } else {
                    ctx.add_sql(connector);
                }
                ctx.add_sql(sql);
                Ok(())
            }
            Node::Bind(node) => node.accept(ctx, loop_info),
            Node::Embedded(node) => node.accept(ctx, loop_info),
            Node::If {
                at,
                children,
                else_node,
            } => {
                let result = IfCommentEvaluator::new(at, ctx.args(), loop_info).evaluate()?;
                if result {
                    self.accept_children(children, ctx, loop_info)?;
                    ctx.set_enabled(true);
                } else if let Some(else_node) = else_node {
                    self.accept_node(*else_node, ctx, loop_info)?;
                }
                Ok(())
            }
            Node::Else(children) => {
                self.accept_children(children, ctx, loop_info)?;
                ctx.set_enabled(true);
                Ok(())
            }
            Node::Begin(children) => {
                let mut child = ctx.child_for_begin();
                self.accept_children(children, &mut child, loop_info)?;
                if child.is_enabled() {
                    ctx.merge(child);
                    ctx.set_enabled(true);
                }
                Ok(())
            }
            Node::For(node) => node.accept(self, ctx, loop_info),
            Node::LoopFirst(children) => {
                if loop_info.is_some_and(LoopInfo::is_first) {
                    self.accept_children(children, ctx, loop_info)?;
                    ctx.set_enabled(true);
                }
                Ok(())
            }
            Node::LoopNext(sql) => {
                if loop_info.is_some_and(|info| !info.is_first()) {
                    trace!(sql = %sql, "NEXT marker emitted");
                    ctx.add_sql(sql);
                    ctx.set_enabled(true);
                }
                Ok(())
            }
            Node::LoopLast(children) => {
                if loop_info.is_some_and(LoopInfo::is_last) {
                    self.accept_children(children, ctx, loop_info)?;
                    ctx.set_enabled(true);
                }
                Ok(())
            }
        }
    }

    pub fn print_tree(&self, id: NodeId, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        self.print_node(id, 0, f)
    }

    fn print_children(
        &self,
        list: &ChildList,
        depth: usize,
        f: &mut std::fmt::Formatter,
    ) -> std::fmt::Result {
        for id in self.children(list) {
            self.print_node(*id, depth, f)?;
        }
        Ok(())
    }

    fn print_node(&self, id: NodeId, depth: usize, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let indent = depth * 2;
        match self.get_unchecked(id) {
            Node::Root(children) => {
                writeln!(f, "{:indent$}Root", "")?;
                self.print_children(children, depth + 1, f)
            }
            Node::SqlParts(sql) => writeln!(f, "{:indent$}Sql({sql:?})", ""),
            Node::SqlConnector { connector, sql } => {
                writeln!(f, "{:indent$}Connector({connector:?}, {sql:?})", "")
            }
            Node::Bind(node) => writeln!(
                f,
                "{:indent$}Bind({}, test={:?})",
                "",
                node.variable().expression(),
                node.variable().test_value()
            ),
            Node::Embedded(node) => writeln!(
                f,
                "{:indent$}Embedded({}, {:?}, test={:?})",
                "",
                node.variable().expression(),
                node.mode(),
                node.variable().test_value()
            ),
            Node::If {
                at,
                children,
                else_node,
            } => {
                writeln!(f, "{:indent$}If({})", "", at.expression)?;
                self.print_children(children, depth + 1, f)?;
                match else_node {
                    Some(else_node) => self.print_node(*else_node, depth, f),
                    None => Ok(()),
                }
            }
            Node::Else(children) => {
                writeln!(f, "{:indent$}Else", "")?;
                self.print_children(children, depth + 1, f)
            }
            Node::Begin(children) => {
                writeln!(f, "{:indent$}Begin", "")?;
                self.print_children(children, depth + 1, f)
            }
            Node::For(node) => {
                writeln!(f, "{:indent$}For({})", "", node.variable().expression())?;
                self.print_children(node.children(), depth + 1, f)
            }
            Node::LoopFirst(children) => {
                writeln!(f, "{:indent$}First", "")?;
                self.print_children(children, depth + 1, f)
            }
            Node::LoopNext(sql) => writeln!(f, "{:indent$}Next({sql:?})", ""),
            Node::LoopLast(children) => {
                writeln!(f, "{:indent$}Last", "")?;
                self.print_children(children, depth + 1, f)
            }
        }
    }
}

pub struct TreePrinter<'a>(pub &'a NodeTree);

impl std::fmt::Display for TreePrinter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.print_tree(self.0.root(), f)
    }
}

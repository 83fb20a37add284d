use tracing::trace;

use super::{ChildList, NodeTree, VariableNode};
use crate::{
    context::EmissionContext,
    error::{CommentKind, Error},
    loop_info::LoopInfo,
    value::Value,
};

/// `/*FOR pmb.memberNameList*/ ... /*END*/`: accepts its children once per
///  element, each time with a [LoopInfo] pointing at that element.
///
/// A null list, or a null anywhere on the way to it, means no iterations.
///  `/*FOR #current*/` iterates the element of the enclosing loop, which must
///  then be a list itself.
#[derive(Debug, Clone)]
pub struct ForNode {
    variable: VariableNode,
    children: ChildList,
}

impl ForNode {
    pub(crate) fn new(variable: VariableNode, children: ChildList) -> Self {
        Self { variable, children }
    }

    pub fn variable(&self) -> &VariableNode {
        &self.variable
    }

    pub fn children(&self) -> &ChildList {
        &self.children
    }

    pub fn accept(
        &self,
        tree: &NodeTree,
        ctx: &mut EmissionContext<'_>,
        loop_info: Option<&LoopInfo<'_>>,
    ) -> Result<(), Error> {
        let bound = self.variable.resolve(ctx, loop_info, CommentKind::For)?;
        let elements = match &bound.target_value {
            Value::Null => return Ok(()),
            Value::List(elements) => elements,
            other => {
                return Err(Error::NotAListOrArray {
                    kind: CommentKind::For,
                    actual: other.type_name(),
                    at: self.variable.location().clone(),
                });
            }
        };
        if elements.is_empty() {
            return Ok(());
        }

        let mut info = LoopInfo::new(
            self.variable.expression(),
            elements,
            bound.filtering_option.clone(),
            loop_info,
        );
        for index in 0..elements.len() {
            info.set_index(index);
            trace!(
                expression = info.expression(),
                index,
                size = info.size(),
                depth = info.depth(),
                "FOR iteration"
            );
            tree.accept_children(&self.children, ctx, Some(&info))?;
        }
        ctx.set_enabled(true);
        Ok(())
    }
}

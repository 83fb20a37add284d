use std::sync::Arc;

use crate::{option::FilteringBindOption, value::Value};

/// One frame of the FOR-loop stack. Frames live on the call stack of the FOR
///  node that owns them; nested loops link to their enclosing frame.
#[derive(Debug, Clone)]
pub struct LoopInfo<'a> {
    expression: &'a str,
    elements: &'a [Value],
    index: usize,
    filtering_option: Option<Arc<dyn FilteringBindOption>>,
    parent: Option<&'a LoopInfo<'a>>,
}

impl<'a> LoopInfo<'a> {
    pub fn new(
        expression: &'a str,
        elements: &'a [Value],
        filtering_option: Option<Arc<dyn FilteringBindOption>>,
        parent: Option<&'a LoopInfo<'a>>,
    ) -> Self {
        Self {
            expression,
            elements,
            index: 0,
            filtering_option,
            parent,
        }
    }

    pub fn expression(&self) -> &'a str {
        self.expression
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.elements.len()
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    pub(crate) fn set_index(&mut self, index: usize) {
        debug_assert!(index < self.elements.len());
        self.index = index;
    }

    pub fn is_first(&self) -> bool {
        self.index == 0
    }

    pub fn is_last(&self) -> bool {
        self.index + 1 == self.size()
    }

    pub fn current_element(&self) -> &'a Value {
        &self.elements[self.index]
    }

    pub fn filtering_option(&self) -> Option<&Arc<dyn FilteringBindOption>> {
        self.filtering_option.as_ref()
    }

    pub fn parent(&self) -> Option<&'a LoopInfo<'a>> {
        self.parent
    }

    /// Number of enclosing frames including this one.
    pub fn depth(&self) -> usize {
        1 + self.parent.map_or(0, LoopInfo::depth)
    }
}

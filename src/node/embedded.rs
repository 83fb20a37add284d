use tracing::trace;

use super::VariableNode;
use crate::{
    context::EmissionContext,
    error::{CommentKind, Error},
    loop_info::LoopInfo,
    parser::analyze,
    value::Value,
};

/// How the test value after an embedded comment is treated once the value
///  has been written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddedMode {
    /// `/*$pmb.schema*/DEFAULT_SCHEMA`: the test value is dropped.
    Normal,
    /// `/*$$pmb.prefix*/SCHEMA.`: the test value is written verbatim after it.
    ReplaceOnly,
    /// `/*$pmb.schema.*/MAIN.MEMBER` or `/*$pmb.schema*/.MEMBER`: the test value
    ///  is kept from its first `.`.
    TerminalDot,
}

/// Writes the resolved value into the SQL text itself.
#[derive(Debug, Clone)]
pub struct EmbeddedVariableNode {
    variable: VariableNode,
    mode: EmbeddedMode,
}

impl EmbeddedVariableNode {
    pub(crate) fn new(variable: VariableNode, mode: EmbeddedMode) -> Self {
        Self { variable, mode }
    }

    pub fn variable(&self) -> &VariableNode {
        &self.variable
    }

    pub fn mode(&self) -> EmbeddedMode {
        self.mode
    }

    /// A quoted test value marks a string literal position: `'/*$pmb.name*/'x''`
    ///  is written as `/*$pmb.name*/'x'`.
    fn is_quoted(&self) -> bool {
        let test_value = self.variable.test_value();
        if self.variable.is_in_scope() {
            test_value[1..].trim_start().starts_with('\'')
        } else {
            test_value.starts_with('\'')
        }
    }

    pub fn accept(
        &self,
        ctx: &mut EmissionContext<'_>,
        loop_info: Option<&LoopInfo<'_>>,
    ) -> Result<(), Error> {
        let mut bound = self
            .variable
            .resolve(ctx, loop_info, CommentKind::Embedded)?;
        let quoted = self.is_quoted();

        if self.variable.is_in_scope() {
            let elements = self
                .variable
                .in_scope_elements(&bound.target_value, CommentKind::Embedded)?;
            ctx.add_sql("(");
            for (i, element) in elements.into_iter().enumerate() {
                if i > 0 {
                    ctx.add_sql(", ");
                }
                let text = element.to_string();
                self.check_bind_symbol(&text)?;
                ctx.add_sql(&quote(&text, quoted));
            }
            ctx.add_sql(")");
            return self.echo_test_value(ctx);
        }

        if bound.target_value.is_null() && self.variable.config().block_null_parameter {
            return Err(Error::NullValueNotAllowed {
                kind: CommentKind::Embedded,
                at: self.variable.location().clone(),
            });
        }

        bound.filter_value_by_option();
        match &bound.target_value {
            Value::Null => ctx.add_sql("null"),
            Value::Text(text) => {
                self.check_bind_symbol(text)?;
                if text.contains("/*") && text.contains("*/") {
                    self.accept_dynamic(text, ctx, loop_info)?;
                } else {
                    ctx.add_sql(&quote(text, quoted));
                }
            }
            other => ctx.add_sql(&quote(&other.to_string(), quoted)),
        }
        if let Some(rear_option) = bound.rear_option_sql() {
            ctx.add_sql(&rear_option);
        }
        self.echo_test_value(ctx)
    }

    fn check_bind_symbol(&self, text: &str) -> Result<(), Error> {
        if text.contains('?') && !self.variable.config().overlook_native_binding {
            return Err(Error::BindSymbolInEmbedded {
                value: text.to_string(),
                at: self.variable.location().clone(),
            });
        }
        Ok(())
    }

    /// A value that carries comments of its own is analyzed and built as a
    ///  nested statement, its binds spliced into the parent's.
    fn accept_dynamic(
        &self,
        sql: &str,
        ctx: &mut EmissionContext<'_>,
        loop_info: Option<&LoopInfo<'_>>,
    ) -> Result<(), Error> {
        let config = self.variable.config();
        if ctx.dynamic_depth() >= config.max_dynamic_depth {
            return Err(Error::DynamicBindingTooDeep {
                depth: config.max_dynamic_depth,
                at: self.variable.location().clone(),
            });
        }
        let tree = analyze(sql, config)?;
        trace!(expression = self.variable.expression(), nodes = tree.len(), "dynamic SQL embedded");

        let mut child = ctx.child_for_dynamic();
        tree.accept_node(tree.root(), &mut child, loop_info)?;
        if child.is_enabled() {
            ctx.set_enabled(true);
        }
        ctx.merge(child);
        Ok(())
    }

    fn echo_test_value(&self, ctx: &mut EmissionContext<'_>) -> Result<(), Error> {
        let test_value = self.variable.test_value();
        match self.mode {
            EmbeddedMode::Normal => {}
            EmbeddedMode::ReplaceOnly => ctx.add_sql(test_value),
            EmbeddedMode::TerminalDot => {
                if let Some(dot) = test_value.find('.') {
                    ctx.add_sql(&test_value[dot..]);
                }
            }
        }
        Ok(())
    }
}

fn quote(text: &str, quoted: bool) -> String {
    if quoted {
        format!("'{}'", text.replace('\'', "''"))
    } else {
        text.to_string()
    }
}

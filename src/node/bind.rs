use super::VariableNode;
use crate::{
    context::EmissionContext,
    error::{CommentKind, Error},
    loop_info::LoopInfo,
};

/// `/*pmb.memberId*/3`: one `?` and one bind value, or `(?, ?, ?)` for an
///  in-scope comment such as `/*pmb.memberIds*/(1, 2)`.
#[derive(Debug, Clone)]
pub struct BindVariableNode {
    variable: VariableNode,
}

impl BindVariableNode {
    pub(crate) fn new(variable: VariableNode) -> Self {
        Self { variable }
    }

    pub fn variable(&self) -> &VariableNode {
        &self.variable
    }

    pub fn accept(
        &self,
        ctx: &mut EmissionContext<'_>,
        loop_info: Option<&LoopInfo<'_>>,
    ) -> Result<(), Error> {
        let mut bound = self.variable.resolve(ctx, loop_info, CommentKind::Bind)?;

        if self.variable.is_in_scope() {
            let elements = self
                .variable
                .in_scope_elements(&bound.target_value, CommentKind::Bind)?;
            ctx.add_sql("(");
            for (i, element) in elements.into_iter().enumerate() {
                if i > 0 {
                    ctx.add_sql(", ");
                }
                ctx.add_bind_variable(element.clone(), element.value_type());
            }
            ctx.add_sql(")");
            return Ok(());
        }

        if bound.target_value.is_null() && self.variable.config().block_null_parameter {
            return Err(Error::NullValueNotAllowed {
                kind: CommentKind::Bind,
                at: self.variable.location().clone(),
            });
        }

        bound.filter_value_by_option();
        let rear_option = bound.rear_option_sql();
        ctx.add_bind_variable(bound.target_value, bound.target_type);
        if let Some(rear_option) = rear_option {
            ctx.add_sql(&rear_option);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        context::Arguments,
        error::Location,
        parser::AnalyzerConfig,
        value::{SimpleBean, Value, ValueType},
    };

    fn bind(expression: &str, test_value: &str, config: AnalyzerConfig) -> BindVariableNode {
        BindVariableNode::new(VariableNode::new(
            expression,
            test_value,
            vec![],
            Location::new(expression, "select 1"),
            config,
        ))
    }

    fn args() -> Arguments {
        Arguments::pmb(
            SimpleBean::new("MemberPmb")
                .with("memberId", 7)
                .with_typed("memberName", Value::Null, ValueType::Text)
                .with("ids", vec![1, 2, 3]),
        )
    }

    #[test]
    fn scalar() {
        let args = args();
        let mut ctx = EmissionContext::new(&args);
        bind("pmb.memberId", "3", AnalyzerConfig::default())
            .accept(&mut ctx, None)
            .unwrap();
        assert_eq!(ctx.sql(), "?");
        assert_eq!(ctx.binds()[0].value, Value::Int(7));
        assert_eq!(ctx.binds()[0].value_type, Some(ValueType::Int));
    }

    #[test]
    fn null_keeps_its_declared_type() {
        let args = args();
        let mut ctx = EmissionContext::new(&args);
        bind("pmb.memberName", "'x'", AnalyzerConfig::default())
            .accept(&mut ctx, None)
            .unwrap();
        assert_eq!(ctx.binds()[0].value, Value::Null);
        assert_eq!(ctx.binds()[0].value_type, Some(ValueType::Text));
    }

    #[test]
    fn blocked_null() {
        let args = args();
        let mut ctx = EmissionContext::new(&args);
        let config = AnalyzerConfig {
            block_null_parameter: true,
            ..Default::default()
        };
        let err = bind("pmb.memberName", "'x'", config)
            .accept(&mut ctx, None)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::NullValueNotAllowed {
                kind: CommentKind::Bind,
                ..
            }
        ));
    }

    #[test]
    fn in_scope() {
        let args = args();
        let mut ctx = EmissionContext::new(&args);
        bind("pmb.ids", "(1, 2)", AnalyzerConfig::default())
            .accept(&mut ctx, None)
            .unwrap();
        assert_eq!(ctx.sql(), "(?, ?, ?)");
        let values: Vec<_> = ctx.binds().iter().map(|b| b.value.clone()).collect();
        assert_eq!(values, vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
    }
}

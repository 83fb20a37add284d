use crate::{
    bound::BoundValue,
    context::EmissionContext,
    error::{CommentKind, Error, Location},
    loop_info::LoopInfo,
    option::{InLoopOption, is_not_like, like_mode_of},
    parser::AnalyzerConfig,
    tracer::{BoundValueTracer, resolve_root},
    value::Value,
};

/// What bind, embedded and FOR comments have in common: a property path,
///  the test value that followed the comment, and in-loop options.
#[derive(Debug, Clone)]
pub struct VariableNode {
    expression: String,
    names: Vec<String>,
    test_value: String,
    options: Vec<InLoopOption>,
    at: Location,
    config: AnalyzerConfig,
}

impl VariableNode {
    pub(crate) fn new(
        expression: &str,
        test_value: &str,
        options: Vec<InLoopOption>,
        at: Location,
        config: AnalyzerConfig,
    ) -> Self {
        Self {
            expression: expression.to_string(),
            names: expression.split('.').map(str::to_string).collect(),
            test_value: test_value.to_string(),
            options,
            at,
            config,
        }
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn test_value(&self) -> &str {
        &self.test_value
    }

    pub fn options(&self) -> &[InLoopOption] {
        &self.options
    }

    pub fn location(&self) -> &Location {
        &self.at
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// A parenthesized test value asks for a collection: `in /*pmb.ids*/(1, 2)`.
    pub fn is_in_scope(&self) -> bool {
        self.test_value.starts_with('(') && self.test_value.ends_with(')')
    }

    /// Resolves the path and settles the filtering option, without applying it.
    pub(crate) fn resolve(
        &self,
        ctx: &EmissionContext<'_>,
        loop_info: Option<&LoopInfo<'_>>,
        kind: CommentKind,
    ) -> Result<BoundValue, Error> {
        let root = resolve_root(&self.names[0], ctx.args(), loop_info, kind, &self.at)?;
        let mut bound = BoundValue::new(root.value, root.value_type);
        BoundValueTracer::new(&self.names, kind, &self.at).trace(&mut bound)?;

        if is_not_like(&self.options) {
            if loop_info.is_none() {
                return Err(Error::InLoopOptionOutsideLoop {
                    kind,
                    option: InLoopOption::NotLike.name().to_string(),
                    at: self.at.clone(),
                });
            }
            bound.clear_filtering_option();
        } else if let Some(mode) = like_mode_of(&self.options) {
            bound.apply_like_mode(mode);
        } else if root.from_loop {
            bound.inherit_like_search_option_if_needed(loop_info);
        }
        Ok(bound)
    }

    /// The non-null elements of an in-scope value, after the checks every
    ///  in-scope comment shares.
    pub(crate) fn in_scope_elements<'v>(
        &self,
        value: &'v Value,
        kind: CommentKind,
    ) -> Result<Vec<&'v Value>, Error> {
        let items = match value {
            Value::Null => {
                return Err(Error::NullValueNotAllowed {
                    kind,
                    at: self.at.clone(),
                });
            }
            Value::List(items) => items,
            other => {
                return Err(Error::NotAListOrArray {
                    kind,
                    actual: other.type_name(),
                    at: self.at.clone(),
                });
            }
        };
        if items.is_empty() {
            return Err(Error::EmptyList {
                kind,
                at: self.at.clone(),
            });
        }
        let present: Vec<&Value> = items.iter().filter(|v| !v.is_null()).collect();
        if present.is_empty() {
            return Err(Error::AllNullList {
                kind,
                at: self.at.clone(),
            });
        }
        Ok(present)
    }
}

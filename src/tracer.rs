use crate::{
    bound::BoundValue,
    context::Arguments,
    error::{CommentKind, Error, Location},
    loop_info::LoopInfo,
    node::CURRENT_VARIABLE,
    value::{LIKE_SEARCH_OPTION_SUFFIX, Value, ValueType},
};

/// Where the first segment of a path came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Root {
    pub value: Value,
    pub value_type: Option<ValueType>,
    /// True when the path starts at the current loop element.
    pub from_loop: bool,
}

/// Resolves the first segment of a directive path: either the current loop
///  element (`#current`) or a named argument.
pub fn resolve_root(
    first: &str,
    args: &Arguments,
    loop_info: Option<&LoopInfo>,
    kind: CommentKind,
    at: &Location,
) -> Result<Root, Error> {
    let illegal = |reason: String| Error::IllegalParameterBeanReference {
        kind,
        reason,
        at: at.clone(),
    };

    if first == CURRENT_VARIABLE {
        let Some(info) = loop_info else {
            return Err(illegal(format!(
                "'{CURRENT_VARIABLE}' can only be used inside a FOR comment"
            )));
        };
        let value = info.current_element().clone();
        let value_type = value.value_type();
        return Ok(Root {
            value,
            value_type,
            from_loop: true,
        });
    }

    if !is_valid_root_name(first) {
        return Err(illegal(format!("malformed root name '{first}'")));
    }

    if let Some(value) = args.get(first) {
        return Ok(Root {
            value: value.clone(),
            value_type: value.value_type().or_else(|| args.get_type(first).cloned()),
            from_loop: false,
        });
    }

    if let Some(bean_name) = args.parameter_bean_name() {
        return Err(illegal(format!(
            "'{first}' is not an argument, the parameter bean is named '{bean_name}'"
        )));
    }

    // Unknown names without a parameter bean to confuse them with are null
    Ok(Root {
        value: Value::Null,
        value_type: None,
        from_loop: false,
    })
}

fn is_valid_root_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

/// `get(N)` segments: returns the text between the parentheses.
pub fn list_index_argument(segment: &str) -> Option<&str> {
    segment.strip_prefix("get(")?.strip_suffix(')')
}

/// One step of property navigation shared by the directive tracer and the
///  IF evaluator. Returns the next value and, when known, its declared type.
pub fn step(
    current: &Value,
    segment: &str,
    kind: CommentKind,
    at: &Location,
) -> Result<(Value, Option<ValueType>), Error> {
    match current {
        Value::Bean(bean) => {
            if let Some(read) = bean.property(segment) {
                let value = read.map_err(|cause| Error::PathReadFailure {
                    kind,
                    property: segment.to_string(),
                    owner: bean.type_name().to_string(),
                    cause,
                    at: at.clone(),
                })?;
                let value_type = value.value_type().or_else(|| bean.property_type(segment));
                return Ok((value, value_type));
            }
        }
        Value::Params(map) => {
            // A missing key in the wrapper is null downstream
            let value = map.get(segment).cloned().unwrap_or(Value::Null);
            let value_type = value.value_type();
            return Ok((value, value_type));
        }
        Value::Map(map) => {
            let value = map.get(segment).cloned().unwrap_or(Value::Null);
            let value_type = value.value_type();
            return Ok((value, value_type));
        }
        _ => {}
    }

    if let (Value::List(items), Some(index)) = (current, list_index_argument(segment)) {
        let index: usize = index.trim().parse().map_err(|_| Error::ListIndexNotNumber {
            kind,
            index: index.to_string(),
            at: at.clone(),
        })?;
        let value = items
            .get(index)
            .cloned()
            .ok_or_else(|| Error::ListIndexOutOfBounds {
                kind,
                index,
                size: items.len(),
                at: at.clone(),
            })?;
        let value_type = value.value_type();
        return Ok((value, value_type));
    }

    Err(Error::PathNotFound {
        kind,
        property: segment.to_string(),
        owner: current.type_name(),
        at: at.clone(),
    })
}

/// Walks the remaining segments of a directive path from an already resolved
///  root, collecting LIKE-search options found along the way.
pub struct BoundValueTracer<'a> {
    names: &'a [String],
    kind: CommentKind,
    at: &'a Location,
}

impl<'a> BoundValueTracer<'a> {
    /// `names` includes the root segment, which is skipped.
    pub fn new(names: &'a [String], kind: CommentKind, at: &'a Location) -> Self {
        Self { names, kind, at }
    }

    pub fn trace(&self, bound: &mut BoundValue) -> Result<(), Error> {
        let mut value = bound.target_value.clone();
        let mut value_type = bound.target_type.clone();

        for segment in self.names.iter().skip(1) {
            if value.is_null() {
                // Permissive: the rest of the path is null too
                value_type = None;
                break;
            }

            if let Value::Bean(bean) = &value
                && let Some(option) =
                    bean.filtering_option(&format!("{segment}{LIKE_SEARCH_OPTION_SUFFIX}"))
            {
                bound.filtering_option = Some(option);
            }

            (value, value_type) = step(&value, segment, self.kind, self.at)?;
        }

        bound.target_value = value;
        bound.target_type = value_type;
        Ok(())
    }
}

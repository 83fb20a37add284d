use indexmap::IndexMap;

use crate::value::{Value, ValueType};

/// The named arguments a statement is built against, usually a single
///  parameter bean under `pmb`.
#[derive(Debug, Clone, Default)]
pub struct Arguments {
    values: IndexMap<String, (Value, Option<ValueType>)>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for the usual single parameter bean named `pmb`.
    pub fn pmb(value: impl Into<Value>) -> Self {
        Self::new().with("pmb", value)
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Declares the argument type explicitly, so a null argument still has one.
    pub fn with_typed(
        mut self,
        name: impl Into<String>,
        value: impl Into<Value>,
        value_type: ValueType,
    ) -> Self {
        self.values
            .insert(name.into(), (value.into(), Some(value_type)));
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let value = value.into();
        let value_type = value.value_type();
        self.values.insert(name.into(), (value, value_type));
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name).map(|(v, _)| v)
    }

    pub fn get_type(&self, name: &str) -> Option<&ValueType> {
        self.values.get(name).and_then(|(_, t)| t.as_ref())
    }

    /// The name of the first argument that is a parameter bean, if any.
    pub fn parameter_bean_name(&self) -> Option<&str> {
        self.values
            .iter()
            .find(|(_, (v, _))| v.is_parameter_bean())
            .map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// One bound argument, handed to the execution layer in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct BindValue {
    pub value: Value,
    pub value_type: Option<ValueType>,
}

/// Accumulates the output of one build: SQL text plus the bind values of every
///  `?` placeholder it appended, in order.
#[derive(Debug)]
pub struct EmissionContext<'a> {
    sql: String,
    binds: Vec<BindValue>,
    enabled: bool,
    args: &'a Arguments,
    begin_child: bool,
    already_skipped_connector: bool,
    dynamic_depth: usize,
}

impl<'a> EmissionContext<'a> {
    pub fn new(args: &'a Arguments) -> Self {
        Self {
            sql: String::with_capacity(256),
            binds: Vec::new(),
            enabled: false,
            args,
            begin_child: false,
            already_skipped_connector: false,
            dynamic_depth: 0,
        }
    }

    /// A context for the contents of a BEGIN block.
    pub fn child_for_begin(&self) -> Self {
        Self {
            begin_child: true,
            dynamic_depth: self.dynamic_depth,
            ..Self::new(self.args)
        }
    }

    /// A context for SQL injected through an embedded variable.
    pub fn child_for_dynamic(&self) -> Self {
        Self {
            dynamic_depth: self.dynamic_depth + 1,
            ..Self::new(self.args)
        }
    }

    pub fn args(&self) -> &'a Arguments {
        self.args
    }

    pub fn add_sql(&mut self, sql: &str) {
        self.sql.push_str(sql);
    }

    /// Appends a `?` placeholder and its value.
    pub fn add_bind_variable(&mut self, value: Value, value_type: Option<ValueType>) {
        self.sql.push('?');
        self.binds.push(BindValue { value, value_type });
    }

    /// Appends the output of a child context.
    pub fn merge(&mut self, child: EmissionContext<'_>) {
        self.sql.push_str(&child.sql);
        self.binds.extend(child.binds);
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn binds(&self) -> &[BindValue] {
        &self.binds
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_begin_child(&self) -> bool {
        self.begin_child
    }

    pub fn is_already_skipped_connector(&self) -> bool {
        self.already_skipped_connector
    }

    pub fn set_already_skipped_connector(&mut self, skipped: bool) {
        self.already_skipped_connector = skipped;
    }

    pub fn dynamic_depth(&self) -> usize {
        self.dynamic_depth
    }

    pub fn into_parts(self) -> (String, Vec<BindValue>, bool) {
        (self.sql, self.binds, self.enabled)
    }
}

use std::{fmt, sync::Arc};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use indexmap::IndexMap;
use rust_decimal::Decimal;

use crate::option::FilteringBindOption;

/// Beans expose the LIKE-search option of a property `foo` under the sibling
///  name `fooInternalLikeSearchOption`.
pub const LIKE_SEARCH_OPTION_SUFFIX: &str = "InternalLikeSearchOption";

/// The type tag carried next to every bound value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueType {
    Bool,
    Int,
    Decimal,
    Text,
    Date,
    DateTime,
    Time,
    List,
    Map,
    Params,
    Bean(String),
}

impl ValueType {
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Int | Self::Decimal)
    }

    pub fn is_date_like(&self) -> bool {
        matches!(self, Self::Date | Self::DateTime | Self::Time)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => write!(f, "Bool"),
            Self::Int => write!(f, "Int"),
            Self::Decimal => write!(f, "Decimal"),
            Self::Text => write!(f, "Text"),
            Self::Date => write!(f, "Date"),
            Self::DateTime => write!(f, "DateTime"),
            Self::Time => write!(f, "Time"),
            Self::List => write!(f, "List"),
            Self::Map => write!(f, "Map"),
            Self::Params => write!(f, "ParameterMap"),
            Self::Bean(name) => write!(f, "{name}"),
        }
    }
}

/// Typed access to a parameter object: the replacement for runtime bean
///  introspection. Implement this for each parameter-bean type, or use
///  [SimpleBean] when a property table is enough.
pub trait ParameterBean: fmt::Debug + Send + Sync {
    fn type_name(&self) -> &str;

    /// `None` means the bean has no such property. `Some(Err(..))` means the
    ///  property exists but reading it failed.
    fn property(&self, name: &str) -> Option<Result<Value, String>>;

    /// The declared type of a property, used when its value is null.
    fn property_type(&self, _name: &str) -> Option<ValueType> {
        None
    }

    /// Zero-argument methods callable from IF comments, e.g. `pmb.isPaging()`.
    fn invoke(&self, _method: &str) -> Option<Result<Value, String>> {
        None
    }

    /// Looks up an option-valued sibling property such as
    ///  `memberNameInternalLikeSearchOption`. Returns `None` when the property
    ///  is absent or null.
    fn filtering_option(&self, _name: &str) -> Option<Arc<dyn FilteringBindOption>> {
        None
    }
}

#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Decimal(Decimal),
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Time(NaiveTime),
    List(Vec<Value>),
    Map(IndexMap<String, Value>),
    Params(ParameterMap),
    Bean(Arc<dyn ParameterBean>),
}

impl Value {
    pub fn bean(bean: impl ParameterBean + 'static) -> Self {
        Value::Bean(Arc::new(bean))
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// `None` for [Value::Null]: a null carries no type of its own.
    pub fn value_type(&self) -> Option<ValueType> {
        Some(match self {
            Value::Null => return None,
            Value::Bool(_) => ValueType::Bool,
            Value::Int(_) => ValueType::Int,
            Value::Decimal(_) => ValueType::Decimal,
            Value::Text(_) => ValueType::Text,
            Value::Date(_) => ValueType::Date,
            Value::DateTime(_) => ValueType::DateTime,
            Value::Time(_) => ValueType::Time,
            Value::List(_) => ValueType::List,
            Value::Map(_) => ValueType::Map,
            Value::Params(_) => ValueType::Params,
            Value::Bean(bean) => ValueType::Bean(bean.type_name().to_string()),
        })
    }

    /// Name used in diagnostics.
    pub fn type_name(&self) -> String {
        self.value_type()
            .map(|t| t.to_string())
            .unwrap_or_else(|| "null".to_string())
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Int(i) => Some(Decimal::from(*i)),
            Value::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Decimal(_))
    }

    pub fn is_date_like(&self) -> bool {
        matches!(self, Value::Date(_) | Value::DateTime(_) | Value::Time(_))
    }

    /// Values that can serve as the root parameter bean.
    pub fn is_parameter_bean(&self) -> bool {
        matches!(self, Value::Bean(_) | Value::Params(_))
    }

    /// The zero-argument methods every value answers in IF comments.
    pub fn invoke_builtin(&self, method: &str) -> Option<Value> {
        match (self, method) {
            (Value::List(items), "size") => Some(Value::Int(items.len() as i64)),
            (Value::List(items), "isEmpty") => Some(Value::Bool(items.is_empty())),
            (Value::Map(map), "size") => Some(Value::Int(map.len() as i64)),
            (Value::Map(map), "isEmpty") => Some(Value::Bool(map.is_empty())),
            (Value::Params(map), "size") => Some(Value::Int(map.len() as i64)),
            (Value::Params(map), "isEmpty") => Some(Value::Bool(map.is_empty())),
            (Value::Text(s), "length" | "size") => Some(Value::Int(s.chars().count() as i64)),
            (Value::Text(s), "isEmpty") => Some(Value::Bool(s.is_empty())),
            (Value::Text(s), "trim") => Some(Value::Text(s.trim().to_string())),
            (Value::Text(s), "toUpperCase") => Some(Value::Text(s.to_uppercase())),
            (Value::Text(s), "toLowerCase") => Some(Value::Text(s.to_lowercase())),
            (_, "toString") => Some(Value::Text(self.to_string())),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        use Value::*;
        match (self, other) {
            (Null, Null) => true,
            (Bool(a), Bool(b)) => a == b,
            (Int(a), Int(b)) => a == b,
            (Decimal(a), Decimal(b)) => a == b,
            (Text(a), Text(b)) => a == b,
            (Date(a), Date(b)) => a == b,
            (DateTime(a), DateTime(b)) => a == b,
            (Time(a), Time(b)) => a == b,
            (List(a), List(b)) => a == b,
            (Map(a), Map(b)) => a == b,
            (Params(a), Params(b)) => a == b,
            (Bean(a), Bean(b)) => std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b)),
            _ => false,
        }
    }
}

/// The natural string form, as used for embedded values.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Decimal(d) => write!(f, "{d}"),
            Value::Text(s) => write!(f, "{s}"),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S%.f")),
            Value::Time(t) => write!(f, "{}", t.format("%H:%M:%S%.f")),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Map(map) => write_entries(f, map.iter()),
            Value::Params(map) => write_entries(f, map.iter()),
            Value::Bean(bean) => write!(f, "{}", bean.type_name()),
        }
    }
}

fn write_entries<'a>(
    f: &mut fmt::Formatter<'_>,
    entries: impl Iterator<Item = (&'a String, &'a Value)>,
) -> fmt::Result {
    write!(f, "{{")?;
    for (i, (k, v)) in entries.enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{k}={v}")?;
    }
    write!(f, "}}")
}

// Conversions used all over the tests and by callers assembling arguments
impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}
impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v.into())
    }
}
impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}
impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Value::Decimal(v)
    }
}
impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}
impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}
impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}
impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::DateTime(v)
    }
}
impl From<NaiveTime> for Value {
    fn from(v: NaiveTime) -> Self {
        Value::Time(v)
    }
}
impl From<ParameterMap> for Value {
    fn from(v: ParameterMap) -> Self {
        Value::Params(v)
    }
}
impl From<SimpleBean> for Value {
    fn from(v: SimpleBean) -> Self {
        Value::Bean(Arc::new(v))
    }
}
impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}
impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Map-backed parameter bean. Unlike a plain [Value::Map], a missing key is
///  distinguishable from a key holding null.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterMap(IndexMap<String, Value>);

impl ParameterMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for ParameterMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// A parameter bean described by a property table. Getter-style methods
///  (`getFoo()`, `isFoo()`) resolve to the matching property.
#[derive(Debug, Clone, Default)]
pub struct SimpleBean {
    type_name: String,
    properties: IndexMap<String, Value>,
    declared_types: IndexMap<String, ValueType>,
    options: IndexMap<String, Arc<dyn FilteringBindOption>>,
}

impl SimpleBean {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            ..Default::default()
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Declares the property type, which survives a null value.
    pub fn with_typed(
        mut self,
        name: impl Into<String>,
        value: impl Into<Value>,
        value_type: ValueType,
    ) -> Self {
        let name = name.into();
        self.declared_types.insert(name.clone(), value_type);
        self.set(name, value);
        self
    }

    /// Attaches a filtering option to `name`, readable as
    ///  `<name>InternalLikeSearchOption`.
    pub fn with_option(
        mut self,
        name: impl AsRef<str>,
        option: impl FilteringBindOption + 'static,
    ) -> Self {
        let key = format!("{}{LIKE_SEARCH_OPTION_SUFFIX}", name.as_ref());
        self.options.insert(key, Arc::new(option));
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.properties.insert(name.into(), value.into());
    }

    pub fn into_value(self) -> Value {
        self.into()
    }
}

impl ParameterBean for SimpleBean {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn property(&self, name: &str) -> Option<Result<Value, String>> {
        self.properties.get(name).cloned().map(Ok)
    }

    fn property_type(&self, name: &str) -> Option<ValueType> {
        self.declared_types
            .get(name)
            .cloned()
            .or_else(|| self.properties.get(name).and_then(Value::value_type))
    }

    fn invoke(&self, method: &str) -> Option<Result<Value, String>> {
        let stem = method
            .strip_prefix("get")
            .or_else(|| method.strip_prefix("is"))?;
        let mut chars = stem.chars();
        let first = chars.next()?;
        let name: String = first.to_lowercase().chain(chars).collect();
        self.property(&name)
    }

    fn filtering_option(&self, name: &str) -> Option<Arc<dyn FilteringBindOption>> {
        self.options.get(name).cloned()
    }
}

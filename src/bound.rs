use std::sync::Arc;

use crate::{
    loop_info::LoopInfo,
    option::{FilteringBindOption, LikeMode, LikeSearchOption},
    value::{Value, ValueType},
};

/// The resolution of one directive occurrence: the root argument it started
///  from, the value at the end of its property path, and any filtering option
///  picked up on the way.
#[derive(Debug, Clone)]
pub struct BoundValue {
    pub first_value: Value,
    pub first_type: Option<ValueType>,
    pub target_value: Value,
    pub target_type: Option<ValueType>,
    pub filtering_option: Option<Arc<dyn FilteringBindOption>>,
    filtered: bool,
}

impl BoundValue {
    pub fn new(first_value: Value, first_type: Option<ValueType>) -> Self {
        let target_type = first_value.value_type().or_else(|| first_type.clone());
        Self {
            target_value: first_value.clone(),
            target_type,
            first_value,
            first_type,
            filtering_option: None,
            filtered: false,
        }
    }

    /// Takes the loop's option unless this value already has one of its own.
    pub fn inherit_like_search_option_if_needed(&mut self, loop_info: Option<&LoopInfo>) {
        if self.filtering_option.is_some() {
            return;
        }
        if let Some(option) = loop_info.and_then(LoopInfo::filtering_option) {
            self.filtering_option = Some(Arc::clone(option));
        }
    }

    pub fn apply_like_mode(&mut self, mode: LikeMode) {
        self.filtering_option = Some(Arc::new(LikeSearchOption::new(mode)));
    }

    pub fn clear_filtering_option(&mut self) {
        self.filtering_option = None;
    }

    /// Rewrites a text target through the filtering option. Runs at most once.
    pub fn filter_value_by_option(&mut self) {
        if self.filtered {
            return;
        }
        if let (Some(option), Value::Text(text)) = (&self.filtering_option, &self.target_value)
            && let Some(real) = option.generate_real_value(text)
        {
            self.target_value = Value::Text(real);
            self.filtered = true;
        }
    }

    /// Rear options only make sense for text values.
    pub fn is_valid_rear_option(&self) -> bool {
        matches!(self.target_value, Value::Text(_))
            && self
                .filtering_option
                .as_ref()
                .is_some_and(|opt| !opt.rear_option().trim().is_empty())
    }

    pub fn rear_option_sql(&self) -> Option<String> {
        if self.is_valid_rear_option() {
            self.filtering_option.as_ref().map(|opt| opt.rear_option())
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filtering_runs_once() {
        let mut bound = BoundValue::new(Value::from("S"), None);
        bound.apply_like_mode(LikeMode::Prefix);
        bound.filter_value_by_option();
        bound.filter_value_by_option();
        assert_eq!(bound.target_value, Value::from("S%"));
        assert_eq!(bound.rear_option_sql().as_deref(), Some(" escape '|'"));
    }

    #[test]
    fn non_text_values_pass_through() {
        let mut bound = BoundValue::new(Value::Int(3), None);
        bound.apply_like_mode(LikeMode::Contain);
        bound.filter_value_by_option();
        assert_eq!(bound.target_value, Value::Int(3));
        assert!(!bound.is_valid_rear_option());
    }

    #[test]
    fn own_option_wins_over_loop() {
        let elements = vec![Value::from("a")];
        let info = LoopInfo::new(
            "pmb.names",
            &elements,
            Some(Arc::new(LikeSearchOption::contain())),
            None,
        );
        let mut bound = BoundValue::new(Value::from("x"), None);
        bound.apply_like_mode(LikeMode::Suffix);
        bound.inherit_like_search_option_if_needed(Some(&info));
        bound.filter_value_by_option();
        assert_eq!(bound.target_value, Value::from("%x"));

        let mut inherited = BoundValue::new(Value::from("x"), None);
        inherited.inherit_like_search_option_if_needed(Some(&info));
        inherited.filter_value_by_option();
        assert_eq!(inherited.target_value, Value::from("%x%"));
    }

    #[test]
    fn null_keeps_declared_type() {
        let bound = BoundValue::new(Value::Null, Some(ValueType::Text));
        assert_eq!(bound.target_type, Some(ValueType::Text));
    }
}

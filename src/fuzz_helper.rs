use crate::{
    AnalyzerConfig, Arguments, LikeSearchOption, SimpleBean, TwoWaySql, Value, ValueType,
    if_comment,
};

// A parameter bean with a bit of everything for fuzzed statements to reach
fn fuzz_pmb() -> SimpleBean {
    SimpleBean::new("FuzzPmb")
        .with("id", 3)
        .with("name", "S'x%")
        .with_option("name", LikeSearchOption::prefix())
        .with_typed("missing", Value::Null, ValueType::Date)
        .with("flag", true)
        .with("ids", vec![1, 2, 3])
        .with(
            "nested",
            Value::from(vec![Value::from(vec!["a", "b"]), Value::from(vec!["c"])]),
        )
        .with("schema", "MAIN")
        .with("dynamic", "ID = /*pmb.id*/1")
        .with(
            "inner",
            SimpleBean::new("InnerPmb")
                .with("id", 4)
                .with("self", "/*$pmb.inner.self*/x"),
        )
}

/// Analyzes and builds `sql` against a fixed parameter bean. Errors are
///  expected and ignored; only panics are of interest.
pub fn analyze_and_build(sql: &str) {
    let config = AnalyzerConfig {
        max_dynamic_depth: 4,
        ..Default::default()
    };
    if let Ok(sql) = TwoWaySql::parse_with(sql, config) {
        let _ = sql.to_string();
        let _ = sql.build(&Arguments::pmb(fuzz_pmb()));
    }
}

/// Runs an IF expression through validation and parsing, then evaluates it
///  wrapped in a statement.
pub fn evaluate_if(expr: &str) {
    if if_comment::validate(expr).is_ok() {
        let _ = if_comment::parse(expr);
    }
    analyze_and_build(&format!("/*IF {expr}*/x/*END*/"));
}

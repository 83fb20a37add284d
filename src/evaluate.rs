use std::cmp::Ordering;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use tracing::trace;

use crate::{
    context::Arguments,
    error::{CommentKind, Error, Location},
    if_comment::{self, Clause, CompareOp, Connector, Operand, ParseError},
    loop_info::LoopInfo,
    tracer::{resolve_root, step},
    value::Value,
};

/// Evaluates one IF-comment expression against the arguments and, inside a
///  FOR comment, the current loop element.
///
/// #Notes
/// Null is the minimum of every ordering: `x > null` holds for any non-null
///  `x` and `null > y` never does. A null side short-circuits type checking,
///  which also means a `date '...'` literal is never parsed when the other
///  side is null.
pub struct IfCommentEvaluator<'a> {
    at: &'a Location,
    args: &'a Arguments,
    loop_info: Option<&'a LoopInfo<'a>>,
}

impl<'a> IfCommentEvaluator<'a> {
    /// `at.expression` is the expression with the `IF ` prefix already removed.
    pub fn new(
        at: &'a Location,
        args: &'a Arguments,
        loop_info: Option<&'a LoopInfo<'a>>,
    ) -> Self {
        Self {
            at,
            args,
            loop_info,
        }
    }

    pub fn evaluate(&self) -> Result<bool, Error> {
        let expr = if_comment::parse(&self.at.expression).map_err(|e| match e {
            ParseError::Empty => Error::IfExpressionEmpty {
                at: self.at.clone(),
            },
            ParseError::Unsupported(reason) => Error::IfExpressionUnsupported {
                reason,
                at: self.at.clone(),
            },
        })?;

        let mut result = match expr.connector {
            Some(Connector::Or) => false,
            _ => true,
        };
        for clause in &expr.clauses {
            let value = self.evaluate_clause(clause)?;
            match expr.connector {
                Some(Connector::Or) if value => {
                    result = true;
                    break;
                }
                Some(Connector::Or) => {}
                _ if !value => {
                    result = false;
                    break;
                }
                _ => {}
            }
        }

        trace!(expression = %self.at.expression, result, "IF comment evaluated");
        Ok(result)
    }

    fn evaluate_clause(&self, clause: &Clause) -> Result<bool, Error> {
        match clause {
            Clause::Truth { negated, operand } => {
                let value = match operand {
                    Operand::Date(literal) => Value::Text(format!("date '{literal}'")),
                    _ => self.resolve(operand)?,
                };
                let b = match &value {
                    Value::Bool(b) => *b,
                    Value::Text(s) if s.eq_ignore_ascii_case("true") => true,
                    Value::Text(s) if s.eq_ignore_ascii_case("false") => false,
                    _ => {
                        return Err(Error::IfNotBoolean {
                            value: value.to_string(),
                            at: self.at.clone(),
                        });
                    }
                };
                Ok(b != *negated)
            }
            Clause::Compare { left, op, right } => match (left, right) {
                (Operand::Date(_), Operand::Date(_)) => Err(Error::IfExpressionUnsupported {
                    reason: "two date literals cannot be compared".to_string(),
                    at: self.at.clone(),
                }),
                (Operand::Date(literal), other) => {
                    let other = self.resolve(other)?;
                    if other.is_null() {
                        return Ok(holds(*op, Ordering::Greater));
                    }
                    let literal = self.date_literal(literal, &other)?;
                    self.compare(&literal, *op, &other)
                }
                (other, Operand::Date(literal)) => {
                    let other = self.resolve(other)?;
                    if other.is_null() {
                        return Ok(holds(*op, Ordering::Less));
                    }
                    let literal = self.date_literal(literal, &other)?;
                    self.compare(&other, *op, &literal)
                }
                (left, right) => {
                    let left = self.resolve(left)?;
                    let right = self.resolve(right)?;
                    self.compare(&left, *op, &right)
                }
            },
        }
    }

    fn resolve(&self, operand: &Operand) -> Result<Value, Error> {
        match operand {
            Operand::Null => Ok(Value::Null),
            Operand::Bool(b) => Ok(Value::Bool(*b)),
            Operand::Text(s) => Ok(Value::Text(s.clone())),
            Operand::Number(n) => {
                n.parse::<Decimal>()
                    .map(Value::Decimal)
                    .map_err(|_| Error::IfExpressionUnsupported {
                        reason: format!("'{n}' is not a number"),
                        at: self.at.clone(),
                    })
            }
            Operand::Path(path) => self.resolve_path(path),
            // Typed by the other side of the comparison
            Operand::Date(literal) => Ok(Value::Text(literal.to_string())),
        }
    }

    fn resolve_path(&self, path: &str) -> Result<Value, Error> {
        let mut segments = path.split('.');
        let first = segments.next().unwrap_or_default();
        let root = resolve_root(first, self.args, self.loop_info, CommentKind::If, self.at)?;

        let mut current = root.value;
        for segment in segments {
            if current.is_null() {
                return Err(Error::IfNullPointer {
                    property: segment.to_string(),
                    at: self.at.clone(),
                });
            }
            current = match segment.strip_suffix("()") {
                Some(method) => self.invoke(&current, method)?,
                None => step(&current, segment, CommentKind::If, self.at)?.0,
            };
        }
        Ok(current)
    }

    /// Bean methods first, then the built-ins every value answers.
    fn invoke(&self, target: &Value, method: &str) -> Result<Value, Error> {
        if let Value::Bean(bean) = target
            && let Some(result) = bean.invoke(method)
        {
            return result.map_err(|cause| Error::PathReadFailure {
                kind: CommentKind::If,
                property: format!("{method}()"),
                owner: bean.type_name().to_string(),
                cause,
                at: self.at.clone(),
            });
        }
        target
            .invoke_builtin(method)
            .ok_or_else(|| Error::PathNotFound {
                kind: CommentKind::If,
                property: format!("{method}()"),
                owner: target.type_name(),
                at: self.at.clone(),
            })
    }

    fn compare(&self, left: &Value, op: CompareOp, right: &Value) -> Result<bool, Error> {
        let mismatch = || Error::IfTypeMismatch {
            left: left.type_name(),
            right: right.type_name(),
            at: self.at.clone(),
        };

        let ordering = match (left, right) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => Ordering::Less,
            (_, Value::Null) => Ordering::Greater,
            (l, r) if l.is_numeric() || r.is_numeric() => {
                match (l.as_decimal(), r.as_decimal()) {
                    (Some(l), Some(r)) => l.cmp(&r),
                    _ => return Err(mismatch()),
                }
            }
            (Value::Time(l), Value::Time(r)) => l.cmp(r),
            (l, r) if l.is_date_like() || r.is_date_like() => {
                match (as_date_time(l), as_date_time(r)) {
                    (Some(l), Some(r)) => l.cmp(&r),
                    _ => return Err(mismatch()),
                }
            }
            (Value::Text(l), Value::Text(r)) => l.cmp(r),
            (Value::Bool(l), Value::Bool(r)) => l.cmp(r),
            (l, r) => {
                return match op {
                    CompareOp::Eq => Ok(l == r),
                    CompareOp::Ne => Ok(l != r),
                    _ => Err(mismatch()),
                };
            }
        };
        Ok(holds(op, ordering))
    }

    /// Reads `date '...'` as the type of the value it is compared with.
    fn date_literal(&self, literal: &str, other: &Value) -> Result<Value, Error> {
        let illegal = |target: &str| Error::IfIllegalDateLiteral {
            literal: literal.to_string(),
            target: target.to_string(),
            at: self.at.clone(),
        };
        match other {
            Value::Date(_) => parse_date(literal)
                .map(Value::Date)
                .ok_or_else(|| illegal("Date")),
            Value::DateTime(_) => parse_date_time(literal)
                .map(Value::DateTime)
                .ok_or_else(|| illegal("DateTime")),
            Value::Time(_) => parse_time(literal)
                .map(Value::Time)
                .ok_or_else(|| illegal("Time")),
            _ => Err(Error::IfTypeMismatch {
                left: "date literal".to_string(),
                right: other.type_name(),
                at: self.at.clone(),
            }),
        }
    }
}

fn holds(op: CompareOp, ordering: Ordering) -> bool {
    match op {
        CompareOp::Eq => ordering.is_eq(),
        CompareOp::Ne => ordering.is_ne(),
        CompareOp::Gt => ordering.is_gt(),
        CompareOp::Lt => ordering.is_lt(),
        CompareOp::Ge => ordering.is_ge(),
        CompareOp::Le => ordering.is_le(),
    }
}

/// Dates compare with date-times at midnight.
fn as_date_time(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::Date(d) => Some(d.and_time(NaiveTime::default())),
        Value::DateTime(dt) => Some(*dt),
        _ => None,
    }
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    ["%Y-%m-%d", "%Y/%m/%d"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

fn parse_date_time(s: &str) -> Option<NaiveDateTime> {
    [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y/%m/%d %H:%M:%S%.f",
    ]
    .iter()
    .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
    .or_else(|| parse_date(s).map(|d| d.and_time(NaiveTime::default())))
}

fn parse_time(s: &str) -> Option<NaiveTime> {
    ["%H:%M:%S%.f", "%H:%M"]
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(s, fmt).ok())
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use crate::value::SimpleBean;

    fn pmb() -> Value {
        SimpleBean::new("MemberPmb")
            .with("age", 20)
            .with("rate", Decimal::from_str("20.0").unwrap())
            .with("name", "Stojkovic")
            .with("nullName", Value::Null)
            .with("paging", true)
            .with("flag", "TRUE")
            .with("ids", vec![1, 2, 3])
            .with("birthdate", NaiveDate::from_ymd_opt(2000, 1, 1).unwrap())
            .with(
                "updated",
                NaiveDate::from_ymd_opt(2024, 5, 1)
                    .unwrap()
                    .and_hms_opt(10, 30, 0)
                    .unwrap(),
            )
            .with("opens", NaiveTime::from_hms_opt(9, 0, 0).unwrap())
            .into_value()
    }

    fn eval(expression: &str) -> Result<bool, Error> {
        let at = Location::new(expression, "select 1");
        let args = Arguments::pmb(pmb());
        IfCommentEvaluator::new(&at, &args, None).evaluate()
    }

    fn is_true(expression: &str) -> bool {
        eval(expression).unwrap_or_else(|e| panic!("{expression}: {e}"))
    }

    #[test]
    fn numeric_comparison_normalizes() {
        assert!(is_true("pmb.age == 20"));
        assert!(is_true("pmb.rate == 20"));
        assert!(is_true("pmb.age == pmb.rate"));
        assert!(is_true("pmb.age >= 19.5"));
        assert!(!is_true("pmb.age < -1"));
    }

    #[test]
    fn null_is_the_minimum() {
        assert!(is_true("pmb.nullName == null"));
        assert!(!is_true("pmb.name == null"));
        assert!(is_true("pmb.name != null"));
        assert!(is_true("pmb.age > null"));
        assert!(!is_true("null > pmb.age"));
        assert!(is_true("null >= null"));
        assert!(!is_true("null > null"));
        assert!(is_true("pmb.nullName <= pmb.age"));
    }

    #[test]
    fn connectors_short_circuit() {
        assert!(is_true("pmb.name != null && pmb.age == 20"));
        assert!(!is_true("pmb.nullName != null && pmb.nullName.length() > 0"));
        assert!(is_true("pmb.name != null || pmb.nullName.length() > 0"));
        assert!(!is_true("pmb.age == 1 || pmb.age == 2"));
    }

    #[test]
    fn standalone_booleans() {
        assert!(is_true("pmb.paging"));
        assert!(is_true("pmb.isPaging()"));
        assert!(!is_true("!pmb.paging"));
        assert!(is_true("pmb.flag"));
        assert!(is_true("!false"));

        let err = eval("pmb.nullName").unwrap_err();
        assert!(matches!(err, Error::IfNotBoolean { .. }));
        let err = eval("pmb.age").unwrap_err();
        assert!(matches!(err, Error::IfNotBoolean { ref value, .. } if value == "20"));
    }

    #[test]
    fn methods_and_list_indexes() {
        assert!(is_true("pmb.ids.size() == 3"));
        assert!(is_true("!pmb.ids.isEmpty()"));
        assert!(is_true("pmb.ids.get(2) == 3"));
        assert!(is_true("pmb.name.toUpperCase() == 'STOJKOVIC'"));
        assert!(is_true("pmb.getName() == 'Stojkovic'"));
        let err = eval("pmb.ids.nothing() == 1").unwrap_err();
        assert!(matches!(err, Error::PathNotFound { .. }));
    }

    #[test]
    fn dates() {
        assert!(is_true("pmb.birthdate == date '2000-01-01'"));
        assert!(is_true("date '1999/12/31' < pmb.birthdate"));
        assert!(is_true("pmb.updated > date '2024-05-01'"));
        assert!(is_true("pmb.updated == date '2024-05-01 10:30:00'"));
        assert!(is_true("pmb.opens < date '09:30'"));
        assert!(is_true("pmb.updated > pmb.birthdate"));
        assert!(is_true("pmb.nullName < date 'not even a date'"));

        let err = eval("pmb.birthdate == date '2000-13-45'").unwrap_err();
        assert!(matches!(err, Error::IfIllegalDateLiteral { .. }));
        let err = eval("pmb.age == date '2000-01-01'").unwrap_err();
        assert!(matches!(err, Error::IfTypeMismatch { .. }));
        let err = eval("date '2000-01-01' == date '2000-01-01'").unwrap_err();
        assert!(matches!(err, Error::IfExpressionUnsupported { .. }));
        let err = eval("pmb.opens == pmb.birthdate").unwrap_err();
        assert!(matches!(err, Error::IfTypeMismatch { .. }));
    }

    #[test]
    fn type_mismatches() {
        let err = eval("pmb.age == 'x'").unwrap_err();
        let Error::IfTypeMismatch { left, right, .. } = err else {
            panic!("expected IfTypeMismatch, got {err:?}")
        };
        assert_eq!(left, "Int");
        assert_eq!(right, "Text");
        assert!(matches!(
            eval("pmb.birthdate > 'x'"),
            Err(Error::IfTypeMismatch { .. })
        ));
        // Non-numeric, non-date pairs compare structurally
        assert!(!is_true("pmb.name == true"));
    }

    #[test]
    fn unsupported_forms() {
        assert!(matches!(eval(""), Err(Error::IfExpressionEmpty { .. })));
        for expr in [
            "pmb.age == 20 && pmb.age == 20 || pmb.age == 20",
            "(pmb.age == 20)",
            "pmb.name == \"x\"",
            "pmb.age = 20",
            "pmb.age <> 20",
            "pmb.target(1) == 1",
        ] {
            assert!(
                matches!(eval(expr), Err(Error::IfExpressionUnsupported { .. })),
                "{expr}"
            );
        }
    }

    #[test]
    fn null_navigation() {
        let err = eval("pmb.nullName.length() > 0").unwrap_err();
        assert!(matches!(err, Error::IfNullPointer { ref property, .. } if property == "length()"));
    }

    #[test]
    fn loop_element() {
        let at = Location::new("#current > 1", "select 1");
        let args = Arguments::pmb(pmb());
        let elements = vec![Value::Int(1), Value::Int(2)];
        let mut info = LoopInfo::new("pmb.ids", &elements, None, None);
        assert!(!IfCommentEvaluator::new(&at, &args, Some(&info)).evaluate().unwrap());
        info.set_index(1);
        assert!(IfCommentEvaluator::new(&at, &args, Some(&info)).evaluate().unwrap());
    }
}

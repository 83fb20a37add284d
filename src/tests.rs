use std::str::FromStr;

use proptest::prelude::*;
use rust_decimal::Decimal;

use crate::{
    AnalyzerConfig, Arguments, BuiltSql, Error, LikeSearchOption, ParameterMap, SimpleBean,
    TwoWaySql, Value, ValueType, error::CommentKind,
};

pub fn member_pmb() -> SimpleBean {
    SimpleBean::new("MemberPmb")
        .with_typed("memberId", Value::Null, ValueType::Int)
        .with_typed("memberName", Value::Null, ValueType::Text)
        .with("memberIds", vec![1, 2, 3])
        .with("schema", "OTHER")
}

pub fn build(sql: &str, pmb: SimpleBean) -> Result<BuiltSql, Error> {
    TwoWaySql::parse(sql)
        .unwrap_or_else(|e| panic!("{sql}: {e}"))
        .build(&Arguments::pmb(pmb))
}

fn bind_values(built: &BuiltSql) -> Vec<Value> {
    built.binds.iter().map(|b| b.value.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_bind() {
        let built = build(
            "select * from MEMBER where MEMBER_ID = /*pmb.id*/3",
            SimpleBean::new("MemberPmb").with("id", 7),
        )
        .unwrap();
        assert_eq!(built.sql, "select * from MEMBER where MEMBER_ID = ?");
        assert_eq!(bind_values(&built), vec![Value::Int(7)]);
    }

    #[test]
    fn if_block() {
        let sql = "select * from MEMBER where 1 = 1 /*IF pmb.memberName != null*/and MEMBER_NAME = /*pmb.memberName*/'x'/*END*/";

        let built = build(sql, member_pmb()).unwrap();
        assert_eq!(built.sql, "select * from MEMBER where 1 = 1 ");
        assert!(built.binds.is_empty());
        assert!(!built.enabled);

        let built = build(sql, member_pmb().with("memberName", "S")).unwrap();
        assert_eq!(
            built.sql,
            "select * from MEMBER where 1 = 1 and MEMBER_NAME = ?"
        );
        assert_eq!(bind_values(&built), vec![Value::from("S")]);
        assert!(built.enabled);
    }

    #[test]
    fn if_else() {
        let sql = "order by /*IF pmb.memberId != null*/MEMBER_ID--ELSE MEMBER_NAME/*END*/";
        let built = build(sql, member_pmb()).unwrap();
        assert_eq!(built.sql, "order by  MEMBER_NAME");
        let built = build(sql, member_pmb().with("memberId", 1)).unwrap();
        assert_eq!(built.sql, "order by MEMBER_ID");
    }

    #[test]
    fn begin_drops_leading_connector() {
        let sql = "select * from MEMBER /*BEGIN*/where /*IF pmb.memberId != null*/MEMBER_ID = /*pmb.memberId*/3/*END*/ /*IF pmb.memberName != null*/and MEMBER_NAME = /*pmb.memberName*/'x'/*END*//*END*/";

        let built = build(sql, member_pmb()).unwrap();
        assert_eq!(built.sql, "select * from MEMBER ");
        assert!(built.binds.is_empty());

        let built = build(sql, member_pmb().with("memberName", "S")).unwrap();
        assert_eq!(built.sql, "select * from MEMBER where  MEMBER_NAME = ?");

        let built = build(
            sql,
            member_pmb().with("memberId", 1).with("memberName", "S"),
        )
        .unwrap();
        assert_eq!(
            built.sql,
            "select * from MEMBER where MEMBER_ID = ? and MEMBER_NAME = ?"
        );
        assert_eq!(bind_values(&built), vec![Value::Int(1), Value::from("S")]);
    }

    #[test]
    fn in_scope_is_repeatable() {
        let sql = TwoWaySql::parse("where MEMBER_ID in /*pmb.memberIds*/(1, 2)").unwrap();
        let args = Arguments::pmb(member_pmb());
        let first = sql.build(&args).unwrap();
        let second = sql.build(&args).unwrap();
        assert_eq!(first.sql, "where MEMBER_ID in (?, ?, ?)");
        assert_eq!(first, second);
    }

    #[test]
    fn nested_loops_over_current() {
        let sql = "/*FOR pmb.lists*//*NEXT '; '*//*FOR #current*//*NEXT ', '*//*#current*/0/*END*//*END*/";
        let lists = Value::from(vec![Value::from(vec![1, 2]), Value::from(vec![3])]);
        let built = build(sql, SimpleBean::new("Pmb").with("lists", lists)).unwrap();
        assert_eq!(built.sql, "?, ?; ?");
        assert_eq!(
            bind_values(&built),
            vec![Value::Int(1), Value::Int(2), Value::Int(3)]
        );
        assert!(built.enabled);
    }

    #[test]
    fn loop_markers() {
        let sql = "in /*FOR pmb.memberIds*//*FIRST*/(/*END*//*NEXT ', '*//*#current*/1/*LAST*/)/*END*//*END*/";
        let built = build(sql, member_pmb()).unwrap();
        assert_eq!(built.sql, "in (?, ?, ?)");
    }

    #[test]
    fn if_inside_loop() {
        let sql = "/*FOR pmb.memberIds*//*IF #current >= 2*/ID = /*#current*/0 /*END*//*END*/";
        let built = build(sql, member_pmb()).unwrap();
        assert_eq!(built.sql, "ID = ? ID = ? ");
        assert_eq!(bind_values(&built), vec![Value::Int(2), Value::Int(3)]);
    }

    fn like_pmb() -> SimpleBean {
        SimpleBean::new("Pmb")
            .with("names", vec!["S", "T%"])
            .with_option("names", LikeSearchOption::contain())
    }

    #[test]
    fn loop_like_option_is_inherited() {
        let sql = "where /*FOR pmb.names*//*NEXT 'or '*/NAME like /*#current*/'x' /*END*/";
        let built = build(sql, like_pmb()).unwrap();
        assert_eq!(
            built.sql,
            "where NAME like ? escape '|' or NAME like ? escape '|' "
        );
        assert_eq!(
            bind_values(&built),
            vec![Value::from("%S%"), Value::from("%T|%%")]
        );
    }

    #[test]
    fn loop_like_option_reaches_nested_loops() {
        let sql = "/*FOR pmb.groups*//*FOR #current*/N like /*#current*/'x' /*END*//*END*/";
        let groups = Value::from(vec![Value::from(vec!["a"]), Value::from(vec!["b"])]);
        let pmb = SimpleBean::new("Pmb")
            .with("groups", groups)
            .with_option("groups", LikeSearchOption::contain());
        let built = build(sql, pmb).unwrap();
        assert_eq!(built.sql, "N like ? escape '|' N like ? escape '|' ");
        assert_eq!(
            bind_values(&built),
            vec![Value::from("%a%"), Value::from("%b%")]
        );
    }

    #[test]
    fn not_like_suppresses_inherited_option() {
        let sql = "where /*FOR pmb.names*//*NEXT 'or '*/NAME like /*#current:notLike*/'x' /*END*/";
        let built = build(sql, like_pmb()).unwrap();
        assert_eq!(built.sql, "where NAME like ? or NAME like ? ");
        assert_eq!(bind_values(&built), vec![Value::from("S"), Value::from("T%")]);

        let err = build("where NAME = /*pmb.memberName:notLike*/'x'", member_pmb()).unwrap_err();
        assert!(matches!(err, Error::InLoopOptionOutsideLoop { .. }));
    }

    #[test]
    fn explicit_like_option_on_loop() {
        let sql = "/*FOR pmb.names:likePrefix*//*#current*/'x'/*END*/";
        let pmb = SimpleBean::new("Pmb").with("names", vec!["a"]);
        let built = build(sql, pmb).unwrap();
        assert_eq!(built.sql, "? escape '|'");
        assert_eq!(bind_values(&built), vec![Value::from("a%")]);
    }

    #[test]
    fn null_handling() {
        // Null through an intermediate is just null for a bind
        let built = build(
            "/*pmb.memberName.first*/'x'",
            member_pmb(),
        )
        .unwrap();
        assert_eq!(built.binds[0].value, Value::Null);
        assert_eq!(built.binds[0].value_type, None);

        // ... no iterations for a loop
        let built = build("/*FOR pmb.memberName*/x/*END*/", member_pmb()).unwrap();
        assert_eq!(built.sql, "");
        assert!(!built.enabled);

        // ... and an error when nulls are blocked
        let config = AnalyzerConfig {
            block_null_parameter: true,
            ..Default::default()
        };
        let err = TwoWaySql::parse_with("/*pmb.memberName*/'x'", config)
            .unwrap()
            .build(&Arguments::pmb(member_pmb()))
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
    fn if_numeric_comparison() {
        let sql = "/*IF pmb.age == 20*/yes/*END*/";
        let built = build(sql, SimpleBean::new("Pmb").with("age", 20)).unwrap();
        assert_eq!(built.sql, "yes");
        let age = Decimal::from_str("20.0").unwrap();
        let built = build(sql, SimpleBean::new("Pmb").with("age", age)).unwrap();
        assert_eq!(built.sql, "yes");
    }

    #[test]
    fn if_connectors_cannot_mix() {
        let err = build(
            "/*IF pmb.a == 1 && pmb.b == 2 || pmb.c == 3*/x/*END*/",
            member_pmb(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::IfExpressionUnsupported { .. }));
    }

    #[test]
    fn embedded_variables() {
        let built = build("select * from /*$pmb.schema.*/MAIN.MEMBER", member_pmb()).unwrap();
        assert_eq!(built.sql, "select * from OTHER.MEMBER");

        let built = build("select * from /*$pmb.schema*/.MEMBER", member_pmb()).unwrap();
        assert_eq!(built.sql, "select * from OTHER.MEMBER");

        let built = build("select * from /*$$pmb.schema*/_MEMBER", member_pmb()).unwrap();
        assert_eq!(built.sql, "select * from OTHER_MEMBER");

        let pmb = member_pmb().with("condition", "MEMBER_ID in /*pmb.memberIds*/(1)");
        let built = build("where /*$pmb.condition*/1 = 1", pmb).unwrap();
        assert_eq!(built.sql, "where MEMBER_ID in (?, ?, ?) = 1");
        assert_eq!(built.binds.len(), 3);

        let pmb = member_pmb().with("condition", "ID = ?");
        let err = build("where /*$pmb.condition*/x", pmb).unwrap_err();
        assert!(matches!(err, Error::BindSymbolInEmbedded { .. }));
    }

    #[test]
    fn self_referencing_embedded_value_is_bounded() {
        let pmb = member_pmb().with("loop", "/*$pmb.loop*/x");
        let err = build("/*$pmb.loop*/x", pmb).unwrap_err();
        assert!(matches!(err, Error::DynamicBindingTooDeep { depth: 8, .. }));
    }

    #[test]
    fn resolution_errors() {
        let err = build("/*pmb.nothing*/1", member_pmb()).unwrap_err();
        let message = err.to_string();
        assert!(matches!(err, Error::PathNotFound { .. }));
        assert!(message.contains("nothing"));
        assert!(message.contains("MemberPmb"));
        assert!(message.contains("/*pmb.nothing*/1"));

        let err = build("/*pbm.memberId*/1", member_pmb()).unwrap_err();
        assert!(matches!(err, Error::IllegalParameterBeanReference { .. }));

        let err = build("/*#current*/1", member_pmb()).unwrap_err();
        assert!(matches!(err, Error::IllegalParameterBeanReference { .. }));

        let err = build("/*FOR #current*/x/*END*/", member_pmb()).unwrap_err();
        assert!(matches!(
            err,
            Error::IllegalParameterBeanReference {
                kind: CommentKind::For,
                ..
            }
        ));

        let err = build("/*FOR pmb.schema*/x/*END*/", member_pmb()).unwrap_err();
        assert!(matches!(
            err,
            Error::NotAListOrArray {
                kind: CommentKind::For,
                ..
            }
        ));

        let err = build("/*pmb.memberIds.get(5)*/1", member_pmb()).unwrap_err();
        assert!(matches!(err, Error::ListIndexOutOfBounds { .. }));
    }

    #[test]
    fn parameter_map_root() {
        let sql = TwoWaySql::parse("/*IF pmb.id != null*/ID = /*pmb.id*/1/*END*//*pmb.other*/2").unwrap();
        let args = Arguments::pmb(ParameterMap::new().with("id", 5));
        let built = sql.build(&args).unwrap();
        assert_eq!(built.sql, "ID = ??");
        assert_eq!(bind_values(&built), vec![Value::Int(5), Value::Null]);
    }

    #[test]
    fn shared_tree_across_threads() {
        let sql = TwoWaySql::parse(
            "select * from MEMBER where MEMBER_ID = /*pmb.memberId*/1 and MEMBER_ID in /*pmb.memberIds*/(1)",
        )
        .unwrap();
        std::thread::scope(|s| {
            let handles: Vec<_> = (0..4i64)
                .map(|i| {
                    let sql = &sql;
                    s.spawn(move || {
                        let pmb = member_pmb()
                            .with("memberId", i)
                            .with("memberIds", vec![i; (i + 1) as usize]);
                        sql.build(&Arguments::pmb(pmb)).unwrap()
                    })
                })
                .collect();
            for (i, handle) in handles.into_iter().enumerate() {
                let built = handle.join().unwrap();
                assert_eq!(built.binds.len(), i + 2);
                assert_eq!(built.binds[0].value, Value::Int(i as i64));
            }
        });
    }

    #[test]
    fn tree_printing() {
        let sql = TwoWaySql::parse("a /*IF pmb.x*/b/*END*/ /*$pmb.y*/c").unwrap();
        let printed = sql.to_string();
        assert!(printed.starts_with("Root\n"));
        assert!(printed.contains("  If(pmb.x)\n    Sql(\"b\")\n"));
        assert!(printed.contains("Embedded(pmb.y, Normal, test=\"c\")"));
    }

    proptest! {
        #[test]
        fn placeholders_match_binds(
            ids in prop::collection::vec(any::<i64>(), 1..8),
            name in prop::option::of("[a-z%_]{0,6}"),
            tags in prop::collection::vec("[a-z]{1,4}", 0..5),
        ) {
            let sql = TwoWaySql::parse(
                "select * from M where ID in /*pmb.ids*/(1) \
                 /*IF pmb.name != null*/and NAME like /*pmb.name:likeContain*/'x'/*END*/ \
                 /*FOR pmb.tags*/or TAG = /*#current*/'t' /*END*/",
            ).unwrap();
            let pmb = SimpleBean::new("Pmb")
                .with("ids", ids.clone())
                .with("name", name.clone())
                .with("tags", tags.clone());
            let built = sql.build(&Arguments::pmb(pmb)).unwrap();

            let placeholders = built.sql.matches('?').count();
            prop_assert_eq!(placeholders, built.binds.len());
            prop_assert_eq!(built.binds.len(), ids.len() + name.iter().count() + tags.len());
            let leading: Vec<Value> = built.binds[..ids.len()].iter().map(|b| b.value.clone()).collect();
            prop_assert_eq!(leading, ids.into_iter().map(Value::Int).collect::<Vec<_>>());
        }
    }
}

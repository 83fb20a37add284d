#![no_main]
use libfuzzer_sys::fuzz_target;

use arbitrary::Arbitrary;

#[derive(Debug)]
pub struct SqlInput {
    pub sql: String,
}

impl<'a> Arbitrary<'a> for SqlInput {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        let sql = random_sql_string(u)?;
        Ok(SqlInput { sql })
    }
}

const MAX_SQL_LENGTH: usize = 10000;

// Directive fragments spliced between arbitrary text so that inputs reach
//  past the lexer more often than pure noise would
const FRAGMENTS: [&str; 14] = [
    "/*pmb.id*/1",
    "/*pmb.name:likeContain*/'x'",
    "/*pmb.ids*/(1, 2)",
    "/*$pmb.schema.*/MAIN.T",
    "/*$pmb.dynamic*/x",
    "/*IF pmb.id > 1*/",
    "/*IF pmb.flag && pmb.missing == null*/",
    "--ELSE ",
    "/*BEGIN*/",
    "/*FOR pmb.nested*/",
    "/*FOR #current*/",
    "/*#current*/'c'",
    "/*NEXT ', '*/",
    "/*END*/",
];

fn random_sql_string(u: &mut arbitrary::Unstructured) -> arbitrary::Result<String> {
    let mut sql = String::new();
    while !u.is_empty() && sql.len() < MAX_SQL_LENGTH {
        if u.arbitrary()? {
            sql.push_str(u.choose(&FRAGMENTS)?);
        } else {
            let text: String = u.arbitrary()?;
            sql.extend(text.chars().take(32));
        }
    }
    Ok(sql)
}

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = arbitrary::Unstructured::new(data).arbitrary::<SqlInput>() {
        twoway_sql::fuzz_helper::analyze_and_build(&input.sql);
    }
});

#![no_main]
use libfuzzer_sys::fuzz_target;

const MAX_EXPR_LENGTH: usize = 1000;

fuzz_target!(|data: &[u8]| {
    if let Ok(expr) = std::str::from_utf8(data) {
        let expr: String = expr.chars().take(MAX_EXPR_LENGTH).collect();
        twoway_sql::fuzz_helper::evaluate_if(&expr);
    }
});

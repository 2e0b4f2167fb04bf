//! Constant folding must never change what an expression evaluates to

use calc_engine::Engine;
use proptest::prelude::*;

fn expr_strategy() -> impl Strategy<Value = String> {
    let leaf = prop_oneof![
        (-20i32..20).prop_map(|n| n.to_string()),
        prop::sample::select(vec!["x", "y", "TRUE", "FALSE"]).prop_map(String::from),
    ];

    leaf.prop_recursive(4, 32, 3, |inner| {
        let binop = prop::sample::select(vec!["+", "-", "*", "<", ">=", "=", "<>", "&&", "||"]);
        prop_oneof![
            (inner.clone(), binop, inner.clone())
                .prop_map(|(l, op, r)| format!("({} {} {})", l, op, r)),
            inner.clone().prop_map(|e| format!("-{}", e)),
            inner.clone().prop_map(|e| format!("ABS({})", e)),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("MAX({}, {})", a, b)),
            (inner.clone(), inner.clone(), inner)
                .prop_map(|(c, a, b)| format!("IF({}, {}, {})", c, a, b)),
        ]
    })
}

fn engines() -> (Engine, Engine) {
    let mut optimized = Engine::new();
    optimized.set_variable("x", 3);
    optimized.set_variable("y", -7);

    let mut plain = Engine::new();
    plain.set_variable("x", 3);
    plain.set_variable("y", -7);
    plain.set_optimize_expressions(false);

    (optimized, plain)
}

proptest! {
    #[test]
    fn folding_preserves_results(expr in expr_strategy()) {
        let (optimized, plain) = engines();
        prop_assert_eq!(optimized.evaluate(&expr), plain.evaluate(&expr), "{}", expr);
    }

    #[test]
    fn parse_never_panics(s in ".{0,40}") {
        let engine = Engine::new();
        let _ = engine.parse(&s);
    }
}

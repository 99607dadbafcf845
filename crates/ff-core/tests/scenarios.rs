//! End-to-end scenarios for the public `validate`/`evaluate` surface.

use ff_core::{evaluate, validate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;
use xxhash_rust::xxh3::xxh3_64;

fn eval(formula: &str) -> f32 {
    evaluate(formula, &json!({})).unwrap()
}

// ===========================================================================
// Concrete scenarios
// ===========================================================================

#[test]
fn scenario_regex_match() {
    assert_eq!(eval(r#"matches("test@test.test", ".+@test.test")"#), 1.0);
}

#[test]
fn scenario_list_membership() {
    assert_eq!(eval(r#"contains("+01:00", ["+01:00","+02:00"])"#), 1.0);
}

#[test]
fn scenario_range_membership() {
    assert_eq!(eval("contains(300, [100:500])"), 1.0);
}

#[test]
fn scenario_conditional() {
    assert_eq!(eval("if(true, 0.6, 0.4)"), 0.6);
}

#[test]
fn scenario_inexact_division() {
    assert_eq!(eval("div(7, 8)"), 0.875);
}

#[test]
fn scenario_linear_map() {
    assert_eq!(eval("map(0.75, 0, 1, 2, 4)"), 3.5);
}

#[test]
fn scenario_cidr_membership() {
    assert_eq!(
        eval(r#"contains(ip("192.167.233.6"), cidr("192.167.233.10/28"))"#),
        1.0
    );
}

#[test]
fn scenario_datetime_epoch() {
    assert_eq!(eval(r#"datetime("2010-06-01")"#), 1275350400.0);
}

#[test]
fn scenario_isblank_null_env() {
    assert_eq!(evaluate(r#"isblank(env["n"])"#, &json!({"n": null})).unwrap(), 1.0);
}

#[test]
fn scenario_env_string_projection() {
    assert_eq!(evaluate(r#"env["s"]"#, &json!({"s": "0.5"})).unwrap(), 0.5);
}

// ===========================================================================
// Error scenarios
// ===========================================================================

#[test]
fn error_scenarios_fail_the_call() {
    let cases = [
        "log10(2)",
        "gt(1)",
        r#"ip("10.0.0")"#,
        "contains(7, [10:0])",
        "plus(true, false)",
        r#"not("true")"#,
        r#"datetime("2021")"#,
    ];
    for formula in cases {
        assert!(evaluate(formula, &json!({})).is_err(), "{formula}");
    }
}

// ===========================================================================
// Universal properties
// ===========================================================================

#[test]
fn unit_literals_hold_for_every_env() {
    let envs = [json!({}), json!({"k": 1}), json!({"user.email": "a@b.c"})];
    for env in &envs {
        assert_eq!(evaluate("1", env).unwrap(), 1.0);
        assert_eq!(evaluate("0", env).unwrap(), 0.0);
        assert_eq!(evaluate("true", env).unwrap(), 1.0);
        assert_eq!(evaluate("false", env).unwrap(), 0.0);
    }
}

#[test]
fn validate_tracks_parse_not_eval() {
    // Parses and evaluates.
    assert!(validate("if(true, 0.6, 0.4)"));
    // Parses but fails at evaluation time with a type error.
    assert!(validate(r#"not("true")"#));
    assert!(evaluate(r#"not("true")"#, &json!({})).is_err());
    // Does not parse.
    assert!(!validate("if(true,"));
    assert!(!validate("1 2"));
    assert!(!validate(""));
}

#[test]
fn range_membership_matches_bounds() {
    let (a, b) = (-3i64, 11i64);
    for x in a - 2..=b + 2 {
        let expected = if a <= x && x <= b { 1.0 } else { 0.0 };
        assert_eq!(
            evaluate(&format!("contains({x}, [{a}:{b}])"), &json!({})).unwrap(),
            expected,
            "x = {x}"
        );
    }
}

#[test]
fn ip_scalar_matches_base256_digits() {
    let octets = [(0u8, 0u8, 0u8, 0u8), (10, 0, 0, 1), (192, 168, 1, 254), (255, 255, 255, 255)];
    for (a, b, c, d) in octets {
        let expected =
            ((i64::from(a) * 256 + i64::from(b)) * 256 + i64::from(c)) * 256 + i64::from(d);
        let formula = format!(r#"eq(ip("{a}.{b}.{c}.{d}"), {expected})"#);
        assert_eq!(evaluate(&formula, &json!({})).unwrap(), 1.0, "{formula}");
    }
}

#[test]
fn cidr_bounds_are_inclusive_and_exclusive_outside() {
    // 10.20.30.40/28 → [10.20.30.32, 10.20.30.47]
    let inside = [r#"ip("10.20.30.32")"#, r#"ip("10.20.30.40")"#, r#"ip("10.20.30.47")"#];
    let outside = [r#"ip("10.20.30.31")"#, r#"ip("10.20.30.48")"#];
    for probe in inside {
        let formula = format!(r#"contains({probe}, cidr("10.20.30.40/28"))"#);
        assert_eq!(evaluate(&formula, &json!({})).unwrap(), 1.0, "{formula}");
    }
    for probe in outside {
        let formula = format!(r#"contains({probe}, cidr("10.20.30.40/28"))"#);
        assert_eq!(evaluate(&formula, &json!({})).unwrap(), 0.0, "{formula}");
    }
}

#[test]
fn arithmetic_promotion_property() {
    // Float on either side promotes the result.
    assert_eq!(eval("plus(1, 2)"), 3.0);
    assert_eq!(eval("eq(plus(1, 2), 3)"), 1.0);
    assert_eq!(eval("eq(plus(1.0, 2), 3.0)"), 1.0);
    // div promotes exactly when integer division is inexact.
    assert_eq!(eval("eq(div(8, 2), 4)"), 1.0);
    assert_eq!(eval("eq(div(7, 8), 0.875)"), 1.0);
}

// ===========================================================================
// Distribution
// ===========================================================================

/// The core hands a stable frequency to an external bucketing hash; with
/// 5000 identifiers and a 0.2 frequency the hit count must land within
/// ±10% of 1000.
#[test]
fn bucketing_distribution_over_random_identifiers() {
    let frequency = evaluate("0.2", &json!({})).unwrap();

    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut hits = 0i64;
    for _ in 0..5000 {
        let rollout_id = format!("ctx-{:016x}", rng.random::<u64>());
        let bucket = (xxh3_64(rollout_id.as_bytes()) % 10_000) as f32 / 10_000.0;
        if bucket < frequency {
            hits += 1;
        }
    }
    assert!((hits - 1000).abs() <= 100, "hit count {hits} outside ±10%");
}

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use orion_error::StructError;
use regex::Regex;
use serde_json::Value as Json;
use tracing::{debug, trace};

use ff_lang::ast::Expr;
use ff_lang::parse_formula;

use crate::env;
use crate::error::{CoreReason, CoreResult};
use crate::net::{parse_cidr, parse_ipv4};
use crate::value::Value;

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// A formula compiled to its expression tree, ready for repeated evaluation.
///
/// The tree and the environment are read-only during evaluation, so a
/// `Formula` may be shared freely across threads.
#[derive(Debug, Clone)]
pub struct Formula {
    root: Expr,
}

impl Formula {
    /// Parse `text` into a compiled formula.
    pub fn parse(text: &str) -> CoreResult<Formula> {
        match parse_formula(text) {
            Ok(root) => Ok(Formula { root }),
            Err(e) => StructError::from(CoreReason::Parse)
                .with_detail(e.to_string())
                .err(),
        }
    }

    /// Evaluate against `env` and project the result onto the frequency
    /// scale.
    pub fn evaluate(&self, env: &Json) -> CoreResult<f32> {
        let value = eval_expr(&self.root, env)?;
        let frequency = project(&value);
        trace!(%value, frequency, "formula evaluated");
        Ok(frequency)
    }
}

/// True iff `formula` parses.
pub fn validate(formula: &str) -> bool {
    let ok = parse_formula(formula).is_ok();
    debug!(ok, "formula validated");
    ok
}

/// Parse `formula` and evaluate it against `env`, returning the frequency
/// the caller feeds into the rollout bucketing step.
///
/// Any parse, type, arity, or domain failure fails the whole call; no
/// partial result is ever returned.
pub fn evaluate(formula: &str, env: &Json) -> CoreResult<f32> {
    Formula::parse(formula)?.evaluate(env)
}

/// Project an evaluated value onto the frequency scale.
///
/// Booleans map to 0/1, numbers cast to f32, strings parse as f32 (falling
/// back to 0), everything else is 0. No clamping is performed here; the
/// bucketing step owns saturation.
pub fn project(value: &Value) -> f32 {
    match value {
        Value::Bool(true) => 1.0,
        Value::Bool(false) => 0.0,
        Value::Int(i) => *i as f32,
        Value::Float(f) => *f as f32,
        Value::Str(s) => s.parse().unwrap_or(0.0),
        Value::Null | Value::List(_) | Value::Range(..) => 0.0,
    }
}

// ---------------------------------------------------------------------------
// Node reduction
// ---------------------------------------------------------------------------

/// Reduce one expression node against the environment.
fn eval_expr(expr: &Expr, env: &Json) -> CoreResult<Value> {
    match expr {
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::Int(i) => Ok(Value::Int(*i)),
        Expr::Float(f) => Ok(Value::Float(*f)),
        Expr::Str(s) => Ok(Value::Str(s.clone())),
        Expr::EnvGet(key) => {
            let key = str_arg(eval_expr(key, env)?, "env[...] key")?;
            Ok(env::lookup(env, &key))
        }
        Expr::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(eval_expr(item, env)?);
            }
            Ok(Value::List(out))
        }
        Expr::Range(lo, hi) => {
            let lo = int_arg(eval_expr(lo, env)?, "range lower bound")?;
            let hi = int_arg(eval_expr(hi, env)?, "range upper bound")?;
            if lo > hi {
                return StructError::from(CoreReason::Domain)
                    .with_detail(format!("inverted range [{lo}:{hi}]"))
                    .err();
            }
            Ok(Value::Range(lo, hi))
        }
        Expr::Call { name, args } => eval_call(&name.to_ascii_lowercase(), args, env),
        other => type_error(format!("unsupported expression {other:?}")),
    }
}

// ---------------------------------------------------------------------------
// Builtin dispatch
// ---------------------------------------------------------------------------

fn eval_call(name: &str, args: &[Expr], env: &Json) -> CoreResult<Value> {
    trace!(func = name, argc = args.len(), "builtin dispatch");
    match name {
        // Info
        "isblank" => {
            expect_arity(name, args, 1)?;
            Ok(Value::Bool(eval_expr(&args[0], env)?.is_blank()))
        }

        // Comparison
        "eq" => {
            expect_arity(name, args, 2)?;
            let lhs = eval_expr(&args[0], env)?;
            let rhs = eval_expr(&args[1], env)?;
            Ok(Value::Bool(lhs.structural_eq(&rhs)))
        }
        "gt" => eval_ordering(Cmp::Gt, args, env),
        "gte" => eval_ordering(Cmp::Gte, args, env),
        "lt" => eval_ordering(Cmp::Lt, args, env),
        "lte" => eval_ordering(Cmp::Lte, args, env),

        // Date/time
        "now" => {
            expect_arity(name, args, 0)?;
            Ok(Value::Int(Utc::now().timestamp()))
        }
        "datetime" => {
            expect_arity(name, args, 1)?;
            let text = str_arg(eval_expr(&args[0], env)?, "datetime argument")?;
            Ok(Value::Int(parse_datetime(&text)?))
        }

        // IPv4
        "ip" => {
            expect_arity(name, args, 1)?;
            let text = str_arg(eval_expr(&args[0], env)?, "ip argument")?;
            Ok(Value::Int(i64::from(parse_ipv4(&text)?)))
        }
        "cidr" => {
            expect_arity(name, args, 1)?;
            let text = str_arg(eval_expr(&args[0], env)?, "cidr argument")?;
            let (network, broadcast) = parse_cidr(&text)?;
            Ok(Value::Range(i64::from(network), i64::from(broadcast)))
        }

        // Text
        "matches" => {
            expect_arity(name, args, 2)?;
            let text = str_arg(eval_expr(&args[0], env)?, "matches text")?;
            let pattern = str_arg(eval_expr(&args[1], env)?, "matches pattern")?;
            // Whole-string semantics: anchor the pattern before compiling.
            let re = Regex::new(&format!("^(?:{pattern})$")).map_err(|e| {
                StructError::from(CoreReason::Domain)
                    .with_detail(format!("invalid pattern {pattern:?}: {e}"))
            })?;
            Ok(Value::Bool(re.is_match(&text)))
        }

        // Collections
        "contains" => eval_contains(args, env),

        // Logic
        "not" => {
            expect_arity(name, args, 1)?;
            let b = bool_arg(eval_expr(&args[0], env)?, "not argument")?;
            Ok(Value::Bool(!b))
        }
        "and" | "or" => eval_logic(name, args, env),
        "if" => {
            expect_arity(name, args, 3)?;
            let cond = bool_arg(eval_expr(&args[0], env)?, "if condition")?;
            // Only the selected branch is evaluated.
            if cond {
                eval_expr(&args[1], env)
            } else {
                eval_expr(&args[2], env)
            }
        }

        // Arithmetic
        "plus" => eval_arithmetic(Arith::Plus, args, env),
        "minus" => eval_arithmetic(Arith::Minus, args, env),
        "times" => eval_arithmetic(Arith::Times, args, env),
        "div" => eval_arithmetic(Arith::Div, args, env),
        "rem" => eval_arithmetic(Arith::Rem, args, env),

        // Math
        "log" => {
            if args.len() != 1 && args.len() != 2 {
                return arity_error(format!(
                    "log expects 1 or 2 arguments, got {}",
                    args.len()
                ));
            }
            let x = num_arg(eval_expr(&args[0], env)?, "log argument")?;
            if x <= 0.0 {
                return math_error(format!("log of non-positive value {x}"));
            }
            let out = if args.len() == 2 {
                let base = num_arg(eval_expr(&args[1], env)?, "log base")?;
                if base <= 0.0 || (base - 1.0).abs() < f64::EPSILON {
                    return math_error(format!("invalid log base {base}"));
                }
                x.log(base)
            } else {
                x.log10()
            };
            Ok(Value::Float(out))
        }
        "ln" => {
            expect_arity(name, args, 1)?;
            let x = num_arg(eval_expr(&args[0], env)?, "ln argument")?;
            if x <= 0.0 {
                return math_error(format!("ln of non-positive value {x}"));
            }
            Ok(Value::Float(x.ln()))
        }
        "pow" => {
            expect_arity(name, args, 2)?;
            let x = num_arg(eval_expr(&args[0], env)?, "pow base")?;
            let y = num_arg(eval_expr(&args[1], env)?, "pow exponent")?;
            let out = x.powf(y);
            if !out.is_finite() {
                return math_error(format!("pow({x}, {y}) is not finite"));
            }
            Ok(Value::Float(out))
        }
        "exp" => {
            expect_arity(name, args, 1)?;
            let x = num_arg(eval_expr(&args[0], env)?, "exp argument")?;
            let out = x.exp();
            if !out.is_finite() {
                return math_error(format!("exp({x}) is not finite"));
            }
            Ok(Value::Float(out))
        }
        "map" => {
            expect_arity(name, args, 5)?;
            let x = num_arg(eval_expr(&args[0], env)?, "map value")?;
            let in_lo = num_arg(eval_expr(&args[1], env)?, "map input lower bound")?;
            let in_hi = num_arg(eval_expr(&args[2], env)?, "map input upper bound")?;
            let out_lo = num_arg(eval_expr(&args[3], env)?, "map output lower bound")?;
            let out_hi = num_arg(eval_expr(&args[4], env)?, "map output upper bound")?;
            if in_hi == in_lo {
                return math_error(format!("map input interval [{in_lo}, {in_hi}] is empty"));
            }
            // Linear remap, no clamping.
            let out = (x - in_lo) / (in_hi - in_lo) * (out_hi - out_lo) + out_lo;
            Ok(Value::Float(out))
        }

        _ => StructError::from(CoreReason::UnknownFunction)
            .with_detail(format!("unknown function {name:?}"))
            .err(),
    }
}

// ---------------------------------------------------------------------------
// Ordering comparisons
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
enum Cmp {
    Gt,
    Gte,
    Lt,
    Lte,
}

impl Cmp {
    fn name(self) -> &'static str {
        match self {
            Cmp::Gt => "gt",
            Cmp::Gte => "gte",
            Cmp::Lt => "lt",
            Cmp::Lte => "lte",
        }
    }
}

/// Ordering comparisons require mutually comparable scalars: both numeric,
/// both string, or both bool. Anything mixed is a type error.
fn eval_ordering(cmp: Cmp, args: &[Expr], env: &Json) -> CoreResult<Value> {
    expect_arity(cmp.name(), args, 2)?;
    let lhs = eval_expr(&args[0], env)?;
    let rhs = eval_expr(&args[1], env)?;
    let ordering = match (&lhs, &rhs) {
        (Value::Int(a), Value::Int(b)) => a.cmp(b),
        (Value::Str(a), Value::Str(b)) => a.cmp(b),
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        _ => match (lhs.as_number(), rhs.as_number()) {
            (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(std::cmp::Ordering::Equal),
            _ => {
                return type_error(format!(
                    "{} cannot compare {} to {}",
                    cmp.name(),
                    lhs.kind(),
                    rhs.kind()
                ));
            }
        },
    };
    let pass = match cmp {
        Cmp::Gt => ordering.is_gt(),
        Cmp::Gte => ordering.is_ge(),
        Cmp::Lt => ordering.is_lt(),
        Cmp::Lte => ordering.is_le(),
    };
    Ok(Value::Bool(pass))
}

// ---------------------------------------------------------------------------
// Collections
// ---------------------------------------------------------------------------

/// `contains(needle, haystack)`: structural equality over lists, bound
/// checks over ranges. The argument order is never commuted; a
/// non-collection haystack is a type error.
fn eval_contains(args: &[Expr], env: &Json) -> CoreResult<Value> {
    expect_arity("contains", args, 2)?;
    let needle = eval_expr(&args[0], env)?;
    let haystack = eval_expr(&args[1], env)?;
    match &haystack {
        Value::List(items) => Ok(Value::Bool(items.iter().any(|v| v.structural_eq(&needle)))),
        Value::Range(lo, hi) => match needle {
            Value::Int(i) => Ok(Value::Bool(*lo <= i && i <= *hi)),
            Value::Float(f) => Ok(Value::Bool(*lo as f64 <= f && f <= *hi as f64)),
            other => type_error(format!(
                "contains needle for a range must be numeric, got {}",
                other.kind()
            )),
        },
        other => type_error(format!(
            "contains haystack must be a list or range, got {}",
            other.kind()
        )),
    }
}

// ---------------------------------------------------------------------------
// Logic
// ---------------------------------------------------------------------------

/// Variadic `and`/`or`. Every argument is evaluated (no short-circuit), and
/// every argument must be a bool.
fn eval_logic(name: &str, args: &[Expr], env: &Json) -> CoreResult<Value> {
    if args.len() < 2 {
        return arity_error(format!(
            "{name} expects at least 2 arguments, got {}",
            args.len()
        ));
    }
    let mut flags = Vec::with_capacity(args.len());
    for arg in args {
        flags.push(bool_arg(eval_expr(arg, env)?, name)?);
    }
    let out = match name {
        "and" => flags.iter().all(|b| *b),
        _ => flags.iter().any(|b| *b),
    };
    Ok(Value::Bool(out))
}

// ---------------------------------------------------------------------------
// Arithmetic
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
enum Arith {
    Plus,
    Minus,
    Times,
    Div,
    Rem,
}

impl Arith {
    fn name(self) -> &'static str {
        match self {
            Arith::Plus => "plus",
            Arith::Minus => "minus",
            Arith::Times => "times",
            Arith::Div => "div",
            Arith::Rem => "rem",
        }
    }
}

/// Two-argument arithmetic with the promotion rules: two Ints stay in i64
/// (except inexact `div`), any Float promotes both sides to f64.
fn eval_arithmetic(op: Arith, args: &[Expr], env: &Json) -> CoreResult<Value> {
    expect_arity(op.name(), args, 2)?;
    let lhs = eval_expr(&args[0], env)?;
    let rhs = eval_expr(&args[1], env)?;
    match (&lhs, &rhs) {
        (Value::Int(a), Value::Int(b)) => int_arithmetic(op, *a, *b),
        _ => {
            let a = num_arg(lhs, op.name())?;
            let b = num_arg(rhs, op.name())?;
            float_arithmetic(op, a, b)
        }
    }
}

fn int_arithmetic(op: Arith, a: i64, b: i64) -> CoreResult<Value> {
    let out = match op {
        Arith::Plus => a.checked_add(b),
        Arith::Minus => a.checked_sub(b),
        Arith::Times => a.checked_mul(b),
        Arith::Div => {
            if b == 0 {
                return math_error(format!("div({a}, {b}): division by zero"));
            }
            match a.checked_rem(b) {
                // Inexact integer division promotes to float.
                Some(r) if r != 0 => return Ok(Value::Float(a as f64 / b as f64)),
                Some(_) => a.checked_div(b),
                None => None,
            }
        }
        Arith::Rem => {
            if b == 0 {
                return math_error(format!("rem({a}, {b}): division by zero"));
            }
            a.checked_rem(b)
        }
    };
    match out {
        Some(v) => Ok(Value::Int(v)),
        None => math_error(format!("integer overflow in {}({a}, {b})", op.name())),
    }
}

fn float_arithmetic(op: Arith, a: f64, b: f64) -> CoreResult<Value> {
    let out = match op {
        Arith::Plus => a + b,
        Arith::Minus => a - b,
        Arith::Times => a * b,
        Arith::Div => {
            if b == 0.0 {
                return math_error(format!("div({a}, {b}): division by zero"));
            }
            a / b
        }
        Arith::Rem => {
            if b == 0.0 {
                return math_error(format!("rem({a}, {b}): division by zero"));
            }
            a % b
        }
    };
    Ok(Value::Float(out))
}

// ---------------------------------------------------------------------------
// Date/time parsing
// ---------------------------------------------------------------------------

/// Parse a datetime string to Unix epoch seconds.
///
/// Accepted forms, tried in order: RFC-3339 instant with offset, naive
/// date-time taken as UTC, date-only taken as UTC midnight.
fn parse_datetime(text: &str) -> CoreResult<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.timestamp());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S") {
        return Ok(dt.and_utc().timestamp());
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d")
        && let Some(dt) = date.and_hms_opt(0, 0, 0)
    {
        return Ok(dt.and_utc().timestamp());
    }
    StructError::from(CoreReason::Domain)
        .with_detail(format!("invalid datetime {text:?}"))
        .err()
}

// ---------------------------------------------------------------------------
// Argument helpers
// ---------------------------------------------------------------------------

fn expect_arity(name: &str, args: &[Expr], n: usize) -> CoreResult<()> {
    if args.len() == n {
        Ok(())
    } else {
        arity_error(format!(
            "{name} expects {n} argument(s), got {}",
            args.len()
        ))
    }
}

fn bool_arg(value: Value, what: &str) -> CoreResult<bool> {
    match value {
        Value::Bool(b) => Ok(b),
        other => type_error(format!("{what} must be a bool, got {}", other.kind())),
    }
}

fn int_arg(value: Value, what: &str) -> CoreResult<i64> {
    match value {
        Value::Int(i) => Ok(i),
        other => type_error(format!("{what} must be an integer, got {}", other.kind())),
    }
}

fn str_arg(value: Value, what: &str) -> CoreResult<String> {
    match value {
        Value::Str(s) => Ok(s),
        other => type_error(format!("{what} must be a string, got {}", other.kind())),
    }
}

fn num_arg(value: Value, what: &str) -> CoreResult<f64> {
    match value.as_number() {
        Some(n) => Ok(n),
        None => type_error(format!("{what} must be numeric, got {}", value.kind())),
    }
}

fn type_error<T>(detail: String) -> CoreResult<T> {
    StructError::from(CoreReason::Type).with_detail(detail).err()
}

fn arity_error<T>(detail: String) -> CoreResult<T> {
    StructError::from(CoreReason::Arity).with_detail(detail).err()
}

fn math_error<T>(detail: String) -> CoreResult<T> {
    StructError::from(CoreReason::Math).with_detail(detail).err()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

use std::fmt;

// ---------------------------------------------------------------------------
// Value domain
// ---------------------------------------------------------------------------

/// Runtime value produced and consumed by the evaluator.
///
/// Instances are transient: created during evaluation and dropped as the
/// recursion unwinds.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent or JSON-null environment lookup.
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Flat, ordered collection. Never nested.
    List(Vec<Value>),
    /// Inclusive integer range `[lo, hi]`; `lo <= hi` by construction.
    /// Membership-testable without materializing the span.
    Range(i64, i64),
}

impl Value {
    /// Value kind name for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Range(..) => "range",
        }
    }

    /// Numeric view: `Int` and `Float` promote to f64, everything else is not
    /// a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Structural equality: `Int` and `Float` compare by numeric value,
    /// lists element-wise, ranges by bounds. Mismatched kinds are unequal,
    /// never an error.
    pub fn structural_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => *a as f64 == *b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.structural_eq(y))
            }
            (Value::Range(lo_a, hi_a), Value::Range(lo_b, hi_b)) => lo_a == lo_b && hi_a == hi_b,
            _ => false,
        }
    }

    /// Blankness as tested by `isblank`: null, a whitespace-only string, or
    /// an empty collection. Numbers and booleans are never blank.
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Str(s) => s.chars().all(char::is_whitespace),
            Value::List(items) => items.is_empty(),
            Value::Range(lo, hi) => lo > hi,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => write!(f, "{s:?}"),
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
            Value::Range(lo, hi) => write!(f, "[{lo}:{hi}]"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

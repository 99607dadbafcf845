// ---------------------------------------------------------------------------
// Formula expressions
// ---------------------------------------------------------------------------

/// A node of a parsed rule formula.
///
/// The tree is immutable after parsing and free of back-references; its depth
/// is bounded by the formula length. Whoever holds the compiled formula owns
/// the tree.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Expr {
    /// Boolean literal: `true` or `false`.
    Bool(bool),
    /// Integer literal, e.g. `42` or `-7`.
    Int(i64),
    /// Float literal: any numeric literal containing a dot, e.g. `0.5` or `-.25`.
    Float(f64),
    /// String literal. Surrounding quotes are stripped; escape sequences are
    /// kept verbatim.
    Str(String),
    /// Environment lookup: `env["key"]`. The grammar only admits a string
    /// literal inside the brackets, so the inner expression is always `Str`.
    EnvGet(Box<Expr>),
    /// Array literal: `[e1, e2, ...]`.
    Array(Vec<Expr>),
    /// Inclusive integer range literal: `[lo : hi]`.
    Range(Box<Expr>, Box<Expr>),
    /// Function call: `name(args...)`.
    Call { name: String, args: Vec<Expr> },
}

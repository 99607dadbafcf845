use derive_more::From;
use orion_error::{ErrorCode, StructError, UvsReason};
use serde::Serialize;

/// Failure classes surfaced by formula evaluation.
///
/// Callers see a single invalid-argument error kind; the variant records
/// which stage rejected the formula.
#[derive(Debug, Clone, PartialEq, thiserror::Error, From, Serialize)]
pub enum CoreReason {
    #[error("formula parse error")]
    Parse,
    #[error("argument type error")]
    Type,
    #[error("argument arity error")]
    Arity,
    #[error("unknown function")]
    UnknownFunction,
    #[error("value domain error")]
    Domain,
    #[error("math error")]
    Math,
    #[error("{0}")]
    Uvs(UvsReason),
}

impl ErrorCode for CoreReason {
    fn error_code(&self) -> i32 {
        match self {
            Self::Parse => 1001,
            Self::Type => 1002,
            Self::Arity => 1003,
            Self::UnknownFunction => 1004,
            Self::Domain => 1005,
            Self::Math => 1006,
            Self::Uvs(u) => u.error_code(),
        }
    }
}

pub type CoreError = StructError<CoreReason>;
pub type CoreResult<T> = Result<T, CoreError>;

use std::fmt;

use thiserror::Error;

use crate::token::SourceLoc;

/// One variant per runtime failure class, each with its user-facing message.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RuntimeErrorKind {
    #[error("Undefined variable '{name}'")]
    UndefinedVariable { name: String },
    #[error("Cannot {op} {lhs} and {rhs}")]
    UnsupportedOperands {
        op: &'static str,
        lhs: &'static str,
        rhs: &'static str,
    },
    #[error("Cannot negate {type_name}")]
    CannotNegate { type_name: &'static str },
    #[error("Cannot apply unary + to {type_name}")]
    InvalidUnaryPlus { type_name: &'static str },
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Modulo by zero")]
    ModuloByZero,
    #[error("Expected numeric value, got {type_name}")]
    ExpectedNumber { type_name: &'static str },
    #[error("Index out of range")]
    IndexOutOfRange,
    #[error("String index out of range")]
    StringIndexOutOfRange,
    #[error("Key not found in dict")]
    KeyNotFound,
    #[error("Cannot index {type_name}")]
    NotIndexable { type_name: &'static str },
    #[error("Module '{module}' has no member '{member}'")]
    UnknownModuleMember { module: String, member: String },
    #[error("Cannot access member '{member}' on {type_name}")]
    UnknownMember {
        member: String,
        type_name: &'static str,
    },
    #[error("Cannot set member on {type_name}")]
    InvalidMemberTarget { type_name: &'static str },
    #[error("Invalid assignment target")]
    InvalidAssignmentTarget,
    #[error("Function '{name}' expected {expected} arguments, got {found}")]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("Object is not callable")]
    NotCallable,
    #[error("for: can only iterate over lists")]
    ForRequiresList,
    #[error("Cannot find module '{name}'")]
    ModuleNotFound { name: String },
    #[error("'ret' outside of function")]
    ReturnOutsideFunction,
    #[error("class '{name}' is not supported")]
    ClassUnsupported { name: String },
    #[error("Uncaught exception: {value}")]
    UncaughtException { value: String },
    #[error("{builtin}: expected {expected}")]
    BuiltinArity {
        builtin: &'static str,
        expected: &'static str,
    },
    #[error("{builtin}: unsupported type {type_name}")]
    BuiltinUnsupportedType {
        builtin: &'static str,
        type_name: &'static str,
    },
    #[error("{builtin}: expected string argument")]
    ExpectedStringArgument { builtin: &'static str },
    #[error("int: cannot convert '{value}' to int")]
    IntConversion { value: String },
    #[error("float: cannot convert '{value}' to float")]
    FloatConversion { value: String },
    #[error("range: step cannot be zero")]
    RangeStepZero,
    #[error("append: first argument must be a list")]
    AppendRequiresList,
    #[error("{builtin}: {message}")]
    Io {
        builtin: &'static str,
        message: String,
    },
    #[error("Interpreter invariant violated: {message}")]
    InvariantViolation { message: &'static str },
}

/// A runtime failure with the position it was raised at, when one is known.
/// `Display` appends the position; `message()` is the bare text that
/// `except` binds.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
    pub loc: Option<SourceLoc>,
}

impl RuntimeError {
    pub fn new(kind: RuntimeErrorKind) -> Self {
        Self { kind, loc: None }
    }

    pub fn at(kind: RuntimeErrorKind, loc: SourceLoc) -> Self {
        Self {
            kind,
            loc: Some(loc),
        }
    }

    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(loc) = self.loc {
            write!(f, " at {loc}")?;
        }
        Ok(())
    }
}

impl std::error::Error for RuntimeError {}

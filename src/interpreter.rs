//! Tree-walking evaluator and embedding surface.
//!
//! The interpreter owns the global environment, the builtin registry, the
//! module cache and the output sink. Evaluation itself lives in `runtime`;
//! the value model in `value`; operator semantics in `ops`.

mod builtins;
mod env;
mod error;
mod ops;
mod runtime;
mod source;
mod value;

pub use builtins::Builtin;
pub use env::Environment;
pub use error::{RuntimeError, RuntimeErrorKind};
pub use runtime::Signal;
pub use source::{DirSource, MemorySource, SourceProvider};
pub use value::{BoundMethod, Function, Method, Module, Value};

use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;

use crate::ast::Program;
use crate::error::Error;
use crate::{lexer, parser};

pub struct Interpreter {
    global_env: Rc<Environment>,
    module_cache: HashMap<String, Value>,
    provider: Box<dyn SourceProvider>,
    output: String,
    capture: bool,
}

impl Interpreter {
    /// A fresh interpreter with builtins and the builtin `io`/`fs` modules
    /// registered. User modules resolve against the current directory until
    /// a base directory or provider is configured.
    pub fn new() -> Self {
        let global_env = Environment::new();
        builtins::register_globals(&global_env);
        let mut module_cache = HashMap::new();
        module_cache.insert("io".to_string(), builtins::io_module());
        module_cache.insert("fs".to_string(), builtins::fs_module());
        Self {
            global_env,
            module_cache,
            provider: Box::new(DirSource::new(".")),
            output: String::new(),
            capture: false,
        }
    }

    /// Resolves `imp name` against `<dir>/<name>.boa`.
    pub fn set_base_dir(&mut self, dir: impl Into<PathBuf>) {
        self.provider = Box::new(DirSource::new(dir));
    }

    pub fn set_source_provider(&mut self, provider: impl SourceProvider + 'static) {
        self.provider = Box::new(provider);
    }

    /// When capturing, printed text accumulates in a buffer instead of
    /// going to stdout.
    pub fn set_capture_output(&mut self, capture: bool) {
        self.capture = capture;
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn clear_output(&mut self) {
        self.output.clear();
    }

    /// Reads a global binding, if present.
    pub fn global(&self, name: &str) -> Option<Value> {
        self.global_env.get(name)
    }

    /// Lexes, parses and executes source against the persistent global
    /// environment; returns the value of the last statement.
    pub fn run(&mut self, source: &str) -> Result<Value, Error> {
        let tokens = lexer::tokenize(source)?;
        let program = parser::parse_tokens(tokens)?;
        self.exec(&program)
    }

    pub fn exec(&mut self, program: &Program) -> Result<Value, Error> {
        let globals = Rc::clone(&self.global_env);
        match self.exec_block(&program.statements, &globals) {
            Ok(value) => Ok(value),
            Err(Signal::Error(error)) => Err(Error::Runtime(error)),
            Err(Signal::Fatal(error)) => Err(error),
            Err(Signal::Return(_)) => Err(Error::Runtime(RuntimeError::new(
                RuntimeErrorKind::ReturnOutsideFunction,
            ))),
            Err(Signal::Raise(value)) => Err(Error::Runtime(RuntimeError::new(
                RuntimeErrorKind::UncaughtException {
                    value: value.to_display(),
                },
            ))),
            Err(Signal::Break | Signal::Continue) => Err(Error::Runtime(RuntimeError::new(
                RuntimeErrorKind::InvariantViolation {
                    message: "loop signal escaped the evaluator",
                },
            ))),
        }
    }

    fn print_output(&mut self, text: &str) {
        if self.capture {
            self.output.push_str(text);
        } else {
            print!("{text}");
        }
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

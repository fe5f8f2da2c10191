use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::rc::Rc;

use super::env::Environment;
use super::error::RuntimeErrorKind;
use super::value::{Module, Value};

/// Every builtin callable: the globals plus the members of the builtin
/// `io` and `fs` modules. Dispatch happens in the executor, which owns the
/// output sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    Print,
    Len,
    Str,
    Int,
    Float,
    Type,
    Range,
    Append,
    Input,
    ReadText,
    WriteText,
    ReadAllBytes,
    WriteAllBytes,
}

impl Builtin {
    pub fn name(self) -> &'static str {
        match self {
            Self::Print => "print",
            Self::Len => "len",
            Self::Str => "str",
            Self::Int => "int",
            Self::Float => "float",
            Self::Type => "type",
            Self::Range => "range",
            Self::Append => "append",
            Self::Input => "io.input",
            Self::ReadText => "fs.read_text",
            Self::WriteText => "fs.write_text",
            Self::ReadAllBytes => "fs.read_all_bytes",
            Self::WriteAllBytes => "fs.write_all_bytes",
        }
    }
}

/// Seeds the global environment with the builtin functions.
pub(super) fn register_globals(globals: &Rc<Environment>) {
    for builtin in [
        Builtin::Print,
        Builtin::Len,
        Builtin::Str,
        Builtin::Int,
        Builtin::Float,
        Builtin::Type,
        Builtin::Range,
        Builtin::Append,
    ] {
        globals.define(builtin.name(), Value::Builtin(builtin));
    }
}

pub(super) fn io_module() -> Value {
    let mut members = HashMap::new();
    members.insert("print".to_string(), Value::Builtin(Builtin::Print));
    members.insert("println".to_string(), Value::Builtin(Builtin::Print));
    members.insert("input".to_string(), Value::Builtin(Builtin::Input));
    Value::Module(Rc::new(RefCell::new(Module {
        name: "io".to_string(),
        members,
    })))
}

pub(super) fn fs_module() -> Value {
    let mut members = HashMap::new();
    members.insert("read_text".to_string(), Value::Builtin(Builtin::ReadText));
    members.insert("write_text".to_string(), Value::Builtin(Builtin::WriteText));
    members.insert(
        "read_all_bytes".to_string(),
        Value::Builtin(Builtin::ReadAllBytes),
    );
    members.insert(
        "write_all_bytes".to_string(),
        Value::Builtin(Builtin::WriteAllBytes),
    );
    Value::Module(Rc::new(RefCell::new(Module {
        name: "fs".to_string(),
        members,
    })))
}

/// Builtins with no interpreter-state dependency. `print` and `io.input`
/// are handled by the executor.
pub(super) fn call_pure(builtin: Builtin, args: &[Value]) -> Result<Value, RuntimeErrorKind> {
    match builtin {
        Builtin::Len => {
            let arg = single_arg(builtin, "1 argument", args)?;
            match arg {
                Value::Str(bytes) => Ok(Value::Int(bytes.len() as i64)),
                Value::List(values) => Ok(Value::Int(values.borrow().len() as i64)),
                Value::Dict(entries) => Ok(Value::Int(entries.borrow().len() as i64)),
                other => Err(RuntimeErrorKind::BuiltinUnsupportedType {
                    builtin: builtin.name(),
                    type_name: other.type_name(),
                }),
            }
        }
        Builtin::Str => {
            let arg = single_arg(builtin, "1 argument", args)?;
            match arg {
                Value::Str(_) => Ok(arg.clone()),
                other => Ok(Value::string(other.to_display())),
            }
        }
        Builtin::Int => {
            let arg = single_arg(builtin, "1 argument", args)?;
            match arg {
                Value::Int(_) => Ok(arg.clone()),
                Value::Float(value) => Ok(Value::Int(*value as i64)),
                Value::Bool(value) => Ok(Value::Int(i64::from(*value))),
                Value::Str(bytes) => {
                    let text = String::from_utf8_lossy(bytes);
                    text.trim()
                        .parse::<i64>()
                        .map(Value::Int)
                        .map_err(|_| RuntimeErrorKind::IntConversion {
                            value: text.into_owned(),
                        })
                }
                other => Err(RuntimeErrorKind::BuiltinUnsupportedType {
                    builtin: builtin.name(),
                    type_name: other.type_name(),
                }),
            }
        }
        Builtin::Float => {
            let arg = single_arg(builtin, "1 argument", args)?;
            match arg {
                Value::Float(_) => Ok(arg.clone()),
                Value::Int(value) => Ok(Value::Float(*value as f64)),
                Value::Bool(value) => Ok(Value::Float(if *value { 1.0 } else { 0.0 })),
                Value::Str(bytes) => {
                    let text = String::from_utf8_lossy(bytes);
                    text.trim()
                        .parse::<f64>()
                        .map(Value::Float)
                        .map_err(|_| RuntimeErrorKind::FloatConversion {
                            value: text.into_owned(),
                        })
                }
                other => Err(RuntimeErrorKind::BuiltinUnsupportedType {
                    builtin: builtin.name(),
                    type_name: other.type_name(),
                }),
            }
        }
        Builtin::Type => {
            let arg = single_arg(builtin, "1 argument", args)?;
            Ok(Value::string(arg.type_name()))
        }
        Builtin::Range => {
            let (start, stop, step) = match args {
                [stop] => (0, int_arg(stop)?, 1),
                [start, stop] => (int_arg(start)?, int_arg(stop)?, 1),
                [start, stop, step] => (int_arg(start)?, int_arg(stop)?, int_arg(step)?),
                _ => {
                    return Err(RuntimeErrorKind::BuiltinArity {
                        builtin: builtin.name(),
                        expected: "1-3 arguments",
                    });
                }
            };
            if step == 0 {
                return Err(RuntimeErrorKind::RangeStepZero);
            }
            let mut values = Vec::new();
            let mut i = start;
            if step > 0 {
                while i < stop {
                    values.push(Value::Int(i));
                    i = i.wrapping_add(step);
                }
            } else {
                while i > stop {
                    values.push(Value::Int(i));
                    i = i.wrapping_add(step);
                }
            }
            Ok(Value::list(values))
        }
        Builtin::Append => {
            if args.len() != 2 {
                return Err(RuntimeErrorKind::BuiltinArity {
                    builtin: builtin.name(),
                    expected: "2 arguments (list, value)",
                });
            }
            match &args[0] {
                Value::List(values) => {
                    values.borrow_mut().push(args[1].clone());
                    Ok(Value::None)
                }
                _ => Err(RuntimeErrorKind::AppendRequiresList),
            }
        }
        Builtin::ReadText => {
            let path = path_arg(builtin, args)?;
            fs::read_to_string(&path)
                .map(Value::string)
                .map_err(|_| open_failed(builtin, &path))
        }
        Builtin::ReadAllBytes => {
            let path = path_arg(builtin, args)?;
            fs::read(&path)
                .map(Value::string)
                .map_err(|_| open_failed(builtin, &path))
        }
        Builtin::WriteText | Builtin::WriteAllBytes => {
            if args.len() < 2 {
                return Err(RuntimeErrorKind::BuiltinArity {
                    builtin: builtin.name(),
                    expected: if builtin == Builtin::WriteText {
                        "(filename, text)"
                    } else {
                        "(filename, data)"
                    },
                });
            }
            let path = path_arg(builtin, args)?;
            fs::write(&path, args[1].to_output_bytes())
                .map(|_| Value::None)
                .map_err(|_| open_failed(builtin, &path))
        }
        Builtin::Print | Builtin::Input => Err(RuntimeErrorKind::InvariantViolation {
            message: "print and input are dispatched by the executor",
        }),
    }
}

fn single_arg<'a>(
    builtin: Builtin,
    expected: &'static str,
    args: &'a [Value],
) -> Result<&'a Value, RuntimeErrorKind> {
    if args.len() == 1 {
        Ok(&args[0])
    } else {
        Err(RuntimeErrorKind::BuiltinArity {
            builtin: builtin.name(),
            expected,
        })
    }
}

fn int_arg(value: &Value) -> Result<i64, RuntimeErrorKind> {
    value
        .as_number()
        .map(|n| n as i64)
        .ok_or(RuntimeErrorKind::ExpectedNumber {
            type_name: value.type_name(),
        })
}

fn path_arg(builtin: Builtin, args: &[Value]) -> Result<String, RuntimeErrorKind> {
    match args.first() {
        Some(Value::Str(bytes)) => Ok(String::from_utf8_lossy(bytes).into_owned()),
        _ => Err(RuntimeErrorKind::ExpectedStringArgument {
            builtin: builtin.name(),
        }),
    }
}

fn open_failed(builtin: Builtin, path: &str) -> RuntimeErrorKind {
    RuntimeErrorKind::Io {
        builtin: builtin.name(),
        message: format!("cannot open file '{path}'"),
    }
}

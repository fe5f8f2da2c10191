use std::cmp::Ordering;
use std::io::BufRead;
use std::rc::Rc;

use crate::ast::{AssignOp, BinaryOp, Expr, ExprKind, Stmt, StmtKind, UnaryOp};
use crate::error::Error;
use crate::token::SourceLoc;
use crate::{lexer, parser};

use super::builtins::{self, Builtin};
use super::env::Environment;
use super::error::{RuntimeError, RuntimeErrorKind};
use super::ops;
use super::value::{BoundMethod, Function, Method, Module, Value};
use super::Interpreter;

/// Non-local exits, threaded through evaluation as the `Err` arm of a
/// `Result` so `?` propagates them. Loops absorb `Break`/`Continue`, calls
/// absorb `Return`, `try` absorbs `Error` and `Raise`. `Raise` is the slot
/// for user-raised values (no v1 syntax produces one, but `try` already
/// binds its payload). `Fatal` carries a lex or parse failure out of a
/// module load past every `try`.
#[derive(Debug)]
pub enum Signal {
    Return(Value),
    Break,
    Continue,
    Raise(Value),
    Error(RuntimeError),
    Fatal(Error),
}

impl From<RuntimeError> for Signal {
    fn from(error: RuntimeError) -> Self {
        Signal::Error(error)
    }
}

pub(super) type Eval = Result<Value, Signal>;

fn fail(kind: RuntimeErrorKind, loc: SourceLoc) -> Signal {
    Signal::Error(RuntimeError::at(kind, loc))
}

impl Interpreter {
    /// Runs statements in order. The block's value is the value of its last
    /// statement, `none` when it is empty.
    pub(super) fn exec_block(&mut self, statements: &[Stmt], env: &Rc<Environment>) -> Eval {
        let mut result = Value::None;
        for statement in statements {
            result = self.exec_statement(statement, env)?;
        }
        Ok(result)
    }

    fn exec_statement(&mut self, statement: &Stmt, env: &Rc<Environment>) -> Eval {
        match &statement.kind {
            StmtKind::Expr(expr) => self.eval_expr(expr, env),
            StmtKind::Pass => Ok(Value::None),
            StmtKind::Assign { target, op, value } => {
                self.eval_assign(statement.loc, target, *op, value, env)
            }
            StmtKind::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval_expr(expr, env)?,
                    None => Value::None,
                };
                Err(Signal::Return(value))
            }
            StmtKind::FnDef { name, params, body } => {
                let function = Value::Function(Rc::new(Function {
                    name: name.clone(),
                    params: params.clone(),
                    body: Rc::clone(body),
                    closure: Rc::clone(env),
                }));
                env.define(name, function.clone());
                Ok(function)
            }
            StmtKind::If {
                condition,
                body,
                elif_clauses,
                else_body,
            } => {
                if self.eval_expr(condition, env)?.is_truthy() {
                    return self.exec_block(body, env);
                }
                for clause in elif_clauses {
                    if self.eval_expr(&clause.condition, env)?.is_truthy() {
                        return self.exec_block(&clause.body, env);
                    }
                }
                if !else_body.is_empty() {
                    return self.exec_block(else_body, env);
                }
                Ok(Value::None)
            }
            StmtKind::For {
                var,
                iterable,
                body,
            } => {
                let iterable = self.eval_expr(iterable, env)?;
                // Iterate a snapshot so a body that mutates the list cannot
                // invalidate the traversal.
                let items = match &iterable {
                    Value::List(values) => values.borrow().clone(),
                    _ => return Err(fail(RuntimeErrorKind::ForRequiresList, statement.loc)),
                };
                let mut result = Value::None;
                for item in items {
                    env.assign(var, item);
                    match self.exec_block(body, env) {
                        Ok(value) => result = value,
                        Err(Signal::Break) => break,
                        Err(Signal::Continue) => continue,
                        Err(other) => return Err(other),
                    }
                }
                Ok(result)
            }
            StmtKind::While { condition, body } => {
                let mut result = Value::None;
                while self.eval_expr(condition, env)?.is_truthy() {
                    match self.exec_block(body, env) {
                        Ok(value) => result = value,
                        Err(Signal::Break) => break,
                        Err(Signal::Continue) => continue,
                        Err(other) => return Err(other),
                    }
                }
                Ok(result)
            }
            StmtKind::Try {
                body,
                except,
                finally_body,
            } => {
                let outcome = self.exec_block(body, env);
                let result = match outcome {
                    Err(Signal::Error(error)) => match except {
                        Some(clause) => {
                            if let Some(var) = &clause.var {
                                env.assign(var, Value::string(error.message()));
                            }
                            self.exec_block(&clause.body, env)
                        }
                        None => Err(Signal::Error(error)),
                    },
                    Err(Signal::Raise(value)) => match except {
                        Some(clause) => {
                            if let Some(var) = &clause.var {
                                env.assign(var, value);
                            }
                            self.exec_block(&clause.body, env)
                        }
                        None => Err(Signal::Raise(value)),
                    },
                    other => other,
                };
                if let Some(finally) = finally_body {
                    // The finally body always runs; a signal it produces
                    // replaces the pending outcome.
                    self.exec_block(finally, env)?;
                }
                result
            }
            StmtKind::Import(names) => {
                self.eval_import(statement.loc, names, env)?;
                Ok(Value::None)
            }
            StmtKind::ClassDef { name, .. } => Err(fail(
                RuntimeErrorKind::ClassUnsupported { name: name.clone() },
                statement.loc,
            )),
        }
    }

    fn eval_expr(&mut self, expr: &Expr, env: &Rc<Environment>) -> Eval {
        match &expr.kind {
            ExprKind::Number(value) => Ok(Value::from_number(*value)),
            ExprKind::Str(value) => Ok(Value::string(value.as_str())),
            ExprKind::Bool(value) => Ok(Value::Bool(*value)),
            ExprKind::None => Ok(Value::None),
            ExprKind::Identifier(name) => env.get(name).ok_or_else(|| {
                fail(
                    RuntimeErrorKind::UndefinedVariable { name: name.clone() },
                    expr.loc,
                )
            }),
            ExprKind::List(elements) => {
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    values.push(self.eval_expr(element, env)?);
                }
                Ok(Value::list(values))
            }
            ExprKind::Dict(entries) => {
                let mut values = Vec::with_capacity(entries.len());
                for (key, value) in entries {
                    let key = self.eval_expr(key, env)?;
                    let value = self.eval_expr(value, env)?;
                    values.push((key, value));
                }
                Ok(Value::dict(values))
            }
            ExprKind::Binary { op, left, right } => {
                self.eval_binary(expr.loc, *op, left, right, env)
            }
            ExprKind::Unary { op, operand } => self.eval_unary(expr.loc, *op, operand, env),
            ExprKind::Index { object, index } => self.eval_index(expr.loc, object, index, env),
            ExprKind::Member { object, member } => {
                self.eval_member(expr.loc, object, member, env)
            }
            ExprKind::Call { callee, args } => {
                let callee = self.eval_expr(callee, env)?;
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval_expr(arg, env)?);
                }
                self.call_value(expr.loc, callee, values)
            }
        }
    }

    fn eval_binary(
        &mut self,
        loc: SourceLoc,
        op: BinaryOp,
        left: &Expr,
        right: &Expr,
        env: &Rc<Environment>,
    ) -> Eval {
        // `and`/`or` short-circuit and yield an operand, not a bool.
        match op {
            BinaryOp::And => {
                let lhs = self.eval_expr(left, env)?;
                if !lhs.is_truthy() {
                    return Ok(lhs);
                }
                return self.eval_expr(right, env);
            }
            BinaryOp::Or => {
                let lhs = self.eval_expr(left, env)?;
                if lhs.is_truthy() {
                    return Ok(lhs);
                }
                return self.eval_expr(right, env);
            }
            _ => {}
        }

        let lhs = self.eval_expr(left, env)?;
        let rhs = self.eval_expr(right, env)?;
        let result = match op {
            BinaryOp::Add => ops::add(&lhs, &rhs),
            BinaryOp::Sub => ops::sub(&lhs, &rhs),
            BinaryOp::Mul => ops::mul(&lhs, &rhs),
            BinaryOp::Div => ops::div(&lhs, &rhs),
            BinaryOp::Mod => ops::rem(&lhs, &rhs),
            BinaryOp::Pow => ops::pow(&lhs, &rhs),
            BinaryOp::Eq => Ok(Value::Bool(lhs.equals(&rhs))),
            BinaryOp::NotEq => Ok(Value::Bool(!lhs.equals(&rhs))),
            BinaryOp::Less => {
                ops::compare(&lhs, &rhs).map(|order| Value::Bool(order == Ordering::Less))
            }
            BinaryOp::LessEq => {
                ops::compare(&lhs, &rhs).map(|order| Value::Bool(order != Ordering::Greater))
            }
            BinaryOp::Greater => {
                ops::compare(&lhs, &rhs).map(|order| Value::Bool(order == Ordering::Greater))
            }
            BinaryOp::GreaterEq => {
                ops::compare(&lhs, &rhs).map(|order| Value::Bool(order != Ordering::Less))
            }
            BinaryOp::And | BinaryOp::Or => Err(RuntimeErrorKind::InvariantViolation {
                message: "short-circuit operator reached strict evaluation",
            }),
        };
        result.map_err(|kind| fail(kind, loc))
    }

    fn eval_unary(
        &mut self,
        loc: SourceLoc,
        op: UnaryOp,
        operand: &Expr,
        env: &Rc<Environment>,
    ) -> Eval {
        let value = self.eval_expr(operand, env)?;
        match op {
            UnaryOp::Neg => match value {
                Value::Int(v) => Ok(Value::Int(v.wrapping_neg())),
                Value::Float(v) => Ok(Value::Float(-v)),
                other => Err(fail(
                    RuntimeErrorKind::CannotNegate {
                        type_name: other.type_name(),
                    },
                    loc,
                )),
            },
            UnaryOp::Pos => match value {
                Value::Int(_) | Value::Float(_) => Ok(value),
                other => Err(fail(
                    RuntimeErrorKind::InvalidUnaryPlus {
                        type_name: other.type_name(),
                    },
                    loc,
                )),
            },
            UnaryOp::Not => Ok(Value::Bool(!value.is_truthy())),
        }
    }

    fn eval_index(
        &mut self,
        loc: SourceLoc,
        object: &Expr,
        index: &Expr,
        env: &Rc<Environment>,
    ) -> Eval {
        let object = self.eval_expr(object, env)?;
        let index = self.eval_expr(index, env)?;
        match &object {
            Value::List(values) => {
                let values = values.borrow();
                let i = resolve_index(
                    values.len(),
                    &index,
                    RuntimeErrorKind::IndexOutOfRange,
                    loc,
                )?;
                Ok(values[i].clone())
            }
            Value::Str(bytes) => {
                let i = resolve_index(
                    bytes.len(),
                    &index,
                    RuntimeErrorKind::StringIndexOutOfRange,
                    loc,
                )?;
                Ok(Value::string(vec![bytes[i]]))
            }
            Value::Dict(entries) => {
                for (key, value) in entries.borrow().iter() {
                    if key.equals(&index) {
                        return Ok(value.clone());
                    }
                }
                Err(fail(RuntimeErrorKind::KeyNotFound, loc))
            }
            other => Err(fail(
                RuntimeErrorKind::NotIndexable {
                    type_name: other.type_name(),
                },
                loc,
            )),
        }
    }

    fn eval_member(
        &mut self,
        loc: SourceLoc,
        object: &Expr,
        member: &str,
        env: &Rc<Environment>,
    ) -> Eval {
        let object = self.eval_expr(object, env)?;
        match &object {
            Value::Module(module) => {
                let module = module.borrow();
                module.members.get(member).cloned().ok_or_else(|| {
                    fail(
                        RuntimeErrorKind::UnknownModuleMember {
                            module: module.name.clone(),
                            member: member.to_string(),
                        },
                        loc,
                    )
                })
            }
            Value::List(values) => match member {
                "length" => Ok(Value::Int(values.borrow().len() as i64)),
                "append" => Ok(Value::Bound(Rc::new(BoundMethod {
                    receiver: object.clone(),
                    method: Method::Append,
                }))),
                _ => Err(fail(
                    RuntimeErrorKind::UnknownMember {
                        member: member.to_string(),
                        type_name: "list",
                    },
                    loc,
                )),
            },
            Value::Str(bytes) => match member {
                "length" => Ok(Value::Int(bytes.len() as i64)),
                "upper" => Ok(Value::Bound(Rc::new(BoundMethod {
                    receiver: object.clone(),
                    method: Method::Upper,
                }))),
                "lower" => Ok(Value::Bound(Rc::new(BoundMethod {
                    receiver: object.clone(),
                    method: Method::Lower,
                }))),
                _ => Err(fail(
                    RuntimeErrorKind::UnknownMember {
                        member: member.to_string(),
                        type_name: "string",
                    },
                    loc,
                )),
            },
            other => Err(fail(
                RuntimeErrorKind::UnknownMember {
                    member: member.to_string(),
                    type_name: other.type_name(),
                },
                loc,
            )),
        }
    }

    fn call_value(&mut self, loc: SourceLoc, callee: Value, args: Vec<Value>) -> Eval {
        match &callee {
            Value::Builtin(builtin) => self.call_builtin(loc, *builtin, args),
            Value::Bound(bound) => self.call_bound(loc, bound, args),
            Value::Function(function) => self.call_function(loc, function, args),
            _ => Err(fail(RuntimeErrorKind::NotCallable, loc)),
        }
    }

    fn call_function(&mut self, loc: SourceLoc, function: &Rc<Function>, args: Vec<Value>) -> Eval {
        if args.len() != function.params.len() {
            return Err(fail(
                RuntimeErrorKind::ArityMismatch {
                    name: function.name.clone(),
                    expected: function.params.len(),
                    found: args.len(),
                },
                loc,
            ));
        }
        let env = Environment::with_parent(&function.closure);
        for (param, value) in function.params.iter().zip(args) {
            env.define(param, value);
        }
        // The body's value is the implicit return; `ret` overrides it.
        match self.exec_block(&function.body, &env) {
            Ok(value) => Ok(value),
            Err(Signal::Return(value)) => Ok(value),
            Err(other) => Err(other),
        }
    }

    fn call_builtin(&mut self, loc: SourceLoc, builtin: Builtin, args: Vec<Value>) -> Eval {
        match builtin {
            Builtin::Print => {
                let line = args
                    .iter()
                    .map(Value::to_display)
                    .collect::<Vec<_>>()
                    .join(" ");
                self.print_output(&line);
                self.print_output("\n");
                Ok(Value::None)
            }
            Builtin::Input => {
                if let Some(prompt) = args.first() {
                    let prompt = prompt.to_display();
                    self.print_output(&prompt);
                }
                let mut line = String::new();
                std::io::stdin().lock().read_line(&mut line).map_err(|error| {
                    fail(
                        RuntimeErrorKind::Io {
                            builtin: "io.input",
                            message: error.to_string(),
                        },
                        loc,
                    )
                })?;
                while line.ends_with('\n') || line.ends_with('\r') {
                    line.pop();
                }
                Ok(Value::string(line))
            }
            other => builtins::call_pure(other, &args).map_err(|kind| fail(kind, loc)),
        }
    }

    fn call_bound(&mut self, loc: SourceLoc, bound: &BoundMethod, args: Vec<Value>) -> Eval {
        match bound.method {
            Method::Append => {
                if args.len() != 1 {
                    return Err(fail(
                        RuntimeErrorKind::BuiltinArity {
                            builtin: "append",
                            expected: "1 argument",
                        },
                        loc,
                    ));
                }
                match &bound.receiver {
                    Value::List(values) => {
                        let value = args.into_iter().next().unwrap_or(Value::None);
                        values.borrow_mut().push(value);
                        Ok(Value::None)
                    }
                    _ => Err(fail(
                        RuntimeErrorKind::InvariantViolation {
                            message: "append bound to a non-list receiver",
                        },
                        loc,
                    )),
                }
            }
            Method::Upper | Method::Lower => match &bound.receiver {
                Value::Str(bytes) => {
                    let converted: Vec<u8> = if bound.method == Method::Upper {
                        bytes.iter().map(|b| b.to_ascii_uppercase()).collect()
                    } else {
                        bytes.iter().map(|b| b.to_ascii_lowercase()).collect()
                    };
                    Ok(Value::string(converted))
                }
                _ => Err(fail(
                    RuntimeErrorKind::InvariantViolation {
                        message: "case conversion bound to a non-string receiver",
                    },
                    loc,
                )),
            },
        }
    }

    fn eval_assign(
        &mut self,
        loc: SourceLoc,
        target: &Expr,
        op: AssignOp,
        value: &Expr,
        env: &Rc<Environment>,
    ) -> Eval {
        let value = self.eval_expr(value, env)?;

        match &target.kind {
            ExprKind::Identifier(name) => {
                match op {
                    AssignOp::Set => env.assign(name, value.clone()),
                    _ => {
                        // Compound assignment requires an existing binding.
                        let existing = env.get(name).ok_or_else(|| {
                            fail(
                                RuntimeErrorKind::UndefinedVariable { name: name.clone() },
                                loc,
                            )
                        })?;
                        let combined = match op {
                            AssignOp::Add => ops::add(&existing, &value),
                            AssignOp::Sub => ops::sub(&existing, &value),
                            AssignOp::Mul => ops::mul(&existing, &value),
                            AssignOp::Div => ops::div(&existing, &value),
                            AssignOp::Set => Ok(value.clone()),
                        }
                        .map_err(|kind| fail(kind, loc))?;
                        env.assign(name, combined);
                    }
                }
                Ok(value)
            }
            ExprKind::Index { object, index } if op == AssignOp::Set => {
                let object = self.eval_expr(object, env)?;
                let index = self.eval_expr(index, env)?;
                match &object {
                    Value::List(values) => {
                        let mut values = values.borrow_mut();
                        let i = resolve_index(
                            values.len(),
                            &index,
                            RuntimeErrorKind::IndexOutOfRange,
                            loc,
                        )?;
                        values[i] = value.clone();
                    }
                    Value::Dict(entries) => {
                        let mut entries = entries.borrow_mut();
                        match entries.iter_mut().find(|(key, _)| key.equals(&index)) {
                            Some((_, slot)) => *slot = value.clone(),
                            None => entries.push((index, value.clone())),
                        }
                    }
                    other => {
                        return Err(fail(
                            RuntimeErrorKind::NotIndexable {
                                type_name: other.type_name(),
                            },
                            loc,
                        ));
                    }
                }
                Ok(value)
            }
            ExprKind::Member { object, member } if op == AssignOp::Set => {
                let object = self.eval_expr(object, env)?;
                match &object {
                    Value::Module(module) => {
                        module
                            .borrow_mut()
                            .members
                            .insert(member.clone(), value.clone());
                        Ok(value)
                    }
                    other => Err(fail(
                        RuntimeErrorKind::InvalidMemberTarget {
                            type_name: other.type_name(),
                        },
                        loc,
                    )),
                }
            }
            _ => Err(fail(RuntimeErrorKind::InvalidAssignmentTarget, loc)),
        }
    }

    fn eval_import(
        &mut self,
        loc: SourceLoc,
        names: &[String],
        env: &Rc<Environment>,
    ) -> Result<(), Signal> {
        for name in names {
            if let Some(module) = self.module_cache.get(name) {
                env.define(name, module.clone());
                continue;
            }

            let source = self.provider.source(name).ok_or_else(|| {
                fail(
                    RuntimeErrorKind::ModuleNotFound { name: name.clone() },
                    loc,
                )
            })?;

            // Frontend failures in a module abort the whole run; they are
            // not catchable by `try`.
            let tokens =
                lexer::tokenize(&source).map_err(|error| Signal::Fatal(Error::Lex(error)))?;
            let program = parser::parse_tokens(tokens)
                .map_err(|error| Signal::Fatal(Error::Parse(error)))?;

            let module_env = Environment::with_parent(&self.global_env);
            match self.exec_block(&program.statements, &module_env) {
                Ok(_) => {}
                Err(Signal::Return(_)) => {
                    return Err(fail(RuntimeErrorKind::ReturnOutsideFunction, loc));
                }
                Err(other) => return Err(other),
            }

            let module = Value::Module(Rc::new(std::cell::RefCell::new(Module {
                name: name.clone(),
                members: module_env.local_bindings(),
            })));
            self.module_cache.insert(name.clone(), module.clone());
            env.define(name, module);
        }
        Ok(())
    }
}

fn resolve_index(
    len: usize,
    index: &Value,
    out_of_range: RuntimeErrorKind,
    loc: SourceLoc,
) -> Result<usize, Signal> {
    let number = index.as_number().ok_or_else(|| {
        fail(
            RuntimeErrorKind::ExpectedNumber {
                type_name: index.type_name(),
            },
            loc,
        )
    })?;
    let mut i = number as i64;
    if i < 0 {
        i += len as i64;
    }
    if i < 0 || i >= len as i64 {
        return Err(fail(out_of_range, loc));
    }
    Ok(i as usize)
}

//! Tree-walking evaluator.

use std::error::Error;
use std::fmt;
use std::io;
use std::io::prelude::*;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::ast::{BinOp, BinOpKind, Expr, FunDef, LogicOp, Stmt};
use crate::ctx::Context;
use crate::diag::Position;
use crate::env::Env;
use crate::interner::Symbol;

/// A runtime value.
///
/// Numbers print in their shortest round-trip decimal form; integral values
/// print without a decimal point.
#[derive(Debug, PartialEq, Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(f64),
    Str(Rc<String>),
    Function(Function),
}

#[derive(Clone)]
pub struct Function {
    name: Symbol,
    body: FunctionBody,
}

#[derive(Clone)]
enum FunctionBody {
    Native(usize, fn(&[Value]) -> Value),
    User(Rc<FunDef>, Rc<Env>),
}

impl Function {
    fn arity(&self) -> usize {
        match &self.body {
            FunctionBody::Native(arity, _) => *arity,
            FunctionBody::User(def, _) => def.params.len(),
        }
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("arity", &self.arity())
            .finish()
    }
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Function {}

impl Value {
    /// Only `nil` and `false` are falsey.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::Str(s) => write!(f, "{}", s),
            Value::Function(func) => match &func.body {
                FunctionBody::Native(..) => write!(f, "<native fn>"),
                FunctionBody::User(..) => write!(f, "<fn {}>", func.name),
            },
        }
    }
}

/// Errors that abort evaluation.  Each carries the line of the operator
/// that raised it.
#[derive(Debug)]
pub enum RuntimeError {
    OperandMustBeNumber(Position),
    OperandsMustBeNumbers(Position),
    AddOperands(Position),
    UndefinedVariable(Position, String),
    NotCallable(Position),
    WrongArity(Position, usize, usize),
    Io(io::Error),
}

impl Error for RuntimeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RuntimeError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::OperandMustBeNumber(pos) => {
                write!(f, "[line {}] Operand must be a number.", pos)
            }
            RuntimeError::OperandsMustBeNumbers(pos) => {
                write!(f, "[line {}] Operands must be numbers.", pos)
            }
            RuntimeError::AddOperands(pos) => {
                write!(f, "[line {}] Operands must be two numbers or two strings.", pos)
            }
            RuntimeError::UndefinedVariable(pos, name) => {
                write!(f, "[line {}] Undefined variable '{}'.", pos, name)
            }
            RuntimeError::NotCallable(pos) => {
                write!(f, "[line {}] Can only call functions.", pos)
            }
            RuntimeError::WrongArity(pos, expected, got) => {
                write!(
                    f,
                    "[line {}] Expected {} arguments but got {}.",
                    pos, expected, got
                )
            }
            RuntimeError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl From<io::Error> for RuntimeError {
    fn from(e: io::Error) -> RuntimeError {
        RuntimeError::Io(e)
    }
}

/// Walks statement trees and carries the runtime state of one session.
#[derive(Debug)]
pub struct Evaluator<'t, W: Write> {
    output: &'t mut W,
    globals: Rc<Env>,

    // Set while a `return` unwinds towards its call frame.  Every composite
    // statement checks it and stops early; the call frame takes the value.
    returning: Option<Value>,
}

impl<'a, W: Write> Evaluator<'a, W> {
    pub fn new(output: &'a mut W, ctx: Rc<Context>) -> Evaluator<'a, W> {
        let globals = Env::new();
        let clock = ctx.symbol("clock");
        globals.define(
            &clock,
            Value::Function(Function {
                name: clock.clone(),
                body: FunctionBody::Native(0, native_clock),
            }),
        );
        Evaluator {
            output,
            globals,
            returning: None,
        }
    }

    /// Execute a program in the global scope.
    ///
    /// A `return` at top level stops the remaining statements; the session
    /// stays usable afterwards.
    pub fn run(&mut self, stmts: &[Stmt]) -> Result<(), RuntimeError> {
        let res = self.eval_stmts(stmts, self.globals.clone());
        self.returning = None;
        res
    }

    fn eval_stmts(&mut self, stmts: &[Stmt], env: Rc<Env>) -> Result<(), RuntimeError> {
        for stmt in stmts {
            self.eval_stmt(stmt, env.clone())?;
        }
        Ok(())
    }

    fn eval_stmt(&mut self, stmt: &Stmt, env: Rc<Env>) -> Result<(), RuntimeError> {
        if self.returning.is_some() {
            return Ok(());
        }

        match stmt {
            Stmt::Nop => (),
            Stmt::Expr(e) => {
                self.eval_expr(e, env)?;
            }
            Stmt::Print(e) => {
                let v = self.eval_expr(e, env)?;
                writeln!(self.output, "{}", v)?;
            }
            Stmt::VarDecl(sym, init) => {
                let val = self.eval_expr(init, env.clone())?;
                env.define(sym, val);
            }
            Stmt::FunDecl(def) => {
                env.define(
                    &def.name,
                    Value::Function(Function {
                        name: def.name.clone(),
                        body: FunctionBody::User(def.clone(), env.clone()),
                    }),
                );
            }
            Stmt::Block(stmts) => {
                self.eval_stmts(stmts, Env::with_parent(Some(env)))?;
            }
            Stmt::If(cond, then_branch, else_branch) => {
                if self.eval_expr(cond, env.clone())?.is_truthy() {
                    self.eval_stmt(then_branch, env)?;
                } else {
                    self.eval_stmt(else_branch, env)?;
                }
            }
            Stmt::While(cond, body) => {
                while self.eval_expr(cond, env.clone())?.is_truthy() {
                    self.eval_stmt(body, env.clone())?;
                    if self.returning.is_some() {
                        break;
                    }
                }
            }
            Stmt::Return(e) => {
                debug_assert!(self.returning.is_none());
                self.returning = Some(self.eval_expr(e, env)?);
            }
        };
        Ok(())
    }

    fn eval_expr(&mut self, expr: &Expr, env: Rc<Env>) -> Result<Value, RuntimeError> {
        match expr {
            Expr::Nil => Ok(Value::Nil),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::Str(s) => Ok(Value::Str(s.clone())),
            Expr::Var(sym, pos) => env.get(sym).ok_or_else(|| {
                RuntimeError::UndefinedVariable(*pos, sym.as_str().to_owned())
            }),
            Expr::Group(e) => self.eval_expr(e, env),
            Expr::Not(e) => Ok(Value::Bool(!self.eval_expr(e, env)?.is_truthy())),
            Expr::Neg(e, pos) => {
                if let Value::Number(n) = self.eval_expr(e, env)? {
                    Ok(Value::Number(-n))
                } else {
                    Err(RuntimeError::OperandMustBeNumber(*pos))
                }
            }
            Expr::Binary(lhs, op, rhs) => {
                let l = self.eval_expr(lhs, env.clone())?;
                let r = self.eval_expr(rhs, env)?;
                apply_binary(*op, l, r)
            }
            Expr::Logical(lhs, op, rhs) => {
                let l = self.eval_expr(lhs, env.clone())?;
                match op {
                    LogicOp::Or if l.is_truthy() => Ok(l),
                    LogicOp::And if !l.is_truthy() => Ok(l),
                    _ => self.eval_expr(rhs, env),
                }
            }
            Expr::Assign(sym, rhs, pos) => {
                let val = self.eval_expr(rhs, env.clone())?;
                if env.assign(sym, val.clone()) {
                    Ok(val)
                } else {
                    Err(RuntimeError::UndefinedVariable(
                        *pos,
                        sym.as_str().to_owned(),
                    ))
                }
            }
            Expr::Call(callee, args, pos) => {
                let callee = self.eval_expr(callee, env.clone())?;
                let mut evaluated = Vec::with_capacity(args.len());
                for arg in args {
                    evaluated.push(self.eval_expr(arg, env.clone())?);
                }
                match callee {
                    Value::Function(f) => self.call_function(f, evaluated, *pos),
                    _ => Err(RuntimeError::NotCallable(*pos)),
                }
            }
        }
    }

    fn call_function(
        &mut self,
        f: Function,
        args: Vec<Value>,
        pos: Position,
    ) -> Result<Value, RuntimeError> {
        if args.len() != f.arity() {
            return Err(RuntimeError::WrongArity(pos, f.arity(), args.len()));
        }
        match &f.body {
            FunctionBody::Native(_, native) => Ok(native(&args)),
            FunctionBody::User(def, closure) => {
                let frame = Env::with_parent(Some(closure.clone()));
                for (param, arg) in def.params.iter().zip(args) {
                    frame.define(param, arg);
                }
                self.eval_stmts(&def.body, frame)?;
                Ok(self.returning.take().unwrap_or(Value::Nil))
            }
        }
    }
}

/// Apply a binary operator.  Equality works across types; the other
/// operators require numbers, except `+` which also concatenates strings.
fn apply_binary(op: BinOp, lhs: Value, rhs: Value) -> Result<Value, RuntimeError> {
    match op.kind {
        BinOpKind::Add => match (lhs, rhs) {
            (Value::Number(l), Value::Number(r)) => Ok(Value::Number(l + r)),
            (Value::Str(l), Value::Str(r)) => {
                Ok(Value::Str(Rc::new(format!("{}{}", l, r))))
            }
            _ => Err(RuntimeError::AddOperands(op.pos)),
        },
        BinOpKind::Sub => {
            let (l, r) = number_operands(lhs, rhs, op.pos)?;
            Ok(Value::Number(l - r))
        }
        BinOpKind::Mul => {
            let (l, r) = number_operands(lhs, rhs, op.pos)?;
            Ok(Value::Number(l * r))
        }
        BinOpKind::Div => {
            // IEEE-754 semantics: dividing by zero yields an infinity or NaN.
            let (l, r) = number_operands(lhs, rhs, op.pos)?;
            Ok(Value::Number(l / r))
        }
        BinOpKind::Less => {
            let (l, r) = number_operands(lhs, rhs, op.pos)?;
            Ok(Value::Bool(l < r))
        }
        BinOpKind::LessEqual => {
            let (l, r) = number_operands(lhs, rhs, op.pos)?;
            Ok(Value::Bool(l <= r))
        }
        BinOpKind::Greater => {
            let (l, r) = number_operands(lhs, rhs, op.pos)?;
            Ok(Value::Bool(l > r))
        }
        BinOpKind::GreaterEqual => {
            let (l, r) = number_operands(lhs, rhs, op.pos)?;
            Ok(Value::Bool(l >= r))
        }
        BinOpKind::Equal => Ok(Value::Bool(lhs == rhs)),
        BinOpKind::NotEqual => Ok(Value::Bool(lhs != rhs)),
    }
}

fn number_operands(lhs: Value, rhs: Value, pos: Position) -> Result<(f64, f64), RuntimeError> {
    if let (Value::Number(l), Value::Number(r)) = (lhs, rhs) {
        Ok((l, r))
    } else {
        Err(RuntimeError::OperandsMustBeNumbers(pos))
    }
}

fn native_clock(_args: &[Value]) -> Value {
    Value::Number(
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before Unix epoch")
            .as_secs_f64(),
    )
}

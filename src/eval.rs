use std::collections::HashMap;
use std::fmt;

use lazy_static::lazy_static;

use crate::ast::{ASTNode, Expression, Function, Prototype};
use crate::backend::{Backend, Bindings, CodegenError};

#[derive(Debug, Clone, Copy)]
pub enum Native {
    Unary(fn(f64) -> f64),
    Binary(fn(f64, f64) -> f64),
}

impl Native {
    pub fn arity(&self) -> usize {
        match self {
            Native::Unary(_) => 1,
            Native::Binary(_) => 2,
        }
    }

    fn call(&self, name: &str, args: &[f64]) -> Result<f64, CodegenError> {
        match (self, args) {
            (Native::Unary(f), [x]) => Ok(f(*x)),
            (Native::Binary(f), [x, y]) => Ok(f(*x, *y)),
            _ => Err(CodegenError::ArgumentCountMismatch(
                name.to_string(),
                self.arity(),
                args.len(),
            )),
        }
    }
}

lazy_static! {
    /// Functions an `extern` declaration can bind to.
    static ref NATIVES: HashMap<&'static str, Native> = {
        let mut natives = HashMap::new();
        natives.insert("sin", Native::Unary(f64::sin));
        natives.insert("cos", Native::Unary(f64::cos));
        natives.insert("tan", Native::Unary(f64::tan));
        natives.insert("atan", Native::Unary(f64::atan));
        natives.insert("sqrt", Native::Unary(f64::sqrt));
        natives.insert("exp", Native::Unary(f64::exp));
        natives.insert("log", Native::Unary(f64::ln));
        natives.insert("fabs", Native::Unary(f64::abs));
        natives.insert("floor", Native::Unary(f64::floor));
        natives.insert("pow", Native::Binary(f64::powf));
        natives.insert("fmin", Native::Binary(f64::min));
        natives.insert("fmax", Native::Binary(f64::max));
        natives
    };
}

#[derive(Debug, Clone)]
enum Callable {
    Native(Native),
    Defined(Function),
}

impl Callable {
    fn arity(&self) -> usize {
        match self {
            Callable::Native(native) => native.arity(),
            Callable::Defined(func) => func.prototype.args.len(),
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum Evaluated {
    Declared(Prototype),
    Defined(Prototype),
    Value(f64),
}

impl fmt::Display for Evaluated {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Evaluated::Declared(proto) => write!(f, "declared extern {}", proto),
            Evaluated::Defined(proto) => write!(f, "defined {}", proto),
            Evaluated::Value(value) => write!(f, "evaluated to {}", value),
        }
    }
}

/// Tree-walking backend. Named functions are resolved when they are defined
/// and evaluated on call; top-level expressions are evaluated immediately.
#[derive(Debug, Default)]
pub struct Evaluator {
    functions: HashMap<String, Callable>,
}

fn apply_operator(op: char, lhs: f64, rhs: f64) -> Result<f64, CodegenError> {
    match op {
        '+' => Ok(lhs + rhs),
        '-' => Ok(lhs - rhs),
        '*' => Ok(lhs * rhs),
        _ => Err(CodegenError::UnknownOperator(op)),
    }
}

impl Evaluator {
    pub fn new() -> Self {
        Self::default()
    }

    fn callee(&self, name: &str, found: usize) -> Result<&Callable, CodegenError> {
        let callable = self
            .functions
            .get(name)
            .ok_or_else(|| CodegenError::UnknownFunction(name.to_string()))?;
        if callable.arity() != found {
            return Err(CodegenError::ArgumentCountMismatch(
                name.to_string(),
                callable.arity(),
                found,
            ));
        }
        Ok(callable)
    }

    fn declare(&mut self, proto: Prototype) -> Result<Evaluated, CodegenError> {
        if let Some(existing) = self.functions.get(&proto.name) {
            if existing.arity() != proto.args.len() {
                return Err(CodegenError::ArgumentCountMismatch(
                    proto.name.clone(),
                    existing.arity(),
                    proto.args.len(),
                ));
            }
            return Ok(Evaluated::Declared(proto));
        }

        let native = NATIVES
            .get(proto.name.as_str())
            .copied()
            .ok_or_else(|| CodegenError::UnknownFunction(proto.name.clone()))?;
        if native.arity() != proto.args.len() {
            return Err(CodegenError::ArgumentCountMismatch(
                proto.name.clone(),
                native.arity(),
                proto.args.len(),
            ));
        }
        Bindings::bind(&proto, std::iter::repeat(0.0).take(proto.args.len()))?;

        self.functions
            .insert(proto.name.clone(), Callable::Native(native));
        Ok(Evaluated::Declared(proto))
    }

    fn define(&mut self, func: Function) -> Result<Evaluated, CodegenError> {
        let name = &func.prototype.name;
        if self.functions.contains_key(name) {
            return Err(CodegenError::Redefinition(name.clone()));
        }

        let bindings = Bindings::bind(
            &func.prototype,
            std::iter::repeat(()).take(func.prototype.args.len()),
        )?;
        self.resolve(&func.body, &bindings)?;

        let prototype = func.prototype.clone();
        self.functions
            .insert(prototype.name.clone(), Callable::Defined(func));
        Ok(Evaluated::Defined(prototype))
    }

    /// Check every name in `expr` before the function is recorded.
    fn resolve(&self, expr: &Expression, bindings: &Bindings<()>) -> Result<(), CodegenError> {
        let (base, steps) = expr.unfold_chain();
        self.resolve_operand(base, bindings)?;
        for (op, rhs) in steps {
            apply_operator(op, 0.0, 0.0)?;
            self.resolve(rhs, bindings)?;
        }
        Ok(())
    }

    fn resolve_operand(&self, expr: &Expression, bindings: &Bindings<()>) -> Result<(), CodegenError> {
        match expr {
            Expression::Number(_) => Ok(()),
            Expression::Variable(name) => bindings.lookup(name),
            Expression::Binary(..) => self.resolve(expr, bindings),
            Expression::Call(callee, args) => {
                self.callee(callee, args.len())?;
                args.iter()
                    .try_for_each(|arg| self.resolve(arg, bindings))
            }
        }
    }

    /// Operator chains are folded left to right along their spine, so a long
    /// `a + b + c + ...` costs no stack per term.
    fn eval_expr(&self, expr: &Expression, bindings: &Bindings<f64>) -> Result<f64, CodegenError> {
        let (base, steps) = expr.unfold_chain();
        let mut value = self.eval_operand(base, bindings)?;
        for (op, rhs) in steps {
            let rhs = self.eval_expr(rhs, bindings)?;
            value = apply_operator(op, value, rhs)?;
        }
        Ok(value)
    }

    fn eval_operand(&self, expr: &Expression, bindings: &Bindings<f64>) -> Result<f64, CodegenError> {
        match expr {
            Expression::Number(value) => Ok(*value),
            Expression::Variable(name) => bindings.lookup(name),
            Expression::Binary(..) => self.eval_expr(expr, bindings),
            Expression::Call(callee, args) => {
                let callable = self.callee(callee, args.len())?;

                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval_expr(arg, bindings)?);
                }

                match callable {
                    Callable::Native(native) => native.call(callee, &values),
                    Callable::Defined(func) => self.call(func, values),
                }
            }
        }
    }

    fn call(&self, func: &Function, args: Vec<f64>) -> Result<f64, CodegenError> {
        let bindings = Bindings::bind(&func.prototype, args)?;
        self.eval_expr(&func.body, &bindings)
    }
}

impl Backend for Evaluator {
    type Output = Evaluated;

    fn generate(&mut self, node: ASTNode) -> Result<Evaluated, CodegenError> {
        match node {
            ASTNode::Extern(proto) => self.declare(proto),
            ASTNode::Function(func) if func.prototype.is_anonymous() => {
                self.call(&func, Vec::new()).map(Evaluated::Value)
            }
            ASTNode::Function(func) => self.define(func),
        }
    }
}

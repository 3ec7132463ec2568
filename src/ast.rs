use std::fmt;
use std::mem;

#[derive(Debug, PartialEq, Clone)]
pub struct Prototype {
    pub name: String,
    pub args: Vec<String>,
}

impl Prototype {
    pub fn anonymous() -> Self {
        Self {
            name: String::new(),
            args: Vec::new(),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.name.is_empty()
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum Expression {
    Number(f64),
    Variable(String),
    Binary(char, Box<Expression>, Box<Expression>),
    Call(String, Vec<Expression>),
}

impl Expression {
    pub fn binary(op: char, lhs: Expression, rhs: Expression) -> Self {
        Expression::Binary(op, Box::new(lhs), Box::new(rhs))
    }

    /// Split a chain of binary operators along its left spine into the
    /// innermost non-binary operand and the `(op, rhs)` steps applied to it,
    /// innermost first. `1 - 2 + 3` gives `1` and `[('-', 2), ('+', 3)]`.
    pub fn unfold_chain(&self) -> (&Expression, Vec<(char, &Expression)>) {
        let mut steps = Vec::new();
        let mut base = self;
        while let Expression::Binary(op, lhs, rhs) = base {
            steps.push((*op, &**rhs));
            base = lhs;
        }
        steps.reverse();
        (base, steps)
    }

    fn take_children(&mut self, pending: &mut Vec<Expression>) {
        match self {
            Expression::Binary(_, lhs, rhs) => {
                pending.push(mem::replace(&mut **lhs, Expression::Number(0.0)));
                pending.push(mem::replace(&mut **rhs, Expression::Number(0.0)));
            }
            Expression::Call(_, args) => pending.extend(args.drain(..)),
            Expression::Number(_) | Expression::Variable(_) => (),
        }
    }
}

// Long operator chains nest as deep as they are long, so children are
// detached onto a heap stack instead of dropped recursively.
impl Drop for Expression {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        self.take_children(&mut pending);
        while let Some(mut expr) = pending.pop() {
            expr.take_children(&mut pending);
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct Function {
    pub prototype: Prototype,
    pub body: Expression,
}

/// A completed top-level construct, ready to be handed to a backend.
#[derive(Debug, PartialEq, Clone)]
pub enum ASTNode {
    Extern(Prototype),
    Function(Function),
}

impl fmt::Display for Prototype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.args.join(" "))
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Number(value) => write!(f, "{}", value),
            Expression::Variable(name) => write!(f, "{}", name),
            Expression::Binary(op, lhs, rhs) => write!(f, "({} {} {})", lhs, op, rhs),
            Expression::Call(callee, args) => {
                write!(f, "{}(", callee)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.prototype.is_anonymous() {
            write!(f, "{}", self.body)
        } else {
            write!(f, "def {} {}", self.prototype, self.body)
        }
    }
}

impl fmt::Display for ASTNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ASTNode::Extern(proto) => write!(f, "extern {}", proto),
            ASTNode::Function(func) => write!(f, "{}", func),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_fully_parenthesized() {
        let expr = Expression::binary(
            '+',
            Expression::Number(1.0),
            Expression::binary('*', Expression::Variable("x".to_string()), Expression::Number(2.5)),
        );
        assert_eq!(expr.to_string(), "(1 + (x * 2.5))");
    }

    #[test]
    fn display_nodes() {
        let proto = Prototype {
            name: "foo".to_string(),
            args: vec!["a".to_string(), "b".to_string()],
        };
        let call = Expression::Call(
            "foo".to_string(),
            vec![Expression::Number(1.0), Expression::Variable("y".to_string())],
        );
        assert_eq!(ASTNode::Extern(proto.clone()).to_string(), "extern foo(a b)");
        assert_eq!(
            ASTNode::Function(Function {
                prototype: proto,
                body: call.clone(),
            })
            .to_string(),
            "def foo(a b) foo(1, y)"
        );
        assert_eq!(
            Function {
                prototype: Prototype::anonymous(),
                body: call,
            }
            .to_string(),
            "foo(1, y)"
        );
    }

    #[test]
    fn unfold_chain_follows_left_spine() {
        let num = Expression::Number;
        // (1 - 2) + (3 * 4)
        let expr = Expression::binary(
            '+',
            Expression::binary('-', num(1.0), num(2.0)),
            Expression::binary('*', num(3.0), num(4.0)),
        );
        let (base, steps) = expr.unfold_chain();
        assert_eq!(base, &num(1.0));
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0], ('-', &num(2.0)));
        assert_eq!(steps[1].0, '+');
        assert_eq!(steps[1].1.to_string(), "(3 * 4)");

        let leaf = Expression::Variable("x".to_string());
        let (base, steps) = leaf.unfold_chain();
        assert_eq!(base, &leaf);
        assert!(steps.is_empty());
    }

    #[test]
    fn deep_trees_drop() {
        let mut expr = Expression::Number(0.0);
        for i in 0..200_000 {
            expr = Expression::binary('+', expr, Expression::Number(i as f64));
        }
        drop(expr);

        let mut nested = Expression::Number(0.0);
        for _ in 0..200_000 {
            nested = Expression::Call("f".to_string(), vec![nested]);
        }
        drop(nested);
    }
}

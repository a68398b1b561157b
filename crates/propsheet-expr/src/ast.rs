//! Expression Abstract Syntax Tree types

use std::fmt;

/// Expression AST
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    // === Literals ===
    /// Numeric literal
    Number(f64),
    /// String literal
    String(String),
    /// Boolean literal
    Boolean(bool),
    /// The `empty` literal
    Empty,

    // === References ===
    /// Reference to a named cell
    Name(String),

    // === Operators ===
    /// Binary operation
    BinaryOp {
        op: BinaryOperator,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Unary operation
    UnaryOp {
        op: UnaryOperator,
        operand: Box<Expr>,
    },

    // === Function call ===
    Function { name: String, args: Vec<Expr> },

    // === Array ===
    Array(Vec<Expr>),
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,

    // Comparison
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,

    // Text
    Concat,
}

impl BinaryOperator {
    /// Binding strength, higher binds tighter
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOperator::Equal
            | BinaryOperator::NotEqual
            | BinaryOperator::LessThan
            | BinaryOperator::LessEqual
            | BinaryOperator::GreaterThan
            | BinaryOperator::GreaterEqual => 1,
            BinaryOperator::Concat => 2,
            BinaryOperator::Add | BinaryOperator::Subtract => 3,
            BinaryOperator::Multiply | BinaryOperator::Divide => 4,
            BinaryOperator::Power => 5,
        }
    }

    /// Source text of the operator
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Power => "^",
            BinaryOperator::Equal => "=",
            BinaryOperator::NotEqual => "<>",
            BinaryOperator::LessThan => "<",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::GreaterThan => ">",
            BinaryOperator::GreaterEqual => ">=",
            BinaryOperator::Concat => "&",
        }
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Negate,
    Percent,
}

impl Expr {
    /// Shorthand for a name reference
    pub fn name<S: Into<String>>(name: S) -> Self {
        Expr::Name(name.into())
    }

    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>, parent: u8) -> fmt::Result {
        match self {
            Expr::BinaryOp { op, .. } if op.precedence() <= parent => write!(f, "({})", self),
            _ => write!(f, "{}", self),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            Expr::String(s) => write!(f, "\"{}\"", s.replace('"', "\"\"")),
            Expr::Boolean(b) => write!(f, "{}", b),
            Expr::Empty => write!(f, "empty"),
            Expr::Name(name) => write!(f, "{}", name),
            Expr::BinaryOp { op, left, right } => {
                // Power is right associative, everything else left associative
                let (lhs, rhs) = match op {
                    BinaryOperator::Power => (op.precedence(), op.precedence() - 1),
                    _ => (op.precedence() - 1, op.precedence()),
                };
                left.fmt_operand(f, lhs)?;
                write!(f, " {} ", op.symbol())?;
                right.fmt_operand(f, rhs)
            }
            Expr::UnaryOp { op, operand } => match op {
                UnaryOperator::Negate => {
                    write!(f, "-")?;
                    operand.fmt_operand(f, u8::MAX)
                }
                UnaryOperator::Percent => {
                    operand.fmt_operand(f, u8::MAX)?;
                    write!(f, "%")
                }
            },
            Expr::Function { name, args } => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Expr::Array(items) => {
                write!(f, "{{")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "}}")
            }
        }
    }
}

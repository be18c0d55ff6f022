use std::{fmt::Display, sync::Arc};

use crate::tokenizer::Token;

/// A point in the source text, tagged with the origin label the driver
/// resolved the input from (a file path, `<stdin>`, or `<cmdline>`).
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub origin: Arc<str>,
    pub line: usize,
    pub column: usize,
}

impl Location {
    pub fn new(origin: Arc<str>, line: usize, column: usize) -> Self {
        Location {
            origin,
            line,
            column,
        }
    }
}

impl Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.origin, self.line, self.column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnaryOp {
    Not,
    Negate,
}

impl UnaryOp {
    pub fn from_token(token: &Token) -> Option<Self> {
        match token {
            Token::Bang => Some(UnaryOp::Not),
            Token::Minus => Some(UnaryOp::Negate),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOp::Not => "!",
            UnaryOp::Negate => "-",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinaryOp {
    Or,
    And,
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

impl BinaryOp {
    pub fn from_token(token: &Token) -> Option<Self> {
        match token {
            Token::PipePipe => Some(BinaryOp::Or),
            Token::AmpAmp => Some(BinaryOp::And),
            Token::EqualEqual => Some(BinaryOp::Equal),
            Token::BangEqual => Some(BinaryOp::NotEqual),
            Token::LessThan => Some(BinaryOp::LessThan),
            Token::LessThanOrEqual => Some(BinaryOp::LessThanOrEqual),
            Token::GreaterThan => Some(BinaryOp::GreaterThan),
            Token::GreaterThanOrEqual => Some(BinaryOp::GreaterThanOrEqual),
            Token::Plus => Some(BinaryOp::Add),
            Token::Minus => Some(BinaryOp::Subtract),
            Token::Star => Some(BinaryOp::Multiply),
            Token::Slash => Some(BinaryOp::Divide),
            Token::Percent => Some(BinaryOp::Modulo),
            _ => None,
        }
    }

    /// Binding strength, loosest first. All binary operators are
    /// left-associative.
    pub fn precedence(&self) -> u8 {
        match self {
            BinaryOp::Or => 1,
            BinaryOp::And => 2,
            BinaryOp::Equal | BinaryOp::NotEqual => 3,
            BinaryOp::LessThan
            | BinaryOp::LessThanOrEqual
            | BinaryOp::GreaterThan
            | BinaryOp::GreaterThanOrEqual => 4,
            BinaryOp::Add | BinaryOp::Subtract => 5,
            BinaryOp::Multiply | BinaryOp::Divide | BinaryOp::Modulo => 6,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Or => "||",
            BinaryOp::And => "&&",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::LessThan => "<",
            BinaryOp::LessThanOrEqual => "<=",
            BinaryOp::GreaterThan => ">",
            BinaryOp::GreaterThanOrEqual => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulo => "%",
        }
    }
}

/// One `name = value` pair in a `local` expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Bind {
    pub name: Arc<str>,
    pub value: Expr,
    pub location: Location,
}

/// A function literal. Shared via `Arc` so closures can hang on to the
/// parameter list and body without cloning the subtree.
#[derive(Debug, PartialEq)]
pub struct FunctionDef {
    pub params: Vec<Arc<str>>,
    pub body: Expr,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Null(Location),
    Boolean(bool, Location),
    Number(f64, Location),
    Str(Arc<str>, Location),
    Var(Arc<str>, Location),
    Array(Vec<Expr>, Location),
    Local {
        binds: Vec<Bind>,
        body: Box<Expr>,
        location: Location,
    },
    Function(Arc<FunctionDef>, Location),
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        location: Location,
    },
    Index {
        target: Box<Expr>,
        index: Box<Expr>,
        location: Location,
    },
    If {
        cond: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Option<Box<Expr>>,
        location: Location,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
        location: Location,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
        location: Location,
    },
    ErrorExpr {
        operand: Box<Expr>,
        location: Location,
    },
}

impl Expr {
    pub fn location(&self) -> &Location {
        match self {
            Expr::Null(location)
            | Expr::Boolean(_, location)
            | Expr::Number(_, location)
            | Expr::Str(_, location)
            | Expr::Var(_, location)
            | Expr::Array(_, location)
            | Expr::Function(_, location) => location,
            Expr::Local { location, .. }
            | Expr::Call { location, .. }
            | Expr::Index { location, .. }
            | Expr::If { location, .. }
            | Expr::Unary { location, .. }
            | Expr::Binary { location, .. }
            | Expr::ErrorExpr { location, .. } => location,
        }
    }
}

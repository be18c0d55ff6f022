mod analyzer;
mod ast;
mod error;
mod interpreter;
mod parser;
mod tokenizer;
mod unparser;

pub use analyzer::analyze;
pub use ast::{BinaryOp, Expr, Location, UnaryOp};
pub use error::{RuntimeError, StackFrame, StaticError};
pub use interpreter::{EvalOptions, Interpreter};
pub use parser::parse;
pub use tokenizer::{PositionedToken, Token, Tokenizer};
pub use unparser::unparse;

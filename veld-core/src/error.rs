use std::{error::Error, fmt::Display};

use crate::ast::Location;

/// An error detected before evaluation begins: tokenization, parsing, or
/// static analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticError {
    pub message: String,
    pub location: Option<Location>,
}

impl StaticError {
    pub fn new<T: Into<String>>(message: T, location: Location) -> Self {
        StaticError {
            message: message.into(),
            location: Some(location),
        }
    }

    pub fn without_location<T: Into<String>>(message: T) -> Self {
        StaticError {
            message: message.into(),
            location: None,
        }
    }
}

impl Display for StaticError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{}: {}", location, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl Error for StaticError {}

/// One level of the call stack at the time a runtime error was raised.
/// The location is pre-rendered so consumers never need the AST.
#[derive(Debug, Clone, PartialEq)]
pub struct StackFrame {
    pub location: String,
    pub name: String,
}

impl StackFrame {
    pub fn new<L: Into<String>, N: Into<String>>(location: L, name: N) -> Self {
        StackFrame {
            location: location.into(),
            name: name.into(),
        }
    }
}

/// An error raised during evaluation, carrying the call stack as it stood
/// when the error was raised, outermost frame first.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeError {
    pub message: String,
    pub stack: Vec<StackFrame>,
}

impl RuntimeError {
    pub fn new<T: Into<String>>(message: T, stack: Vec<StackFrame>) -> Self {
        RuntimeError {
            message: message.into(),
            stack,
        }
    }
}

impl Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for RuntimeError {}

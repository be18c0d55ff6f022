use std::{
    fmt::Display,
    io::{self, Read},
};

use crate::args::InputSource;

/// Resolved program text plus the origin label used in diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceText {
    pub origin: String,
    pub text: String,
}

impl SourceText {
    pub fn new<O: Into<String>, T: Into<String>>(origin: O, text: T) -> Self {
        SourceText {
            origin: origin.into(),
            text: text.into(),
        }
    }
}

/// Failure to read the designated input. Fatal; a missing file is not
/// treated as transient.
#[derive(Debug)]
pub struct InputError {
    context: String,
    cause: io::Error,
}

impl Display for InputError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.context, self.cause)
    }
}

impl std::error::Error for InputError {}

/// Turns the request's source designator into program text. Literal code
/// and stdin get fixed origin labels; a file's origin is its path.
pub fn acquire(input: &InputSource) -> Result<SourceText, InputError> {
    match input {
        InputSource::LiteralCode(code) => Ok(SourceText::new("<cmdline>", code.clone())),
        InputSource::Stdin => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .map_err(|cause| InputError {
                    context: "Reading stdin".to_string(),
                    cause,
                })?;
            Ok(SourceText::new("<stdin>", text))
        }
        InputSource::File(path) => {
            let text = std::fs::read_to_string(path).map_err(|cause| InputError {
                context: format!("Opening input file: {}", path),
                cause,
            })?;
            Ok(SourceText::new(path.clone(), text))
        }
    }
}

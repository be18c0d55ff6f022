use veld_core::{RuntimeError, StaticError};

/// The two failure shapes the pipeline can hand back, rendered at exactly
/// one boundary (`render`) and nowhere else.
#[derive(Debug, PartialEq)]
pub enum Diagnostic {
    Static(StaticError),
    Runtime(RuntimeError),
}

impl From<StaticError> for Diagnostic {
    fn from(err: StaticError) -> Self {
        Diagnostic::Static(err)
    }
}

impl From<RuntimeError> for Diagnostic {
    fn from(err: RuntimeError) -> Self {
        Diagnostic::Runtime(err)
    }
}

/// How many stack frames to keep from each end of a long trace.
const MAX_FRAMES_ABOVE: usize = 10;
const MAX_FRAMES_BELOW: usize = 10;

impl Diagnostic {
    /// Renders the diagnostic as the text printed to stderr, without a
    /// trailing newline. Long runtime stack traces keep the first
    /// `MAX_FRAMES_ABOVE` and last `MAX_FRAMES_BELOW` frames with a single
    /// ellipsis line between them; a trace that the two windows cover
    /// completely is printed in full.
    pub fn render(&self) -> String {
        match self {
            Diagnostic::Static(err) => format!("STATIC ERROR: {}", err),
            Diagnostic::Runtime(err) => {
                let mut out = format!("RUNTIME ERROR: {}", err.message);
                let total = err.stack.len();
                for (i, frame) in err.stack.iter().enumerate() {
                    if i >= MAX_FRAMES_ABOVE && i + MAX_FRAMES_BELOW < total {
                        if i == MAX_FRAMES_ABOVE {
                            out.push_str("\n\t...");
                        }
                    } else {
                        out.push_str(&format!("\n\t{}\t{}", frame.location, frame.name));
                    }
                }
                out
            }
        }
    }
}

use std::fmt::Display;

pub const USAGE: &str = "\
Usage:
veld {<option>} [<filename>]
where <filename> defaults to - (stdin)
and <option> can be:
    -h / --help            This message
    -e / --exec            Treat filename as code (requires explicit filename)
    -s / --max-stack <n>   Number of allowed stack frames
    --gc-min-objects <n>   Do not run garbage collector until this many objects
    --gc-growth-trigger <n> Run garbage collector after this amount of object growth
    --debug-ast            Unparse the parsed AST without executing it

Multichar options are expanded e.g. -abc becomes -a -b -c.
The -- option suppresses option processing.  Note that since veld programs can
begin with -, it is advised to use -- with -e if the program is unknown.";

/// Where the program text comes from, resolved from the positional
/// argument and the `--exec` flag.
#[derive(Debug, Clone, PartialEq)]
pub enum InputSource {
    Stdin,
    File(String),
    LiteralCode(String),
}

/// The fully-validated configuration for one run. Built by `parse_args`,
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionRequest {
    pub input: InputSource,
    pub max_stack: usize,
    pub gc_min_objects: usize,
    pub gc_growth_trigger: f64,
    pub debug_ast: bool,
}

#[derive(Debug, PartialEq)]
pub enum ParsedArgs {
    /// `-h`/`--help` was given; print usage and exit successfully.
    Help,
    Run(ExecutionRequest),
}

/// A configuration error. The caller prints it with the usage text and
/// exits; nothing in here terminates the process.
#[derive(Debug, PartialEq)]
pub struct ArgError {
    pub message: String,
}

impl ArgError {
    fn new<T: Into<String>>(message: T) -> Self {
        ArgError {
            message: message.into(),
        }
    }
}

impl Display for ArgError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Expands combined short options: `-abc` becomes `-a -b -c`. A `--`
/// passes itself and everything after it through untouched. Purely
/// lexical; no validation happens here.
pub fn normalize_args<I: IntoIterator<Item = String>>(raw: I) -> Vec<String> {
    let mut result: Vec<String> = Vec::new();
    let mut iter = raw.into_iter();
    while let Some(arg) = iter.next() {
        if arg == "--" {
            result.push(arg);
            result.extend(iter.by_ref());
            break;
        }
        let chars: Vec<char> = arg.chars().collect();
        if chars.len() > 2 && chars[0] == '-' && chars[1] != '-' {
            for &ch in &chars[1..] {
                result.push(format!("-{}", ch));
            }
        } else {
            result.push(arg);
        }
    }
    result
}

/// The cursor over the normalized token list. `next` advances by one;
/// `next_value` is the transition used by options that take a value.
struct ArgScanner {
    tokens: Vec<String>,
    position: usize,
}

impl ArgScanner {
    fn new(tokens: Vec<String>) -> Self {
        ArgScanner {
            tokens,
            position: 0,
        }
    }

    fn next(&mut self) -> Option<String> {
        let token = self.tokens.get(self.position).cloned();
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    fn next_value(&mut self) -> Result<String, ArgError> {
        self.next()
            .ok_or_else(|| ArgError::new("Expected another commandline argument."))
    }

    fn rest(&mut self) -> Vec<String> {
        let rest = self.tokens.split_off(self.position);
        self.position = self.tokens.len();
        rest
    }
}

fn parse_integer(value: &str) -> Result<i64, ArgError> {
    value
        .parse::<i64>()
        .map_err(|_| ArgError::new(format!("Invalid integer \"{}\"", value)))
}

/// Scans the normalized tokens left to right and accumulates the request.
/// Anything that is not a recognized option is positional; at most one
/// positional token (the source designator) is allowed.
pub fn parse_args(tokens: Vec<String>) -> Result<ParsedArgs, ArgError> {
    let mut scanner = ArgScanner::new(tokens);
    let mut max_stack: usize = 500;
    let mut gc_min_objects: usize = 1000;
    let mut gc_growth_trigger: f64 = 2.0;
    let mut filename_is_code = false;
    let mut debug_ast = false;
    let mut positional: Vec<String> = Vec::new();

    while let Some(arg) = scanner.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(ParsedArgs::Help),
            "-s" | "--max-stack" => {
                let value = parse_integer(&scanner.next_value()?)?;
                if value < 1 {
                    return Err(ArgError::new(format!("Invalid --max-stack value {}", value)));
                }
                max_stack = value as usize;
            }
            "--gc-min-objects" => {
                let value = parse_integer(&scanner.next_value()?)?;
                if value < 1 {
                    return Err(ArgError::new(format!(
                        "Invalid --gc-min-objects value {}",
                        value
                    )));
                }
                gc_min_objects = value as usize;
            }
            "--gc-growth-trigger" => {
                let raw = scanner.next_value()?;
                let value = raw
                    .parse::<f64>()
                    .map_err(|_| ArgError::new(format!("Invalid number \"{}\"", raw)))?;
                if !(value >= 0.0) {
                    return Err(ArgError::new(format!(
                        "Invalid --gc-growth-trigger \"{}\"",
                        raw
                    )));
                }
                gc_growth_trigger = value;
            }
            "-e" | "--exec" => filename_is_code = true,
            "--debug-ast" => debug_ast = true,
            "--" => {
                positional.extend(scanner.rest());
                break;
            }
            _ => positional.push(arg),
        }
    }

    if positional.len() > 1 {
        return Err(ArgError::new(format!(
            "Filename already specified as \"{}\"",
            positional[0]
        )));
    }
    if filename_is_code && positional.is_empty() {
        return Err(ArgError::new("Must give filename when using -e, --exec"));
    }

    let filename = positional.pop().unwrap_or_else(|| "-".to_string());
    let input = if filename_is_code {
        InputSource::LiteralCode(filename)
    } else if filename == "-" {
        InputSource::Stdin
    } else {
        InputSource::File(filename)
    };

    Ok(ParsedArgs::Run(ExecutionRequest {
        input,
        max_stack,
        gc_min_objects,
        gc_growth_trigger,
        debug_ast,
    }))
}

mod args;
mod diagnostics;
mod input;
mod pipeline;

use colored::Colorize;

use args::ParsedArgs;

fn main() {
    std::process::exit(run());
}

/// The single place that decides the exit status. Everything below
/// returns `Result`s instead of exiting.
fn run() -> i32 {
    let raw: Vec<String> = std::env::args().skip(1).collect();

    let request = match args::parse_args(args::normalize_args(raw)) {
        Ok(ParsedArgs::Help) => {
            println!("{}", args::USAGE);
            return 0;
        }
        Ok(ParsedArgs::Run(request)) => request,
        Err(err) => {
            eprintln!("{}", format!("ERROR: {}", err).red());
            eprintln!();
            eprintln!("{}", args::USAGE);
            return 1;
        }
    };

    let source = match input::acquire(&request.input) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("{}", err.to_string().red());
            return 1;
        }
    };

    match pipeline::run(&request, &source) {
        Ok(output) => {
            println!("{}", output);
            0
        }
        Err(diagnostic) => {
            eprintln!("{}", diagnostic.render().red());
            1
        }
    }
}

mod parsing_dbg;

use std::io::{stdin, stdout, Read, Write};

use clap::Parser;

use cfmt_formatting::{format_policy, Error as FormattingError, FormatConfig};
use cfmt_lexing::DebugTokenExt;
use parsing_dbg::DebugTree;

/// CFEngine policy auto-formatter
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Will try to wrap at this column
    #[arg(short = 'w', long, default_value_t = 80)]
    max_width: usize,

    /// Number of spaces used for indentation
    #[arg(short, long, default_value_t = 4)]
    tab_width: usize,

    /// Drop promise types with no promises in them
    #[arg(long, default_value_t = false)]
    remove_empty_promise_types: bool,

    /// Sort promise types to CFEngine's fixed evaluation order
    #[arg(long, default_value_t = false)]
    canonical_order: bool,

    /// Format the file in-place rather than print to STDOUT (use with caution!)
    #[arg(short, long, default_value_t = false, requires("file_path"))]
    in_place: bool,

    /// (debugging) Show raw lexer output rather than auto-formatting
    #[arg(long, default_value_t = false)]
    lex: bool,

    /// (debugging) Show the syntax tree rather than auto-formatting
    #[arg(long, default_value_t = false)]
    tree: bool,

    /// Path of the file to format (leave empty or use "-" for STDIN)
    file_path: Option<String>,
}

fn main() {
    simple_logger::SimpleLogger::new().env().init().or_error("Failed to initialize logger");

    let args = Args::parse();

    let config = FormatConfig {
        page_width: args.max_width,
        tab_width: args.tab_width,
        removes_empty_promise_types: args.remove_empty_promise_types,
        sorts_promise_types_to_evaluation_order: args.canonical_order,
    };

    let mut buffer: Vec<u8> = vec![];

    if args.file_path.as_ref().map_or(false, |path| path == "-") && args.in_place {
        exit_with_error("Can't modify STDIN in place");
    }

    match args.file_path {
        Some(ref file_path) => {
            if file_path == "-" {
                read_stdin(&mut buffer)
            } else {
                read_file(&mut buffer, file_path)
            }
        }
        None => read_stdin(&mut buffer),
    }

    let mut stdout = stdout().lock();

    if args.lex {
        for token in cfmt_lexing::scan_iter(&buffer) {
            match token {
                Ok(token) => writeln!(stdout, "{}", token.human_readable_string())
                    .or_error("Failed to write to STDOUT"),
                Err(error) => exit_with_error(format!("Lexer error: {error:?}")),
            }
        }

        return;
    }

    if args.tree {
        let source = std::str::from_utf8(&buffer).or_error("Input is not valid UTF-8");
        let tree = match cfmt_parsing::parse(source) {
            Ok(tree) => tree,
            Err(error) => exit_with_error(format!("Failed to parse input file: {error}")),
        };

        writeln!(stdout, "{}", DebugTree(&tree)).or_error("Failed to write to STDOUT");
        return;
    }

    if args.in_place {
        let file_path = args.file_path.as_ref().unwrap();
        let mut output_buffer: Vec<u8> = vec![];

        if let Err(error) = format_policy(&mut output_buffer, &buffer, &config) {
            handle_formatting_error(error);
        }

        if let Err(error) = std::fs::write(file_path, output_buffer) {
            exit_with_error(error);
        }
    } else if let Err(error) = format_policy(&mut stdout, &buffer, &config) {
        handle_formatting_error(error);
    }
}

fn handle_formatting_error(error: FormattingError) -> ! {
    exit_with_error(error)
}

fn read_stdin(buffer: &mut Vec<u8>) {
    if let Err(error) = stdin().read_to_end(buffer) {
        exit_with_error(format!("Failed to read from STDIN: {}", error));
    };
}

fn read_file<T: AsRef<str>>(buffer: &mut Vec<u8>, file_path: T) {
    let mut file = match std::fs::File::open(file_path.as_ref()) {
        Ok(file) => file,
        Err(error) => exit_with_error(format!("Failed to open file: {}", error)),
    };

    if let Err(error) = file.read_to_end(buffer) {
        exit_with_error(format!("Failed to read from input file: {}", error));
    }
}

fn exit_with_error<T: std::fmt::Display>(msg: T) -> ! {
    eprintln!("Error: {}", msg);
    std::process::exit(1);
}

trait OrError<T> {
    /// Return the success result or exit the process with an error message
    fn or_error(self, msg: &str) -> T;
}

impl<T, E> OrError<T> for Result<T, E> {
    fn or_error(self, msg: &str) -> T {
        match self {
            Ok(result) => result,
            Err(_) => {
                exit_with_error(msg);
            }
        }
    }
}

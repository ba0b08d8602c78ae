use std::path::PathBuf;
use std::process;
use std::rc::Rc;

use clap::Parser;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing_subscriber::EnvFilter;

use cadlisp::{Interpreter, InterpreterConfig, LispError, MemoryHost, Value, SPECIAL_FORM_NAMES};

#[derive(Parser)]
#[command(name = "cadlisp", version, about = "cadlisp: an AutoLISP-flavoured scripting interpreter")]
struct Cli {
    /// Script to execute
    file: Option<PathBuf>,

    /// Arguments bound to *ARGV*
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,

    /// Evaluate an expression
    #[arg(short, long)]
    eval: Option<String>,

    /// Skip the prelude definitions
    #[arg(long)]
    no_prelude: bool,

    /// Nesting limit for non-tail evaluation
    #[arg(long, value_name = "N")]
    max_depth: Option<usize>,
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let mut config = InterpreterConfig::from_env()
        .with_prelude(!cli.no_prelude)
        .with_argv(cli.args.clone());
    if let Some(depth) = cli.max_depth {
        config = config.with_max_eval_depth(depth);
    }

    let host = Rc::new(MemoryHost::new());
    let interpreter = Interpreter::builder()
        .with_config(config)
        .with_host(host)
        .build();

    if let Some(expr) = &cli.eval {
        match interpreter.eval_str(expr) {
            Ok(val) => {
                if !val.is_nil() {
                    println!("{val}");
                }
            }
            Err(e) => fail(&e),
        }
        return;
    }

    if let Some(file) = &cli.file {
        if let Err(e) = interpreter.load_file(file) {
            eprintln!("Error in {}:", file.display());
            fail(&e);
        }
        return;
    }

    repl(interpreter);
}

/// `CADLISP_LOG` takes precedence over `RUST_LOG`; the default level is `warn`.
fn init_tracing() {
    let filter = std::env::var("CADLISP_LOG")
        .ok()
        .and_then(|v| EnvFilter::try_new(v).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn report(e: &LispError) {
    tracing::warn!(error = %e, "evaluation failed");
    eprintln!("Error: {e}");
    if let Some(trace) = e.stack_trace() {
        eprint!("{trace}");
    }
}

/// Report `e` and end the process, honouring `(exit n)`.
fn fail(e: &LispError) -> ! {
    if let LispError::Exit(code) = e.inner() {
        process::exit(*code);
    }
    report(e);
    process::exit(1);
}

fn repl(interpreter: Interpreter) {
    let mut rl = match DefaultEditor::new() {
        Ok(rl) => rl,
        Err(e) => {
            eprintln!("Error: cannot start line editor: {e}");
            process::exit(1);
        }
    };
    let history_path = data_dir().join("history.txt");
    let _ = rl.load_history(&history_path);

    println!("cadlisp v{}", env!("CARGO_PKG_VERSION"));
    println!("Type ,help for help, ,quit to exit\n");

    let mut buffer = String::new();
    let mut in_multiline = false;

    loop {
        let prompt = if in_multiline { "  ... " } else { "_$ " };
        match rl.readline(prompt) {
            Ok(line) => {
                let trimmed = line.trim();

                if !in_multiline {
                    match trimmed {
                        ",quit" | ",exit" | ",q" => break,
                        ",help" | ",h" => {
                            print_help();
                            continue;
                        }
                        ",env" => {
                            print_env(&interpreter);
                            continue;
                        }
                        _ => {}
                    }
                }

                if in_multiline {
                    buffer.push('\n');
                    buffer.push_str(&line);
                } else {
                    buffer = line.clone();
                }

                if !is_balanced(&buffer) {
                    in_multiline = true;
                    continue;
                }

                in_multiline = false;
                let input = buffer.trim().to_string();
                buffer.clear();

                if input.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(&input);

                match interpreter.eval_str(&input) {
                    Ok(val) => {
                        if !val.is_nil() {
                            println!("{val}");
                        }
                    }
                    Err(e) => {
                        if let LispError::Exit(code) = e.inner() {
                            save_history(&mut rl, &history_path);
                            process::exit(*code);
                        }
                        report(&e);
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                if in_multiline {
                    buffer.clear();
                    in_multiline = false;
                    println!("^C");
                    continue;
                }
                break;
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Error: {e}");
                break;
            }
        }
    }

    save_history(&mut rl, &history_path);
}

fn save_history(rl: &mut DefaultEditor, path: &std::path::Path) {
    let _ = std::fs::create_dir_all(data_dir());
    if let Err(e) = rl.save_history(path) {
        tracing::debug!(error = %e, "could not save history");
    }
}

/// Whether every bracket opened in `input` outside strings and comments is closed.
fn is_balanced(input: &str) -> bool {
    let mut depth = 0i32;
    let mut in_string = false;
    let mut in_comment = false;
    let mut escape = false;
    for ch in input.chars() {
        if in_comment {
            if ch == '\n' {
                in_comment = false;
            }
            continue;
        }
        if escape {
            escape = false;
            continue;
        }
        if ch == '\\' && in_string {
            escape = true;
            continue;
        }
        if ch == '"' {
            in_string = !in_string;
            continue;
        }
        if in_string {
            continue;
        }
        match ch {
            ';' => in_comment = true,
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            _ => {}
        }
    }
    depth <= 0 && !in_string
}

fn print_help() {
    println!("cadlisp REPL commands:");
    println!("  ,quit / ,q    Exit the REPL");
    println!("  ,help / ,h    Show this help");
    println!("  ,env          Show user-defined globals");
    println!();
    println!("Special forms:");
    println!("  {}", SPECIAL_FORM_NAMES.join(", "));
    println!();
    println!("Drawing commands run against an in-memory drawing in this REPL.");
}

fn print_env(interpreter: &Interpreter) {
    let env = interpreter.global_env();
    let user: Vec<(String, Value)> = env
        .local_names()
        .into_iter()
        .filter_map(|name| {
            let val = env.get_str(&name)?;
            (!matches!(val, Value::BuiltIn(_))).then_some((name, val))
        })
        .collect();
    if user.is_empty() {
        println!("(no user-defined bindings)");
    } else {
        for (name, val) in user {
            println!("  {name} = {val}");
        }
    }
}

/// `$CADLISP_HOME`, else `$HOME/.cadlisp`.
fn data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("CADLISP_HOME") {
        return PathBuf::from(dir);
    }
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".cadlisp")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balanced_input() {
        assert!(is_balanced("(+ 1 2)"));
        assert!(!is_balanced("(defun f (x)"));
        assert!(is_balanced("(princ \"(\")"));
        assert!(is_balanced("(+ 1 2) ; (unclosed"));
        assert!(!is_balanced("(princ \"open"));
    }

    #[test]
    fn cli_collects_trailing_args() {
        let cli = Cli::parse_from(["cadlisp", "--no-prelude", "run.lsp", "a", "-b"]);
        assert_eq!(cli.file, Some(PathBuf::from("run.lsp")));
        assert_eq!(cli.args, vec!["a".to_string(), "-b".to_string()]);
        assert!(cli.no_prelude);
    }
}

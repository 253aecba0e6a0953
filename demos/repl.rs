use gigl::reader::read;
use gigl::{Config, Environment, Error, Evaluator, Value};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::panic;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let result = panic::catch_unwind(|| {
        run_repl();
    });

    if let Err(panic_info) = result {
        eprintln!("The REPL encountered an unexpected error and must exit.");

        if let Some(msg) = panic_info.downcast_ref::<&str>() {
            eprintln!("Error: {msg}");
        } else if let Some(msg) = panic_info.downcast_ref::<String>() {
            eprintln!("Error: {msg}");
        } else {
            eprintln!("Error: Unknown panic occurred");
        }

        process::exit(1);
    }
}

fn run_repl() {
    println!("gigl, a small Lisp with macros and tail calls");
    println!("Enter expressions like: (map (λ (x) (* x x)) '(1 2 3))");
    println!("Type :help for more commands, or Ctrl+D to exit.");
    println!();

    let mut rl = match DefaultEditor::new() {
        Ok(rl) => rl,
        Err(e) => {
            eprintln!("Could not initialize REPL: {e}");
            return;
        }
    };
    let evaluator = match Evaluator::with_config(Config { load_prelude: true }) {
        Ok(evaluator) => evaluator,
        Err(e) => {
            eprintln!("Could not load the prelude: {e}");
            return;
        }
    };

    // Register custom function that can be called from user code for demonstration purposes
    evaluator.global().register_builtin_function("help", print_help);

    let mut pending = String::new();

    loop {
        let prompt = if pending.is_empty() { "gigl> " } else { "  ... " };
        match rl.readline(prompt) {
            Ok(line) => {
                if pending.is_empty() {
                    let command = line.trim();
                    if command.is_empty() {
                        continue;
                    }
                    let _ = rl.add_history_entry(command);

                    // Handle special commands
                    match command.split_once(' ').unwrap_or((command, "")) {
                        (":help", _) => {
                            _ = print_help(&[]).is_ok();
                            continue;
                        }
                        (":env", _) => {
                            print_environment(evaluator.global());
                            continue;
                        }
                        (":macros", _) => {
                            for name in evaluator.macro_names() {
                                println!("  {name}");
                            }
                            continue;
                        }
                        (":expand", form) => {
                            match read(form).and_then(|form| evaluator.macroexpand(&form)) {
                                Ok(expansion) => println!("{expansion}"),
                                Err(e) => println!("Error: {e}"),
                            }
                            continue;
                        }
                        (":quit" | ":exit", _) => {
                            println!("Goodbye!");
                            break;
                        }
                        _ => {}
                    }
                } else {
                    let _ = rl.add_history_entry(line.trim());
                }

                pending.push_str(&line);
                pending.push('\n');

                // Keep reading until every open paren is closed
                if open_parens(&pending) > 0 {
                    continue;
                }

                let source = std::mem::take(&mut pending);
                match evaluator.eval_str(&source) {
                    // Don't print nil (e.g., from define)
                    Ok(Value::Nil) => {}
                    Ok(result) => println!("{result}"),
                    Err(e) => println!("Error: {e}"),
                }
            }

            Err(ReadlineError::Interrupted) => {
                // Ctrl+C abandons a partial expression
                if !pending.is_empty() {
                    pending.clear();
                    continue;
                }
                println!("Goodbye!");
                break;
            }
            Err(ReadlineError::Eof) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                println!("Error: {err:?}");
                break;
            }
        }
    }
}

/// Net count of unclosed parentheses, ignoring those inside strings and comments.
fn open_parens(source: &str) -> i64 {
    let mut depth = 0;
    let mut chars = source.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '(' => depth += 1,
            ')' => depth -= 1,
            ';' => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            }
            '"' => {
                while let Some(c) = chars.next() {
                    match c {
                        '\\' => {
                            chars.next();
                        }
                        '"' => break,
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }
    depth
}

fn print_help(_args: &[Value]) -> Result<Value, Error> {
    println!("gigl REPL:");
    println!("  :help          - Show this help message");
    println!("  :env           - Show current environment bindings");
    println!("  :macros        - List installed macros");
    println!("  :expand <form> - Show the one-step macro expansion of <form>");
    println!("  :quit          - Exit the interpreter");
    println!("  :exit          - Exit the interpreter");
    println!("  Ctrl+D         - Exit the interpreter");
    println!();
    println!("Expressions may span several lines; input is evaluated once parens balance.");
    println!();
    println!("Special forms:");
    println!("  quote quasiquote unquote unquote-splicing if cond set! define");
    println!("  lambda λ defn defmacro let begin apply");
    println!();
    println!("Examples:");
    println!("  (defn fact (n acc) (if (= n 0) acc (fact (- n 1) (* n acc))))");
    println!("  (fact 20 1)");
    println!("  `(1 ,@(list 2 3) 4)");
    println!("  (defmacro my-or (syntax-rules () ((_) #f) ((_ e r ...) (if e e (my-or r ...)))))");
    println!("  (when (> 2 1) 'yes)");
    println!();

    Ok(Value::Nil)
}

fn print_environment(env: &Environment) {
    let bindings = env.get_all_bindings();

    if bindings.is_empty() {
        println!("Environment is empty.");
        return;
    }

    println!("Environment bindings ({} total):", bindings.len());
    println!();

    // Separate built-in functions from user-defined values
    let mut builtins = Vec::new();
    let mut user_defined = Vec::new();

    for (name, value) in bindings {
        match value {
            Value::Builtin(_) => builtins.push(name),
            _ => user_defined.push((name, value)),
        }
    }

    if !builtins.is_empty() {
        println!("Built-in functions ({}):", builtins.len());
        // Print in columns for readability
        let mut col = 0;
        for name in builtins {
            print!("  {:<15}", name.as_str());
            col += 1;
            if col % 4 == 0 {
                println!();
            }
        }
        if col % 4 != 0 {
            println!();
        }
        println!();
    }

    if !user_defined.is_empty() {
        println!("User-defined values ({}):", user_defined.len());
        for (name, value) in user_defined {
            println!("  {name} = {value}");
        }
    }
}

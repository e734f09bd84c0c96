use boa_lang::cli::{generate_completions, Args, Commands};
use boa_lang::config::AppConfig;
use boa_lang::interpreter::evaluator::base_dir_for;
use boa_lang::interpreter::Interpreter;
use boa_lang::Value;
use clap::Parser;
use owo_colors::OwoColorize;
use std::io::{self, BufRead, Write};
use std::path::Path;

fn main() {
    let args = Args::parse();

    if args.version {
        println!("boa {}", env!("CARGO_PKG_VERSION"));
        return;
    }

    if let Some(Commands::Complete { shell }) = args.command {
        generate_completions(shell);
        return;
    }

    let config = AppConfig::from_args(&args);

    match &args.script {
        Some(path) => std::process::exit(run_file(path, &config)),
        None => run_repl(&config),
    }
}

fn run_file(path: &Path, config: &AppConfig) -> i32 {
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(_) => {
            error_message(config, &format!("Error: cannot open file '{}'", path.display()));
            return 1;
        }
    };

    let mut interp = Interpreter::new();
    interp.set_base_dir(base_dir_for(path));
    match interp.run(&source, &path.display().to_string()) {
        Ok(_) => 0,
        Err(e) => {
            error_message(config, &e.to_string());
            1
        }
    }
}

fn run_repl(config: &AppConfig) {
    println!(
        "Boa v{} REPL (type :help for commands, Ctrl+D to exit)",
        env!("CARGO_PKG_VERSION")
    );
    let mut interp = Interpreter::new();
    let stdin = io::stdin();

    loop {
        print!(">>> ");
        io::stdout().flush().ok();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                error_message(config, &format!("Error reading input: {}", e));
                break;
            }
        }
        let line = line.trim_end_matches(['\n', '\r']).to_string();

        if line.is_empty() {
            continue;
        }

        if line == ":help" {
            println!("REPL commands:");
            println!("  :help            Show this help");
            println!("  :run <file>      Run a Boa script file");
            println!("  :load <file>     Load and execute a file in current session");
            println!("  :doc <symbol>    Show documentation for a symbol");
            println!("  :quit            Exit the REPL");
            continue;
        }
        if line == ":quit" || line == ":exit" {
            break;
        }
        if let Some(path) = line.strip_prefix(":run ") {
            run_file(Path::new(path.trim()), config);
            continue;
        }
        if let Some(path) = line.strip_prefix(":load ") {
            let path = Path::new(path.trim());
            match std::fs::read_to_string(path) {
                Ok(source) => {
                    interp.set_base_dir(base_dir_for(path));
                    if let Err(e) = interp.run(&source, &path.display().to_string()) {
                        error_message(config, &e.to_string());
                    }
                }
                Err(_) => {
                    error_message(
                        config,
                        &format!("Error: cannot open file '{}'", path.display()),
                    );
                }
            }
            continue;
        }
        if let Some(symbol) = line.strip_prefix(":doc ") {
            let symbol = symbol.trim();
            match interp.globals().get(symbol) {
                Some(value) => println!("{} : {}", symbol, value.type_name()),
                None => println!("Symbol '{}' not found", symbol),
            }
            continue;
        }

        // A line ending in ':' starts a block; accumulate until a blank line
        let mut source = line;
        if source.ends_with(':') {
            loop {
                print!("... ");
                io::stdout().flush().ok();
                let mut cont = String::new();
                match stdin.lock().read_line(&mut cont) {
                    Ok(0) => break,
                    Ok(_) => {}
                    Err(_) => break,
                }
                let cont = cont.trim_end_matches(['\n', '\r']);
                if cont.trim().is_empty() {
                    break;
                }
                source.push('\n');
                source.push_str(cont);
            }
        }

        match interp.run(&source, "<repl>") {
            Ok(Value::None) => {}
            Ok(value) => println!("{}", value),
            Err(e) => error_message(config, &e.to_string()),
        }
    }

    println!("\nGoodbye!");
}

fn error_message(config: &AppConfig, message: &str) {
    if config.color_enabled {
        eprintln!("{}", message.red().bold());
    } else {
        eprintln!("{}", message);
    }
}

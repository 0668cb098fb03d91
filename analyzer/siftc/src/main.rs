//! sift CLI
//!
//! Walks file trees, classifies source into lexical regions, and reports
//! line statistics and pattern matches.

use siftc::{command_count, command_eval, command_list, command_snippet};

fn main() {
    siftc::tracing_setup::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        return;
    }

    let command = &args[1];
    let rest = &args[2..];

    let result = match command.as_str() {
        "count" => command_count(rest),
        "list" => command_list(rest),
        "snippet" => command_snippet(rest),
        "eval" => {
            if rest.is_empty() {
                Err("Usage: sift eval <expression>".to_string())
            } else {
                command_eval(&rest.join(" "))
            }
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        "version" | "--version" | "-v" => {
            println!("sift 0.2.0");
            Ok(())
        }
        other => Err(format!("unknown command `{other}` (try `sift help`)")),
    };

    if let Err(message) = result {
        eprintln!("error: {message}");
        std::process::exit(1);
    }
}

fn print_usage() {
    println!("sift - source tree analysis");
    println!();
    println!("Usage: sift <command> [key=value]...");
    println!();
    println!("Commands:");
    println!("  count    per-file line statistics (code, comments, strings)");
    println!("  list     lines matching literal or regex patterns");
    println!("  snippet  transform matching lines with an expression");
    println!("  eval     evaluate a standalone expression");
    println!("  version  print the version");
    println!("  help     this text");
    println!();
    println!("Options:");
    println!("  source=<path>[;<path>...]   files or directories (required)");
    println!("  recursive=<depth> | R       walk subdirectories (R = 16)");
    println!("  filter=<glob>[;<glob>...]   filename filters, e.g. *.rs");
    println!("  pattern=<str>[,<str>...]    literal patterns");
    println!("  rpattern=<re>[,<re>...]     regex patterns");
    println!("  state=code|comment|string|all  region subset to search");
    println!("  expression=<expr>           row filter (count/list) or transform (snippet)");
    println!("  sort=<column>               sort the result table");
    println!("  stats=sum|count|relation    extra statistics");
    println!("  max=<n>                     limit printed rows");
    println!("  output=<path>               write result (.csv / .sql pick the format)");
    println!("  print                       also print when output= is set");
    println!("  table=<name>                table name for SQL output");
    println!("  ignore=<path>               ignore-list file (wildcards, # comments)");
    println!("  vs                          Visual Studio line format");
    println!();
    println!("Environment:");
    println!("  SIFT_LOG=debug              tracing filter (RUST_LOG syntax)");
    println!("  SIFT_LOG_TREE=1             hierarchical trace output");
}

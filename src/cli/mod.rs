//! CLI Module for snipstash
//! Hand-rolled argument parsing and dispatch. Every command is a thin client
//! over the store API; rendering lives in `commands`.

pub mod commands;

use colored::Colorize;
use snipstash::SearchOptions;
use snipstash::config::{Config, Environment};
use std::error::Error;

/// Flags and positional arguments of one command line.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ParsedArgs {
    pub positional: Vec<String>,
    pub query: Option<String>,
    pub tags: Vec<String>,
    pub language: Option<String>,
    pub json: bool,
}

impl ParsedArgs {
    /// Search options from `-q` (or the positional words), `-t` and `-L`.
    pub fn search_options(&self) -> SearchOptions {
        let query = self
            .query
            .clone()
            .unwrap_or_else(|| self.positional.join(" "));
        let mut options = SearchOptions::new().query(query);
        for tag in &self.tags {
            options = options.tag(tag.as_str());
        }
        if let Some(language) = &self.language {
            options = options.language(language.as_str());
        }
        options
    }
}

/// Splits `args` into flags and positional arguments.
pub fn parse_args(args: &[String]) -> Result<ParsedArgs, String> {
    let mut parsed = ParsedArgs::default();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-q" | "--query" => parsed.query = Some(flag_value(&mut iter, arg)?),
            "-t" | "--tag" => parsed.tags.push(flag_value(&mut iter, arg)?),
            "-L" | "--lang" | "--language" => {
                parsed.language = Some(flag_value(&mut iter, arg)?)
            }
            "--json" => parsed.json = true,
            "--" => {
                parsed.positional.extend(iter.by_ref().cloned());
            }
            flag if flag.starts_with('-') && flag.len() > 1 => {
                return Err(format!("Unknown option: {}", flag));
            }
            _ => parsed.positional.push(arg.clone()),
        }
    }
    Ok(parsed)
}

fn flag_value(iter: &mut std::slice::Iter<'_, String>, flag: &str) -> Result<String, String> {
    iter.next()
        .cloned()
        .ok_or_else(|| format!("Missing value for {}", flag))
}

/// Bad command-line input. The relevant usage line has already been printed.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct UsageError(pub String);

fn usage(message: &str, usage: &str) -> Box<dyn Error> {
    println!("{}  Usage: snipstash {}", "┃".bright_magenta(), usage);
    Box::new(UsageError(message.to_string()))
}

/// Executes CLI commands based on the provided arguments
pub fn execute_cli(args: &[String]) -> Result<(), Box<dyn Error>> {
    let Some(command) = args.first() else {
        print_help();
        return Ok(());
    };

    let parsed = match parse_args(&args[1..]) {
        Ok(parsed) => parsed,
        Err(message) => return Err(usage(&message, "help")),
    };

    match command.as_str() {
        "list" | "ls" => commands::list_snippets(&commands::open_store()?, parsed.json)?,
        "show" | "view" | "cat" => match parsed.positional.first() {
            Some(key) => commands::show_snippet(&commands::open_store()?, key)?,
            None => return Err(usage("Missing snippet ID or title", "show <ID|TITLE>")),
        },
        "search" | "find" => {
            let options = parsed.search_options();
            commands::search_snippets(&commands::open_store()?, &options, parsed.json)?;
        }
        "new" | "add" => match parsed.positional.as_slice() {
            [title, rest @ ..] if rest.len() <= 1 => {
                let body = match rest.first() {
                    Some(body) => body.clone(),
                    None => commands::read_body_from_stdin()?,
                };
                commands::create_snippet(
                    &commands::open_store()?,
                    title,
                    body,
                    parsed.tags.clone(),
                    parsed.language.clone().unwrap_or_default(),
                )?;
            }
            _ => {
                return Err(usage(
                    "Expected a title and an optional body",
                    "new <TITLE> [BODY] [-t TAG]... [-L LANG]",
                ));
            }
        },
        "delete" | "rm" => match parsed.positional.first() {
            Some(id) => commands::delete_snippet(&commands::open_store()?, id)?,
            None => return Err(usage("Missing snippet ID", "delete <ID>")),
        },
        "fav" => match parsed.positional.first() {
            Some(id) => commands::toggle_favorite(&commands::open_store()?, id)?,
            None => return Err(usage("Missing snippet ID", "fav <ID>")),
        },
        "favorites" => commands::list_favorites(&commands::open_store()?)?,
        "tags" => commands::list_tags(&commands::open_store()?, parsed.json)?,
        "config" => run_config(&parsed.positional)?,
        "version" | "--version" | "-V" => {
            println!(
                "{}  snipstash {}",
                "┃".bright_magenta(),
                env!("CARGO_PKG_VERSION")
            );
        }
        "help" | "--help" | "-h" => print_help(),
        _ => {
            print_help();
            return Err(Box::new(UsageError(format!("Unknown command: {}", command))));
        }
    }

    Ok(())
}

fn run_config(args: &[String]) -> Result<(), Box<dyn Error>> {
    let env = Environment::current();
    match args {
        [] => commands::show_config(&env)?,
        [sub] if sub == "show" => commands::show_config(&env)?,
        [sub, key, value] if sub == "set" && key == "data_directory" => {
            let config = Config {
                data_directory: value.into(),
            };
            let path = config.save(&env)?;
            println!(
                "{}  {} data_directory = {}",
                "┃".bright_magenta(),
                "SAVED".bright_green().bold(),
                value
            );
            println!(
                "{}  {}: {}",
                "┃".bright_magenta(),
                "Config file".bright_blue(),
                path.display()
            );
        }
        _ => {
            return Err(usage(
                "Unknown config command",
                "config show | config set data_directory <PATH>",
            ));
        }
    }
    Ok(())
}

/// Prints the help message with available commands
fn print_help() {
    let entries = [
        ("list, ls [--json]", "List all snippets"),
        ("show <ID|TITLE>", "Display a snippet (ID prefix or title works)"),
        ("search [QUERY] [-q QUERY]", "Ranked search over titles, tags and bodies"),
        ("    [-t TAG]... [-L LANG]", "Only snippets with every tag and the language"),
        ("new <TITLE> [BODY]", "Create a snippet; body read from stdin if omitted"),
        ("    [-t TAG]... [-L LANG]", "Tags and language for the new snippet"),
        ("delete, rm <ID>", "Delete a snippet"),
        ("fav <ID>", "Toggle a snippet's favorite flag"),
        ("favorites", "List favorite snippets"),
        ("tags [--json]", "List tags with snippet counts"),
        ("config show", "Show the data directory and config file"),
        ("config set data_directory <P>", "Store a data directory in the config file"),
        ("version", "Print the version"),
        ("help", "Display this help message"),
    ];

    println!(
        "{}  {}",
        "┃".bright_magenta(),
        "SNIPSTASH - LOCAL SNIPPET STORE".bold()
    );
    println!("{}  {}", "┃".bright_magenta(), "USAGE:".bright_yellow());
    println!("{}  snipstash [COMMAND] [ARGS]", "┃".bright_magenta());
    println!("{}  {}", "┃".bright_magenta(), "COMMANDS:".bright_yellow());
    for (command, description) in entries {
        println!(
            "{}  {:<31} {}",
            "┃".bright_magenta(),
            command.bright_white(),
            description
        );
    }

    println!("{}  {}", "┃".bright_magenta(), "ENVIRONMENT:".bright_yellow());
    println!(
        "{}  {:<31} {}",
        "┃".bright_magenta(),
        "SNIPSTASH_DATA_DIR".bright_white(),
        "Overrides the configured data directory"
    );
    println!(
        "{}  {:<31} {}",
        "┃".bright_magenta(),
        "SNIPSTASH_CONFIG_PATH".bright_white(),
        "Alternate config file location"
    );
    println!(
        "{}  {:<31} {}",
        "┃".bright_magenta(),
        "SNIPSTASH_LOG".bright_white(),
        "Log level on stderr (default: warn)"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_flags_and_positionals() {
        let parsed =
            parse_args(&args(&["Title", "-t", "go", "--tag", "web", "-L", "go", "body", "--json"]))
                .unwrap();
        assert_eq!(parsed.positional, vec!["Title", "body"]);
        assert_eq!(parsed.tags, vec!["go", "web"]);
        assert_eq!(parsed.language.as_deref(), Some("go"));
        assert!(parsed.json);
    }

    #[test]
    fn missing_flag_value_is_an_error() {
        assert!(parse_args(&args(&["-t"])).is_err());
        assert!(parse_args(&args(&["--bogus"])).is_err());
    }

    fn assert_usage_error(list: &[&str]) {
        let err = execute_cli(&args(list)).unwrap_err();
        assert!(err.downcast_ref::<UsageError>().is_some(), "{:?}: {}", list, err);
    }

    #[test]
    fn bad_input_fails_before_touching_the_store() {
        assert_usage_error(&["list", "--bogus"]);
        assert_usage_error(&["search", "-t"]);
        assert_usage_error(&["show"]);
        assert_usage_error(&["new"]);
        assert_usage_error(&["new", "title", "body", "extra"]);
        assert_usage_error(&["delete"]);
        assert_usage_error(&["fav"]);
        assert_usage_error(&["config", "bogus"]);
        assert_usage_error(&["config", "set", "data_directory"]);
        assert_usage_error(&["frobnicate"]);
    }

    #[test]
    fn help_and_version_succeed() {
        assert!(execute_cli(&[]).is_ok());
        assert!(execute_cli(&args(&["help"])).is_ok());
        assert!(execute_cli(&args(&["version"])).is_ok());
    }

    #[test]
    fn double_dash_ends_options() {
        let parsed = parse_args(&args(&["Title", "--", "-not-a-flag"])).unwrap();
        assert_eq!(parsed.positional, vec!["Title", "-not-a-flag"]);
    }

    #[test]
    fn search_query_from_flag_or_words() {
        let from_words = parse_args(&args(&["web", "server"])).unwrap();
        assert_eq!(from_words.search_options().query, "web server");

        let from_flag = parse_args(&args(&["-q", "deploy", "-t", "devops", "-L", "bash"])).unwrap();
        let options = from_flag.search_options();
        assert_eq!(options.query, "deploy");
        assert_eq!(options.tags, vec!["devops"]);
        assert_eq!(options.language, "bash");
    }
}

use colored::Colorize;
use snipstash::config::{Config, Environment};
use snipstash::{SearchOptions, Snippet, SnippetStore, StoreError};
use std::error::Error;
use std::io::{self, IsTerminal, Read};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use super::UsageError;

const MIN_ID_WIDTH: usize = 8;
const TITLE_WIDTH: usize = 32;
const TAGS_WIDTH: usize = 24;
const LANGUAGE_WIDTH: usize = 10;

/// Opens the configured store and loads every record.
pub fn open_store() -> Result<SnippetStore, Box<dyn Error>> {
    let config = Config::load()?;
    let store = SnippetStore::open(&config.data_directory)?;
    let report = store.load_all()?;
    if !report.skipped.is_empty() {
        tracing::warn!(
            "{} file(s) in {} could not be loaded",
            report.skipped.len(),
            store.root().display()
        );
    }
    Ok(store)
}

/// Result of looking a snippet up by id, id prefix or title.
#[derive(Debug)]
pub enum Lookup {
    Found(Snippet),
    Ambiguous(Vec<Snippet>),
    Missing,
}

/// Exact id, then unique id prefix, then exact title (case-insensitive), then unique title prefix.
pub fn find_snippet(snippets: &[Snippet], key: &str) -> Lookup {
    if let Some(snippet) = snippets.iter().find(|s| s.id == key) {
        return Lookup::Found(snippet.clone());
    }

    let by_id: Vec<&Snippet> = snippets.iter().filter(|s| s.id.starts_with(key)).collect();
    if !by_id.is_empty() {
        return pick(by_id);
    }

    let name = key.to_lowercase();
    let exact: Vec<&Snippet> = snippets
        .iter()
        .filter(|s| s.title.to_lowercase() == name)
        .collect();
    if !exact.is_empty() {
        return pick(exact);
    }

    let partial: Vec<&Snippet> = snippets
        .iter()
        .filter(|s| s.title.to_lowercase().starts_with(&name))
        .collect();
    if partial.is_empty() {
        Lookup::Missing
    } else {
        pick(partial)
    }
}

fn pick(matches: Vec<&Snippet>) -> Lookup {
    match matches.as_slice() {
        [one] => Lookup::Found((*one).clone()),
        _ => Lookup::Ambiguous(matches.into_iter().cloned().collect()),
    }
}

/// Resolves `key` to exactly one snippet, listing the candidates when it is ambiguous.
fn resolve(store: &SnippetStore, key: &str) -> Result<Snippet, Box<dyn Error>> {
    let snippets = store.get_all();
    match find_snippet(&snippets, key) {
        Lookup::Found(snippet) => Ok(snippet),
        Lookup::Missing => Err(Box::new(StoreError::NotFound(key.to_string()))),
        Lookup::Ambiguous(candidates) => {
            println!("{}", "─".repeat(60).bright_magenta());
            for snippet in candidates.iter().take(10) {
                println!(
                    "{}  {}  {}",
                    "┃".bright_magenta(),
                    snippet.id.bright_black(),
                    snippet.title.bright_white()
                );
            }
            Err(Box::new(UsageError(format!(
                "'{}' matches {} snippets, use a longer ID",
                key,
                candidates.len()
            ))))
        }
    }
}

/// Shortest prefix length (at least 8) that keeps every id distinct.
pub fn short_id_width(snippets: &[Snippet]) -> usize {
    let mut ids: Vec<&str> = snippets.iter().map(|s| s.id.as_str()).collect();
    ids.sort_unstable();
    let widest = ids.iter().map(|id| id.len()).max().unwrap_or(0);
    let needed = ids
        .windows(2)
        .map(|pair| {
            pair[0]
                .bytes()
                .zip(pair[1].bytes())
                .take_while(|(a, b)| a == b)
                .count()
                + 1
        })
        .max()
        .unwrap_or(0);
    needed.max(MIN_ID_WIDTH).min(widest.max(MIN_ID_WIDTH))
}

fn short_id(id: &str, width: usize) -> &str {
    match id.char_indices().nth(width) {
        Some((end, _)) => &id[..end],
        None => id,
    }
}

/// Truncates to `width` display columns (ending in `…` when cut) and pads with spaces.
pub fn fit(text: &str, width: usize) -> String {
    let mut out = String::new();
    if text.width() <= width {
        out.push_str(text);
    } else {
        let mut used = 0;
        for ch in text.chars() {
            let w = ch.width().unwrap_or(0);
            if used + w + 1 > width {
                break;
            }
            out.push(ch);
            used += w;
        }
        out.push('…');
    }
    let pad = width.saturating_sub(out.width());
    out.push_str(&" ".repeat(pad));
    out
}

fn print_table(snippets: &[Snippet]) {
    let id_width = short_id_width(snippets);
    println!(
        "{}  {}  {} {} {} {}",
        "┃".bright_magenta(),
        fit("ID", id_width).bright_black(),
        fit("TITLE", TITLE_WIDTH).bold(),
        fit("TAGS", TAGS_WIDTH).bright_cyan(),
        fit("LANGUAGE", LANGUAGE_WIDTH).bright_yellow(),
        "FAV"
    );
    println!("{}", "─".repeat(60).bright_magenta());
    for snippet in snippets {
        println!(
            "{}  {}  {} {} {} {}",
            "┃".bright_magenta(),
            short_id(&snippet.id, id_width).bright_black(),
            fit(&snippet.title, TITLE_WIDTH).bright_white(),
            fit(&snippet.tags.join(", "), TAGS_WIDTH).cyan(),
            fit(&snippet.language, LANGUAGE_WIDTH).yellow(),
            if snippet.is_favorite { "★".yellow() } else { "".normal() }
        );
    }
}

/// Lists every snippet as a table or as JSON
pub fn list_snippets(store: &SnippetStore, json: bool) -> Result<(), Box<dyn Error>> {
    let snippets = store.get_all();
    if json {
        println!("{}", serde_json::to_string_pretty(&snippets)?);
        return Ok(());
    }

    if snippets.is_empty() {
        println!(
            "{}  No snippets in {}",
            "┃".bright_magenta(),
            store.root().display()
        );
        return Ok(());
    }

    println!(
        "{}  {} {}",
        "┃".bright_magenta(),
        snippets.len().to_string().bright_yellow(),
        "SNIPPETS".bold()
    );
    print_table(&snippets);
    Ok(())
}

/// Shows the content of a specific snippet by ID or title
pub fn show_snippet(store: &SnippetStore, key: &str) -> Result<(), Box<dyn Error>> {
    display_snippet_content(&resolve(store, key)?);
    Ok(())
}

fn display_snippet_content(snippet: &Snippet) {
    println!(
        "{}  {} {}",
        "┃".bright_magenta(),
        "SNIPPET".bright_green().bold(),
        snippet.title.bold()
    );
    println!("{}", "─".repeat(60).bright_magenta());

    if !snippet.tags.is_empty() {
        println!(
            "{}  {}: {}",
            "┃".bright_magenta(),
            "Tags".bright_cyan(),
            snippet.tags.join(", ")
        );
    }
    if !snippet.language.is_empty() {
        println!(
            "{}  {}: {}",
            "┃".bright_magenta(),
            "Language".bright_yellow(),
            snippet.language
        );
    }
    if snippet.is_favorite {
        println!("{}  {}", "┃".bright_magenta(), "★ Favorite".yellow());
    }
    println!(
        "{}  {}: {}",
        "┃".bright_magenta(),
        "Updated".bright_blue(),
        snippet.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!(
        "{}  {}: {}",
        "┃".bright_magenta(),
        "ID".bright_black(),
        snippet.id
    );
    println!("{}", "─".repeat(60).bright_magenta());

    for line in snippet.body.lines() {
        println!("{}  {}", "┃".bright_magenta(), line);
    }
}

/// Runs a ranked search and prints the results with their scores
pub fn search_snippets(
    store: &SnippetStore,
    options: &SearchOptions,
    json: bool,
) -> Result<(), Box<dyn Error>> {
    let results = store.search_with_filters(options);
    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    let mut heading = if options.query.trim().is_empty() {
        "all snippets".to_string()
    } else {
        format!("'{}'", options.query)
    };
    if options.has_filters() {
        if !options.tags.is_empty() {
            heading.push_str(&format!(" tags: {}", options.tags.join(", ")));
        }
        if !options.language.is_empty() {
            heading.push_str(&format!(" language: {}", options.language));
        }
    }

    println!(
        "{}  {} {}",
        "┃".bright_magenta(),
        "SEARCH RESULTS FOR".bold(),
        heading.bright_white()
    );

    if results.is_empty() {
        println!("{}  No snippets found", "┃".bright_magenta());
        return Ok(());
    }

    println!("{}", "─".repeat(60).bright_magenta());
    for (idx, result) in results.iter().enumerate() {
        let snippet = &result.snippet;
        println!(
            "{}  {}. {} (score: {})",
            "┃".bright_magenta(),
            (idx + 1).to_string().bright_yellow(),
            snippet.title.bright_white().bold(),
            result.score.to_string().bright_green()
        );
        if !snippet.tags.is_empty() {
            println!(
                "{}     {}: {}",
                "┃".bright_magenta(),
                "Tags".bright_cyan(),
                snippet.tags.join(", ")
            );
        }
        let preview = snippet.preview();
        if !preview.is_empty() {
            println!("{}     {}", "┃".bright_magenta(), preview.bright_black());
        }
        println!(
            "{}     {}: {}",
            "┃".bright_magenta(),
            "ID".bright_black(),
            snippet.id
        );
    }
    Ok(())
}

/// Reads a snippet body from standard input until EOF.
pub fn read_body_from_stdin() -> Result<String, Box<dyn Error>> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        eprintln!("Enter the snippet body, then press Ctrl-D:");
    }
    let mut body = String::new();
    stdin.lock().read_to_string(&mut body)?;
    Ok(body)
}

/// Creates and saves a new snippet
pub fn create_snippet(
    store: &SnippetStore,
    title: &str,
    body: String,
    tags: Vec<String>,
    language: String,
) -> Result<(), Box<dyn Error>> {
    let mut snippet = Snippet::with_body(title, body);
    snippet.tags = tags;
    snippet.language = language;
    store.save(&mut snippet)?;

    println!(
        "{}  {} {}",
        "┃".bright_magenta(),
        "CREATED".bright_green().bold(),
        snippet.title.bold()
    );
    println!(
        "{}  {}: {}",
        "┃".bright_magenta(),
        "ID".bright_black(),
        snippet.id
    );
    if let Some(path) = store.file_of(&snippet.id) {
        println!(
            "{}  {}: {}",
            "┃".bright_magenta(),
            "File".bright_blue(),
            path.display()
        );
    }
    Ok(())
}

/// Deletes a snippet by ID (a unique prefix works)
pub fn delete_snippet(store: &SnippetStore, key: &str) -> Result<(), Box<dyn Error>> {
    let snippet = resolve(store, key)?;
    store.delete(&snippet.id)?;
    println!(
        "{}  {} {}",
        "┃".bright_magenta(),
        "DELETED".bright_red().bold(),
        snippet.title.bold()
    );
    Ok(())
}

/// Flips a snippet's favorite flag and saves it
pub fn toggle_favorite(store: &SnippetStore, key: &str) -> Result<(), Box<dyn Error>> {
    let mut snippet = resolve(store, key)?;
    snippet.is_favorite = !snippet.is_favorite;
    store.save(&mut snippet)?;

    let state = if snippet.is_favorite {
        "added to favorites".bright_green()
    } else {
        "removed from favorites".bright_yellow()
    };
    println!(
        "{}  {} {}",
        "┃".bright_magenta(),
        snippet.title.bold(),
        state
    );
    Ok(())
}

/// Lists all favorite snippets
pub fn list_favorites(store: &SnippetStore) -> Result<(), Box<dyn Error>> {
    let favorites = store.favorites();
    if favorites.is_empty() {
        println!("{}  No favorite snippets found.", "┃".bright_magenta());
        return Ok(());
    }

    println!(
        "{}  {} favorite snippets:",
        "┃".bright_magenta(),
        favorites.len()
    );
    print_table(&favorites);
    Ok(())
}

/// Lists tags with how many snippets carry each
pub fn list_tags(store: &SnippetStore, json: bool) -> Result<(), Box<dyn Error>> {
    let tags = store.tags();
    if json {
        println!("{}", serde_json::to_string_pretty(&tags)?);
        return Ok(());
    }

    if tags.is_empty() {
        println!("{}  No tags found.", "┃".bright_magenta());
        return Ok(());
    }

    let width = tags.iter().map(|t| t.name.width()).max().unwrap_or(0);
    println!("{}  {}", "┃".bright_magenta(), "TAGS".bold());
    println!("{}", "─".repeat(60).bright_magenta());
    for tag in tags {
        println!(
            "{}  {} {}",
            "┃".bright_magenta(),
            fit(&tag.name, width).bright_cyan(),
            tag.count.to_string().bright_yellow()
        );
    }
    Ok(())
}

/// Prints the resolved data directory and config file location
pub fn show_config(env: &Environment) -> Result<(), Box<dyn Error>> {
    let config = Config::resolve(env)?;
    println!("{}  {}", "┃".bright_magenta(), "CONFIG".bold());
    println!(
        "{}  {}: {}",
        "┃".bright_magenta(),
        "data_directory".bright_white(),
        config.data_directory.display()
    );
    match env.config_path() {
        Some(path) => println!(
            "{}  {}: {}{}",
            "┃".bright_magenta(),
            "Config file".bright_blue(),
            path.display(),
            if path.exists() { "" } else { " (not created)" }
        ),
        None => println!(
            "{}  {}: unavailable",
            "┃".bright_magenta(),
            "Config file".bright_blue()
        ),
    }
    Ok(())
}

//! Interactive chat session.
//!
//! A rustyline-driven loop over the query engine. Each question is answered
//! in streaming mode with fragments printed as they arrive; slash commands
//! manage the document store without leaving the session. Turns are
//! single-flight, one question at a time, and the transcript lives only in
//! memory for the lifetime of the session. Each question is answered from
//! the store alone; earlier turns are not sent back to the model.

use anyhow::Result;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use sqlx::SqlitePool;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::catalog::list_documents;
use crate::chat::ChatClient;
use crate::config::Config;
use crate::embedding::EmbeddingClient;
use crate::extract::extract_file;
use crate::ingest::add_document;
use crate::models::ChatTurn;
use crate::query::stream_query;

const PROMPT: &str = "you> ";

/// What one line of input asks the session to do.
#[derive(Debug, PartialEq, Eq)]
enum Input {
    Ask(String),
    Add(PathBuf),
    List,
    History,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

fn parse_input(line: &str) -> Input {
    let line = line.trim();
    if line.is_empty() {
        return Input::Empty;
    }
    if !line.starts_with('/') {
        return Input::Ask(line.to_string());
    }

    let (command, rest) = match line.split_once(char::is_whitespace) {
        Some((c, r)) => (c, r.trim()),
        None => (line, ""),
    };

    match command {
        "/add" if !rest.is_empty() => Input::Add(PathBuf::from(rest)),
        "/add" => Input::Unknown("/add needs a file path".to_string()),
        "/list" => Input::List,
        "/history" => Input::History,
        "/help" => Input::Help,
        "/quit" | "/exit" => Input::Quit,
        other => Input::Unknown(format!("unknown command: {}", other)),
    }
}

/// The document title used when a file is added: its stem, falling back to
/// the full file name.
fn title_from_path(path: &Path) -> String {
    path.file_stem()
        .or_else(|| path.file_name())
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn print_help() {
    println!("Commands:");
    println!("  /add <path>   ingest a txt, md, pdf or docx file");
    println!("  /list         show stored documents");
    println!("  /history      show this session's turns");
    println!("  /help         show this help");
    println!("  /quit         leave the session");
    println!("Anything else is asked as a question over your documents.");
}

/// Run the interactive loop until the user quits or input reaches EOF.
pub async fn run(
    pool: &SqlitePool,
    embedder: &EmbeddingClient,
    chat: &ChatClient,
    config: &Config,
) -> Result<()> {
    let mut editor = DefaultEditor::new()?;
    let mut transcript: Vec<ChatTurn> = Vec::new();

    println!(
        "{} (model: {}). Type {} for commands.",
        "docchat".bold(),
        chat.model(),
        "/help".cyan()
    );

    loop {
        let line = match editor.readline(PROMPT) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        let _ = editor.add_history_entry(line.trim());

        match parse_input(&line) {
            Input::Empty => {}
            Input::Quit => break,
            Input::Help => print_help(),
            Input::History if transcript.is_empty() => println!("No turns yet."),
            Input::History => print!("{}", render_transcript(&transcript)),
            Input::List => match list_documents(pool).await {
                Ok(entries) if entries.is_empty() => println!("No documents stored yet."),
                Ok(entries) => {
                    for entry in entries {
                        println!("{} ({})", entry.title.bold(), entry.source);
                        println!("  {}", entry.summary);
                    }
                }
                Err(e) => eprintln!("{} {:#}", "Error:".red(), e),
            },
            Input::Add(path) => {
                let title = title_from_path(&path);
                match ingest_file(pool, embedder, config, path).await {
                    Ok(count) => println!("Added '{}' ({} chunks).", title, count),
                    Err(e) => eprintln!("{} {:#}", "Error:".red(), e),
                }
            }
            Input::Unknown(message) => {
                eprintln!("{} {}", "Error:".red(), message);
                println!("Type {} for commands.", "/help".cyan());
            }
            Input::Ask(question) => {
                transcript.push(ChatTurn::user(&question));
                let answer = answer_streaming(pool, embedder, chat, config, &question).await;
                transcript.push(ChatTurn::assistant(answer));
            }
        }
    }

    println!("Bye.");
    Ok(())
}

async fn ingest_file(
    pool: &SqlitePool,
    embedder: &EmbeddingClient,
    config: &Config,
    path: PathBuf,
) -> Result<usize> {
    let title = title_from_path(&path);
    if title.trim().is_empty() {
        anyhow::bail!("document title must not be empty");
    }
    let content = extract_file(path).await?;
    add_document(pool, embedder, config, &title, &content, "Local/Manual").await
}

/// One line per turn, prefixed with who said it.
fn render_transcript(transcript: &[ChatTurn]) -> String {
    let mut out = String::new();
    for turn in transcript {
        out.push_str(turn.role.as_str());
        out.push_str(": ");
        out.push_str(&turn.content);
        out.push('\n');
    }
    out
}

/// Stream one answer to stdout, returning the full text for the transcript.
/// A failure is printed inline and recorded as the assistant turn so the
/// session stays usable.
async fn answer_streaming(
    pool: &SqlitePool,
    embedder: &EmbeddingClient,
    chat: &ChatClient,
    config: &Config,
    question: &str,
) -> String {
    let mut rx = match stream_query(pool, embedder, chat, config, question).await {
        Ok(rx) => rx,
        Err(e) => {
            let message = format!("Error: {:#}", e);
            eprintln!("{}", message.red());
            return message;
        }
    };

    let mut answer = String::new();
    while let Some(item) = rx.recv().await {
        match item {
            Ok(fragment) => {
                print!("{}", fragment);
                let _ = std::io::stdout().flush();
                answer.push_str(&fragment);
            }
            Err(e) => {
                let message = format!("Error: {:#}", e);
                eprintln!("\n{}", message.red());
                answer.push_str(&message);
                break;
            }
        }
    }
    println!();
    answer
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_a_question() {
        assert_eq!(
            parse_input("How many leave days?"),
            Input::Ask("How many leave days?".to_string())
        );
    }

    #[test]
    fn whitespace_is_trimmed() {
        assert_eq!(parse_input("   "), Input::Empty);
        assert_eq!(
            parse_input("  question  "),
            Input::Ask("question".to_string())
        );
    }

    #[test]
    fn commands_parse() {
        assert_eq!(
            parse_input("/add ./docs/policy.pdf"),
            Input::Add(PathBuf::from("./docs/policy.pdf"))
        );
        assert_eq!(parse_input("/list"), Input::List);
        assert_eq!(parse_input("/history"), Input::History);
        assert_eq!(parse_input("/help"), Input::Help);
        assert_eq!(parse_input("/quit"), Input::Quit);
        assert_eq!(parse_input("/exit"), Input::Quit);
    }

    #[test]
    fn add_requires_a_path() {
        assert!(matches!(parse_input("/add"), Input::Unknown(_)));
        assert!(matches!(parse_input("/add   "), Input::Unknown(_)));
    }

    #[test]
    fn unknown_commands_are_reported() {
        assert!(matches!(parse_input("/frobnicate"), Input::Unknown(_)));
    }

    #[test]
    fn add_path_keeps_spaces_after_command() {
        assert_eq!(
            parse_input("/add my notes.txt"),
            Input::Add(PathBuf::from("my notes.txt"))
        );
    }

    #[test]
    fn transcript_renders_turns_in_order_with_roles() {
        let transcript = vec![
            ChatTurn::user("How many leave days?"),
            ChatTurn::assistant("Employees get 20 days leave."),
        ];
        assert_eq!(
            render_transcript(&transcript),
            "user: How many leave days?\nassistant: Employees get 20 days leave.\n"
        );
    }

    #[test]
    fn title_comes_from_file_stem() {
        assert_eq!(title_from_path(Path::new("./docs/policy.pdf")), "policy");
        assert_eq!(title_from_path(Path::new("notes")), "notes");
    }
}

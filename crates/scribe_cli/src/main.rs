//! Scribe CLI - anchored feedback and word-level diffs for writers.

use anyhow::Result;
use clap::{Parser, Subcommand};
use scribe_core::{AnnotationType, Priority, Status};

mod commands;

#[derive(Parser)]
#[command(name = "scribe")]
#[command(about = "Anchored feedback and word-level diffs for writers", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a scribe store in the current git repository
    Init,
    /// Show a word-level diff between two texts
    ///
    /// Each side is a file path, or `REV:PATH` to read from git.
    Diff {
        /// Original text
        old: String,
        /// Revised text
        new: String,
        /// Unchanged words shown around each change
        #[arg(long)]
        context: Option<usize>,
        /// Show every unchanged word
        #[arg(long)]
        full: bool,
        /// Compare words case-insensitively
        #[arg(long)]
        ignore_case: bool,
        /// Ignore punctuation when comparing
        #[arg(long)]
        ignore_punctuation: bool,
    },
    /// Leave and manage feedback
    Note {
        #[command(subcommand)]
        command: NoteCommands,
    },
    /// Move notes on a file from one revision to the next
    Sync {
        /// File whose notes should follow the text
        file: String,
        /// Revision the notes are anchored at
        from: String,
        /// Revision to move them to
        to: String,
    },
    /// Work with suggested edits
    Suggest {
        #[command(subcommand)]
        command: SuggestCommands,
    },
}

#[derive(Subcommand)]
enum NoteCommands {
    /// Leave a note on a line range
    Add {
        /// File the note is about
        file: String,
        /// First line (1-based)
        line: u32,
        /// Last line, if more than one
        #[arg(long)]
        end: Option<u32>,
        /// Byte columns on the line, as START..END
        #[arg(long, value_parser = commands::parse_columns)]
        columns: Option<(u32, u32)>,
        /// Note text
        #[arg(short, long)]
        message: String,
        /// comment, suggestion, question, praise, issue or task
        #[arg(short = 't', long = "type", default_value = "comment")]
        kind: AnnotationType,
        /// Replacement text (makes the note a suggestion)
        #[arg(long)]
        suggest: Option<String>,
        /// low, medium, high or critical
        #[arg(short, long)]
        priority: Option<Priority>,
        /// Tag (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Who should act on it
        #[arg(long)]
        assign: Option<String>,
        /// Revision the line numbers refer to (default: HEAD)
        #[arg(long)]
        rev: Option<String>,
    },
    /// List notes
    List {
        /// Only notes on this file
        #[arg(long)]
        file: Option<String>,
        /// Only notes with this status (repeatable)
        #[arg(long)]
        status: Vec<Status>,
        /// Only notes by this author
        #[arg(long)]
        author: Option<String>,
        /// Only notes tagged with this
        #[arg(long)]
        tag: Option<String>,
        /// Only notes flagged after their text was deleted
        #[arg(long)]
        needs_review: bool,
        /// Include resolved, accepted and rejected notes
        #[arg(short, long)]
        all: bool,
    },
    /// Show a note and its replies
    Show {
        id: String,
    },
    /// Mark a note as being worked on
    Start {
        id: String,
    },
    /// Mark a note as addressed
    Resolve {
        id: String,
        #[arg(short, long)]
        message: Option<String>,
    },
    /// Accept a suggestion or request
    Accept {
        id: String,
        #[arg(short, long)]
        message: Option<String>,
    },
    /// Decline a suggestion or request
    Reject {
        id: String,
        #[arg(short, long)]
        message: Option<String>,
    },
    /// Reply to a note
    Reply {
        id: String,
        /// Reply text
        text: String,
    },
    /// Assign a note, or clear the assignee if none is given
    Assign {
        id: String,
        assignee: Option<String>,
    },
    /// Delete a note and its replies
    Delete {
        id: String,
    },
    /// Clear the needs-review flag
    Reviewed {
        id: String,
    },
}

#[derive(Subcommand)]
enum SuggestCommands {
    /// Show what applying a suggestion would change
    Preview {
        id: String,
    },
    /// Apply a suggestion to the working copy
    Apply {
        id: String,
        /// Also mark the suggestion accepted
        #[arg(long)]
        accept: bool,
    },
}

fn main() -> Result<()> {
    // Initialize tracing subscriber
    // Respects RUST_LOG environment variable (e.g., RUST_LOG=debug)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => commands::init::run(),
        Commands::Diff {
            old,
            new,
            context,
            full,
            ignore_case,
            ignore_punctuation,
        } => commands::diff::run(
            &old,
            &new,
            commands::diff::DiffArgs {
                context,
                full,
                ignore_case,
                ignore_punctuation,
            },
        ),
        Commands::Note { command } => match command {
            NoteCommands::Add {
                file,
                line,
                end,
                columns,
                message,
                kind,
                suggest,
                priority,
                tags,
                assign,
                rev,
            } => commands::note::add(commands::note::AddArgs {
                file,
                line,
                end,
                columns,
                message,
                kind,
                suggest,
                priority,
                tags,
                assign,
                rev,
            }),
            NoteCommands::List {
                file,
                status,
                author,
                tag,
                needs_review,
                all,
            } => commands::note::list(file, status, author, tag, needs_review, all),
            NoteCommands::Show { id } => commands::note::show(&id),
            NoteCommands::Start { id } => {
                commands::note::transition(&id, Status::InProgress, None)
            }
            NoteCommands::Resolve { id, message } => {
                commands::note::transition(&id, Status::Resolved, message.as_deref())
            }
            NoteCommands::Accept { id, message } => {
                commands::note::transition(&id, Status::Accepted, message.as_deref())
            }
            NoteCommands::Reject { id, message } => {
                commands::note::transition(&id, Status::Rejected, message.as_deref())
            }
            NoteCommands::Reply { id, text } => commands::note::reply(&id, &text),
            NoteCommands::Assign { id, assignee } => {
                commands::note::assign(&id, assignee.as_deref())
            }
            NoteCommands::Delete { id } => commands::note::delete(&id),
            NoteCommands::Reviewed { id } => commands::note::reviewed(&id),
        },
        Commands::Sync { file, from, to } => commands::sync::run(&file, &from, &to),
        Commands::Suggest { command } => match command {
            SuggestCommands::Preview { id } => commands::suggest::preview(&id),
            SuggestCommands::Apply { id, accept } => commands::suggest::apply(&id, accept),
        },
    }
}

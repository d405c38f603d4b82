//! Shared types for the keepsake application.
//!
//! This module holds the crate Result alias, the collaborator interfaces
//! passed into command functions, and the CLI command tree.
use std::path::PathBuf;

use chrono::{NaiveDate, NaiveTime};
use clap::Subcommand;

use crate::{Category, KeepsakeError};

/// A specialized Result type for keepsake operations.
pub type Result<T> = std::result::Result<T, KeepsakeError>;

/// Obtains a yes/no answer before anything is deleted.
pub trait Confirmer {
    fn confirm(&self, message: &str) -> bool;
}

/// Answers every question the same way; `Fixed(true)` backs `--force`.
pub struct Fixed(pub bool);

impl Confirmer for Fixed {
    fn confirm(&self, _message: &str) -> bool {
        self.0
    }
}

/// Outcome of a confirm-then-delete operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deletion {
    /// The record was removed and the collection persisted
    Deleted,
    /// The confirmer said no; nothing changed
    Declined,
}

/// Summary of an accepted upload batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReport {
    /// Bucket that received the photos
    pub bucket_id: String,
    pub date: NaiveDate,
    /// Number of photos added by this batch
    pub added: usize,
    /// Whether the photos were appended to an existing bucket
    pub merged: bool,
}

/// Timeline commands
#[derive(Subcommand)]
pub enum EventCommand {
    /// Add an event to the timeline
    Add {
        /// Title of the event
        #[clap(short = 'T', long)]
        title: String,

        /// Calendar date, YYYY-MM-DD
        #[clap(short, long)]
        date: NaiveDate,

        /// birthday, anniversary or holiday
        #[clap(short, long, value_parser = parse_category, default_value = "birthday")]
        category: Category,

        /// Reminder time of day, HH:MM
        #[clap(short, long, value_parser = parse_time)]
        reminder: Option<NaiveTime>,

        /// Image to attach
        #[clap(short, long)]
        photo: Option<PathBuf>,
    },

    /// Show the timeline with countdowns
    List,

    /// Delete an event by ID
    Delete {
        id: String,

        /// Skip confirmation prompt
        #[clap(short, long)]
        force: bool,
    },
}

/// Album commands
#[derive(Subcommand)]
pub enum AlbumCommand {
    /// Upload photos into today's bucket
    Upload {
        /// Image files (at most 9 per batch)
        #[clap(required = true)]
        files: Vec<PathBuf>,
    },

    /// Show buckets grouped by year
    List,

    /// Change a photo's title
    Rename { photo_id: String, title: String },

    /// Delete a photo by ID
    Delete {
        photo_id: String,

        /// Skip confirmation prompt
        #[clap(short, long)]
        force: bool,
    },
}

/// Diary commands
#[derive(Subcommand)]
pub enum DiaryCommand {
    /// Create an entry, or update one when --id is given
    Write {
        /// ID of the entry to update
        #[clap(long)]
        id: Option<String>,

        #[clap(short = 'T', long)]
        title: Option<String>,

        /// Calendar date, YYYY-MM-DD (defaults to today for new entries)
        #[clap(short, long)]
        date: Option<NaiveDate>,

        /// Entry text
        #[clap(short, long)]
        content: Option<String>,

        /// Path to a file containing the entry text
        #[clap(short, long, conflicts_with = "content")]
        file: Option<PathBuf>,

        /// Image to attach
        #[clap(short, long)]
        photo: Option<PathBuf>,

        /// Remove the attached image
        #[clap(long, conflicts_with = "photo")]
        clear_photo: bool,
    },

    /// List entries with summaries
    List,

    /// Show one entry with its comments
    Show { id: String },

    /// Expand or collapse an entry's comment thread in listings
    ToggleComments { id: String },

    /// Delete an entry by ID
    Delete {
        id: String,

        /// Skip confirmation prompt
        #[clap(short, long)]
        force: bool,
    },

    /// Add a comment to an entry
    Comment {
        id: String,
        content: String,

        #[clap(short, long)]
        author: Option<String>,
    },

    /// Delete a comment from an entry
    Uncomment {
        id: String,
        comment_id: String,

        /// Skip confirmation prompt
        #[clap(short, long)]
        force: bool,
    },
}

/// Available subcommands for the keepsake application
#[derive(Subcommand)]
pub enum Commands {
    /// Anniversaries on the timeline
    #[clap(subcommand)]
    Event(EventCommand),

    /// Photo album
    #[clap(subcommand)]
    Album(AlbumCommand),

    /// Diary entries and comments
    #[clap(subcommand)]
    Diary(DiaryCommand),

    /// Configuration management
    Config {
        /// Show current configuration
        #[clap(short = 'S', long)]
        show: bool,
    },
}

fn parse_category(value: &str) -> std::result::Result<Category, String> {
    match value.to_lowercase().as_str() {
        "birthday" => Ok(Category::Birthday),
        "anniversary" => Ok(Category::Anniversary),
        "holiday" => Ok(Category::Holiday),
        other => Err(format!(
            "unknown category '{}', expected birthday, anniversary or holiday",
            other
        )),
    }
}

fn parse_time(value: &str) -> std::result::Result<NaiveTime, String> {
    NaiveTime::parse_from_str(value, "%H:%M").map_err(|e| e.to_string())
}

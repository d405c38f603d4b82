//! CLI module for the keepsake application
//!
//! This module maps subcommands onto the timeline, album and diary command
//! functions and renders their outcomes as terminal output.
use std::{
    fs::read_to_string,
    io::{stdin, stdout, Write},
    path::Path,
    sync::Mutex,
};

use console::style;
use log::{debug, info};

use crate::{
    edit_in_editor, local_today, summary, Album, AlbumCommand, BlobLoader, CelebrationLatch,
    Commands, Config, Confirmer, Deletion, Diary, DiaryCommand, DiaryEntry, EncodedBlob,
    EventCommand, Fixed, KeepsakeError, NewEvent, RecordStore, Result, Timeline,
};

/// Asks on the terminal and accepts `y` or `yes`.
pub struct StdinConfirmer;

impl Confirmer for StdinConfirmer {
    fn confirm(&self, message: &str) -> bool {
        print!("{} [y/N]: ", message);
        if stdout().flush().is_err() {
            return false;
        }

        let mut input = String::new();
        if stdin().read_line(&mut input).is_err() {
            return false;
        }
        matches!(input.trim().to_lowercase().as_str(), "y" | "yes")
    }
}

/// CLI Application handler - processes CLI commands against the record store
pub struct App {
    timeline: Timeline,
    album: Album,
    diary: Diary,
    loader: BlobLoader,

    /// Application configuration
    config: Config,

    /// Whether to display verbose output
    verbose: bool,

    celebration: Mutex<CelebrationLatch>,
}

impl App {
    /// Create a new CLI application over the given store and config
    pub fn new(store: RecordStore, config: Config, verbose: bool) -> Self {
        let loader = BlobLoader::new(config.max_blob_bytes);
        Self {
            timeline: Timeline::new(store.clone()),
            album: Album::new(store.clone(), loader.clone(), config.max_upload_batch),
            diary: Diary::with_default_author(store, config.default_author.clone()),
            loader,
            config,
            verbose,
            celebration: Mutex::new(CelebrationLatch::new()),
        }
    }

    /// Run the CLI application with the given command
    pub async fn run(&self, command: Commands) -> Result<()> {
        match command {
            Commands::Event(command) => self.run_event(command).await,
            Commands::Album(command) => self.run_album(command).await,
            Commands::Diary(command) => self.run_diary(command).await,
            Commands::Config { show } => {
                if show {
                    println!("{}", serde_json::to_string_pretty(&self.config)?);
                }
                Ok(())
            }
        }
    }

    async fn run_event(&self, command: EventCommand) -> Result<()> {
        match command {
            EventCommand::Add {
                title,
                date,
                category,
                reminder,
                photo,
            } => {
                let photo = self.load_photo(photo.as_deref()).await?;
                let event = self.timeline.add_event(NewEvent {
                    title,
                    date,
                    category,
                    reminder,
                    photo,
                })?;
                println!("Event added with ID: {}", event.id);
            }

            EventCommand::List => self.show_timeline()?,

            EventCommand::Delete { id, force } => {
                let outcome = self.timeline.delete_event(&id, confirmer(force))?;
                report_deletion(outcome, "Event");
            }
        }
        Ok(())
    }

    fn show_timeline(&self) -> Result<()> {
        let view = self.timeline.project(local_today());
        if view.items.is_empty() {
            println!("No anniversaries yet, add one with `keepsake event add`.");
            return Ok(());
        }

        for item in &view.items {
            let event = &item.event;
            println!(
                "{}  {}  {}",
                style(event.date.format("%Y-%m-%d")).dim(),
                style(&event.title).bold(),
                style(event.category).cyan()
            );
            println!("    {}", item.countdown);
            if let Some(reminder) = event.reminder {
                println!("    reminder at {}", reminder.format("%H:%M"));
            }
            if self.verbose {
                println!("    id: {}", event.id);
            }
        }

        let fire = self
            .celebration
            .lock()
            .map_err(|e| KeepsakeError::LockAcquisitionFailed {
                message: format!("Failed to acquire celebration latch: {}", e),
            })?
            .observe(&view);
        if fire {
            println!();
            println!("{}", style("Happy birthday!").magenta().bold());
        }
        Ok(())
    }

    async fn run_album(&self, command: AlbumCommand) -> Result<()> {
        match command {
            AlbumCommand::Upload { files } => {
                let report = self.album.upload(&files, local_today()).await?;
                println!(
                    "Uploaded {} photos to {} ({})",
                    report.added,
                    report.date,
                    if report.merged { "existing bucket" } else { "new bucket" }
                );
            }

            AlbumCommand::List => {
                let years = self.album.years();
                if years.is_empty() {
                    println!("The album is empty.");
                }
                for group in years {
                    println!("{}", style(group.year).bold());
                    for bucket in group.buckets {
                        println!("  {}", style(bucket.date.format("%Y-%m-%d")).cyan());
                        for photo in bucket.photos {
                            println!("    {}  {}", style(&photo.id).dim(), photo.title);
                        }
                    }
                }
            }

            AlbumCommand::Rename { photo_id, title } => {
                let photo = self.album.rename_photo(&photo_id, &title)?;
                println!("Photo {} renamed to '{}'", photo.id, photo.title);
            }

            AlbumCommand::Delete { photo_id, force } => {
                let outcome = self.album.delete_photo(&photo_id, confirmer(force))?;
                report_deletion(outcome, "Photo");
            }
        }
        Ok(())
    }

    async fn run_diary(&self, command: DiaryCommand) -> Result<()> {
        match command {
            DiaryCommand::Write {
                id,
                title,
                date,
                content,
                file,
                photo,
                clear_photo,
            } => {
                let mut entry = match id {
                    Some(id) => self.diary.get(&id)?,
                    None => DiaryEntry::draft(local_today()),
                };
                let is_new = entry.id.is_empty();

                if let Some(title) = title {
                    entry.title = title;
                }
                if let Some(date) = date {
                    entry.date = date;
                }
                match (content, file) {
                    (Some(content), _) => entry.content = content,
                    (None, Some(path)) => entry.content = read_content_from_file(&path)?,
                    (None, None) if is_new => {
                        entry.content = edit_in_editor(
                            &self.config.get_editor_command(),
                            &entry.title,
                            &entry.content,
                        )?;
                    }
                    (None, None) => {}
                }
                if clear_photo {
                    entry.photo = None;
                } else if photo.is_some() {
                    entry.photo = self.load_photo(photo.as_deref()).await?;
                }

                let saved = self.diary.save(entry)?;
                if is_new {
                    println!("Diary entry created with ID: {}", saved.id);
                } else {
                    println!("Diary entry {} saved", saved.id);
                }
            }

            DiaryCommand::List => self.list_diary(),

            DiaryCommand::Show { id } => {
                let entry = self.diary.get(&id)?;
                println!("{}", style(&entry.title).bold());
                println!("{}", style(entry.date.format("%Y-%m-%d")).dim());
                if let Some(photo) = &entry.photo {
                    let mime = photo.mime_type().unwrap_or("unknown type");
                    println!("{}", style(format!("[photo attached: {}]", mime)).dim());
                }
                println!();
                println!("{}", entry.content);
                self.print_comments(&entry, true);
            }

            DiaryCommand::ToggleComments { id } => {
                let shown = self.diary.toggle_comments(&id)?;
                println!(
                    "Comments {} in listings",
                    if shown { "expanded" } else { "collapsed" }
                );
            }

            DiaryCommand::Delete { id, force } => {
                let outcome = self.diary.delete_entry(&id, confirmer(force))?;
                report_deletion(outcome, "Diary entry");
            }

            DiaryCommand::Comment {
                id,
                content,
                author,
            } => {
                let comment = self.diary.add_comment(&id, &content, author.as_deref())?;
                println!("Comment added with ID: {}", comment.id);
            }

            DiaryCommand::Uncomment {
                id,
                comment_id,
                force,
            } => {
                let outcome = self
                    .diary
                    .delete_comment(&id, &comment_id, confirmer(force))?;
                report_deletion(outcome, "Comment");
            }
        }
        Ok(())
    }

    fn list_diary(&self) {
        let entries = self.diary.entries();
        if entries.is_empty() {
            println!("No diary entries yet, add one with `keepsake diary write`.");
            return;
        }

        let term_width = terminal_size::terminal_size()
            .map(|(w, _)| w.0 as usize)
            .unwrap_or(80)
            .min(100);

        for entry in &entries {
            println!("{}", "─".repeat(term_width));
            println!(
                "{}  {}",
                style(entry.date.format("%Y-%m-%d")).dim(),
                style(&entry.title).bold()
            );
            println!("{}", summary(&entry.content, self.config.summary_length));
            println!(
                "{}",
                style(format!("id: {}  comments: {}", entry.id, entry.comments.len())).dim()
            );
            self.print_comments(entry, entry.show_comments);
        }
    }

    fn print_comments(&self, entry: &DiaryEntry, expanded: bool) {
        if !expanded || entry.comments.is_empty() {
            return;
        }
        println!();
        for comment in &entry.comments {
            println!(
                "  {} {}",
                style(&comment.author).cyan(),
                style(comment.created_at.format("%Y-%m-%d %H:%M")).dim()
            );
            println!("  {}", comment.content);
            if self.verbose {
                println!("  {}", style(format!("id: {}", comment.id)).dim());
            }
        }
    }

    async fn load_photo(&self, path: Option<&Path>) -> Result<Option<EncodedBlob>> {
        match path {
            Some(path) => {
                let loaded = self.loader.load(path).await?;
                debug!("Attached photo {}", loaded.file_name);
                Ok(Some(loaded.blob))
            }
            None => Ok(None),
        }
    }
}

fn confirmer(force: bool) -> &'static dyn Confirmer {
    if force {
        &Fixed(true)
    } else {
        &StdinConfirmer
    }
}

fn report_deletion(outcome: Deletion, what: &str) {
    match outcome {
        Deletion::Deleted => println!("{} deleted.", what),
        Deletion::Declined => println!("Deletion cancelled."),
    }
}

fn read_content_from_file(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(KeepsakeError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("File not found: {}", path.display()),
        )));
    }
    info!("Reading diary content from {}", path.display());
    Ok(read_to_string(path)?)
}

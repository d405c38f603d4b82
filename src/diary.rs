//! Diary entries and their comment threads.
use chrono::Utc;
use log::{debug, info};

use crate::{
    new_id, Collection, Comment, Confirmer, Deletion, DiaryEntry, KeepsakeError, RecordStore,
    Result,
};

/// Default number of characters kept by [`summary`].
pub const DEFAULT_SUMMARY_LENGTH: usize = 60;

/// Author recorded when a comment is left without a name.
pub const DEFAULT_AUTHOR: &str = "anonymous";

const ELLIPSIS: &str = "...";

/// Truncates `content` to `max_chars` characters, appending `...` when
/// anything was cut. No word-boundary snapping.
pub fn summary(content: &str, max_chars: usize) -> String {
    match content.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{}", &content[..cut], ELLIPSIS),
        None => content.to_string(),
    }
}

/// Stable sort, newest date first.
pub fn sort_entries(entries: &mut [DiaryEntry]) {
    entries.sort_by(|a, b| b.date.cmp(&a.date));
}

/// Command functions over the `diaries` collection
#[derive(Clone)]
pub struct Diary {
    store: RecordStore,
    default_author: String,
}

impl Diary {
    pub fn new(store: RecordStore) -> Self {
        Self::with_default_author(store, DEFAULT_AUTHOR)
    }

    pub fn with_default_author(store: RecordStore, default_author: impl Into<String>) -> Self {
        Self {
            store,
            default_author: default_author.into(),
        }
    }

    /// Entries in display order
    pub fn entries(&self) -> Vec<DiaryEntry> {
        let mut entries: Vec<DiaryEntry> = self.store.load(Collection::Diaries);
        sort_entries(&mut entries);
        entries
    }

    pub fn get(&self, id: &str) -> Result<DiaryEntry> {
        self.store
            .load::<DiaryEntry>(Collection::Diaries)
            .into_iter()
            .find(|e| e.id == id)
            .ok_or_else(|| entry_not_found(id))
    }

    /// Creates or updates an entry.
    ///
    /// An entry with an empty id is new: it gets a fresh id and goes to the
    /// front of the collection. Otherwise it replaces the stored entry with
    /// the same id in place.
    pub fn save(&self, mut entry: DiaryEntry) -> Result<DiaryEntry> {
        if entry.title.trim().is_empty() || entry.content.trim().is_empty() {
            return Err(KeepsakeError::validation(
                "diary title and content are required",
            ));
        }

        let mut entries: Vec<DiaryEntry> = self.store.load_for_update(Collection::Diaries)?;
        if entry.id.is_empty() {
            entry.id = new_id();
            entries.insert(0, entry.clone());
            info!("Diary entry created: {}", entry.id);
        } else {
            let slot = entries
                .iter_mut()
                .find(|e| e.id == entry.id)
                .ok_or_else(|| entry_not_found(&entry.id))?;
            *slot = entry.clone();
            info!("Diary entry updated: {}", entry.id);
        }

        self.store.save(Collection::Diaries, &entries)?;
        Ok(entry)
    }

    /// Flips the comment-thread display flag, returning the new value.
    pub fn toggle_comments(&self, id: &str) -> Result<bool> {
        self.modify(id, |entry| {
            entry.show_comments = !entry.show_comments;
            Ok(entry.show_comments)
        })
    }

    /// Appends a comment; blank content is rejected.
    pub fn add_comment(&self, id: &str, content: &str, author: Option<&str>) -> Result<Comment> {
        if content.trim().is_empty() {
            return Err(KeepsakeError::validation("comment cannot be empty"));
        }
        let author = author
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .unwrap_or(self.default_author.as_str());

        let comment = Comment {
            id: new_id(),
            content: content.to_string(),
            author: author.to_string(),
            created_at: Utc::now(),
        };

        self.modify(id, |entry| {
            entry.comments.push(comment.clone());
            Ok(())
        })?;

        info!("Comment {} added to diary entry {}", comment.id, id);
        Ok(comment)
    }

    pub fn delete_comment(
        &self,
        id: &str,
        comment_id: &str,
        confirmer: &dyn Confirmer,
    ) -> Result<Deletion> {
        let mut entries: Vec<DiaryEntry> = self.store.load_for_update(Collection::Diaries)?;
        let entry = entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| entry_not_found(id))?;
        let Some(position) = entry.comments.iter().position(|c| c.id == comment_id) else {
            return Err(KeepsakeError::RecordNotFound {
                kind: "Comment",
                id: comment_id.to_string(),
            });
        };

        if !confirmer.confirm("Delete this comment?") {
            debug!("Deletion of comment {} declined", comment_id);
            return Ok(Deletion::Declined);
        }

        entry.comments.remove(position);
        self.store.save(Collection::Diaries, &entries)?;

        info!("Comment {} deleted from diary entry {}", comment_id, id);
        Ok(Deletion::Deleted)
    }

    pub fn delete_entry(&self, id: &str, confirmer: &dyn Confirmer) -> Result<Deletion> {
        let mut entries: Vec<DiaryEntry> = self.store.load_for_update(Collection::Diaries)?;
        if !entries.iter().any(|e| e.id == id) {
            return Err(entry_not_found(id));
        }

        if !confirmer.confirm("Delete this diary entry?") {
            debug!("Deletion of diary entry {} declined", id);
            return Ok(Deletion::Declined);
        }

        entries.retain(|e| e.id != id);
        self.store.save(Collection::Diaries, &entries)?;

        info!("Diary entry deleted: {}", id);
        Ok(Deletion::Deleted)
    }

    fn modify<T>(&self, id: &str, apply: impl FnOnce(&mut DiaryEntry) -> Result<T>) -> Result<T> {
        let mut entries: Vec<DiaryEntry> = self.store.load_for_update(Collection::Diaries)?;
        let entry = entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| entry_not_found(id))?;
        let value = apply(entry)?;
        self.store.save(Collection::Diaries, &entries)?;
        Ok(value)
    }
}

fn entry_not_found(id: &str) -> KeepsakeError {
    KeepsakeError::RecordNotFound {
        kind: "Diary entry",
        id: id.to_string(),
    }
}

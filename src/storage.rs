use std::{
    collections::HashMap,
    fmt, fs,
    io::Write,
    path::PathBuf,
    sync::{Arc, Mutex},
};

use log::{debug, error, info, trace, warn};
use serde::{de::DeserializeOwned, Serialize};
use tempfile::NamedTempFile;

use crate::{KeepsakeError, Result};

/// The three top-level collections persisted by the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Events,
    Albums,
    Diaries,
}

impl Collection {
    /// Key under which the collection is stored
    pub fn key(&self) -> &'static str {
        match self {
            Collection::Events => "events",
            Collection::Albums => "albums",
            Collection::Diaries => "diaries",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A persistent string key/value substrate.
pub trait KeyValueStore: Send + Sync {
    /// Returns the stored text, or `None` when the key was never written.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replaces the stored text for `key`.
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Stores each key as `<dir>/<key>.json`
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Opens a file store rooted at `dir`, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        if !dir.exists() {
            debug!("Data directory does not exist, creating: {}", dir.display());
            fs::create_dir_all(&dir).map_err(|e| {
                error!("Failed to create data directory: {}", e);
                KeepsakeError::DirectoryError { path: dir.clone() }
            })?;
        }
        info!("FileStore opened at {}", dir.display());
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            trace!("No file for key {}", key);
            return Ok(None);
        }
        let text = fs::read_to_string(&path).map_err(|e| {
            error!("Failed to read {}: {}", path.display(), e);
            KeepsakeError::Io(e)
        })?;
        Ok(Some(text))
    }

    /// Writes through a temporary file in the same directory, then persists
    /// it over the target.
    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        debug!("Writing key {} to {}", key, path.display());

        let mut temp_file = NamedTempFile::new_in(&self.dir).map_err(|e| {
            error!("Failed to create temporary file: {}", e);
            KeepsakeError::Io(e)
        })?;

        temp_file.write_all(value.as_bytes()).map_err(|e| {
            error!("Failed to write to temporary file: {}", e);
            KeepsakeError::Io(e)
        })?;

        temp_file.flush().map_err(|e| {
            error!("Failed to flush temporary file: {}", e);
            KeepsakeError::Io(e)
        })?;

        temp_file.persist(&path).map_err(|e| {
            error!("Failed to persist file {}: {}", path.display(), e.error);
            KeepsakeError::Io(e.error)
        })?;

        Ok(())
    }
}

/// Keeps every key in process memory
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match self.entries.lock() {
            Ok(entries) => Ok(entries.get(key).cloned()),
            Err(_) => Err(KeepsakeError::LockAcquisitionFailed {
                message: "Failed to acquire lock on memory store during read".to_string(),
            }),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        match self.entries.lock() {
            Ok(mut entries) => {
                entries.insert(key.to_string(), value.to_string());
                Ok(())
            }
            Err(_) => Err(KeepsakeError::LockAcquisitionFailed {
                message: "Failed to acquire lock on memory store during write".to_string(),
            }),
        }
    }
}

/// Loads and saves whole collections as JSON arrays.
///
/// There is no partial update: every mutation reads the full collection,
/// transforms it in memory, and writes the full collection back. Cloning is
/// cheap and every clone shares the same backend.
#[derive(Clone)]
pub struct RecordStore {
    backend: Arc<dyn KeyValueStore>,
}

impl RecordStore {
    pub fn new(backend: impl KeyValueStore + 'static) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }

    /// A store backed by process memory only
    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }

    /// Loads a collection, failing on unreadable or malformed contents.
    pub fn try_load<T: DeserializeOwned>(&self, collection: Collection) -> Result<Vec<T>> {
        match self.read_text(collection)? {
            None => Ok(Vec::new()),
            Some(text) => decode(collection, &text),
        }
    }

    /// Loads a collection for display, substituting an empty one when the
    /// stored contents are missing, unreadable or cannot be decoded.
    pub fn load<T: DeserializeOwned>(&self, collection: Collection) -> Vec<T> {
        match self.try_load(collection) {
            Ok(records) => {
                trace!("Loaded {} records from {}", records.len(), collection);
                records
            }
            Err(e) => {
                warn!("{}; continuing with an empty collection", e);
                Vec::new()
            }
        }
    }

    /// Loads a collection that is about to be modified and written back.
    ///
    /// Corrupted text is replaced by an empty collection, but a backend that
    /// cannot be read fails with `StorageRead` so the write-back never
    /// clobbers records it did not see.
    pub fn load_for_update<T: DeserializeOwned>(&self, collection: Collection) -> Result<Vec<T>> {
        let Some(text) = self.read_text(collection)? else {
            return Ok(Vec::new());
        };
        match decode(collection, &text) {
            Ok(records) => Ok(records),
            Err(e) => {
                warn!("{}; starting the collection over", e);
                Ok(Vec::new())
            }
        }
    }

    fn read_text(&self, collection: Collection) -> Result<Option<String>> {
        let text = self.backend.get(collection.key()).map_err(|e| {
            error!("Failed to read {}: {}", collection, e);
            KeepsakeError::StorageRead {
                collection: collection.to_string(),
                message: e.to_string(),
            }
        })?;
        Ok(text.filter(|t| !t.trim().is_empty()))
    }

    /// Replaces the stored collection with `records`.
    pub fn save<T: Serialize>(&self, collection: Collection, records: &[T]) -> Result<()> {
        let json = serde_json::to_string(records).map_err(|e| {
            error!("Failed to serialize {}: {}", collection, e);
            KeepsakeError::StorageWrite {
                collection: collection.to_string(),
                message: e.to_string(),
            }
        })?;

        self.backend
            .set(collection.key(), &json)
            .map_err(|e| {
                error!("Failed to write {}: {}", collection, e);
                KeepsakeError::StorageWrite {
                    collection: collection.to_string(),
                    message: e.to_string(),
                }
            })?;

        debug!("Saved {} records to {}", records.len(), collection);
        Ok(())
    }
}

fn decode<T: DeserializeOwned>(collection: Collection, text: &str) -> Result<Vec<T>> {
    serde_json::from_str(text).map_err(|e| KeepsakeError::StorageRead {
        collection: collection.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::{
        io,
        sync::atomic::{AtomicBool, AtomicUsize, Ordering},
    };

    use chrono::NaiveDate;
    use tempfile::TempDir;

    use super::*;
    use crate::{
        Album, BlobLoader, Category, Diary, DiaryEntry, EncodedBlob, Event, Fixed, LoadedBlob,
        NewEvent, Timeline,
    };

    fn sample_events() -> Vec<Event> {
        vec![
            Event {
                id: "a".to_string(),
                title: "First date".to_string(),
                date: NaiveDate::from_ymd_opt(2019, 2, 14).unwrap(),
                category: Category::Anniversary,
                reminder: None,
                photo: None,
            },
            Event {
                id: "b".to_string(),
                title: "Sam".to_string(),
                date: NaiveDate::from_ymd_opt(1990, 7, 1).unwrap(),
                category: Category::Birthday,
                reminder: None,
                photo: None,
            },
        ]
    }

    /// Memory store that fails a chosen number of reads, or every write.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        failing_reads: AtomicUsize,
        failing_writes: AtomicBool,
    }

    impl FlakyStore {
        fn fail_next_read(&self) {
            self.failing_reads.fetch_add(1, Ordering::SeqCst);
        }

        fn fail_writes(&self) {
            self.failing_writes.store(true, Ordering::SeqCst);
        }
    }

    fn disk_error(op: &str) -> KeepsakeError {
        KeepsakeError::Io(io::Error::new(
            io::ErrorKind::Other,
            format!("disk unavailable during {}", op),
        ))
    }

    impl KeyValueStore for Arc<FlakyStore> {
        fn get(&self, key: &str) -> Result<Option<String>> {
            let failing = self
                .failing_reads
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if failing {
                return Err(disk_error("read"));
            }
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<()> {
            if self.failing_writes.load(Ordering::SeqCst) {
                return Err(disk_error("write"));
            }
            self.inner.set(key, value)
        }
    }

    fn flaky_store() -> (Arc<FlakyStore>, RecordStore) {
        let backend = Arc::new(FlakyStore::default());
        (backend.clone(), RecordStore::new(backend))
    }

    fn new_event(title: &str, day: u32) -> NewEvent {
        NewEvent {
            title: title.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            category: Category::Holiday,
            reminder: None,
            photo: None,
        }
    }

    fn photo(name: &str) -> Vec<LoadedBlob> {
        vec![LoadedBlob {
            file_name: name.to_string(),
            blob: EncodedBlob::new("data:image/png;base64,AAAA".to_string()),
        }]
    }

    fn diary_draft(title: &str) -> DiaryEntry {
        let mut entry = DiaryEntry::draft(NaiveDate::from_ymd_opt(2024, 2, 2).unwrap());
        entry.title = title.to_string();
        entry.content = "Went outside.".to_string();
        entry
    }

    fn titles(timeline: &Timeline) -> Vec<String> {
        timeline.events().into_iter().map(|e| e.title).collect()
    }

    #[test]
    fn absent_collection_loads_empty() {
        let store = RecordStore::in_memory();
        let events: Vec<Event> = store.load(Collection::Events);
        assert!(events.is_empty());
    }

    #[test]
    fn save_then_load_round_trips() {
        let store = RecordStore::in_memory();
        let events = sample_events();
        store.save(Collection::Events, &events).unwrap();
        let loaded: Vec<Event> = store.load(Collection::Events);
        assert_eq!(loaded, events);
    }

    #[test]
    fn corrupted_collection_is_recovered_as_empty() {
        let backend = MemoryStore::new();
        backend.set("events", "[{not json").unwrap();
        let store = RecordStore::new(backend);

        let events: Vec<Event> = store.load(Collection::Events);
        assert!(events.is_empty());

        let err = store.try_load::<Event>(Collection::Events).unwrap_err();
        assert!(matches!(err, KeepsakeError::StorageRead { .. }));

        let events: Vec<Event> = store.load_for_update(Collection::Events).unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn failed_read_does_not_wipe_events() {
        let (backend, store) = flaky_store();
        let timeline = Timeline::new(store);
        for (title, day) in [("a", 1), ("b", 2), ("c", 3)] {
            timeline.add_event(new_event(title, day)).unwrap();
        }

        backend.fail_next_read();
        let err = timeline.add_event(new_event("d", 4)).unwrap_err();
        assert!(matches!(
            err,
            KeepsakeError::StorageRead { ref collection, .. } if collection == "events"
        ));
        assert_eq!(titles(&timeline), ["a", "b", "c"]);

        let id = timeline.events()[0].id.clone();
        backend.fail_next_read();
        let err = timeline.delete_event(&id, &Fixed(true)).unwrap_err();
        assert!(matches!(err, KeepsakeError::StorageRead { .. }));
        assert_eq!(titles(&timeline), ["a", "b", "c"]);
    }

    #[test]
    fn failed_read_blocks_album_and_diary_updates() {
        let (backend, store) = flaky_store();
        let album = Album::new(store.clone(), BlobLoader::default(), 9);
        let diary = Diary::new(store);
        let today = NaiveDate::from_ymd_opt(2024, 2, 2).unwrap();
        album.add_photos(photo("first.png"), today).unwrap();
        let entry = diary.save(diary_draft("kept")).unwrap();

        backend.fail_next_read();
        let err = album.add_photos(photo("second.png"), today).unwrap_err();
        assert!(matches!(err, KeepsakeError::StorageRead { .. }));
        assert_eq!(album.buckets()[0].photos.len(), 1);

        backend.fail_next_read();
        let err = diary.save(diary_draft("lost")).unwrap_err();
        assert!(matches!(err, KeepsakeError::StorageRead { .. }));

        backend.fail_next_read();
        let err = diary.delete_entry(&entry.id, &Fixed(true)).unwrap_err();
        assert!(matches!(err, KeepsakeError::StorageRead { .. }));
        assert_eq!(diary.entries(), vec![entry]);
    }

    #[test]
    fn failed_write_leaves_collections_unchanged() {
        let (backend, store) = flaky_store();
        let timeline = Timeline::new(store.clone());
        let album = Album::new(store.clone(), BlobLoader::default(), 9);
        let diary = Diary::new(store);
        let today = NaiveDate::from_ymd_opt(2024, 2, 2).unwrap();
        timeline.add_event(new_event("a", 1)).unwrap();
        album.add_photos(photo("first.png"), today).unwrap();
        let entry = diary.save(diary_draft("kept")).unwrap();

        backend.fail_writes();

        let err = timeline.add_event(new_event("b", 2)).unwrap_err();
        assert!(matches!(
            err,
            KeepsakeError::StorageWrite { ref collection, .. } if collection == "events"
        ));
        assert_eq!(titles(&timeline), ["a"]);

        let err = album.add_photos(photo("second.png"), today).unwrap_err();
        assert!(matches!(
            err,
            KeepsakeError::StorageWrite { ref collection, .. } if collection == "albums"
        ));
        let buckets = album.buckets();
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].photos.len(), 1);

        let err = diary.save(diary_draft("lost")).unwrap_err();
        assert!(matches!(
            err,
            KeepsakeError::StorageWrite { ref collection, .. } if collection == "diaries"
        ));
        assert_eq!(diary.entries(), vec![entry]);
    }

    #[test]
    fn collections_do_not_interfere() {
        let backend = MemoryStore::new();
        backend.set("albums", "garbage").unwrap();
        let store = RecordStore::new(backend);
        store.save(Collection::Events, &sample_events()).unwrap();

        let events: Vec<Event> = store.load(Collection::Events);
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn file_store_persists_across_instances() {
        let dir = TempDir::new().unwrap();
        let events = sample_events();
        {
            let store = RecordStore::new(FileStore::open(dir.path()).unwrap());
            store.save(Collection::Events, &events).unwrap();
        }
        let store = RecordStore::new(FileStore::open(dir.path()).unwrap());
        let loaded: Vec<Event> = store.load(Collection::Events);
        assert_eq!(loaded, events);
        assert!(dir.path().join("events.json").exists());
    }

    #[test]
    fn file_store_creates_missing_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        let store = FileStore::open(&nested).unwrap();
        assert_eq!(store.get("events").unwrap(), None);
        assert!(nested.is_dir());
    }
}

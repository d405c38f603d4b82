//! Integration tests for keepsake
//!
//! These tests drive the public command functions over a file-backed store:
//! - Upload batches through the blob loader
//! - Persistence across store instances
//! - Recovery from corrupted collection files

use std::path::PathBuf;

use chrono::NaiveDate;
use keepsake::{
    Album, BlobLoader, Category, Collection, Diary, DiaryEntry, Event, FileStore, Fixed,
    KeepsakeError, NewEvent, RecordStore, Timeline,
};
use tempfile::TempDir;

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Helper to create a file-backed store in a temporary directory
fn create_test_store() -> (RecordStore, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let store = RecordStore::new(FileStore::open(temp_dir.path().join("data")).unwrap());
    (store, temp_dir)
}

/// Helper to write `count` small image files
fn write_images(dir: &TempDir, prefix: &str, count: usize) -> Vec<PathBuf> {
    (0..count)
        .map(|i| {
            let path = dir.path().join(format!("{}{}.jpg", prefix, i));
            std::fs::write(&path, [0xFF, 0xD8, i as u8]).unwrap();
            path
        })
        .collect()
}

#[tokio::test]
async fn test_upload_batch_limits() {
    let (store, temp) = create_test_store();
    let album = Album::new(store, BlobLoader::default(), 9);
    let today = ymd(2024, 10, 1);

    let ten = write_images(&temp, "ten", 10);
    let err = album.upload(&ten, today).await.unwrap_err();
    assert!(matches!(err, KeepsakeError::BatchTooLarge { count: 10, .. }));
    assert!(album.buckets().is_empty());

    let report = album.upload(&ten[..9], today).await.unwrap();
    assert_eq!(report.added, 9);
    assert_eq!(album.buckets()[0].photos.len(), 9);
}

#[tokio::test]
async fn test_same_day_uploads_merge_into_one_bucket() {
    let (store, temp) = create_test_store();
    let album = Album::new(store, BlobLoader::default(), 9);
    let today = ymd(2024, 10, 1);

    album
        .upload(&write_images(&temp, "a", 3), today)
        .await
        .unwrap();
    album
        .upload(&write_images(&temp, "b", 4), today)
        .await
        .unwrap();

    let buckets = album.buckets();
    assert_eq!(buckets.len(), 1);
    assert_eq!(buckets[0].photos.len(), 7);
    assert_eq!(buckets[0].photos[0].title, "a0");
    assert_eq!(buckets[0].photos[6].title, "b3");
    assert!(buckets[0].photos[0]
        .url
        .as_str()
        .starts_with("data:image/jpeg;base64,"));
}

#[tokio::test]
async fn test_oversized_file_rejects_whole_batch() {
    let (store, temp) = create_test_store();
    let album = Album::new(store, BlobLoader::new(8), 9);

    let mut files = write_images(&temp, "ok", 2);
    let big = temp.path().join("big.png");
    std::fs::write(&big, vec![0u8; 64]).unwrap();
    files.push(big);

    let err = album.upload(&files, ymd(2024, 10, 1)).await.unwrap_err();
    assert!(err.is_size_limit());
    assert!(album.buckets().is_empty());
}

#[test]
fn test_collections_survive_reopen() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("data");

    let entry_id = {
        let store = RecordStore::new(FileStore::open(&dir).unwrap());
        Timeline::new(store.clone())
            .add_event(NewEvent {
                title: "Moved in".to_string(),
                date: ymd(2021, 3, 1),
                category: Category::Anniversary,
                reminder: None,
                photo: None,
            })
            .unwrap();

        let mut entry = DiaryEntry::draft(ymd(2024, 2, 2));
        entry.title = "Snow".to_string();
        entry.content = "First snow of the year.".to_string();
        Diary::new(store).save(entry).unwrap().id
    };

    let store = RecordStore::new(FileStore::open(&dir).unwrap());
    let events: Vec<Event> = store.load(Collection::Events);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].title, "Moved in");

    let diary = Diary::new(store);
    assert_eq!(diary.get(&entry_id).unwrap().title, "Snow");
}

#[test]
fn test_corrupted_file_loads_empty_and_is_rewritten() {
    let (store, temp) = create_test_store();
    std::fs::write(temp.path().join("data").join("diaries.json"), "{{{").unwrap();

    let diary = Diary::new(store.clone());
    assert!(diary.entries().is_empty());

    let mut entry = DiaryEntry::draft(ymd(2024, 2, 2));
    entry.title = "Fresh start".to_string();
    entry.content = "Rebuilt the diary.".to_string();
    diary.save(entry).unwrap();

    let stored = store.try_load::<DiaryEntry>(Collection::Diaries).unwrap();
    assert_eq!(stored.len(), 1);
}

#[test]
fn test_reads_records_written_by_the_web_front_end() {
    let (store, temp) = create_test_store();
    let data = temp.path().join("data");
    std::fs::write(
        data.join("events.json"),
        r#"[{"id":"1717000000000","title":"Lea","date":"1999-06-21","category":"birthday","reminder":"","photo":""}]"#,
    )
    .unwrap();
    std::fs::write(
        data.join("diaries.json"),
        r#"[{"id":"1","date":"2024-05-05","title":"Picnic","content":"Sun.","photo":null,"showComments":true,
            "comments":[{"id":"2","content":"nice","author":"anonymous","createdAt":"2024-05-05T10:00:00.000Z"}]}]"#,
    )
    .unwrap();

    let view = Timeline::new(store.clone()).project(ymd(2025, 6, 21));
    assert!(view.celebrate());
    assert_eq!(view.items[0].countdown.to_string(), "elapsed 9497 days");

    let diary = Diary::new(store);
    let entry = diary.get("1").unwrap();
    assert!(entry.show_comments);
    assert_eq!(entry.comments[0].author, "anonymous");

    diary.delete_comment("1", "2", &Fixed(true)).unwrap();
    assert!(diary.get("1").unwrap().comments.is_empty());
}

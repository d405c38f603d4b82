//! Photo album grouped into dated buckets.
//!
//! Uploads land in the bucket for the current day. For display, buckets are
//! ordered newest first and partitioned by year.
use std::{collections::BTreeMap, path::PathBuf};

use chrono::{Datelike, NaiveDate};
use log::{debug, info, warn};

use crate::{
    new_id, AlbumBucket, BlobLoader, Collection, Confirmer, Deletion, KeepsakeError, LoadedBlob,
    Photo, RecordStore, Result, UploadReport,
};

/// Default number of files accepted in one upload.
pub const DEFAULT_MAX_UPLOAD_BATCH: usize = 9;

/// All buckets captured in one calendar year
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearGroup {
    pub year: i32,
    pub buckets: Vec<AlbumBucket>,
}

/// Stable sort, newest date first.
pub fn sort_buckets(buckets: &mut [AlbumBucket]) {
    buckets.sort_by(|a, b| b.date.cmp(&a.date));
}

/// Partitions buckets by year, newest year first. Buckets keep their
/// relative order within each year.
pub fn group_by_year(buckets: &[AlbumBucket]) -> Vec<YearGroup> {
    let mut years: BTreeMap<i32, Vec<AlbumBucket>> = BTreeMap::new();
    for bucket in buckets {
        years
            .entry(bucket.date.year())
            .or_default()
            .push(bucket.clone());
    }
    years
        .into_iter()
        .rev()
        .map(|(year, buckets)| YearGroup { year, buckets })
        .collect()
}

/// Command functions over the `albums` collection
#[derive(Clone)]
pub struct Album {
    store: RecordStore,
    loader: BlobLoader,
    max_batch: usize,
}

impl Album {
    pub fn new(store: RecordStore, loader: BlobLoader, max_batch: usize) -> Self {
        Self {
            store,
            loader,
            max_batch,
        }
    }

    /// Buckets in display order
    pub fn buckets(&self) -> Vec<AlbumBucket> {
        let mut buckets: Vec<AlbumBucket> = self.store.load(Collection::Albums);
        sort_buckets(&mut buckets);
        buckets
    }

    pub fn years(&self) -> Vec<YearGroup> {
        group_by_year(&self.buckets())
    }

    /// Loads a batch of files and adds them to `today`'s bucket.
    ///
    /// The batch is all-or-nothing: an oversized batch, an oversized file or
    /// a failed read leaves the album untouched.
    pub async fn upload(&self, files: &[PathBuf], today: NaiveDate) -> Result<UploadReport> {
        self.check_batch(files.len())?;
        let loaded = self.loader.load_all(files).await?;
        self.add_photos(loaded, today)
    }

    /// Adds already-loaded blobs as photos in `today`'s bucket.
    pub fn add_photos(&self, loaded: Vec<LoadedBlob>, today: NaiveDate) -> Result<UploadReport> {
        self.check_batch(loaded.len())?;

        let photos: Vec<Photo> = loaded
            .into_iter()
            .map(|b| Photo::from_file(&b.file_name, b.blob))
            .collect();
        let added = photos.len();

        let mut buckets: Vec<AlbumBucket> = self.store.load_for_update(Collection::Albums)?;
        let (bucket_id, merged) = match buckets.iter_mut().find(|b| b.date == today) {
            Some(bucket) => {
                bucket.photos.extend(photos);
                (bucket.id.clone(), true)
            }
            None => {
                let bucket = AlbumBucket {
                    id: new_id(),
                    date: today,
                    photos,
                };
                let id = bucket.id.clone();
                buckets.insert(0, bucket);
                (id, false)
            }
        };

        self.store.save(Collection::Albums, &buckets)?;

        info!(
            "Uploaded {} photos into bucket {} ({})",
            added, bucket_id, today
        );
        Ok(UploadReport {
            bucket_id,
            date: today,
            added,
            merged,
        })
    }

    /// Renames a photo wherever it lives.
    pub fn rename_photo(&self, photo_id: &str, title: &str) -> Result<Photo> {
        let mut buckets: Vec<AlbumBucket> = self.store.load_for_update(Collection::Albums)?;
        let photo = buckets
            .iter_mut()
            .flat_map(|b| b.photos.iter_mut())
            .find(|p| p.id == photo_id)
            .ok_or_else(|| photo_not_found(photo_id))?;
        photo.title = title.to_string();
        let renamed = photo.clone();

        self.store.save(Collection::Albums, &buckets)?;

        debug!("Photo {} renamed to {}", photo_id, title);
        Ok(renamed)
    }

    /// Deletes a photo once the confirmer agrees, dropping its bucket if it
    /// was the last photo there.
    pub fn delete_photo(&self, photo_id: &str, confirmer: &dyn Confirmer) -> Result<Deletion> {
        let mut buckets: Vec<AlbumBucket> = self.store.load_for_update(Collection::Albums)?;
        let Some(bucket) = buckets
            .iter_mut()
            .find(|b| b.photos.iter().any(|p| p.id == photo_id))
        else {
            return Err(photo_not_found(photo_id));
        };

        if !confirmer.confirm("Delete this photo?") {
            debug!("Deletion of photo {} declined", photo_id);
            return Ok(Deletion::Declined);
        }

        bucket.photos.retain(|p| p.id != photo_id);
        buckets.retain(|b| {
            if b.photos.is_empty() {
                debug!("Bucket {} is empty, removing it", b.id);
                false
            } else {
                true
            }
        });

        self.store.save(Collection::Albums, &buckets)?;

        info!("Photo deleted: {}", photo_id);
        Ok(Deletion::Deleted)
    }

    fn check_batch(&self, count: usize) -> Result<()> {
        if count == 0 {
            return Err(KeepsakeError::validation("no files selected"));
        }
        if count > self.max_batch {
            warn!(
                "Upload of {} files rejected, limit is {}",
                count, self.max_batch
            );
            return Err(KeepsakeError::BatchTooLarge {
                count,
                limit: self.max_batch,
            });
        }
        Ok(())
    }
}

fn photo_not_found(photo_id: &str) -> KeepsakeError {
    KeepsakeError::RecordNotFound {
        kind: "Photo",
        id: photo_id.to_string(),
    }
}

use redb::WriteTransaction;

use super::db::{load, load_list, save, save_list, Database, DatabaseError};
use super::models::{FileRecord, FileSummary, Tag};
use super::tables::*;
use crate::error::AppError;

pub const MAX_TAG_LENGTH: usize = 50;

/// A catalogue tag with the number of the owner's files carrying it.
#[derive(Debug, Clone)]
pub struct TagUsage {
    pub tag: Tag,
    pub file_count: usize,
}

/// Per-item result of a batch request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchOutcome {
    pub fn record(&mut self, ok: bool) {
        if ok {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagMode {
    Add,
    Remove,
}

/// Result of a rename, delete or merge: the surviving tag, if any, and how
/// many files were rewritten.
#[derive(Debug, Clone)]
pub struct TagChange {
    pub tag: Option<Tag>,
    pub updated_files: usize,
}

pub(crate) fn normalize_tag_name(name: &str) -> Result<String, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::validation("Tag name must not be empty"));
    }
    if name.chars().count() > MAX_TAG_LENGTH {
        return Err(AppError::validation(format!(
            "Tag name must be at most {MAX_TAG_LENGTH} characters"
        )));
    }
    Ok(name.to_string())
}

/// Trim, validate and de-duplicate a tag list, keeping first occurrences.
pub(crate) fn normalize_tags(names: &[String]) -> Result<Vec<String>, AppError> {
    let mut tags: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        let name = normalize_tag_name(name)?;
        if !tags.contains(&name) {
            tags.push(name);
        }
    }
    Ok(tags)
}

/// Add any names missing from the user's catalogue.
pub(crate) fn ensure_tags_exist(
    txn: &WriteTransaction,
    user_id: &str,
    names: &[String],
) -> Result<(), DatabaseError> {
    let mut catalogue: Vec<Tag> = load_list(txn, USER_TAGS, user_id)?;
    let before = catalogue.len();
    for name in names {
        if !catalogue.iter().any(|t| t.name == *name) {
            catalogue.push(Tag::new(name, None));
        }
    }
    if catalogue.len() != before {
        save_list(txn, USER_TAGS, user_id, &catalogue)?;
    }
    Ok(())
}

/// Rewrite `from` on every file the user owns: replaced by `to`, or dropped
/// when `to` is `None`. Returns the number of files touched.
fn rewrite_tag(
    txn: &WriteTransaction,
    user_id: &str,
    from: &str,
    to: Option<&str>,
) -> Result<usize, DatabaseError> {
    let index: Vec<FileSummary> = load_list(txn, USER_FILES, user_id)?;
    let mut updated = 0;

    for summary in &index {
        let Some(mut record) = load::<FileRecord>(txn, FILES, &summary.id)? else {
            continue;
        };
        if !record.tags.iter().any(|t| t == from) {
            continue;
        }

        let mut tags = Vec::with_capacity(record.tags.len());
        for tag in record.tags.drain(..) {
            let tag = if tag == from {
                match to {
                    Some(to) => to.to_string(),
                    None => continue,
                }
            } else {
                tag
            };
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }
        record.tags = tags;
        save(txn, FILES, &record.id, &record)?;
        updated += 1;
    }

    Ok(updated)
}

fn find_tag<'a>(catalogue: &'a [Tag], tag_id: &str) -> Result<&'a Tag, AppError> {
    catalogue
        .iter()
        .find(|t| t.id == tag_id)
        .ok_or_else(|| AppError::not_found("Tag not found"))
}

impl Database {
    // ========================================================================
    // Tag catalogue
    // ========================================================================

    pub fn list_tags(&self, user_id: &str) -> Result<Vec<TagUsage>, DatabaseError> {
        let catalogue: Vec<Tag> = self.read(USER_TAGS, user_id)?.unwrap_or_default();
        let files = self.list_user_files(user_id)?;

        Ok(catalogue
            .into_iter()
            .map(|tag| {
                let file_count = files
                    .iter()
                    .filter(|f| f.tags.iter().any(|t| *t == tag.name))
                    .count();
                TagUsage { tag, file_count }
            })
            .collect())
    }

    pub fn create_tag(
        &self,
        user_id: &str,
        name: &str,
        color: Option<String>,
    ) -> Result<Tag, AppError> {
        let name = normalize_tag_name(name)?;

        self.write(|txn| {
            let mut catalogue: Vec<Tag> = load_list(txn, USER_TAGS, user_id)?;
            if catalogue.iter().any(|t| t.name == name) {
                return Err(AppError::conflict("Tag already exists"));
            }
            let tag = Tag::new(&name, color);
            catalogue.push(tag.clone());
            save_list(txn, USER_TAGS, user_id, &catalogue)?;
            Ok(tag)
        })
    }

    /// Rename and/or recolor a tag. A rename is applied to every file the
    /// user owns in the same transaction. `color: Some(None)` clears it.
    pub fn update_tag(
        &self,
        user_id: &str,
        tag_id: &str,
        name: Option<&str>,
        color: Option<Option<String>>,
    ) -> Result<TagChange, AppError> {
        let name = name.map(normalize_tag_name).transpose()?;

        self.write(|txn| {
            let mut catalogue: Vec<Tag> = load_list(txn, USER_TAGS, user_id)?;
            let old_name = find_tag(&catalogue, tag_id)?.name.clone();

            let mut updated_files = 0;
            if let Some(ref new_name) = name {
                if *new_name != old_name {
                    if catalogue.iter().any(|t| t.name == *new_name) {
                        return Err(AppError::conflict("Tag already exists"));
                    }
                    updated_files = rewrite_tag(txn, user_id, &old_name, Some(new_name))?;
                }
            }

            let Some(tag) = catalogue.iter_mut().find(|t| t.id == tag_id) else {
                return Err(AppError::not_found("Tag not found"));
            };
            if let Some(new_name) = name {
                tag.name = new_name;
            }
            if let Some(color) = color {
                tag.color = color;
            }
            let tag = tag.clone();

            save_list(txn, USER_TAGS, user_id, &catalogue)?;
            Ok(TagChange {
                tag: Some(tag),
                updated_files,
            })
        })
    }

    /// Remove a tag from the catalogue and from every file carrying it.
    pub fn delete_tag(&self, user_id: &str, tag_id: &str) -> Result<TagChange, AppError> {
        self.write(|txn| {
            let mut catalogue: Vec<Tag> = load_list(txn, USER_TAGS, user_id)?;
            let name = find_tag(&catalogue, tag_id)?.name.clone();

            let updated_files = rewrite_tag(txn, user_id, &name, None)?;
            catalogue.retain(|t| t.id != tag_id);
            save_list(txn, USER_TAGS, user_id, &catalogue)?;

            Ok(TagChange {
                tag: None,
                updated_files,
            })
        })
    }

    /// Fold every source tag into `target_id`; the sources leave the catalogue.
    pub fn merge_tags(
        &self,
        user_id: &str,
        source_ids: &[String],
        target_id: &str,
    ) -> Result<TagChange, AppError> {
        if source_ids.is_empty() {
            return Err(AppError::validation("No source tags given"));
        }
        if source_ids.iter().any(|id| id == target_id) {
            return Err(AppError::validation("A tag cannot be merged into itself"));
        }

        self.write(|txn| {
            let mut catalogue: Vec<Tag> = load_list(txn, USER_TAGS, user_id)?;
            let target = find_tag(&catalogue, target_id)?.clone();

            let mut source_names = Vec::with_capacity(source_ids.len());
            for id in source_ids {
                source_names.push(find_tag(&catalogue, id)?.name.clone());
            }

            let mut updated_files = 0;
            for name in &source_names {
                updated_files += rewrite_tag(txn, user_id, name, Some(&target.name))?;
            }

            catalogue.retain(|t| !source_ids.contains(&t.id));
            save_list(txn, USER_TAGS, user_id, &catalogue)?;

            Ok(TagChange {
                tag: Some(target),
                updated_files,
            })
        })
    }

    /// Add or remove tag names on several files. Files that are missing or
    /// not owned by the user count as failed.
    pub fn tag_files(
        &self,
        user_id: &str,
        file_ids: &[String],
        names: &[String],
        mode: TagMode,
    ) -> Result<BatchOutcome, AppError> {
        let names = normalize_tags(names)?;
        if names.is_empty() {
            return Err(AppError::validation("No tag names given"));
        }

        self.write(|txn| {
            if mode == TagMode::Add {
                ensure_tags_exist(txn, user_id, &names)?;
            }

            let mut outcome = BatchOutcome::default();
            for file_id in file_ids {
                let record = load::<FileRecord>(txn, FILES, file_id)?
                    .filter(|record| record.is_owned_by(user_id));
                let Some(mut record) = record else {
                    outcome.record(false);
                    continue;
                };

                match mode {
                    TagMode::Add => {
                        for name in &names {
                            if !record.tags.contains(name) {
                                record.tags.push(name.clone());
                            }
                        }
                    }
                    TagMode::Remove => record.tags.retain(|t| !names.contains(t)),
                }
                save(txn, FILES, file_id, &record)?;
                outcome.record(true);
            }
            Ok(outcome)
        })
    }

    pub fn delete_tags(&self, user_id: &str, tag_ids: &[String]) -> Result<BatchOutcome, AppError> {
        let mut outcome = BatchOutcome::default();
        for tag_id in tag_ids {
            match self.delete_tag(user_id, tag_id) {
                Ok(_) => outcome.record(true),
                Err(AppError::NotFound(_)) => outcome.record(false),
                Err(e) => return Err(e),
            }
        }
        Ok(outcome)
    }

    /// The tag and the user's files carrying it, newest first.
    pub fn files_with_tag(
        &self,
        user_id: &str,
        tag_id: &str,
    ) -> Result<(Tag, Vec<FileRecord>), AppError> {
        let catalogue: Vec<Tag> = self.read(USER_TAGS, user_id)?.unwrap_or_default();
        let tag = find_tag(&catalogue, tag_id)?.clone();

        let files = self
            .list_user_files(user_id)?
            .into_iter()
            .filter(|f| f.tags.contains(&tag.name))
            .collect();
        Ok((tag, files))
    }
}

pub mod db;
mod favorites;
mod files;
mod moderation;
pub mod models;
mod shares;
mod tables;
mod tags;
mod users;

pub use db::{Database, DatabaseError};
pub use favorites::FavoriteIndex;
pub use files::{FileFilter, FilePatch, MAX_FILE_NAME_LENGTH};
pub use tables::*;
pub use tags::{BatchOutcome, TagChange, TagMode, TagUsage, MAX_TAG_LENGTH};
pub use users::UserStats;

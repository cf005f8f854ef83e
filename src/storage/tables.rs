use redb::TableDefinition;

/// Tables whose values are msgpack records.
pub type Records = TableDefinition<'static, &'static str, &'static [u8]>;

/// Tables mapping a unique name to an id.
pub type Names = TableDefinition<'static, &'static str, &'static str>;

/// File records: file id -> FileRecord
pub const FILES: Records = TableDefinition::new("files");

/// User records: user id -> UserRecord
pub const USERS: Records = TableDefinition::new("users");

/// Uniqueness index: lowercased username -> user id
pub const USERNAMES: Names = TableDefinition::new("usernames");

/// Uniqueness index: lowercased email -> user id
pub const EMAILS: Names = TableDefinition::new("emails");

/// Share records: share id -> ShareRecord
pub const SHARES: Records = TableDefinition::new("shares");

/// Per-user file index: user id -> Vec<FileSummary>, in upload order
pub const USER_FILES: Records = TableDefinition::new("user_files");

/// Per-user favorites: user id -> Vec<FavoriteEntry>
pub const USER_FAVORITES: Records = TableDefinition::new("user_favorites");

/// Per-user tag catalogue: user id -> Vec<Tag>
pub const USER_TAGS: Records = TableDefinition::new("user_tags");

/// Reverse favorites index: file id -> Vec<user id>
pub const FILE_FAVORITES: Records = TableDefinition::new("file_favorites");

/// Blob claims: blob ref -> id of the record that first stored it
pub const BLOB_CLAIMS: Names = TableDefinition::new("blob_claims");

use std::time::SystemTime;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Project identifiers are the directory names under the extraction root.
pub type ProjectId = String;

/// Generate a fresh opaque identifier (UUID v4, hyphenated).
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Convert a filesystem timestamp, falling back to the Unix epoch when the
/// platform does not report one.
pub fn timestamp_from(time: Option<SystemTime>) -> Timestamp {
    Timestamp::from(time.unwrap_or(SystemTime::UNIX_EPOCH))
}

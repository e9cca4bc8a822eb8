/// All entity primary keys are UUIDs (v7 generated at insert time).
/// Slideshow and image identifiers are externally meaningful and appear
/// in storage paths and client URLs.
pub type DbId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

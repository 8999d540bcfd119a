/// Name of the single table holding stored images.
pub const IMAGES_TABLE: &str = "Images";

pub const DROP_IMAGES: &str = "DROP TABLE IF EXISTS Images";

pub const CREATE_IMAGES: &str = r#"
-- ObjId: filename stem, not a key (repeated ids become separate rows)
-- img:   file bytes exactly as read from disk
-- size:  decoded pixel width at ingest time
CREATE TABLE Images (
    ObjId INT,
    img BLOB,
    size INT
)
"#;

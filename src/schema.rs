//! Metadata table schema.
//!
//! The processor streams one row per uploaded document. `tags` is a list on
//! the processor side but is declared as a plain STRING column: the inline
//! `bq mk` schema syntax has no way to express REPEATED.

use serde::Serialize;
use strum::{Display, EnumString};

/// BigQuery column types used by the metadata table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, EnumString)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum ColumnType {
    String,
    Timestamp,
    Integer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Column {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
}

/// Columns in declaration order
pub const METADATA_COLUMNS: &[Column] = &[
    Column { name: "filename", column_type: ColumnType::String },
    Column { name: "upload_timestamp", column_type: ColumnType::Timestamp },
    Column { name: "word_count", column_type: ColumnType::Integer },
    Column { name: "content_snippet", column_type: ColumnType::String },
    Column { name: "tags", column_type: ColumnType::String },
];

/// Inline schema for `bq mk --table`: `name:TYPE,name:TYPE,...`
pub fn inline_schema(columns: &[Column]) -> String {
    columns
        .iter()
        .map(|c| format!("{}:{}", c.name, c.column_type))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_inline_schema_is_exact() {
        assert_eq!(
            inline_schema(METADATA_COLUMNS),
            concat!(
                "filename:STRING,upload_timestamp:TIMESTAMP,word_count:INTEGER,",
                "content_snippet:STRING,tags:STRING"
            )
        );
    }

    #[test]
    fn test_column_types_render_uppercase() {
        let rendered: Vec<String> = METADATA_COLUMNS
            .iter()
            .map(|c| c.column_type.to_string())
            .collect();
        assert_eq!(rendered, ["STRING", "TIMESTAMP", "INTEGER", "STRING", "STRING"]);
        assert_eq!("INTEGER".parse::<ColumnType>().unwrap(), ColumnType::Integer);
    }

    #[test]
    fn test_tags_is_plain_string() {
        let tags = METADATA_COLUMNS.iter().find(|c| c.name == "tags").unwrap();
        assert_eq!(tags.column_type, ColumnType::String);
    }
}

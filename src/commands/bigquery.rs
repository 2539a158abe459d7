//! BigQuery calls (`bq`).
//!
//! References use the `project:dataset[.table]` form.

use crate::command_traits::{CloudCommand, Program};

/// `bq show --format=none <project:dataset>`
#[derive(Debug, Clone)]
pub struct DatasetShowArgs {
    pub dataset_ref: String,
}

impl CloudCommand for DatasetShowArgs {
    fn program(&self) -> Program {
        Program::Bq
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec!["show".into(), "--format=none".into(), self.dataset_ref.clone()]
    }

    fn is_mutating(&self) -> bool {
        false
    }
}

/// `bq --location=<region> mk --dataset <project:dataset>`
#[derive(Debug, Clone)]
pub struct DatasetCreateArgs {
    pub dataset_ref: String,
    pub location: String,
}

impl CloudCommand for DatasetCreateArgs {
    fn program(&self) -> Program {
        Program::Bq
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec![
            format!("--location={}", self.location),
            "mk".into(),
            "--dataset".into(),
            self.dataset_ref.clone(),
        ]
    }

    fn is_mutating(&self) -> bool {
        true
    }
}

/// `bq show --format=none <project:dataset.table>`
#[derive(Debug, Clone)]
pub struct TableShowArgs {
    pub table_ref: String,
}

impl CloudCommand for TableShowArgs {
    fn program(&self) -> Program {
        Program::Bq
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec!["show".into(), "--format=none".into(), self.table_ref.clone()]
    }

    fn is_mutating(&self) -> bool {
        false
    }
}

/// `bq mk --table <project:dataset.table> <inline schema>`
#[derive(Debug, Clone)]
pub struct TableCreateArgs {
    pub table_ref: String,
    /// `name:TYPE,...` as produced by `schema::inline_schema`
    pub schema: String,
}

impl CloudCommand for TableCreateArgs {
    fn program(&self) -> Program {
        Program::Bq
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec![
            "mk".into(),
            "--table".into(),
            self.table_ref.clone(),
            self.schema.clone(),
        ]
    }

    fn is_mutating(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{METADATA_COLUMNS, inline_schema};

    #[test]
    fn test_dataset_create_sets_location_globally() {
        let args = DatasetCreateArgs {
            dataset_ref: "acme-docs:doc_processing".into(),
            location: "us-central1".into(),
        };
        let cli = args.to_cli_args();
        // bq global flags precede the command
        assert_eq!(cli[0], "--location=us-central1");
        assert_eq!(cli[1], "mk");
        assert_eq!(cli[3], "acme-docs:doc_processing");
    }

    #[test]
    fn test_table_create_carries_schema_last() {
        let args = TableCreateArgs {
            table_ref: "acme-docs:doc_processing.metadata".into(),
            schema: inline_schema(METADATA_COLUMNS),
        };
        let cli = args.to_cli_args();
        assert_eq!(cli[..3], ["mk", "--table", "acme-docs:doc_processing.metadata"]);
        assert!(cli[3].starts_with("filename:STRING,"));
        assert!(args.is_mutating());
    }

    #[test]
    fn test_show_commands_are_read_only() {
        assert!(!DatasetShowArgs { dataset_ref: "p:d".into() }.is_mutating());
        assert!(!TableShowArgs { table_ref: "p:d.t".into() }.is_mutating());
    }
}

//! Cloud Storage calls (`gsutil`).

use crate::command_traits::{CloudCommand, Program};

fn bucket_url(bucket: &str) -> String {
    format!("gs://{}", bucket)
}

/// `gsutil ls -b gs://<bucket>`: succeeds only if the bucket exists
#[derive(Debug, Clone)]
pub struct BucketDescribeArgs {
    pub bucket: String,
}

impl CloudCommand for BucketDescribeArgs {
    fn program(&self) -> Program {
        Program::Gsutil
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec!["ls".into(), "-b".into(), bucket_url(&self.bucket)]
    }

    fn is_mutating(&self) -> bool {
        false
    }
}

/// `gsutil mb -p <project> -l <location> gs://<bucket>`
#[derive(Debug, Clone)]
pub struct BucketCreateArgs {
    pub bucket: String,
    pub project: String,
    pub location: String,
}

impl CloudCommand for BucketCreateArgs {
    fn program(&self) -> Program {
        Program::Gsutil
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec![
            "mb".into(),
            "-p".into(),
            self.project.clone(),
            "-l".into(),
            self.location.clone(),
            bucket_url(&self.bucket),
        ]
    }

    fn is_mutating(&self) -> bool {
        true
    }
}

/// `gsutil notification create -t <topic> -f json gs://<bucket>`
///
/// Always creates a new notification config; the provider does not dedupe,
/// so reruns add another one for the same topic.
#[derive(Debug, Clone)]
pub struct NotificationCreateArgs {
    pub bucket: String,
    pub topic: String,
}

impl CloudCommand for NotificationCreateArgs {
    fn program(&self) -> Program {
        Program::Gsutil
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec![
            "notification".into(),
            "create".into(),
            "-t".into(),
            self.topic.clone(),
            "-f".into(),
            "json".into(),
            bucket_url(&self.bucket),
        ]
    }

    fn is_mutating(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_describe_args() {
        let args = BucketDescribeArgs { bucket: "acme-docs-doc-uploads".into() };
        assert_eq!(args.to_cli_args(), vec!["ls", "-b", "gs://acme-docs-doc-uploads"]);
        assert!(!args.is_mutating());
    }

    #[test]
    fn test_bucket_create_places_bucket_in_region() {
        let args = BucketCreateArgs {
            bucket: "acme-docs-doc-uploads".into(),
            project: "acme-docs".into(),
            location: "us-central1".into(),
        };
        assert_eq!(
            args.render(),
            "gsutil mb -p acme-docs -l us-central1 gs://acme-docs-doc-uploads"
        );
    }

    #[test]
    fn test_notification_uses_json_payload() {
        let args = NotificationCreateArgs {
            bucket: "b-uploads".into(),
            topic: "doc-processing-topic".into(),
        };
        let cli = args.to_cli_args();
        let f = cli.iter().position(|a| a == "-f").unwrap();
        assert_eq!(cli[f + 1], "json");
        assert_eq!(cli.last().map(String::as_str), Some("gs://b-uploads"));
        assert!(args.is_mutating());
    }
}

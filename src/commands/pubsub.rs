//! Pub/Sub topic and push subscription calls.

use super::project_flag;
use crate::command_traits::{CloudCommand, Program};

/// `gcloud pubsub topics describe <topic> --project <id>`
#[derive(Debug, Clone)]
pub struct TopicDescribeArgs {
    pub topic: String,
    pub project: String,
}

impl CloudCommand for TopicDescribeArgs {
    fn program(&self) -> Program {
        Program::Gcloud
    }

    fn to_cli_args(&self) -> Vec<String> {
        let mut args = vec![
            "pubsub".to_string(),
            "topics".to_string(),
            "describe".to_string(),
            self.topic.clone(),
        ];
        args.extend(project_flag(&self.project));
        args
    }

    fn is_mutating(&self) -> bool {
        false
    }
}

/// `gcloud pubsub topics create <topic> --project <id>`
#[derive(Debug, Clone)]
pub struct TopicCreateArgs {
    pub topic: String,
    pub project: String,
}

impl CloudCommand for TopicCreateArgs {
    fn program(&self) -> Program {
        Program::Gcloud
    }

    fn to_cli_args(&self) -> Vec<String> {
        let mut args = vec![
            "pubsub".to_string(),
            "topics".to_string(),
            "create".to_string(),
            self.topic.clone(),
        ];
        args.extend(project_flag(&self.project));
        args
    }

    fn is_mutating(&self) -> bool {
        true
    }
}

/// `gcloud pubsub subscriptions describe <subscription> --project <id>`
#[derive(Debug, Clone)]
pub struct SubscriptionDescribeArgs {
    pub subscription: String,
    pub project: String,
}

impl CloudCommand for SubscriptionDescribeArgs {
    fn program(&self) -> Program {
        Program::Gcloud
    }

    fn to_cli_args(&self) -> Vec<String> {
        let mut args = vec![
            "pubsub".to_string(),
            "subscriptions".to_string(),
            "describe".to_string(),
            self.subscription.clone(),
        ];
        args.extend(project_flag(&self.project));
        args
    }

    fn is_mutating(&self) -> bool {
        false
    }
}

/// `gcloud pubsub subscriptions create <sub> --topic <topic> --push-endpoint <url> ...`
#[derive(Debug, Clone)]
pub struct SubscriptionCreateArgs {
    pub subscription: String,
    pub topic: String,
    pub push_endpoint: String,
    pub push_auth_account: String,
    pub project: String,
}

impl CloudCommand for SubscriptionCreateArgs {
    fn program(&self) -> Program {
        Program::Gcloud
    }

    fn to_cli_args(&self) -> Vec<String> {
        let mut args = vec![
            "pubsub".to_string(),
            "subscriptions".to_string(),
            "create".to_string(),
            self.subscription.clone(),
            "--topic".to_string(),
            self.topic.clone(),
            "--push-endpoint".to_string(),
            self.push_endpoint.clone(),
            "--push-auth-service-account".to_string(),
            self.push_auth_account.clone(),
        ];
        args.extend(project_flag(&self.project));
        args
    }

    fn is_mutating(&self) -> bool {
        true
    }
}

/// `gcloud pubsub subscriptions update <sub> --push-endpoint <url> ...`
///
/// Repoints an existing subscription instead of creating a second one.
#[derive(Debug, Clone)]
pub struct SubscriptionUpdateArgs {
    pub subscription: String,
    pub push_endpoint: String,
    pub push_auth_account: String,
    pub project: String,
}

impl CloudCommand for SubscriptionUpdateArgs {
    fn program(&self) -> Program {
        Program::Gcloud
    }

    fn to_cli_args(&self) -> Vec<String> {
        let mut args = vec![
            "pubsub".to_string(),
            "subscriptions".to_string(),
            "update".to_string(),
            self.subscription.clone(),
            "--push-endpoint".to_string(),
            self.push_endpoint.clone(),
            "--push-auth-service-account".to_string(),
            self.push_auth_account.clone(),
        ];
        args.extend(project_flag(&self.project));
        args
    }

    fn is_mutating(&self) -> bool {
        true
    }
}

//! Shared fixtures for integration tests
//!
//! `FakeCloud` is an in-memory control plane implementing `CommandRunner`.
//! It interprets the argv of every typed command the sequencer issues and
//! keeps enough state to answer later lookups, so multi-run scenarios behave
//! like a real project.

#![allow(dead_code)]

use docpipe_setup::command_runner::{CommandOutput, CommandRunner};
use docpipe_setup::command_traits::{CloudCommand, Program};
use docpipe_setup::config_file::SetupConfig;
use docpipe_setup::naming::EnvironmentContext;
use docpipe_setup::schema::ColumnType;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

pub const PROJECT: &str = "acme-docs";
pub const DEPLOYED_URL: &str = "https://doc-processor-abc123-uc.a.run.app";

/// Environment context for `PROJECT` with default names
pub fn test_context() -> EnvironmentContext {
    EnvironmentContext::new(PROJECT, &SetupConfig::default()).expect("default config is valid")
}

/// Environment context with strict existence checks
pub fn strict_context() -> EnvironmentContext {
    let config = SetupConfig {
        strict_existence_checks: true,
        ..Default::default()
    };
    EnvironmentContext::new(PROJECT, &config).expect("default config is valid")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub topic: String,
    pub push_endpoint: String,
    pub push_auth_account: String,
}

/// Everything the fake project knows about
#[derive(Debug, Clone, Default)]
pub struct CloudState {
    pub active_project: Option<String>,
    pub enabled_services: BTreeSet<String>,
    /// `gs://` URLs
    pub buckets: BTreeSet<String>,
    pub datasets: BTreeSet<String>,
    /// table ref -> inline schema
    pub tables: BTreeMap<String, String>,
    pub images: BTreeSet<String>,
    pub builds: usize,
    pub deploys: usize,
    pub deployed_env_vars: Option<String>,
    pub service_url: Option<String>,
    pub service_accounts: BTreeSet<String>,
    /// (member, role)
    pub bindings: BTreeSet<(String, String)>,
    pub topics: BTreeSet<String>,
    pub subscriptions: BTreeMap<String, Subscription>,
    /// (bucket URL, topic), one entry per create call
    pub notifications: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub rendered: String,
    pub mutating: bool,
    /// Mutation skipped by dry-run
    pub skipped: bool,
}

pub struct FakeCloud {
    state: Mutex<CloudState>,
    calls: Mutex<Vec<Call>>,
    dry_run: bool,
    /// URL the service reports after the next deploy
    deploy_url: Mutex<String>,
    /// Mutations whose rendered command contains this fail
    fail_on: Mutex<Option<String>>,
    /// Probes whose rendered command contains the pattern fail with the stderr
    lookup_error: Mutex<Option<(String, String)>>,
}

impl FakeCloud {
    pub fn new() -> Self {
        Self::with_state(CloudState::default())
    }

    pub fn with_state(state: CloudState) -> Self {
        Self {
            state: Mutex::new(state),
            calls: Mutex::new(Vec::new()),
            dry_run: false,
            deploy_url: Mutex::new(DEPLOYED_URL.to_string()),
            fail_on: Mutex::new(None),
            lookup_error: Mutex::new(None),
        }
    }

    pub fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }

    pub fn fail_on(&self, pattern: &str) {
        *self.fail_on.lock().unwrap() = Some(pattern.to_string());
    }

    pub fn lookup_error(&self, pattern: &str, stderr: &str) {
        *self.lookup_error.lock().unwrap() = Some((pattern.to_string(), stderr.to_string()));
    }

    pub fn set_deploy_url(&self, url: &str) {
        *self.deploy_url.lock().unwrap() = url.to_string();
    }

    pub fn state(&self) -> MutexGuard<'_, CloudState> {
        self.state.lock().unwrap()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Rendered mutations that actually executed
    pub fn executed_mutations(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.mutating && !c.skipped)
            .map(|c| c.rendered)
            .collect()
    }

    /// Index of the first call containing `pattern`
    pub fn position_of(&self, pattern: &str) -> Option<usize> {
        self.calls().iter().position(|c| c.rendered.contains(pattern))
    }

    pub fn count_calls(&self, pattern: &str) -> usize {
        self.calls().iter().filter(|c| c.rendered.contains(pattern)).count()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn execute(&self, program: Program, args: &[String]) -> CommandOutput {
        let argv: Vec<&str> = args.iter().map(String::as_str).collect();
        let mut s = self.state.lock().unwrap();

        match (program, argv.as_slice()) {
            (Program::Gcloud, ["config", "get-value", "project"]) => {
                CommandOutput::ok(format!("{}\n", s.active_project.as_deref().unwrap_or("(unset)")))
            }
            (Program::Gcloud, ["services", "enable", rest @ ..]) => {
                for service in rest.iter().take_while(|a| !a.starts_with("--")) {
                    s.enabled_services.insert(service.to_string());
                }
                CommandOutput::ok("")
            }

            (Program::Gsutil, ["ls", "-b", url]) => {
                if s.buckets.contains(*url) {
                    CommandOutput::ok(format!("{}/\n", url))
                } else {
                    let message =
                        format!("BucketNotFoundException: 404 {} bucket does not exist.", url);
                    CommandOutput::failed(1, message)
                }
            }
            (Program::Gsutil, ["mb", "-p", _, "-l", _, url]) => {
                if !s.buckets.insert(url.to_string()) {
                    let message = format!(
                        "ServiceException: 409 A Cloud Storage bucket named '{}' already exists.",
                        url
                    );
                    return CommandOutput::failed(1, message);
                }
                CommandOutput::ok(format!("Creating {}/...\n", url))
            }
            (Program::Gsutil, ["notification", "create", "-t", topic, "-f", "json", url]) => {
                if !s.buckets.contains(*url) {
                    let message = format!("BucketNotFoundException: 404 {}", url);
                    return CommandOutput::failed(1, message);
                }
                if !s.topics.contains(*topic) {
                    return CommandOutput::failed(1, format!("NOT_FOUND: topic {}", topic));
                }
                s.notifications.push((url.to_string(), topic.to_string()));
                CommandOutput::ok("Created notification config\n")
            }

            (Program::Bq, ["show", "--format=none", reference]) => {
                let exists = if reference.contains('.') {
                    s.tables.contains_key(*reference)
                } else {
                    s.datasets.contains(*reference)
                };
                if exists {
                    CommandOutput::ok("")
                } else {
                    bq_error(format!("BigQuery error in show operation: Not found: {}", reference))
                }
            }
            (Program::Bq, [location, "mk", "--dataset", reference])
                if location.starts_with("--location=") =>
            {
                if !s.datasets.insert(reference.to_string()) {
                    return bq_error(format!("Dataset '{}' already exists.", reference));
                }
                CommandOutput::ok(format!("Dataset '{}' successfully created.\n", reference))
            }
            (Program::Bq, ["mk", "--table", reference, schema]) => {
                let dataset = reference.split('.').next().unwrap_or_default();
                if !s.datasets.contains(dataset) {
                    return bq_error(format!("Not found: Dataset {}", dataset));
                }
                if s.tables.contains_key(*reference) {
                    return bq_error(format!("Table '{}' already exists.", reference));
                }
                s.tables.insert(reference.to_string(), schema.to_string());
                CommandOutput::ok(format!("Table '{}' successfully created.\n", reference))
            }

            (Program::Gcloud, ["builds", "submit", "--tag", image, ..]) => {
                s.builds += 1;
                s.images.insert(image.to_string());
                CommandOutput::ok("DONE\n")
            }
            (Program::Gcloud, ["run", "deploy", _, "--image", image, ..]) => {
                if !s.images.contains(*image) {
                    return CommandOutput::failed(1, format!("Image '{}' not found.", image));
                }
                s.deploys += 1;
                s.deployed_env_vars = flag_value(&argv, "--set-env-vars").map(str::to_string);
                s.service_url = Some(self.deploy_url.lock().unwrap().clone());
                CommandOutput::ok("Service deployed\n")
            }
            (Program::Gcloud, ["run", "services", "describe", service, ..]) => {
                match &s.service_url {
                    Some(url) => CommandOutput::ok(format!("{}\n", url)),
                    None => {
                        let message = format!(
                            "ERROR: (gcloud.run.services.describe) Cannot find service [{}]",
                            service
                        );
                        CommandOutput::failed(1, message)
                    }
                }
            }
            (
                Program::Gcloud,
                [
                    "run",
                    "services",
                    "add-iam-policy-binding",
                    _,
                    "--member",
                    member,
                    "--role",
                    role,
                    ..,
                ],
            ) => {
                if s.service_url.is_none() {
                    return CommandOutput::failed(1, "NOT_FOUND: service");
                }
                s.bindings.insert((member.to_string(), role.to_string()));
                CommandOutput::ok("Updated IAM policy\n")
            }

            (Program::Gcloud, ["iam", "service-accounts", "describe", email, ..]) => {
                if s.service_accounts.contains(*email) {
                    CommandOutput::ok(format!("email: {}\n", email))
                } else {
                    let message = format!("ERROR: NOT_FOUND: Unknown service account {}", email);
                    CommandOutput::failed(1, message)
                }
            }
            (Program::Gcloud, ["iam", "service-accounts", "create", account, ..]) => {
                let project = flag_value(&argv, "--project").unwrap_or_default();
                let email = format!("{}@{}.iam.gserviceaccount.com", account, project);
                if !s.service_accounts.insert(email) {
                    return CommandOutput::failed(
                        1,
                        "ALREADY_EXISTS: Service account already exists",
                    );
                }
                CommandOutput::ok("")
            }

            (Program::Gcloud, ["pubsub", "topics", "describe", topic, ..]) => {
                if s.topics.contains(*topic) {
                    CommandOutput::ok(format!("name: projects/{}/topics/{}\n", PROJECT, topic))
                } else {
                    CommandOutput::failed(
                        1,
                        "ERROR: (gcloud.pubsub.topics.describe) NOT_FOUND: Resource not found",
                    )
                }
            }
            (Program::Gcloud, ["pubsub", "topics", "create", topic, ..]) => {
                if !s.topics.insert(topic.to_string()) {
                    return CommandOutput::failed(
                        1,
                        "ERROR: ALREADY_EXISTS: Resource already exists in the project",
                    );
                }
                CommandOutput::ok("")
            }
            (Program::Gcloud, ["pubsub", "subscriptions", "describe", name, ..]) => {
                match s.subscriptions.get(*name) {
                    Some(sub) => CommandOutput::ok(format!(
                        "pushConfig:\n  pushEndpoint: {}\n",
                        sub.push_endpoint
                    )),
                    None => CommandOutput::failed(
                        1,
                        concat!(
                            "ERROR: (gcloud.pubsub.subscriptions.describe) ",
                            "NOT_FOUND: Resource not found"
                        ),
                    ),
                }
            }
            (
                Program::Gcloud,
                ["pubsub", "subscriptions", "create", name, "--topic", topic, ..],
            ) => {
                if s.subscriptions.contains_key(*name) {
                    return CommandOutput::failed(
                        1,
                        "ERROR: ALREADY_EXISTS: Subscription already exists",
                    );
                }
                if !s.topics.contains(*topic) {
                    return CommandOutput::failed(1, "ERROR: NOT_FOUND: topic");
                }
                let sub = Subscription {
                    topic: topic.to_string(),
                    push_endpoint: flag_value(&argv, "--push-endpoint")
                        .unwrap_or_default()
                        .to_string(),
                    push_auth_account: flag_value(&argv, "--push-auth-service-account")
                        .unwrap_or_default()
                        .to_string(),
                };
                s.subscriptions.insert(name.to_string(), sub);
                CommandOutput::ok("")
            }
            (Program::Gcloud, ["pubsub", "subscriptions", "update", name, ..]) => {
                let endpoint = flag_value(&argv, "--push-endpoint").map(str::to_string);
                let auth = flag_value(&argv, "--push-auth-service-account").map(str::to_string);
                match s.subscriptions.get_mut(*name) {
                    Some(sub) => {
                        if let Some(endpoint) = endpoint {
                            sub.push_endpoint = endpoint;
                        }
                        if let Some(auth) = auth {
                            sub.push_auth_account = auth;
                        }
                        CommandOutput::ok("")
                    }
                    None => CommandOutput::failed(1, "ERROR: NOT_FOUND: Resource not found"),
                }
            }

            _ => {
                let message = format!("fake cloud: unsupported command {:?} {:?}", program, argv);
                CommandOutput::failed(2, message)
            }
        }
    }
}

impl CommandRunner for FakeCloud {
    fn run(&self, command: &dyn CloudCommand) -> anyhow::Result<CommandOutput> {
        let rendered = command.render();
        let mutating = command.is_mutating();
        let skipped = self.dry_run && mutating;

        self.calls.lock().unwrap().push(Call {
            rendered: rendered.clone(),
            mutating,
            skipped,
        });

        if skipped {
            return Ok(CommandOutput::skipped());
        }

        if mutating {
            if let Some(pattern) = self.fail_on.lock().unwrap().as_deref() {
                if rendered.contains(pattern) {
                    return Ok(CommandOutput::failed(1, "ERROR: injected failure"));
                }
            }
        } else if let Some((pattern, stderr)) = self.lookup_error.lock().unwrap().as_ref() {
            if rendered.contains(pattern.as_str()) {
                return Ok(CommandOutput::failed(1, stderr.clone()));
            }
        }

        Ok(self.execute(command.program(), &command.to_cli_args()))
    }

    fn is_dry_run(&self) -> bool {
        self.dry_run
    }
}

/// Parse an inline `name:TYPE,...` table schema back into `(name, type)` pairs.
///
/// Returns `None` on any malformed entry.
pub fn parse_inline_schema(schema: &str) -> Option<Vec<(String, ColumnType)>> {
    schema
        .split(',')
        .map(|entry| {
            let (name, ty) = entry.split_once(':')?;
            if name.is_empty() {
                return None;
            }
            Some((name.to_string(), ty.parse().ok()?))
        })
        .collect()
}

/// `bq` prints its errors on stdout and exits 2
fn bq_error(message: String) -> CommandOutput {
    CommandOutput {
        stdout: format!("{}\n", message),
        ..CommandOutput::failed(2, "")
    }
}

fn flag_value<'a>(argv: &[&'a str], flag: &str) -> Option<&'a str> {
    argv.iter()
        .position(|a| *a == flag)
        .and_then(|i| argv.get(i + 1))
        .copied()
}

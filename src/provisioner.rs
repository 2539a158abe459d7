//! Provisioning sequencer
//!
//! Drives the project from "resources may or may not exist" to a fully wired
//! pipeline by running eleven ensure-steps in a fixed order. Each step is a
//! free function taking the runner and the immutable `EnvironmentContext`;
//! `Provisioner` sequences them, advances the stage machine, prints progress
//! and records outcomes.
//!
//! Error policy is fail-fast: the first failing create/update/deploy call
//! ends the run. Nothing is retried or rolled back.

use crate::command_runner::{CommandOutput, CommandRunner};
use crate::command_traits::CloudCommand;
use crate::commands::bigquery::{
    DatasetCreateArgs, DatasetShowArgs, TableCreateArgs, TableShowArgs,
};
use crate::commands::iam::{
    INVOKER_DISPLAY_NAME, ServiceAccountCreateArgs, ServiceAccountDescribeArgs,
};
use crate::commands::project::{ConfigGetProjectArgs, parse_project_value};
use crate::commands::pubsub::{
    SubscriptionCreateArgs, SubscriptionDescribeArgs, SubscriptionUpdateArgs, TopicCreateArgs,
    TopicDescribeArgs,
};
use crate::commands::run::{
    AddInvokerBindingArgs, BuildSubmitArgs, INVOKER_ROLE, RunDeployArgs, ServiceUrlArgs,
};
use crate::commands::services::ServicesEnableArgs;
use crate::commands::storage::{BucketCreateArgs, BucketDescribeArgs, NotificationCreateArgs};
use crate::error::{ProvisionError, Result};
use crate::naming::{EnvironmentContext, ServiceEndpoint};
use crate::provision_state::{ProvisionStage, ProvisionTracker};
use crate::report::{SetupReport, StepOutcome};
use crate::schema::{METADATA_COLUMNS, inline_schema};

/// Substrings (lowercased) that identify a probe failure as "resource absent"
const NOT_FOUND_MARKERS: &[&str] = &[
    "not_found",
    "not found",
    "404",
    "bucketnotfoundexception",
    "does not exist",
];

/// Classified result of an existence probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Existence {
    Exists,
    Absent,
    /// The probe failed but not with a recognizable not-found error
    /// (permissions, network, quota...). Carries the probe's output.
    Indeterminate(String),
}

/// Classify a probe's output.
///
/// Markers are matched against both streams: `bq show` reports a missing
/// dataset or table on stdout, the gcloud tools on stderr.
pub fn classify_probe(output: &CommandOutput) -> Existence {
    if output.success {
        return Existence::Exists;
    }
    let diagnostic = [output.stdout.trim(), output.stderr.trim()]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    let lowered = diagnostic.to_lowercase();
    if NOT_FOUND_MARKERS.iter().any(|m| lowered.contains(m)) {
        Existence::Absent
    } else {
        Existence::Indeterminate(diagnostic)
    }
}

/// Run an existence probe and apply the context's policy for inconclusive results.
///
/// Lenient (default): an inconclusive probe counts as absent, so the create
/// call that follows surfaces the real problem. Strict: it aborts the run.
pub fn probe_exists(
    runner: &dyn CommandRunner,
    ctx: &EnvironmentContext,
    resource: &str,
    probe: &dyn CloudCommand,
) -> Result<bool> {
    let output = runner.run(probe)?;
    match classify_probe(&output) {
        Existence::Exists => Ok(true),
        Existence::Absent => Ok(false),
        Existence::Indeterminate(detail) => {
            if ctx.strict_existence_checks() {
                Err(ProvisionError::ExistenceCheck {
                    resource: resource.to_string(),
                    detail,
                })
            } else {
                tracing::warn!(
                    resource,
                    exit_code = output.code(),
                    output = %detail,
                    "existence check inconclusive, treating as absent"
                );
                Ok(false)
            }
        }
    }
}

/// Run a mutating command; a non-zero exit aborts the run
fn mutate(
    runner: &dyn CommandRunner,
    stage: ProvisionStage,
    command: &dyn CloudCommand,
) -> Result<CommandOutput> {
    let output = runner.run(command)?;
    if !output.success {
        return Err(ProvisionError::CommandFailed {
            stage,
            command: command.render(),
            exit_code: output.code(),
            stderr: failure_text(&output),
        });
    }
    Ok(output)
}

/// Error text of a failed call; `bq` reports on stdout
fn failure_text(output: &CommandOutput) -> String {
    let stderr = output.stderr.trim();
    if stderr.is_empty() {
        output.stdout.trim().to_string()
    } else {
        stderr.to_string()
    }
}

/// Outcome for a mutation that either ran or was skipped by dry-run
fn applied_or_skipped(output: &CommandOutput, applied: StepOutcome) -> StepOutcome {
    if output.dry_run {
        StepOutcome::Skipped
    } else {
        applied
    }
}

/// Shared shape of the check-then-create steps
fn ensure_exists(
    runner: &dyn CommandRunner,
    ctx: &EnvironmentContext,
    stage: ProvisionStage,
    resource: &str,
    probe: &dyn CloudCommand,
    create: &dyn CloudCommand,
) -> Result<StepOutcome> {
    if probe_exists(runner, ctx, resource, probe)? {
        tracing::info!(resource, "already exists");
        return Ok(StepOutcome::AlreadyExists);
    }
    tracing::info!(resource, "creating");
    let output = mutate(runner, stage, create)?;
    Ok(applied_or_skipped(&output, StepOutcome::Created))
}

/// Project id from an explicit value or the active gcloud configuration
pub fn resolve_project_id(runner: &dyn CommandRunner, explicit: Option<&str>) -> Result<String> {
    if let Some(project) = explicit.map(str::trim).filter(|p| !p.is_empty()) {
        return Ok(project.to_string());
    }

    let output = runner.run(&ConfigGetProjectArgs)?;
    if !output.success {
        tracing::error!(stderr = %output.stderr.trim(), "gcloud config get-value project failed");
        return Err(ProvisionError::ProjectUnresolved);
    }
    parse_project_value(&output.stdout).ok_or(ProvisionError::ProjectUnresolved)
}

// ============================================================================
// Steps
// ============================================================================

/// Step 1: enable provider APIs (idempotent on the provider side)
pub fn enable_services(
    runner: &dyn CommandRunner,
    ctx: &EnvironmentContext,
) -> Result<StepOutcome> {
    let args = ServicesEnableArgs {
        services: ctx.required_services().to_vec(),
        project: ctx.project_id().to_string(),
    };
    let output = mutate(runner, ProvisionStage::EnablingServices, &args)?;
    Ok(applied_or_skipped(&output, StepOutcome::Applied))
}

/// Step 2: upload bucket in the configured region
pub fn ensure_bucket(runner: &dyn CommandRunner, ctx: &EnvironmentContext) -> Result<StepOutcome> {
    ensure_exists(
        runner,
        ctx,
        ProvisionStage::EnsuringBucket,
        &ctx.bucket_url(),
        &BucketDescribeArgs {
            bucket: ctx.bucket().to_string(),
        },
        &BucketCreateArgs {
            bucket: ctx.bucket().to_string(),
            project: ctx.project_id().to_string(),
            location: ctx.region().to_string(),
        },
    )
}

/// Step 3: analytics dataset
pub fn ensure_dataset(runner: &dyn CommandRunner, ctx: &EnvironmentContext) -> Result<StepOutcome> {
    ensure_exists(
        runner,
        ctx,
        ProvisionStage::EnsuringDataset,
        &ctx.dataset_ref(),
        &DatasetShowArgs {
            dataset_ref: ctx.dataset_ref(),
        },
        &DatasetCreateArgs {
            dataset_ref: ctx.dataset_ref(),
            location: ctx.region().to_string(),
        },
    )
}

/// Step 4: metadata table with the fixed five-column schema
pub fn ensure_table(runner: &dyn CommandRunner, ctx: &EnvironmentContext) -> Result<StepOutcome> {
    ensure_exists(
        runner,
        ctx,
        ProvisionStage::EnsuringTable,
        &ctx.table_ref(),
        &TableShowArgs {
            table_ref: ctx.table_ref(),
        },
        &TableCreateArgs {
            table_ref: ctx.table_ref(),
            schema: inline_schema(METADATA_COLUMNS),
        },
    )
}

/// Step 5: rebuild the image and redeploy the processor. Always runs.
pub fn deploy_service(runner: &dyn CommandRunner, ctx: &EnvironmentContext) -> Result<StepOutcome> {
    let build = BuildSubmitArgs {
        image: ctx.image().to_string(),
        project: ctx.project_id().to_string(),
        source_dir: ctx.source_dir().to_path_buf(),
    };
    mutate(runner, ProvisionStage::DeployingService, &build)?;

    let deploy = RunDeployArgs {
        service: ctx.service().to_string(),
        image: ctx.image().to_string(),
        region: ctx.region().to_string(),
        project: ctx.project_id().to_string(),
        env_vars: ctx.service_env_vars(),
        allow_unauthenticated: false,
    };
    let output = mutate(runner, ProvisionStage::DeployingService, &deploy)?;
    Ok(applied_or_skipped(&output, StepOutcome::Applied))
}

/// Step 6: read the deployed service URL.
///
/// Outside dry-run a blank URL is an error, so no later step ever sees an
/// empty endpoint. In dry-run the service may not exist yet; a placeholder
/// keeps the preview going.
pub fn resolve_endpoint(
    runner: &dyn CommandRunner,
    ctx: &EnvironmentContext,
) -> Result<ServiceEndpoint> {
    let args = ServiceUrlArgs {
        service: ctx.service().to_string(),
        region: ctx.region().to_string(),
        project: ctx.project_id().to_string(),
    };
    let output = runner.run(&args)?;

    if output.success {
        if let Some(endpoint) = ServiceEndpoint::parse(&output.stdout) {
            return Ok(endpoint);
        }
    }

    if runner.is_dry_run() {
        let placeholder = ServiceEndpoint::placeholder(ctx.service());
        tracing::warn!(
            service = ctx.service(),
            %placeholder,
            "service not deployed yet, using placeholder endpoint"
        );
        return Ok(placeholder);
    }

    if !output.success {
        return Err(ProvisionError::CommandFailed {
            stage: ProvisionStage::ResolvingEndpoint,
            command: args.render(),
            exit_code: output.code(),
            stderr: output.stderr.trim().to_string(),
        });
    }

    Err(ProvisionError::EmptyEndpoint {
        service: ctx.service().to_string(),
    })
}

/// Step 7: push-auth service account
pub fn ensure_invoker(runner: &dyn CommandRunner, ctx: &EnvironmentContext) -> Result<StepOutcome> {
    ensure_exists(
        runner,
        ctx,
        ProvisionStage::EnsuringInvoker,
        ctx.invoker_email(),
        &ServiceAccountDescribeArgs {
            email: ctx.invoker_email().to_string(),
            project: ctx.project_id().to_string(),
        },
        &ServiceAccountCreateArgs {
            account_id: ctx.invoker_account().to_string(),
            display_name: INVOKER_DISPLAY_NAME.to_string(),
            project: ctx.project_id().to_string(),
        },
    )
}

/// Step 8: allow the invoker identity to call the service at `endpoint`
pub fn bind_invoker(
    runner: &dyn CommandRunner,
    ctx: &EnvironmentContext,
    endpoint: &ServiceEndpoint,
) -> Result<StepOutcome> {
    tracing::info!(member = ctx.invoker_email(), %endpoint, role = INVOKER_ROLE, "binding invoker");
    let args = AddInvokerBindingArgs {
        service: ctx.service().to_string(),
        member_email: ctx.invoker_email().to_string(),
        role: INVOKER_ROLE.to_string(),
        region: ctx.region().to_string(),
        project: ctx.project_id().to_string(),
    };
    let output = mutate(runner, ProvisionStage::BindingInvoker, &args)?;
    Ok(applied_or_skipped(&output, StepOutcome::Applied))
}

/// Step 9: message topic
pub fn ensure_topic(runner: &dyn CommandRunner, ctx: &EnvironmentContext) -> Result<StepOutcome> {
    ensure_exists(
        runner,
        ctx,
        ProvisionStage::EnsuringTopic,
        ctx.topic(),
        &TopicDescribeArgs {
            topic: ctx.topic().to_string(),
            project: ctx.project_id().to_string(),
        },
        &TopicCreateArgs {
            topic: ctx.topic().to_string(),
            project: ctx.project_id().to_string(),
        },
    )
}

/// Step 10: push subscription pointed at `endpoint`.
///
/// An existing subscription is updated in place (endpoint and auth identity)
/// so reruns after a redeploy never leave a second subscription behind.
pub fn ensure_subscription(
    runner: &dyn CommandRunner,
    ctx: &EnvironmentContext,
    endpoint: &ServiceEndpoint,
) -> Result<StepOutcome> {
    let stage = ProvisionStage::EnsuringSubscription;
    let probe = SubscriptionDescribeArgs {
        subscription: ctx.subscription().to_string(),
        project: ctx.project_id().to_string(),
    };

    if probe_exists(runner, ctx, ctx.subscription(), &probe)? {
        tracing::info!(subscription = ctx.subscription(), %endpoint, "updating push endpoint");
        let update = SubscriptionUpdateArgs {
            subscription: ctx.subscription().to_string(),
            push_endpoint: endpoint.to_string(),
            push_auth_account: ctx.invoker_email().to_string(),
            project: ctx.project_id().to_string(),
        };
        let output = mutate(runner, stage, &update)?;
        return Ok(applied_or_skipped(&output, StepOutcome::Updated));
    }

    tracing::info!(subscription = ctx.subscription(), %endpoint, "creating push subscription");
    let create = SubscriptionCreateArgs {
        subscription: ctx.subscription().to_string(),
        topic: ctx.topic().to_string(),
        push_endpoint: endpoint.to_string(),
        push_auth_account: ctx.invoker_email().to_string(),
        project: ctx.project_id().to_string(),
    };
    let output = mutate(runner, stage, &create)?;
    Ok(applied_or_skipped(&output, StepOutcome::Created))
}

/// Step 11: publish bucket changes to the topic.
///
/// Not idempotent: every call adds a notification config, so reruns
/// accumulate duplicates for the same topic.
pub fn configure_notification(
    runner: &dyn CommandRunner,
    ctx: &EnvironmentContext,
) -> Result<StepOutcome> {
    let args = NotificationCreateArgs {
        bucket: ctx.bucket().to_string(),
        topic: ctx.topic().to_string(),
    };
    let output = mutate(runner, ProvisionStage::ConfiguringNotification, &args)?;
    Ok(applied_or_skipped(&output, StepOutcome::Applied))
}

// ============================================================================
// Sequencer
// ============================================================================

/// Runs the eleven steps in order against one environment
pub struct Provisioner<'a> {
    runner: &'a dyn CommandRunner,
    tracker: ProvisionTracker,
    report: SetupReport,
    /// Print progress lines to stdout
    progress: bool,
}

impl<'a> Provisioner<'a> {
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        Self {
            runner,
            tracker: ProvisionTracker::new(),
            report: SetupReport::default(),
            progress: true,
        }
    }

    /// Disable stdout progress lines (logging is unaffected)
    pub fn quiet(mut self) -> Self {
        self.progress = false;
        self
    }

    pub fn tracker(&self) -> &ProvisionTracker {
        &self.tracker
    }

    pub fn report(&self) -> &SetupReport {
        &self.report
    }

    pub fn into_report(self) -> SetupReport {
        self.report
    }

    /// Execute every step. Stops at the first failure.
    pub fn run(&mut self, ctx: &EnvironmentContext) -> Result<()> {
        self.report = SetupReport::new(ctx.project_id(), ctx.region(), self.runner.is_dry_run());
        tracing::info!(
            project = ctx.project_id(),
            region = ctx.region(),
            dry_run = self.runner.is_dry_run(),
            "starting provisioning"
        );

        match self.run_steps(ctx) {
            Ok(()) => {
                self.tracker.advance()?;
                self.say(format!("==> {}", ProvisionStage::Completed));
                tracing::info!("provisioning complete");
                Ok(())
            }
            Err(err) => {
                let stage = self.tracker.current_stage();
                // Already terminal only if the tracker itself rejected a transition
                if self.tracker.fail().is_ok() {
                    self.report.failed_at = self.tracker.failed_at();
                }
                tracing::error!(%stage, error = %err, "provisioning aborted");
                Err(err)
            }
        }
    }

    fn run_steps(&mut self, ctx: &EnvironmentContext) -> Result<()> {
        let runner = self.runner;

        self.enter(ProvisionStage::EnablingServices)?;
        let outcome = enable_services(runner, ctx)?;
        self.complete(outcome, ctx.required_services().join(" "));

        self.enter(ProvisionStage::EnsuringBucket)?;
        let outcome = ensure_bucket(runner, ctx)?;
        self.complete(outcome, ctx.bucket_url());

        self.enter(ProvisionStage::EnsuringDataset)?;
        let outcome = ensure_dataset(runner, ctx)?;
        self.complete(outcome, ctx.dataset_ref());

        self.enter(ProvisionStage::EnsuringTable)?;
        let outcome = ensure_table(runner, ctx)?;
        self.complete(outcome, ctx.table_ref());

        self.enter(ProvisionStage::DeployingService)?;
        let outcome = deploy_service(runner, ctx)?;
        self.complete(outcome, format!("{} <- {}", ctx.service(), ctx.image()));

        self.enter(ProvisionStage::ResolvingEndpoint)?;
        let endpoint = resolve_endpoint(runner, ctx)?;
        self.report.endpoint = Some(endpoint.clone());
        self.complete(StepOutcome::Resolved, endpoint.to_string());

        self.enter(ProvisionStage::EnsuringInvoker)?;
        let outcome = ensure_invoker(runner, ctx)?;
        self.complete(outcome, ctx.invoker_email().to_string());

        self.enter(ProvisionStage::BindingInvoker)?;
        let outcome = bind_invoker(runner, ctx, &endpoint)?;
        self.complete(outcome, format!("{} on {}", INVOKER_ROLE, ctx.service()));

        self.enter(ProvisionStage::EnsuringTopic)?;
        let outcome = ensure_topic(runner, ctx)?;
        self.complete(outcome, ctx.topic().to_string());

        self.enter(ProvisionStage::EnsuringSubscription)?;
        let outcome = ensure_subscription(runner, ctx, &endpoint)?;
        self.complete(outcome, format!("{} -> {}", ctx.subscription(), endpoint));

        self.enter(ProvisionStage::ConfiguringNotification)?;
        let outcome = configure_notification(runner, ctx)?;
        self.complete(outcome, format!("{} -> {}", ctx.bucket_url(), ctx.topic()));

        Ok(())
    }

    fn enter(&mut self, stage: ProvisionStage) -> Result<()> {
        self.tracker.transition_to(stage)?;
        self.say(format!(
            "==> [{}/{}] {}...",
            stage.step_number().unwrap_or(0),
            ProvisionStage::STEP_COUNT,
            stage
        ));
        Ok(())
    }

    fn complete(&mut self, outcome: StepOutcome, detail: String) {
        let stage = self.tracker.current_stage();
        let line = match outcome {
            StepOutcome::Created => format!("    created {}", detail),
            StepOutcome::AlreadyExists => format!("    {} already exists", detail),
            StepOutcome::Updated => format!("    updated {}", detail),
            StepOutcome::Applied => format!("    done: {}", detail),
            StepOutcome::Resolved => format!("    endpoint: {}", detail),
            StepOutcome::Skipped => format!("    skipped (dry run): {}", detail),
        };
        self.say(line);
        tracing::debug!(%stage, %outcome, detail = %detail, "step complete");
        self.report.record(stage, outcome, detail);
    }

    fn say(&self, line: String) {
        if self.progress {
            println!("{}", line);
        }
    }
}

use async_trait::async_trait;
use calendor_conflict::{ConflictDetector, DetectorConfig, EventSpan};
use calendor_core::{CalendorResult, MailMessage, TaskState, WorkflowKind};
use calendor_runtime::{AgentRegistry, CoordinationLedger, RuntimeConfig};
use calendor_store::{Datastore, DocumentStore, JsonFileStore, MemoryStore};
use calendor_workers::{
    AggregatorWorker, CalendarWorker, CoordinatorWorker, MailGateway, MailboxWorker,
    OverseerWorker, StubMailGateway,
};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "calendor", about = "Calendor — multi-agent calendar & mail assistant")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "calendor.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the agent fleet until ctrl-c
    Run,
    /// One-shot conflict detection over a JSON event list
    Detect {
        /// Path to a JSON array of event documents
        #[arg(long)]
        events: PathBuf,
        /// User the schedule belongs to
        #[arg(long)]
        user: String,
    },
    /// Initiate a workflow and run the fleet until it settles
    Workflow {
        /// Workflow to initiate
        kind: WorkflowArg,
        /// User the workflow runs for
        #[arg(long)]
        user: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum WorkflowArg {
    MailProcessing,
    ScheduleOptimization,
    ConflictResolution,
}

impl From<WorkflowArg> for WorkflowKind {
    fn from(arg: WorkflowArg) -> Self {
        match arg {
            WorkflowArg::MailProcessing => WorkflowKind::MailProcessing,
            WorkflowArg::ScheduleOptimization => WorkflowKind::ScheduleOptimization,
            WorkflowArg::ConflictResolution => WorkflowKind::ConflictResolution,
        }
    }
}

#[derive(Deserialize, Default)]
struct CalendorConfig {
    /// When set, collections persist as JSON files under this directory.
    #[serde(default)]
    data_dir: Option<PathBuf>,
    #[serde(default)]
    runtime: RuntimeConfig,
    #[serde(default)]
    conflict: DetectorConfig,
    #[serde(default)]
    mail: MailConfig,
}

#[derive(Deserialize, Default)]
struct MailConfig {
    /// Optional JSON file of messages served as the unread inbox. Without
    /// it the fleet runs against a stub gateway that fetches nothing.
    #[serde(default)]
    inbox_path: Option<PathBuf>,
}

/// Gateway over a fixed inbox loaded from disk.
struct FileInboxGateway {
    messages: Vec<MailMessage>,
}

#[async_trait]
impl MailGateway for FileInboxGateway {
    async fn fetch_unread(&self, limit: usize) -> CalendorResult<Vec<MailMessage>> {
        Ok(self.messages.iter().take(limit).cloned().collect())
    }

    async fn send(
        &self,
        to: &str,
        subject: &str,
        _body: &str,
        _thread_ref: &str,
    ) -> CalendorResult<bool> {
        info!(to, subject, "outgoing message accepted");
        Ok(true)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config).await?;

    match cli.command {
        Commands::Run => run_fleet(&config, None).await,
        Commands::Detect { events, user } => detect(&config, &events, &user).await,
        Commands::Workflow { kind, user } => run_fleet(&config, Some((kind.into(), user))).await,
    }
}

async fn load_config(path: &PathBuf) -> anyhow::Result<CalendorConfig> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Ok(toml::from_str(&text)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!(config = %path.display(), "config file not found, using defaults");
            Ok(CalendorConfig::default())
        }
        Err(e) => Err(anyhow::anyhow!(
            "Failed to read config file '{}': {}",
            path.display(),
            e
        )),
    }
}

async fn build_store(config: &CalendorConfig) -> anyhow::Result<Datastore> {
    let inner: Arc<dyn DocumentStore> = match &config.data_dir {
        Some(dir) => {
            info!(data_dir = %dir.display(), "using JSON file store");
            Arc::new(JsonFileStore::new(dir.clone()).await?)
        }
        None => Arc::new(MemoryStore::new()),
    };
    Ok(Datastore::new(inner))
}

async fn build_gateway(config: &MailConfig) -> anyhow::Result<Arc<dyn MailGateway>> {
    match &config.inbox_path {
        Some(path) => {
            let text = tokio::fs::read_to_string(path).await?;
            let messages: Vec<MailMessage> = serde_json::from_str(&text)?;
            info!(inbox = %path.display(), count = messages.len(), "inbox loaded");
            Ok(Arc::new(FileInboxGateway { messages }))
        }
        None => Ok(Arc::new(StubMailGateway)),
    }
}

async fn run_fleet(
    config: &CalendorConfig,
    workflow: Option<(WorkflowKind, String)>,
) -> anyhow::Result<()> {
    let store = build_store(config).await?;
    let gateway = build_gateway(&config.mail).await?;
    let detector = ConflictDetector::new(config.conflict.clone());

    let mut registry = AgentRegistry::new(store.clone(), config.runtime.clone());
    registry.register(Arc::new(MailboxWorker::new(store.clone(), gateway)));
    registry.register(Arc::new(AggregatorWorker::new(store.clone())));
    registry.register(Arc::new(CalendarWorker::new(store.clone(), detector)));
    registry.register(Arc::new(CoordinatorWorker::new(store.clone())));
    registry.register(Arc::new(OverseerWorker::new(store.clone())));
    let handles = registry.spawn_all();

    match workflow {
        Some((kind, user)) => {
            let ledger = CoordinationLedger::new(store.clone());
            let coordination_id = ledger.initiate(kind, &user).await?;
            info!(%coordination_id, workflow = %kind, "workflow started");

            tokio::select! {
                summary = wait_until_settled(&ledger, &store, &coordination_id) => {
                    let summary = summary?;
                    ledger.complete(&coordination_id, summary).await?;
                    let status = ledger.status(&coordination_id).await?;
                    println!("{}", serde_json::to_string_pretty(&status)?);
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("interrupted before the workflow settled");
                }
            }
        }
        None => {
            info!("agent fleet running, press ctrl-c to stop");
            tokio::signal::ctrl_c().await?;
        }
    }

    registry.shutdown();
    for handle in handles {
        let _ = handle.await;
    }
    Ok(())
}

/// Poll until every task addressed to the workflow's agents is terminal,
/// then summarize the outcome.
async fn wait_until_settled(
    ledger: &CoordinationLedger,
    store: &Datastore,
    coordination_id: &str,
) -> anyhow::Result<Value> {
    loop {
        tokio::time::sleep(Duration::from_millis(500)).await;
        let status = ledger.status(coordination_id).await?;

        let mut queued = 0;
        for agent_id in &status.record.involved_agents {
            queued += store.pending_tasks(agent_id).await?.len();
        }
        let open = status
            .tasks
            .iter()
            .filter(|t| !t.state.is_terminal())
            .count();
        if queued > 0 || open > 0 || status.tasks.is_empty() {
            continue;
        }

        let completed = status
            .tasks
            .iter()
            .filter(|t| t.state == TaskState::Completed)
            .count();
        let failed = status
            .tasks
            .iter()
            .filter(|t| t.state == TaskState::Failed)
            .count();
        return Ok(json!({
            "tasks": status.tasks.len(),
            "completed": completed,
            "failed": failed,
        }));
    }
}

async fn detect(config: &CalendorConfig, events_path: &PathBuf, user: &str) -> anyhow::Result<()> {
    let text = tokio::fs::read_to_string(events_path).await?;
    let docs: Vec<Value> = serde_json::from_str(&text)?;
    let spans = docs
        .iter()
        .map(EventSpan::from_document)
        .collect::<CalendorResult<Vec<_>>>()?;

    let detector = ConflictDetector::new(config.conflict.clone());
    let conflicts = detector.detect(&spans, user);
    info!(
        event_count = spans.len(),
        conflict_count = conflicts.len(),
        "detection complete"
    );
    println!("{}", serde_json::to_string_pretty(&conflicts)?);
    Ok(())
}

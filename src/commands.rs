use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{info, warn};

use scrapewatch::api::models::{CreateJobRequest, Job, ScrapeRequest, Stats};
use scrapewatch::api::validation::normalize_urls;
use scrapewatch::api::{ApiClient, ExportFormat};
use scrapewatch::config::Config;
use scrapewatch::drafts::{Draft, DraftStore};
use scrapewatch::export::{self, ExportError};
use scrapewatch::humanize::format_elapsed;
use scrapewatch::polling::{
    JobView, Notification, NotificationKind, PollScheduler, RefreshSink, SchedulerSettings,
    StatsPoller,
};

use crate::cli::{
    Cli, Commands, DraftCommand, SubmitCommand, SubmitScrapeArgs, SubmitSearchArgs,
};

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

struct Context {
    config: Config,
    client: Arc<ApiClient>,
}

impl Context {
    fn drafts(&self) -> Result<DraftStore, AnyError> {
        Ok(DraftStore::open(&self.config.drafts.path)?)
    }

    fn output_dir(&self, explicit: Option<PathBuf>) -> PathBuf {
        explicit.unwrap_or_else(|| self.config.export.output_dir.clone())
    }
}

pub async fn run(cli: Cli) -> Result<(), AnyError> {
    let config = Config::load(cli.config)?;
    let client = Arc::new(ApiClient::new(&config.api)?);
    let ctx = Context { config, client };

    match cli.command {
        Commands::Watch(args) => watch(&ctx, args.jobs).await?,
        Commands::Jobs(args) => {
            let jobs = ctx.client.list_jobs().await?;
            let shown: Vec<&Job> = jobs
                .iter()
                .filter(|job| args.status.is_none_or(|status| job.status == status))
                .collect();
            if shown.is_empty() {
                println!("No jobs found");
            }
            for job in shown {
                print_job(job);
            }
        }
        Commands::Status(args) => {
            let job = ctx.client.job_status(&args.job_id).await?;
            print_job(&job);
        }
        Commands::Results(args) => {
            let results = ctx.client.job_results(&args.job_id).await?;
            if let Some(job) = &results.job {
                print_job(job);
            }
            println!("{}", serde_json::to_string_pretty(&results.results)?);
            println!("{} result(s)", results.results.len());
        }
        Commands::Submit(SubmitCommand::Search(args)) => submit_search(&ctx, args).await?,
        Commands::Submit(SubmitCommand::Scrape(args)) => submit_scrape(&ctx, args).await?,
        Commands::ScrapeJobs(args) => {
            let request = ScrapeRequest {
                query: args.query,
                max_results: args.max_results,
            };
            println!("{}", ctx.client.scrape_jobs(&request).await?.summary());
        }
        Commands::ScrapeLeads(args) => {
            let request = ScrapeRequest {
                query: args.query,
                max_results: args.max_results,
            };
            println!("{}", ctx.client.scrape_leads(&request).await?.summary());
        }
        Commands::Export(args) => {
            let results = ctx.client.job_results(&args.job_id).await?;
            let dir = ctx.output_dir(args.output_dir);
            match export::write_csv(&args.job_id, &results.results, &dir) {
                Ok(path) => println!("Exported {} result(s) to {}", results.results.len(), path.display()),
                Err(ExportError::NothingToExport) => println!("No results to export"),
                Err(e) => return Err(e.into()),
            }
        }
        Commands::Download(args) => {
            let path = download(&ctx, &args.job_id, args.format, &ctx.output_dir(args.output_dir)).await?;
            println!("Saved {}", path.display());
        }
        Commands::Cancel(args) => cancel(&ctx, &args.job_id).await?,
        Commands::Stats => {
            let stats = ctx.client.stats().await?;
            print_stats(&stats, Utc::now());
        }
        Commands::Adapters => {
            for adapter in ctx.client.adapters().await? {
                let label = adapter.display_name.as_deref().unwrap_or(&adapter.name);
                match adapter.description.as_deref() {
                    Some(description) => println!("{:<20} {}  {}", adapter.name, label, description),
                    None => println!("{:<20} {}", adapter.name, label),
                }
            }
        }
        Commands::Health => {
            let health = ctx.client.health().await?;
            println!("{}", serde_json::to_string_pretty(&health)?);
        }
        Commands::Search(args) => {
            let results = ctx.client.search(&args.query, args.max_results).await?;
            println!("{}", serde_json::to_string_pretty(&results)?);
            println!("{} result(s)", results.len());
        }
        Commands::ClearData(args) => {
            if !args.yes {
                return Err("clear-data deletes every job and result; pass --yes to confirm".into());
            }
            println!("{}", ctx.client.clear_data().await?.summary());
        }
        Commands::Draft(command) => draft(&ctx, command)?,
        Commands::Config => print!("{}", ctx.config.to_toml()?),
    }

    Ok(())
}

/// Terminal dashboard: prints rows and notices, and forwards reloaded job
/// listings to the watch loop
struct DashboardSink {
    client: Arc<ApiClient>,
    reloads: mpsc::UnboundedSender<Vec<Job>>,
}

#[async_trait]
impl RefreshSink for DashboardSink {
    fn apply_patch(&self, view: &JobView) {
        println!("{}", view.render_line());
    }

    fn notify(&self, notification: &Notification) {
        let prefix = match notification.kind {
            NotificationKind::Success => "OK",
            NotificationKind::Error => "FAILED",
            NotificationKind::Info => "INFO",
        };
        println!("[{}] {}", prefix, notification.message);
    }

    async fn reload(&self) {
        match self.client.list_jobs().await {
            Ok(jobs) => {
                println!("--- jobs reloaded ---");
                for job in &jobs {
                    print_job(job);
                }
                let _ = self.reloads.send(jobs);
            }
            Err(e) => warn!(error = %e, "Job list reload failed"),
        }
    }

    fn stats_updated(&self, stats: &Stats, at: DateTime<Utc>) {
        print_stats(stats, at);
    }
}

async fn watch(ctx: &Context, extra: Vec<String>) -> Result<(), AnyError> {
    let jobs = ctx.client.list_jobs().await?;
    watch_jobs(ctx, jobs, extra).await
}

async fn watch_jobs(ctx: &Context, jobs: Vec<Job>, extra: Vec<String>) -> Result<(), AnyError> {
    let started = std::time::Instant::now();
    let (reload_tx, mut reload_rx) = mpsc::unbounded_channel();
    let sink = Arc::new(DashboardSink {
        client: ctx.client.clone(),
        reloads: reload_tx,
    });

    let scheduler = PollScheduler::new(
        ctx.client.clone(),
        sink.clone(),
        SchedulerSettings::from(&ctx.config.polling),
    );
    let stats = StatsPoller::new(
        ctx.client.clone(),
        sink,
        ctx.config.polling.stats_interval.as_duration(),
    );

    for job in &jobs {
        print_job(job);
    }
    scheduler.mount(jobs);
    for job_id in extra {
        scheduler.register(job_id);
    }

    if scheduler.active_ids().is_empty() {
        println!("No active jobs to watch");
        return Ok(());
    }

    let _ = stats.refresh_once().await;
    stats.start();

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = scheduler.wait_idle() => {
                scheduler.flush_reloads().await;
                while let Ok(listing) = reload_rx.try_recv() {
                    scheduler.refresh(listing);
                }
                if scheduler.active_ids().is_empty() {
                    break;
                }
            }
            Some(listing) = reload_rx.recv() => {
                let activated = scheduler.refresh(listing);
                if !activated.is_empty() {
                    info!(count = activated.len(), "New active jobs discovered");
                }
            }
            _ = &mut shutdown => {
                println!("Interrupted, stopping");
                break;
            }
        }
    }

    stats.stop();
    scheduler.teardown();

    let metrics = scheduler.metrics();
    info!(
        polls = metrics.polls_issued,
        fetch_failures = metrics.fetch_failures,
        discarded = metrics.discarded_results,
        notifications = metrics.notifications,
        reloads = metrics.reloads,
        elapsed = %format_elapsed(started.elapsed().as_secs()),
        "Watch finished"
    );
    Ok(())
}

async fn submit_search(ctx: &Context, args: SubmitSearchArgs) -> Result<(), AnyError> {
    let drafts = ctx.drafts()?;
    let draft = drafts.load(Some(&args.form))?;

    let query = args
        .query
        .or_else(|| draft_field(draft.as_ref(), "query"))
        .unwrap_or_default();
    let max_results = match args.max_results {
        Some(max) => max,
        None => draft_field(draft.as_ref(), "max_results")
            .map(|raw| raw.trim().parse::<u32>())
            .transpose()?
            .unwrap_or(scrapewatch::api::models::DEFAULT_MAX_RESULTS),
    };

    let request = CreateJobRequest::Search { query, max_results };
    submit(ctx, &drafts, &args.form, request, args.watch).await
}

async fn submit_scrape(ctx: &Context, args: SubmitScrapeArgs) -> Result<(), AnyError> {
    let drafts = ctx.drafts()?;

    let raw = if args.urls.is_empty() {
        draft_field(drafts.load(Some(&args.form))?.as_ref(), "urls").unwrap_or_default()
    } else {
        args.urls.join("\n")
    };
    let input = normalize_urls(&raw);
    for invalid in &input.invalid {
        warn!(url = %invalid, "Skipping invalid URL");
        println!("Skipping invalid URL: {}", invalid);
    }

    let request = CreateJobRequest::Scrape {
        urls: input.valid,
        adapter_name: args.adapter,
        task_type: args.task_type,
    };
    submit(ctx, &drafts, &args.form, request, args.watch).await
}

async fn submit(
    ctx: &Context,
    drafts: &DraftStore,
    form: &str,
    request: CreateJobRequest,
    watch: bool,
) -> Result<(), AnyError> {
    let accepted = ctx.client.create_job(&request).await?;
    println!("Job {} created", accepted.job_id);

    if drafts.clear(Some(form))? {
        drafts.persist()?;
    }

    if watch {
        watch_jobs(ctx, Vec::new(), vec![accepted.job_id]).await?;
    }
    Ok(())
}

async fn cancel(ctx: &Context, job_id: &str) -> Result<(), AnyError> {
    let message = ctx.client.cancel_job(job_id).await?;
    println!("{}", message);

    tokio::time::sleep(ctx.config.polling.cancel_reload_delay.as_duration()).await;
    match ctx.client.job_status(job_id).await {
        Ok(job) => print_job(&job),
        Err(e) => warn!(job_id = %job_id, error = %e, "Reload after cancel failed"),
    }
    Ok(())
}

async fn download(
    ctx: &Context,
    job_id: &str,
    format: ExportFormat,
    dir: &Path,
) -> Result<PathBuf, AnyError> {
    let bytes = ctx.client.export_job(job_id, format).await?;
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(format.filename(job_id));
    tokio::fs::write(&path, &bytes).await?;
    info!(job_id = %job_id, format = %format, bytes = bytes.len(), "Export downloaded");
    Ok(path)
}

fn draft(ctx: &Context, command: DraftCommand) -> Result<(), AnyError> {
    let store = ctx.drafts()?;
    match command {
        DraftCommand::Save { form, fields } => {
            let draft = store.save(form.as_deref(), fields)?;
            store.persist()?;
            println!("Saved {} field(s)", draft.fields.len());
        }
        DraftCommand::Show { form } => match store.load(form.as_deref())? {
            Some(draft) => print_draft(&draft),
            None => println!("No draft saved"),
        },
        DraftCommand::Clear { form } => {
            if store.clear(form.as_deref())? {
                store.persist()?;
                println!("Draft cleared");
            } else {
                println!("No draft saved");
            }
        }
        DraftCommand::List => {
            for draft in store.list()? {
                print_draft(&draft);
            }
        }
    }
    Ok(())
}

fn draft_field(draft: Option<&Draft>, name: &str) -> Option<String> {
    draft.and_then(|draft| draft.fields.get(name).cloned())
}

fn print_job(job: &Job) {
    println!("{}", JobView::from_job(job).render_line());
}

fn print_draft(draft: &Draft) {
    println!(
        "{} (saved {})",
        draft.form_id.as_deref().unwrap_or("anonymous"),
        draft.saved_at.format("%Y-%m-%d %H:%M:%S")
    );
    for (name, value) in &draft.fields {
        println!("  {} = {}", name, value);
    }
}

fn print_stats(stats: &Stats, at: DateTime<Utc>) {
    println!(
        "jobs={} running={} completed={} failed={} results={} success={:.1}%  Last updated: {}",
        stats.total_jobs,
        stats.running_jobs,
        stats.completed_jobs,
        stats.failed_jobs,
        stats.total_results,
        stats.effective_success_rate(),
        at.format("%H:%M:%S")
    );
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}

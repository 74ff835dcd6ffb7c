mod cli;
mod driver;

use clap::Parser;
use cli::{Cli, Commands, JobArgs, RunArgs};
use crawlbox::config::Settings;
use crawlbox::queue::{JobKeys, QueueState};
use crawlbox::request::RequestNormalizer;
use crawlbox::store::Store;
use crawlbox::{Dispatcher, observability};
use driver::FileSpider;
use std::sync::Arc;
use tracing::{info, warn};

type AnyError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), AnyError> {
    let cli = Cli::parse();

    let settings = match cli.config {
        Some(path) => Settings::load_from_path(path)?,
        None => Settings::load()?,
    };
    observability::init_tracing(&settings.logging)?;

    match cli.command {
        Commands::Run(args) => run(&settings, args).await?,
        Commands::Status(args) => status(&settings, &args)?,
        Commands::Clear(args) => clear(&settings, &args)?,
    }

    Ok(())
}

async fn run(settings: &Settings, args: RunArgs) -> Result<(), AnyError> {
    let store = settings.store.open()?;
    let mut job = settings.job(args.job.name.clone());
    job.options = args.apply(job.options);

    let dispatcher = Dispatcher::builder()
        .config(job)
        .store(store.clone())
        .spider(Arc::new(FileSpider::open(&args.input)?))
        .key_prefix(settings.store.key_prefix.clone())
        .http(settings.http.clone())
        .build()?;

    tokio::select! {
        summary = dispatcher.run() => {
            let summary = summary?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        _ = tokio::signal::ctrl_c() => {
            warn!(
                namespace = dispatcher.namespace(),
                "Interrupted; run again with --continue to resume"
            );
        }
    }

    store.persist()?;
    Ok(())
}

fn queue_state(settings: &Settings, args: &JobArgs) -> Result<(QueueState, Arc<dyn Store>), AnyError> {
    let store = settings.store.open()?;
    let keys = JobKeys::new(&settings.store.key_prefix, &args.name);
    Ok((
        QueueState::new(store.clone(), keys, RequestNormalizer::default()),
        store,
    ))
}

fn status(settings: &Settings, args: &JobArgs) -> Result<(), AnyError> {
    let (queue, _) = queue_state(settings, args)?;
    let progress = queue.progress()?;

    println!("namespace:   {}", queue.keys().namespace());
    println!("queued:      {}", queue.length()?);
    println!("retrying:    {}", queue.error_length()?);
    println!("in flight:   {}", queue.in_flight()?.len());
    println!("total:       {}", progress.total);
    println!("overplus:    {}", progress.overplus);
    println!("completed:   {} ({}%)", progress.completed(), progress.percent());
    Ok(())
}

fn clear(settings: &Settings, args: &JobArgs) -> Result<(), AnyError> {
    let (queue, store) = queue_state(settings, args)?;
    let removed = queue.clear()?;
    store.persist()?;
    info!(namespace = queue.keys().namespace(), removed, "Cleared job state");
    Ok(())
}

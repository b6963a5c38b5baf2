use std::rc::Rc;

use canopy::{
    Composite, Document, ListenScope, Listener, Metadata, Property,
    remote::{HttpSource, Poller},
};
use tokio::task::LocalSet;
use tracing::info;

use crate::{
    cli::WatchArgs,
    output::{self, OutputFormat},
};

/// Reject arguments that would leave nothing to poll
fn check_args(args: &WatchArgs) -> Result<(), Box<dyn std::error::Error>> {
    url::Url::parse(&args.url).map_err(|e| format!("Invalid url {}: {e}", args.url))?;
    if args.refresh_rate == 0 {
        return Err("--refresh-rate must be non-zero (use -1 to fetch once)".into());
    }
    Ok(())
}

pub async fn run(args: &WatchArgs, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    check_args(args)?;

    let doc = match &args.file {
        Some(path) => super::read_document(path)?,
        None => Document::new(),
    };

    let poller = Rc::new(Poller::new(HttpSource::new()));
    poller.install();

    let root = Composite::new(doc, Metadata::new());
    root.on_change(
        &Listener::new(move |old, new, name| output::print_event(format, old, new, name)),
        ListenScope::Subtree,
    );
    // Tracking happens when the remote child is created
    root.create_child_with(
        args.name.as_str(),
        Document::new(),
        Metadata::new()
            .with_url(args.url.as_str())
            .with_refresh_rate(args.refresh_rate),
    );
    info!(url = %args.url, refresh_rate = args.refresh_rate, "watching");

    LocalSet::new()
        .run_until(async {
            let runner = poller.clone();
            let handle = tokio::task::spawn_local(async move { runner.run().await });

            let stopped = tokio::signal::ctrl_c().await;
            info!("stopping");
            poller.shutdown();
            handle
                .await
                .map_err(Box::<dyn std::error::Error>::from)?;
            stopped.map_err(Box::<dyn std::error::Error>::from)
        })
        .await?;

    canopy::remote::clear_tracker();
    Ok(())
}

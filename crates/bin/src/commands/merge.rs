use canopy::{Composite, ListenScope, Listener, Metadata, Property};
use tracing::info;

use crate::{
    cli::MergeArgs,
    output::{self, OutputFormat},
};

pub fn run(args: &MergeArgs, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let base = super::read_document(&args.base)?;
    let patch = super::read_document(&args.patch)?;

    let root = Composite::new(base, Metadata::new());
    root.on_change(
        &Listener::new(move |old, new, name| output::print_event(format, old, new, name)),
        ListenScope::Subtree,
    );

    root.try_merge(&patch, args.keep_old)?;
    info!(keep_old = args.keep_old, children = root.len(), "merge applied");

    let merged = root.to_document(true);
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(&merged)?),
        OutputFormat::Human => println!("{}", serde_json::to_string_pretty(&merged)?),
    }
    Ok(())
}

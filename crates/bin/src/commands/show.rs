use canopy::{Composite, Metadata};

use crate::{
    cli::ShowArgs,
    output::{self, OutputFormat},
};

pub fn run(args: &ShowArgs, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let doc = super::read_document(&args.file)?;
    let root = Composite::new(doc, Metadata::new());

    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&root.to_document(args.metadata))?
            );
        }
        OutputFormat::Human => {
            let rows = output::leaf_rows(&root);
            if rows.is_empty() {
                println!("(empty document)");
            } else {
                output::print_table(&["PATH", "TYPE", "VALUE"], &rows);
            }
        }
    }
    Ok(())
}

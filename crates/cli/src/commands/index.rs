//! `docchat index <FILE>`: upload a document and index its pages.

use std::path::PathBuf;

use docchat_rag::Indexer;

pub async fn run(file: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    // Checked before config so a typo fails fast even without credentials
    if !file.is_file() {
        return Err(format!("File not found: {}", file.display()).into());
    }

    let config = super::load_config()?;
    let store = docchat_storage::build_from_config(&config)?;
    let index = docchat_search::build_from_config(&config)?;

    let indexer = Indexer::from_config(store, index, &config.ingest);
    let report = indexer.index_file(&file).await?;

    println!("Uploaded {} to {}", report.stored_name, config.storage.backend);
    println!(
        "Indexed {} record(s) from {} page(s) into '{}'",
        report.records, report.pages, config.search.index_name
    );
    if report.removed > 0 {
        println!("Removed {} record(s) left from the previous version", report.removed);
    }
    println!("Document processing completed successfully");

    Ok(())
}

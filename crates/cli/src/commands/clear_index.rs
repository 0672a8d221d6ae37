//! `docchat clear-index`: delete every document from the index.

use docchat_rag::clear_index;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    let index = docchat_search::build_from_config(&config)?;

    let report = clear_index(index.as_ref(), config.search.delete_batch_size).await?;

    if report.documents == 0 {
        println!("No documents found in '{}'", config.search.index_name);
    } else {
        println!(
            "Deleted {} document(s) from '{}' in {} batch(es)",
            report.documents, config.search.index_name, report.batches
        );
    }

    Ok(())
}

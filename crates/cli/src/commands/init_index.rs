//! `docchat init-index`: create or update the index definition.

use docchat_search::AzureSearchIndex;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    let index = AzureSearchIndex::from_config(&config.search)?;

    index.create_or_update_index().await?;
    println!("Index '{}' is ready", index.index_name());

    Ok(())
}

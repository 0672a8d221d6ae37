//! Index maintenance: removing every document in bounded delete batches.

use docchat_core::error::SearchError;
use docchat_core::search::SearchIndex;
use tracing::info;

/// Largest delete batch the search service accepts.
pub const MAX_DELETE_BATCH: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClearReport {
    pub documents: usize,
    pub batches: usize,
}

/// Delete every document from `index`, `batch_size` ids at a time.
///
/// The first failing batch aborts the run; earlier batches stay deleted.
pub async fn clear_index(
    index: &dyn SearchIndex,
    batch_size: usize,
) -> Result<ClearReport, SearchError> {
    let batch_size = batch_size.clamp(1, MAX_DELETE_BATCH);
    let ids: Vec<String> = index
        .list_all(&["id"])
        .await?
        .into_iter()
        .filter_map(|hit| hit.id)
        .collect();

    if ids.is_empty() {
        info!("No documents found in the index");
        return Ok(ClearReport {
            documents: 0,
            batches: 0,
        });
    }

    let total = ids.len().div_ceil(batch_size);
    info!(documents = ids.len(), batches = total, "Clearing index");

    for (i, batch) in ids.chunks(batch_size).enumerate() {
        index.delete(batch.to_vec()).await?;
        info!("Deleted batch {} of {}", i + 1, total);
    }

    Ok(ClearReport {
        documents: ids.len(),
        batches: total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::StaticIndex;
    use chrono::Utc;
    use docchat_core::search::SearchRecord;
    use docchat_search::InMemoryIndex;

    #[tokio::test]
    async fn fifteen_hundred_records_take_two_batches() {
        let index = StaticIndex::with_documents(1500);
        let report = clear_index(&index, 1000).await.unwrap();

        assert_eq!(report, ClearReport { documents: 1500, batches: 2 });
        assert_eq!(index.batch_sizes(), vec![1000, 500]);
    }

    #[tokio::test]
    async fn empty_index_needs_no_batches() {
        let index = StaticIndex::with_documents(0);
        let report = clear_index(&index, 1000).await.unwrap();
        assert_eq!(report.batches, 0);
        assert!(index.batch_sizes().is_empty());
    }

    #[tokio::test]
    async fn first_failure_aborts() {
        let index = StaticIndex::with_documents(2500).failing_delete_at(2);
        let err = clear_index(&index, 1000).await.unwrap_err();

        assert!(matches!(err, SearchError::ApiError { status_code: 503, .. }));
        assert_eq!(index.batch_sizes(), vec![1000]);
    }

    #[tokio::test]
    async fn oversized_batches_are_capped() {
        let index = StaticIndex::with_documents(1001);
        let report = clear_index(&index, 5000).await.unwrap();
        assert_eq!(report.batches, 2);
        assert_eq!(index.batch_sizes(), vec![1000, 1]);
    }

    #[tokio::test]
    async fn clears_an_in_memory_index() {
        let index = InMemoryIndex::new();
        let records = (0..7)
            .map(|i| SearchRecord {
                id: format!("doc_{i}"),
                content: "text".into(),
                title: "t".into(),
                section: "default".into(),
                page_number: 1,
                last_modified: Utc::now(),
            })
            .collect();
        index.upsert(records).await.unwrap();

        let report = clear_index(&index, 3).await.unwrap();
        assert_eq!(report.batches, 3);
        assert_eq!(index.count().await, 0);
    }
}

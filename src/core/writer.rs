use crate::core::catalog::Catalog;
use crate::error::AppResult;
use crate::logging::{log, LogLevel};
use crate::model::output::BadUriRecord;
use crate::utils::pace;
use async_recursion::async_recursion;
use std::time::Duration;

pub trait RejectSink: Send {
    fn reject(&mut self, record: BadUriRecord);
}

impl RejectSink for Vec<BadUriRecord> {
    fn reject(&mut self, record: BadUriRecord) {
        self.push(record);
    }
}

pub struct BatchWriter<'a> {
    catalog: &'a dyn Catalog,
    playlist_id: &'a str,
    pacing: Duration,
}

impl<'a> BatchWriter<'a> {
    pub fn new(catalog: &'a dyn Catalog, playlist_id: &'a str, pacing: Duration) -> Self {
        BatchWriter {
            catalog,
            playlist_id,
            pacing,
        }
    }

    /// A rejected chunk is split at its midpoint and each half resubmitted
    /// until the rejected URIs stand alone; those go to `sink`. Failures that
    /// are not rejections abort the write with the error.
    pub async fn write(
        &self,
        uris: &[String],
        batch_size: usize,
        sink: &mut dyn RejectSink,
    ) -> AppResult<usize> {
        let batch_size = batch_size.max(1);
        let total_batches = uris.len().div_ceil(batch_size);
        let mut added = 0;

        for (i, chunk) in uris.chunks(batch_size).enumerate() {
            let committed = self.submit(chunk, sink).await?;
            if committed < chunk.len() {
                log(
                    LogLevel::Warning,
                    &format!(
                        "Write Batch {}/{} - {} of {} URI(s) rejected.",
                        i + 1,
                        total_batches,
                        chunk.len() - committed,
                        chunk.len()
                    ),
                );
            }
            added += committed;
        }

        Ok(added)
    }

    #[async_recursion]
    async fn submit(&self, chunk: &[String], sink: &mut dyn RejectSink) -> AppResult<usize> {
        if chunk.is_empty() {
            return Ok(0);
        }

        match self.catalog.add_tracks(self.playlist_id, chunk).await {
            Ok(()) => {
                pace(self.pacing).await;
                Ok(chunk.len())
            }
            Err(e) if e.is_rejection() => {
                if let [uri] = chunk {
                    log(
                        LogLevel::Warning,
                        &format!("Add rejected for {}: {}", uri, e.detail()),
                    );
                    sink.reject(BadUriRecord::add_failed(uri, &e.detail()));
                    return Ok(0);
                }
                let (left, right) = chunk.split_at(chunk.len() / 2);
                let committed_left = self.submit(left, sink).await?;
                let committed_right = self.submit(right, sink).await?;
                Ok(committed_left + committed_right)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::testing::FakeCatalog;

    fn uris(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("spotify:track:{:0>22}", i)).collect()
    }

    async fn run(catalog: &FakeCatalog, uris: &[String], batch: usize) -> (usize, Vec<BadUriRecord>) {
        let mut bad = Vec::new();
        let added = BatchWriter::new(catalog, "target", Duration::ZERO)
            .write(uris, batch, &mut bad)
            .await
            .unwrap();
        (added, bad)
    }

    #[tokio::test]
    async fn single_rejected_uri_is_isolated() {
        for n in [1usize, 2, 3, 17, 100] {
            for bad_at in [0, n / 2, n - 1] {
                let all = uris(n);
                let catalog = FakeCatalog::default().rejecting([all[bad_at].clone()]);
                let (added, bad) = run(&catalog, &all, 100).await;

                assert_eq!(added, n - 1, "n={} bad_at={}", n, bad_at);
                assert_eq!(bad.len(), 1);
                assert_eq!(bad[0].uri, all[bad_at]);
                assert!(bad[0].note.starts_with("add_failed:"));

                let mut expected = all.clone();
                expected.remove(bad_at);
                assert_eq!(catalog.added_to("target"), expected);
            }
        }
    }

    #[tokio::test]
    async fn rejected_uri_in_middle_batch() {
        let all: Vec<String> = ["a", "b", "c", "d", "e"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let catalog = FakeCatalog::default().rejecting(["c".to_string()]);
        let (added, bad) = run(&catalog, &all, 2).await;

        assert_eq!(added, 4);
        assert_eq!(bad, vec![BadUriRecord::add_failed("c", "400 Invalid track uri: c")]);
        assert_eq!(catalog.added_to("target"), ["a", "b", "d", "e"]);
        // [a,b] ok, [c,d] rejected, [c] rejected, [d] ok, [e] ok
        assert_eq!(catalog.add_call_count(), 5);
    }

    #[tokio::test]
    async fn clean_write_uses_one_call_per_batch() {
        let all = uris(250);
        let catalog = FakeCatalog::default();
        let (added, bad) = run(&catalog, &all, 100).await;
        assert_eq!(added, 250);
        assert!(bad.is_empty());
        assert_eq!(catalog.add_call_count(), 3);
    }

    #[tokio::test]
    async fn every_uri_rejected_commits_nothing() {
        let all = uris(4);
        let catalog = FakeCatalog::default().rejecting(all.clone());
        let (added, bad) = run(&catalog, &all, 4).await;
        assert_eq!(added, 0);
        let rejected: Vec<&str> = bad.iter().map(|r| r.uri.as_str()).collect();
        assert_eq!(rejected, all.iter().map(String::as_str).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn non_rejection_failure_aborts() {
        let all = uris(3);
        let catalog = FakeCatalog::default()
            .failing_adds_with(AppError::api_error(401, "The access token expired", "add_tracks"));
        let mut bad: Vec<BadUriRecord> = Vec::new();
        let result = BatchWriter::new(&catalog, "target", Duration::ZERO)
            .write(&all, 2, &mut bad)
            .await;
        assert!(matches!(result, Err(AppError::ApiError { status: 401, .. })));
        assert!(bad.is_empty());
    }

    #[tokio::test]
    async fn target_playlist_failures_are_not_bisected() {
        for status in [403u16, 404] {
            let all = uris(8);
            let catalog = FakeCatalog::default()
                .failing_adds_with(AppError::api_error(status, "refused", "add_tracks"));
            let mut bad: Vec<BadUriRecord> = Vec::new();
            let result = BatchWriter::new(&catalog, "target", Duration::ZERO)
                .write(&all, 8, &mut bad)
                .await;
            assert!(matches!(result, Err(AppError::ApiError { status: s, .. }) if s == status));
            assert!(bad.is_empty());
            assert_eq!(catalog.add_call_count(), 1);
        }
    }
}

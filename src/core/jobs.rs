use crate::core::writer::RejectSink;
use crate::logging::{log, LogLevel};
use crate::model::output::{BadUriRecord, JobView, UnavailableRow};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use uuid::Uuid;

pub type JobId = String;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Running,
    Done,
    Error(String),
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Running)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Running => f.write_str("running"),
            JobStatus::Done => f.write_str("done"),
            JobStatus::Error(message) => write!(f, "error: {}", message),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Estimate {
    Known(u64),
    Unknown,
}

impl Estimate {
    pub fn combine(parts: &[Estimate]) -> (u64, bool) {
        parts.iter().fold((0, true), |(total, complete), part| match part {
            Estimate::Known(n) => (total + n, complete),
            Estimate::Unknown => (total, false),
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    pub processed: u64,
    pub total: u64,
    pub total_complete: bool,
}

#[derive(Debug, Clone, Default)]
pub struct JobResult {
    pub summary: String,
    pub playlist_url: Option<String>,
}

#[derive(Debug)]
struct JobRecord {
    status: JobStatus,
    progress: Progress,
    result: Option<String>,
    playlist_url: Option<String>,
    unavailable_rows: Vec<UnavailableRow>,
    bad_uris: Vec<BadUriRecord>,
    finished_at: Option<Instant>,
}

impl JobRecord {
    fn new() -> Self {
        JobRecord {
            status: JobStatus::Running,
            progress: Progress::default(),
            result: None,
            playlist_url: None,
            unavailable_rows: Vec::new(),
            bad_uris: Vec::new(),
            finished_at: None,
        }
    }

    fn view(&self, id: &str) -> JobView {
        JobView {
            id: id.to_string(),
            status: self.status.to_string(),
            running: !self.status.is_terminal(),
            processed: self.progress.processed,
            total: self.progress.total,
            total_complete: self.progress.total_complete,
            result: self.result.clone(),
            playlist_url: self.playlist_url.clone(),
            unavailable_count: self.unavailable_rows.len(),
            bad_uri_count: self.bad_uris.len(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct JobRegistry {
    jobs: Arc<Mutex<HashMap<JobId, JobRecord>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<JobId, JobRecord>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_job<R>(&self, id: &str, f: impl FnOnce(&mut JobRecord) -> R) -> Option<R> {
        self.lock().get_mut(id).map(f)
    }

    pub fn register(&self) -> JobId {
        let mut jobs = self.lock();
        loop {
            let id = Uuid::new_v4().simple().to_string();
            if !jobs.contains_key(&id) {
                jobs.insert(id.clone(), JobRecord::new());
                return id;
            }
        }
    }

    pub fn set_total(&self, id: &str, parts: &[Estimate]) {
        let (total, complete) = Estimate::combine(parts);
        self.with_job(id, |job| {
            job.progress.total = total;
            job.progress.total_complete = complete;
        });
    }

    pub fn bump(&self, id: &str, delta: u64) {
        self.with_job(id, |job| {
            job.progress.processed = job.progress.processed.saturating_add(delta);
        });
    }

    pub fn push_row(&self, id: &str, row: UnavailableRow) {
        self.with_job(id, |job| job.unavailable_rows.push(row));
    }

    pub fn push_bad_uri(&self, id: &str, record: BadUriRecord) {
        self.with_job(id, |job| job.bad_uris.push(record));
    }

    /// Moves a running job to its terminal status. Returns false, leaving
    /// the job untouched, if it is unknown or already finished.
    pub fn finish(&self, id: &str, outcome: Result<JobResult, String>) -> bool {
        self.with_job(id, |job| {
            if job.status.is_terminal() {
                log(
                    LogLevel::Warning,
                    &format!("Job {} already finished as '{}', ignoring new outcome.", id, job.status),
                );
                return false;
            }
            match outcome {
                Ok(result) => {
                    job.status = JobStatus::Done;
                    job.result = Some(result.summary);
                    job.playlist_url = result.playlist_url;
                }
                Err(message) => job.status = JobStatus::Error(message),
            }
            job.finished_at = Some(Instant::now());
            true
        })
        .unwrap_or(false)
    }

    pub fn status(&self, id: &str) -> Option<JobStatus> {
        self.with_job(id, |job| job.status.clone())
    }

    pub fn snapshot(&self, id: &str) -> Option<JobView> {
        self.with_job(id, |job| job.view(id))
    }

    pub fn unavailable_rows(&self, id: &str) -> Option<Vec<UnavailableRow>> {
        self.with_job(id, |job| job.unavailable_rows.clone())
    }

    pub fn bad_uris(&self, id: &str) -> Option<Vec<BadUriRecord>> {
        self.with_job(id, |job| job.bad_uris.clone())
    }

    pub fn evict_finished(&self, max_age: Duration) -> usize {
        let now = Instant::now();
        let mut jobs = self.lock();
        let before = jobs.len();
        jobs.retain(|_, job| {
            job.finished_at
                .map_or(true, |at| now.duration_since(at) < max_age)
        });
        before - jobs.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn handle(&self, id: &str) -> JobHandle {
        JobHandle {
            registry: self.clone(),
            id: id.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct JobHandle {
    registry: JobRegistry,
    id: JobId,
}

impl JobHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn set_total(&self, parts: &[Estimate]) {
        self.registry.set_total(&self.id, parts);
    }

    pub fn bump(&self) {
        self.registry.bump(&self.id, 1);
    }

    pub fn push_row(&self, row: UnavailableRow) {
        self.registry.push_row(&self.id, row);
    }

    pub fn push_bad_uri(&self, record: BadUriRecord) {
        self.registry.push_bad_uri(&self.id, record);
    }

    pub fn finish(&self, outcome: Result<JobResult, String>) -> bool {
        self.registry.finish(&self.id, outcome)
    }
}

impl RejectSink for JobHandle {
    fn reject(&mut self, record: BadUriRecord) {
        self.push_bad_uri(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::output::RowSource;

    fn row() -> UnavailableRow {
        UnavailableRow {
            source: RowSource::LikedSongs,
            added_at: None,
            track_name: None,
            artists: Vec::new(),
            album: None,
            uri: None,
            reasons: Vec::new(),
        }
    }

    #[test]
    fn registered_job_starts_running_with_zero_progress() {
        let registry = JobRegistry::new();
        let id = registry.register();
        let view = registry.snapshot(&id).unwrap();
        assert_eq!(view.status, "running");
        assert!(view.running);
        assert_eq!((view.processed, view.total), (0, 0));
        assert!(view.result.is_none());
    }

    #[test]
    fn ids_are_unique() {
        let registry = JobRegistry::new();
        let ids: std::collections::HashSet<JobId> = (0..200).map(|_| registry.register()).collect();
        assert_eq!(ids.len(), 200);
        assert_eq!(registry.len(), 200);
    }

    #[test]
    fn unknown_job_has_no_snapshot() {
        let registry = JobRegistry::new();
        assert!(registry.snapshot("nope").is_none());
        assert!(registry.unavailable_rows("nope").is_none());
        assert!(!registry.finish("nope", Ok(JobResult::default())));
    }

    #[test]
    fn bump_accumulates() {
        let registry = JobRegistry::new();
        let id = registry.register();
        registry.bump(&id, 1);
        registry.bump(&id, 4);
        assert_eq!(registry.snapshot(&id).unwrap().processed, 5);
    }

    #[test]
    fn unknown_estimate_marks_total_incomplete() {
        let registry = JobRegistry::new();
        let id = registry.register();
        registry.set_total(&id, &[Estimate::Known(40), Estimate::Unknown, Estimate::Known(2)]);
        let view = registry.snapshot(&id).unwrap();
        assert_eq!(view.total, 42);
        assert!(!view.total_complete);

        registry.set_total(&id, &[Estimate::Known(40), Estimate::Known(0)]);
        let view = registry.snapshot(&id).unwrap();
        assert_eq!(view.total, 40);
        assert!(view.total_complete);
    }

    #[test]
    fn terminal_status_is_set_once() {
        let registry = JobRegistry::new();
        let id = registry.register();
        assert!(registry.finish(&id, Err("boom".into())));
        assert!(!registry.finish(
            &id,
            Ok(JobResult {
                summary: "late".into(),
                playlist_url: None
            })
        ));
        assert_eq!(registry.status(&id), Some(JobStatus::Error("boom".into())));
        assert_eq!(registry.snapshot(&id).unwrap().status, "error: boom");
    }

    #[test]
    fn records_survive_failure() {
        let registry = JobRegistry::new();
        let handle = registry.handle(&registry.register());
        handle.push_row(row());
        handle.push_bad_uri(BadUriRecord::invalid_format("spotify:local:x"));
        handle.finish(Err("auth failed".into()));
        assert_eq!(registry.unavailable_rows(handle.id()).unwrap().len(), 1);
        assert_eq!(registry.bad_uris(handle.id()).unwrap().len(), 1);
    }

    #[test]
    fn eviction_only_touches_finished_jobs() {
        let registry = JobRegistry::new();
        let running = registry.register();
        let finished = registry.register();
        registry.finish(&finished, Ok(JobResult::default()));

        assert_eq!(registry.evict_finished(Duration::from_secs(3600)), 0);
        assert_eq!(registry.evict_finished(Duration::ZERO), 1);
        assert!(registry.snapshot(&finished).is_none());
        assert!(registry.snapshot(&running).is_some());
    }

    #[test]
    fn concurrent_bumps_are_not_lost() {
        let registry = JobRegistry::new();
        let id = registry.register();
        let threads: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                let id = id.clone();
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        registry.bump(&id, 1);
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }
        assert_eq!(registry.snapshot(&id).unwrap().processed, 8000);
    }
}

use crate::config::{self, Settings};
use crate::core::catalog::Catalog;
use crate::core::classify::classify;
use crate::core::dedup::{Admission, CandidateSet};
use crate::core::jobs::{Estimate, JobHandle, JobId, JobRegistry, JobResult};
use crate::core::paginate::paginate;
use crate::core::stats::ScanStats;
use crate::core::writer::BatchWriter;
use crate::error::{AppError, AppResult};
use crate::logging::{log, LogLevel};
use crate::model::common::{Playlist, PlaylistEntry};
use crate::model::locator;
use crate::model::output::{BadUriRecord, JobView, RowSource, Table, UnavailableRow};
use crate::utils::pace;
use futures::stream::{StreamExt, TryStreamExt};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobParams {
    pub only_playlist: Option<String>,
    /// Scan at most this many of the user's playlists. Zero means no cap.
    pub max_playlists: Option<usize>,
    pub include_saved: bool,
    pub dry_run: bool,
    pub batch_size: usize,
}

impl Default for JobParams {
    fn default() -> Self {
        JobParams {
            only_playlist: None,
            max_playlists: None,
            include_saved: true,
            dry_run: false,
            batch_size: config::MAX_WRITE_BATCH,
        }
    }
}

#[derive(Clone)]
pub struct JobService {
    registry: JobRegistry,
    catalog: Arc<dyn Catalog>,
    settings: Settings,
}

impl JobService {
    pub fn new(catalog: Arc<dyn Catalog>, settings: Settings) -> Self {
        Self::with_registry(catalog, settings, JobRegistry::new())
    }

    pub fn with_registry(catalog: Arc<dyn Catalog>, settings: Settings, registry: JobRegistry) -> Self {
        JobService {
            registry,
            catalog,
            settings,
        }
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    pub fn start(&self, params: JobParams) -> JobId {
        let evicted = self.registry.evict_finished(self.settings.job_retention);
        if evicted > 0 {
            log(
                LogLevel::Info,
                &format!("Evicted {} finished job(s) past retention.", evicted),
            );
        }

        let job_id = self.registry.register();
        let job = self.registry.handle(&job_id);
        let catalog = self.catalog.clone();
        let pacing = self.settings.pacing;

        log(
            LogLevel::Step,
            &format!("Starting sweep job {} ({:?})", job_id, params),
        );

        tokio::spawn(async move {
            let worker_job = job.clone();
            let worker =
                tokio::spawn(async move { run_job(catalog.as_ref(), &worker_job, params, pacing).await });

            let outcome = match worker.await {
                Ok(result) => result,
                Err(e) => Err(AppError::from(e)),
            };
            match outcome {
                Ok(result) => {
                    log(
                        LogLevel::Success,
                        &format!("Job {} finished.", job.id()),
                    );
                    job.finish(Ok(result));
                }
                Err(e) => {
                    log(
                        LogLevel::Error,
                        &format!("Job {} failed: {}", job.id(), e),
                    );
                    job.finish(Err(e.to_string()));
                }
            }
        });

        job_id
    }

    pub fn status(&self, job_id: &str) -> Option<JobView> {
        self.registry.snapshot(job_id)
    }

    pub fn export_unavailable_rows(&self, job_id: &str) -> Option<Table> {
        self.registry
            .unavailable_rows(job_id)
            .map(|rows| Table::from_records(&rows))
    }

    pub fn export_bad_uri_rows(&self, job_id: &str) -> Option<Table> {
        self.registry
            .bad_uris(job_id)
            .map(|records| Table::from_records(&records))
    }

    pub async fn wait_for(
        &self,
        job_id: &str,
        poll: Duration,
        mut on_tick: impl FnMut(&JobView),
    ) -> AppResult<JobView> {
        loop {
            let view = self
                .status(job_id)
                .ok_or_else(|| AppError::UnknownJob(job_id.to_string()))?;
            if !view.running {
                return Ok(view);
            }
            on_tick(&view);
            sleep(poll).await;
        }
    }
}

async fn run_job(
    catalog: &dyn Catalog,
    job: &JobHandle,
    params: JobParams,
    pacing: Duration,
) -> AppResult<JobResult> {
    let started = Instant::now();

    log(LogLevel::Step, "--- Phase 1: Resolve Playlists ---");
    let user = catalog.current_user().await?;
    let playlists = resolve_playlists(catalog, &params, pacing).await?;
    log(
        LogLevel::Info,
        &format!(
            "User '{}' (market {}): {} playlist(s) to scan.",
            user.id,
            user.country.as_deref().unwrap_or("unknown"),
            playlists.len()
        ),
    );

    log(LogLevel::Step, "--- Phase 2: Estimate Work ---");
    let estimates = estimate_work(catalog, &playlists, params.include_saved, pacing).await;
    job.set_total(&estimates);
    let (total, complete) = Estimate::combine(&estimates);
    log(
        LogLevel::Info,
        &format!(
            "Estimated {} item(s){}.",
            total,
            if complete { "" } else { " (some counts unavailable)" }
        ),
    );

    log(LogLevel::Step, "--- Phase 3: Scan Playlists ---");
    let mut sweep = Sweep::new(catalog, job, user.country.clone(), pacing);
    for (i, playlist) in playlists.iter().enumerate() {
        sweep.scan_playlist(playlist).await?;
        log(
            LogLevel::Info,
            &format!(
                "Playlist {}/{} '{}' scanned. Unavailable so far: {}",
                i + 1,
                playlists.len(),
                playlist.display_name(),
                sweep.stats.unavailable_rows
            ),
        );
        pace(pacing).await;
    }

    if params.include_saved {
        log(LogLevel::Step, "--- Phase 4: Scan Liked Songs ---");
        sweep.scan_saved().await?;
    }

    let Sweep {
        candidates,
        mut stats,
        ..
    } = sweep;
    stats.candidates = candidates.len();
    stats.rejected_format = candidates.malformed_count();
    log(
        LogLevel::Success,
        &format!(
            "Scan complete in {:.3?}: {} item(s), {} unavailable, {} unique candidate URI(s).",
            started.elapsed(),
            stats.items_scanned,
            stats.unavailable_rows,
            stats.candidates
        ),
    );

    if params.dry_run {
        return Ok(JobResult {
            summary: stats.dry_run_summary(),
            playlist_url: None,
        });
    }

    log(LogLevel::Step, "--- Phase 5: Write Remediation Playlist ---");
    let name = remediation_playlist_name();
    let created = catalog
        .create_playlist(&user.id, &name, false, config::REMEDIATION_DESCRIPTION)
        .await?;
    let playlist_url = format!("{}{}", config::PLAYLIST_URL_BASE, created.id);

    let uris = candidates.into_ordered();
    let mut sink = job.clone();
    let added = BatchWriter::new(catalog, &created.id, pacing)
        .write(&uris, config::clamp_batch_size(params.batch_size), &mut sink)
        .await?;
    stats.added = added;
    stats.rejected_write = uris.len() - added;
    log(
        LogLevel::Success,
        &format!(
            "Added {} of {} URI(s) to '{}'.",
            added,
            uris.len(),
            name
        ),
    );

    Ok(JobResult {
        summary: stats.live_summary(&name, &playlist_url),
        playlist_url: Some(playlist_url),
    })
}

async fn resolve_playlists(
    catalog: &dyn Catalog,
    params: &JobParams,
    pacing: Duration,
) -> AppResult<Vec<Playlist>> {
    if let Some(raw) = params.only_playlist.as_deref().filter(|s| !s.trim().is_empty()) {
        let playlist_id = locator::normalize_id(raw);
        return Ok(vec![catalog.playlist(&playlist_id).await?]);
    }

    let listing = paginate(config::PLAYLIST_PAGE_SIZE, pacing, move |limit, offset| {
        catalog.list_playlists(limit, offset)
    });
    match params.max_playlists.filter(|&cap| cap > 0) {
        Some(cap) => listing.take(cap).try_collect().await,
        None => listing.try_collect().await,
    }
}

async fn estimate_work(
    catalog: &dyn Catalog,
    playlists: &[Playlist],
    include_saved: bool,
    pacing: Duration,
) -> Vec<Estimate> {
    let mut estimates = Vec::with_capacity(playlists.len() + 1);

    for playlist in playlists {
        let estimate = match catalog.playlist_item_count(&playlist.id).await {
            Ok(count) => Estimate::Known(count),
            Err(e) => {
                log(
                    LogLevel::Warning,
                    &format!(
                        "Count lookup failed for '{}', leaving it out of the total: {}",
                        playlist.display_name(),
                        e
                    ),
                );
                Estimate::Unknown
            }
        };
        estimates.push(estimate);
        pace(pacing).await;
    }

    if include_saved {
        let estimate = match catalog.saved_track_count().await {
            Ok(count) => Estimate::Known(count),
            Err(e) => {
                log(
                    LogLevel::Warning,
                    &format!("Liked Songs count lookup failed: {}", e),
                );
                Estimate::Unknown
            }
        };
        estimates.push(estimate);
    }

    estimates
}

struct Sweep<'a> {
    catalog: &'a dyn Catalog,
    job: &'a JobHandle,
    region: Option<String>,
    pacing: Duration,
    candidates: CandidateSet,
    stats: ScanStats,
}

impl<'a> Sweep<'a> {
    fn new(catalog: &'a dyn Catalog, job: &'a JobHandle, region: Option<String>, pacing: Duration) -> Self {
        Sweep {
            catalog,
            job,
            region,
            pacing,
            candidates: CandidateSet::new(),
            stats: ScanStats::default(),
        }
    }

    async fn scan_playlist(&mut self, playlist: &Playlist) -> AppResult<()> {
        let catalog = self.catalog;
        let playlist_id = playlist.id.as_str();
        let source = RowSource::Playlist {
            id: playlist.id.clone(),
            name: playlist.display_name().to_string(),
        };

        let mut entries = paginate(
            config::PLAYLIST_ITEM_PAGE_SIZE,
            self.pacing,
            move |limit, offset| catalog.list_playlist_items(playlist_id, limit, offset),
        );
        while let Some(entry) = entries.try_next().await? {
            self.record(&source, entry);
        }
        self.stats.playlists_scanned += 1;
        Ok(())
    }

    async fn scan_saved(&mut self) -> AppResult<()> {
        let catalog = self.catalog;
        let before = self.stats.items_scanned;

        let mut entries = paginate(
            config::SAVED_TRACK_PAGE_SIZE,
            self.pacing,
            move |limit, offset| catalog.list_saved_tracks(limit, offset),
        );
        while let Some(entry) = entries.try_next().await? {
            self.record(&RowSource::LikedSongs, entry);
        }
        log(
            LogLevel::Info,
            &format!(
                "Liked Songs scanned: {} item(s).",
                self.stats.items_scanned - before
            ),
        );
        Ok(())
    }

    fn record(&mut self, source: &RowSource, entry: PlaylistEntry) {
        let verdict = classify(entry.track.as_ref(), self.region.as_deref());
        self.stats.items_scanned += 1;

        if verdict.unavailable() {
            let track = entry.track.unwrap_or_default();
            let uri = track.uri.filter(|u| !u.is_empty());
            match uri.as_deref() {
                Some(u) => {
                    if self.candidates.admit(u) == Admission::Malformed {
                        self.job.push_bad_uri(BadUriRecord::invalid_format(u));
                    }
                }
                None => self.stats.ghost_rows += 1,
            }
            self.job.push_row(UnavailableRow {
                source: source.clone(),
                added_at: entry.added_at,
                track_name: track.name,
                artists: track.artists,
                album: track.album,
                uri,
                reasons: verdict.reasons,
            });
            self.stats.unavailable_rows += 1;
        }

        self.job.bump();
    }
}

fn remediation_playlist_name() -> String {
    format!(
        "{} - {}",
        config::REMEDIATION_NAME_PREFIX,
        chrono::Local::now().format("%Y-%m-%d")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::common::{CurrentUser, Track};
    use crate::testing::{self, FakeCatalog, FakePlaylist};

    fn new_service(catalog: FakeCatalog) -> (JobService, Arc<FakeCatalog>) {
        let catalog = Arc::new(catalog);
        let settings = Settings {
            pacing: Duration::ZERO,
            ..Settings::default()
        };
        (JobService::new(catalog.clone(), settings), catalog)
    }

    async fn finished(service: &JobService, job_id: &str) -> JobView {
        service
            .wait_for(job_id, Duration::from_millis(5), |_| {})
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn start_returns_before_the_job_completes() {
        let (service, _) = new_service(FakeCatalog::default());
        let job_id = service.start(JobParams::default());
        assert!(service.status(&job_id).is_some());
        let view = finished(&service, &job_id).await;
        assert_eq!(view.status, "done");
    }

    #[tokio::test]
    async fn progress_reaches_the_number_of_enumerated_items() {
        let catalog = FakeCatalog::default()
            .with_playlist(FakePlaylist::new("p1", "One").with_entries(
                (0..130).map(|i| testing::playable_entry(i)).collect(),
            ))
            .with_saved((200..207).map(testing::playable_entry).collect());
        let (service, _) = new_service(catalog);
        let job_id = service.start(JobParams {
            dry_run: true,
            ..JobParams::default()
        });
        let view = finished(&service, &job_id).await;
        assert_eq!(view.processed, 137);
        assert_eq!(view.total, 137);
        assert!(view.total_complete);
        assert_eq!(view.unavailable_count, 0);
    }

    #[tokio::test]
    async fn failing_count_lookup_does_not_fail_the_job() {
        let catalog = FakeCatalog::default()
            .with_playlist(
                FakePlaylist::new("p1", "One")
                    .with_entries(vec![testing::playable_entry(1)])
                    .failing_count(),
            )
            .with_playlist(
                FakePlaylist::new("p2", "Two").with_entries(vec![testing::playable_entry(2)]),
            );
        let (service, _) = new_service(catalog);
        let job_id = service.start(JobParams {
            dry_run: true,
            include_saved: false,
            ..JobParams::default()
        });
        let view = finished(&service, &job_id).await;
        assert_eq!(view.status, "done");
        assert_eq!(view.total, 1);
        assert!(!view.total_complete);
        assert_eq!(view.processed, 2);
    }

    #[tokio::test]
    async fn max_playlists_caps_the_scan() {
        let mut catalog = FakeCatalog::default();
        for i in 0..5 {
            catalog = catalog.with_playlist(
                FakePlaylist::new(&format!("p{}", i), "P").with_entries(vec![testing::ghost_entry()]),
            );
        }
        let (service, _) = new_service(catalog);
        let job_id = service.start(JobParams {
            max_playlists: Some(3),
            include_saved: false,
            dry_run: true,
            ..JobParams::default()
        });
        let view = finished(&service, &job_id).await;
        assert_eq!(view.processed, 3);
        assert_eq!(view.unavailable_count, 3);
    }

    #[tokio::test]
    async fn only_playlist_accepts_a_web_url() {
        let id = "37i9dQZF1DXcBWIGoYBM5M";
        let catalog = FakeCatalog::default()
            .with_playlist(FakePlaylist::new(id, "Target").with_entries(vec![testing::ghost_entry()]))
            .with_playlist(FakePlaylist::new("other", "Other").with_entries(vec![testing::ghost_entry()]));
        let (service, _) = new_service(catalog);
        let job_id = service.start(JobParams {
            only_playlist: Some(format!("https://open.spotify.com/playlist/{}?si=x", id)),
            include_saved: false,
            dry_run: true,
            ..JobParams::default()
        });
        let view = finished(&service, &job_id).await;
        assert_eq!(view.processed, 1);
        let rows = service.registry().unavailable_rows(&job_id).unwrap();
        assert_eq!(rows[0].source.label(), "Target");
    }

    #[tokio::test]
    async fn unknown_single_playlist_fails_the_job() {
        let (service, _) = new_service(FakeCatalog::default());
        let job_id = service.start(JobParams {
            only_playlist: Some("does-not-exist".into()),
            ..JobParams::default()
        });
        let view = finished(&service, &job_id).await;
        assert!(view.status.starts_with("error: "), "{}", view.status);
        assert!(view.result.is_none());
    }

    #[tokio::test]
    async fn liked_songs_rows_use_the_sentinel_source() {
        let restricted = PlaylistEntry {
            added_at: Some("2021-01-01T00:00:00Z".into()),
            track: Some(Track {
                restriction: Some("market".into()),
                ..testing::playable_track(9)
            }),
        };
        let catalog = FakeCatalog::default().with_saved(vec![restricted]);
        let (service, _) = new_service(catalog);
        let job_id = service.start(JobParams {
            dry_run: true,
            ..JobParams::default()
        });
        finished(&service, &job_id).await;
        let table = service.export_unavailable_rows(&job_id).unwrap();
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0][0], "Liked Songs");
        assert_eq!(table.rows[0][6], "restriction:market");
    }

    #[tokio::test]
    async fn exports_for_unknown_job_are_absent() {
        let (service, _) = new_service(FakeCatalog::default());
        assert!(service.export_unavailable_rows("missing").is_none());
        assert!(service.export_bad_uri_rows("missing").is_none());
        assert!(matches!(
            service.wait_for("missing", Duration::from_millis(1), |_| {}).await,
            Err(AppError::UnknownJob(_))
        ));
    }

    #[tokio::test]
    async fn saved_library_is_skipped_when_not_included() {
        let catalog = FakeCatalog::default()
            .with_playlist(
                FakePlaylist::new("p1", "One").with_entries((0..4).map(testing::playable_entry).collect()),
            )
            .with_saved((100..110).map(testing::unplayable_entry).collect());
        let (service, _) = new_service(catalog);
        let job_id = service.start(JobParams {
            include_saved: false,
            dry_run: true,
            ..JobParams::default()
        });
        let view = finished(&service, &job_id).await;
        assert_eq!(view.status, "done");
        assert_eq!(view.processed, 4);
        assert_eq!(view.total, 4);
        assert!(view.total_complete);
        assert_eq!(view.unavailable_count, 0);
    }

    #[tokio::test]
    async fn failing_saved_count_leaves_total_incomplete() {
        let catalog = FakeCatalog::default()
            .with_playlist(
                FakePlaylist::new("p1", "One").with_entries((0..3).map(testing::playable_entry).collect()),
            )
            .with_saved((100..105).map(testing::playable_entry).collect())
            .failing_saved_count();
        let (service, _) = new_service(catalog);
        let job_id = service.start(JobParams {
            dry_run: true,
            ..JobParams::default()
        });
        let view = finished(&service, &job_id).await;
        assert_eq!(view.status, "done");
        assert_eq!(view.total, 3);
        assert!(!view.total_complete);
        assert_eq!(view.processed, 8);
    }

    #[tokio::test]
    async fn missing_target_playlist_on_add_fails_the_job() {
        let catalog = FakeCatalog::default()
            .with_playlist(
                FakePlaylist::new("p1", "One").with_entries((0..8).map(testing::unplayable_entry).collect()),
            )
            .failing_adds_with(AppError::api_error(404, "Resource not found", "add_tracks"));
        let (service, catalog) = new_service(catalog);
        let job_id = service.start(JobParams {
            include_saved: false,
            batch_size: 8,
            ..JobParams::default()
        });
        let view = finished(&service, &job_id).await;
        assert!(view.status.starts_with("error: "), "{}", view.status);
        assert_eq!(view.bad_uri_count, 0);
        assert_eq!(catalog.add_call_count(), 1);
        assert_eq!(view.unavailable_count, 8);
    }

    #[tokio::test]
    async fn track_outside_the_user_market_is_flagged() {
        let fr_only = PlaylistEntry {
            added_at: None,
            track: Some(Track {
                available_markets: Some(vec!["FR".into()]),
                ..testing::playable_track(5)
            }),
        };
        let catalog = FakeCatalog::default()
            .with_user(CurrentUser {
                id: "someone".into(),
                country: Some("JP".into()),
            })
            .with_playlist(FakePlaylist::new("p1", "One").with_entries(vec![fr_only]));
        let (service, catalog) = new_service(catalog);
        let job_id = service.start(JobParams {
            include_saved: false,
            ..JobParams::default()
        });
        let view = finished(&service, &job_id).await;
        assert_eq!(view.status, "done");
        let table = service.export_unavailable_rows(&job_id).unwrap();
        assert_eq!(table.rows[0][6], "not_in_region");
        let created = catalog.created_playlists();
        assert_eq!(created[0].owner_id.as_deref(), Some("someone"));
        assert_eq!(catalog.added_to(&created[0].id).len(), 1);
    }

    #[test]
    fn remediation_name_carries_the_date() {
        let name = remediation_playlist_name();
        assert!(name.starts_with("Unavailable tracks - "));
        assert_eq!(name.len(), "Unavailable tracks - ".len() + 10);
    }
}

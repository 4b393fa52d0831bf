use anyhow::{anyhow, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::app_config::Config;
use crate::database::{DatabaseConnection, DraftRecord, Repository, SegmentRecord};
use crate::draft::{Draft, DraftMerger, DraftStore, Segment, SegmentCollection};
use crate::errors::{AppError, JobError};
use crate::file_utils::FileManager;
use crate::language_utils;
use crate::providers::remote::RemoteJobService;
use crate::providers::{JobProvider, JobRequest};
use crate::translation::batch::{select_for_translation, translate_batch_via_jobs};
use crate::translation::{
    BatchChunker, BatchReport, BatchSummary, JobOrchestrator, JobOutcome, JobStatus, RegenerateMode,
    RemoteResult, UsagePolicy, align, run_batches,
};
use crate::usfm::{self, DocumentElement, ParsedDocument};

// @module: Application controller wiring parsing, jobs and drafts together

/// How a translation run ended, with the one message shown to the user
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// Book or project the run worked on
    pub scope: String,
    /// Terminal status of the run
    pub status: JobStatus,
    /// User-facing notification
    pub message: String,
    /// Translated file, when one was written
    pub output_path: Option<PathBuf>,
    /// Batches that failed, for batched runs
    pub failed_batch_ids: Vec<usize>,
}

impl RunSummary {
    fn new(scope: &str, status: JobStatus, message: impl Into<String>) -> Self {
        Self {
            scope: scope.to_string(),
            status,
            message: message.into(),
            output_path: None,
            failed_batch_ids: Vec::new(),
        }
    }

    /// Emit the notification at the level its status calls for
    pub fn log(&self) {
        match self.status {
            JobStatus::TimedOut => warn!("{}: {}", self.scope, self.message),
            _ if !self.failed_batch_ids.is_empty() => warn!("{}: {}", self.scope, self.message),
            _ => info!("{}: {}", self.scope, self.message),
        }
    }
}

/// Result of translating every document of a folder
#[derive(Debug, Default)]
pub struct FolderReport {
    /// Runs that ended without an error
    pub completed: Vec<RunSummary>,
    /// Files whose run raised an error, with the error message
    pub failed: Vec<(PathBuf, String)>,
    /// Files left untouched because the run was cancelled
    pub skipped: usize,
}

/// Stored state of a draft
#[derive(Debug, Clone)]
pub struct DraftOverview {
    pub draft: Draft,
    pub total_segments: usize,
    pub translated_segments: usize,
    /// Segments changed since the last save
    pub dirty_segments: Vec<String>,
}

impl DraftOverview {
    /// Draft or any segment has unsaved changes
    pub fn is_dirty(&self) -> bool {
        self.draft.is_dirty() || !self.dirty_segments.is_empty()
    }
}

/// Main application controller for document translation
pub struct Controller {
    // @field: App configuration
    config: Config,
    // @field: Remote job service
    provider: Arc<dyn JobProvider>,
    // @field: Shared daily quota
    usage: Arc<UsagePolicy>,
    // @field: Draft storage
    repository: Repository,
    // @field: Draw progress bars
    show_progress: bool,
}

impl Controller {
    // @method: Create a controller talking to the configured service and database
    pub fn with_config(config: Config) -> Result<Self> {
        let provider = RemoteJobService::new(&config.service.endpoint, config.request_timeout())
            .context("Failed to create translation service client")?;

        let repository = match config.database_file() {
            Some(path) => Repository::new(DatabaseConnection::new(path)?),
            None => Repository::new_default()?,
        };

        Ok(Self::with_components(config, Arc::new(provider), repository))
    }

    /// Create a controller from ready-made collaborators
    pub fn with_components(config: Config, provider: Arc<dyn JobProvider>, repository: Repository) -> Self {
        let usage = Arc::new(UsagePolicy::new(config.usage.daily_limit));
        Self {
            config,
            provider,
            usage,
            repository,
            show_progress: true,
        }
    }

    /// Replace the usage policy
    pub fn with_usage_policy(mut self, usage: Arc<UsagePolicy>) -> Self {
        self.usage = usage;
        self
    }

    /// Disable progress bars
    pub fn without_progress(mut self) -> Self {
        self.show_progress = false;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    pub fn usage(&self) -> &UsagePolicy {
        &self.usage
    }

    /// Continue from the quota counter stored by an earlier run
    pub async fn restore_usage(&self) -> Result<()> {
        if let Some(counter) = self.repository.load_usage().await? {
            debug!("Restored usage counter {}/{} for {}", counter.count, self.usage.daily_limit(), counter.date);
            self.usage.restore(counter);
        }
        Ok(())
    }

    async fn persist_usage(&self) {
        let counter = self.usage.snapshot();
        if counter.date.is_empty() {
            return;
        }
        if let Err(e) = self.repository.save_usage(&counter).await {
            warn!("Could not store usage counter: {}", e);
        }
    }

    // =========================================================================
    // Exposed surface
    // =========================================================================

    /// Split a document into structural and translatable elements
    pub fn parse_document(&self, text: &str) -> ParsedDocument {
        usfm::parse_document(text)
    }

    /// Rebuild a document from its elements and translated spans
    pub fn reconstruct(&self, elements: &[DocumentElement], translated_spans: &[String]) -> String {
        usfm::reconstruct(elements, translated_spans)
    }

    /// Run one job to a terminal state
    pub async fn submit_and_await(
        &self,
        payload: JobRequest,
        cancel: &CancellationToken,
    ) -> Result<JobOutcome, JobError> {
        let mut orchestrator = self.orchestrator();
        let outcome = orchestrator
            .submit_and_await(payload, &self.config.credentials(), cancel)
            .await;
        self.persist_usage().await;
        outcome
    }

    /// Fold a segment edit into a draft
    ///
    /// Without an explicit old text, the segment's current translation (or
    /// its source when untranslated) is replaced.
    pub fn merge_edit(
        &self,
        draft: &mut Draft,
        segments: &mut SegmentCollection,
        key: &str,
        old: Option<&str>,
        new: &str,
    ) -> usize {
        let fallback = segments
            .get(key)
            .map(|segment| segment.translated_text.clone().unwrap_or_else(|| segment.source_text.clone()));
        let old = old.filter(|text| !text.is_empty()).map(str::to_string).or(fallback);

        DraftMerger::apply_segment_edit(draft, segments, key, old.as_deref(), new)
    }

    /// Translate segments in sequential batches, one job per batch
    pub async fn run_batched(
        &self,
        segments: Vec<Segment>,
        batch_size: usize,
        cancel: &CancellationToken,
    ) -> BatchReport {
        let batches = BatchChunker::new(batch_size).chunk(segments);
        let progress_bar = self.progress_bar(batches.len() as u64, "batches");
        progress_bar.set_message(language_utils::describe_pair(
            &self.config.source_language,
            &self.config.target_language,
        ));

        let template = self.job_request(String::new());
        let credentials = self.config.credentials();
        let template = &template;
        let credentials = &credentials;

        let report = run_batches(
            batches,
            |batch| {
                let orchestrator = self.orchestrator();
                async move { translate_batch_via_jobs(&batch, orchestrator, template, credentials, cancel).await }
            },
            cancel,
            |completed, _total| progress_bar.set_position(completed as u64),
        )
        .await;

        progress_bar.finish_and_clear();
        self.persist_usage().await;
        report
    }

    // =========================================================================
    // Workflows
    // =========================================================================

    /// Translate a whole document as one job
    ///
    /// The result is written next to the other outputs as
    /// `<stem>.<target>.<ext>` and stored as the working draft of its scope.
    pub async fn translate_file(
        &self,
        input_file: &Path,
        output_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<RunSummary> {
        let start_time = std::time::Instant::now();

        if !FileManager::file_exists(input_file) {
            return Err(anyhow!("Input file does not exist: {:?}", input_file));
        }

        let text = FileManager::read_to_string(input_file)?;
        let document = self.parse_document(&text);
        let scope = Self::scope_for(&document, input_file);

        if document.translatable_count() == 0 {
            return Ok(RunSummary::new(&scope, JobStatus::Finished, "Nothing to translate"));
        }

        info!(
            "Translating {} ({}, {} spans)",
            scope,
            language_utils::describe_pair(&self.config.source_language, &self.config.target_language),
            document.translatable_count()
        );

        let mut orchestrator = self.orchestrator();
        let outcome = orchestrator
            .submit_and_await(
                self.job_request(document.source_text()),
                &self.config.credentials(),
                cancel,
            )
            .await;
        self.persist_usage().await;

        let artifact = match outcome? {
            JobOutcome::Completed(artifact) => artifact,
            JobOutcome::Failed(status) => {
                let job_id = orchestrator.job().map(|job| job.job_id.clone()).unwrap_or_default();
                return Err(JobError::RemoteJobFailed { job_id, status }.into());
            }
            other => return Ok(RunSummary::new(&scope, other.status(), other.notification())),
        };

        let aligned = align(document.source_lines(), &RemoteResult::detect(&artifact.body));

        let mut segments = SegmentCollection::from_document(&document);
        Self::carry_over(&mut segments, self.repository.fetch_segments(&scope).await?, false);
        let indexed: Vec<(String, usize)> = segments
            .iter()
            .filter_map(|segment| segment.translation_index.map(|index| (segment.id.clone(), index)))
            .collect();
        for (id, index) in indexed {
            if let Some(span) = aligned.get(index).filter(|span| !span.trim().is_empty()) {
                segments.apply_translation(&id, span);
            }
        }

        let spans = segments.translated_spans(document.translatable_count());
        let translated = self.reconstruct(&document.elements, &spans);

        let output_path = FileManager::generate_output_path(input_file, output_dir, &self.config.target_language);
        FileManager::write_to_file(&output_path, &translated)?;
        self.store_generated(&scope, translated, &segments, &text).await?;

        info!(
            "Success: {} in {}",
            output_path.display(),
            Self::format_duration(start_time.elapsed())
        );

        let mut summary = RunSummary::new(&scope, JobStatus::Finished, JobOutcome::Completed(artifact).notification());
        summary.output_path = Some(output_path);
        Ok(summary)
    }

    /// Translate every document below a directory, one job per file
    ///
    /// A failing file is recorded and the next one is processed.
    pub async fn translate_folder(&self, input_dir: &Path, cancel: &CancellationToken) -> Result<FolderReport> {
        if !FileManager::dir_exists(input_dir) {
            return Err(anyhow!("Input directory does not exist: {:?}", input_dir));
        }

        let files = FileManager::find_documents(input_dir, &self.config.target_language)?;
        if files.is_empty() {
            warn!("No documents found in {:?}", input_dir);
            return Ok(FolderReport::default());
        }

        let folder_pb = self.progress_bar(files.len() as u64, "files");
        folder_pb.set_message("Processing files");

        let mut report = FolderReport::default();
        for (position, file) in files.iter().enumerate() {
            if cancel.is_cancelled() {
                report.skipped = files.len() - position;
                break;
            }

            let output_dir = file.parent().unwrap_or(input_dir);
            match self.translate_file(file, output_dir, cancel).await {
                Ok(summary) => report.completed.push(summary),
                Err(e) => {
                    error!("Failed to translate {}: {}", file.display(), e);
                    report.failed.push((file.clone(), e.to_string()));
                }
            }
            folder_pb.inc(1);
        }

        folder_pb.finish_and_clear();
        info!(
            "Folder done: {} translated, {} failed, {} skipped",
            report.completed.len(),
            report.failed.len(),
            report.skipped
        );
        Ok(report)
    }

    /// Translate a document verse by verse in batches
    ///
    /// Stored translations of unchanged segments are reused; `mode`
    /// decides whether they are retranslated. Whatever was translated
    /// before a cancellation is kept.
    pub async fn translate_verses(
        &self,
        input_file: &Path,
        mode: RegenerateMode,
        cancel: &CancellationToken,
    ) -> Result<RunSummary> {
        let text = FileManager::read_to_string(input_file)?;
        let document = self.parse_document(&text);
        let scope = Self::scope_for(&document, input_file);

        let mut segments = SegmentCollection::from_document(&document);
        let reused = Self::carry_over(&mut segments, self.repository.fetch_segments(&scope).await?, true);
        debug!("Reusing {} stored segments of {}", reused, scope);

        let pending = select_for_translation(&mut segments, mode);
        if pending.is_empty() {
            return Ok(RunSummary::new(&scope, JobStatus::Finished, "Nothing left to translate"));
        }

        info!("Translating {} of {} segments of {}", pending.len(), segments.len(), scope);
        let pending_ids: Vec<String> = pending.iter().map(|segment| segment.id.clone()).collect();
        segments.mark_in_progress(pending_ids.iter().map(String::as_str));

        let report = self.run_batched(pending, self.config.batch.batch_size, cancel).await;

        for segment in &report.translated {
            if let Some(text) = &segment.translated_text {
                segments.apply_translation(&segment.id, text);
            }
        }
        segments.clear_in_progress();

        let (status, message) = match report.summary() {
            BatchSummary::AllFailed => {
                for failure in &report.failures {
                    debug!("{}", failure);
                }
                return Err(AppError::AllBatchesFailed(report.total_batches).into());
            }
            BatchSummary::Cancelled => (
                JobStatus::Cancelled,
                format!("Translation cancelled; {} translated verses kept", report.translated.len()),
            ),
            BatchSummary::PartialSuccess => (
                JobStatus::Finished,
                report.partial_notice().unwrap_or_default(),
            ),
            BatchSummary::AllSucceeded => (JobStatus::Finished, "Translation finished".to_string()),
        };

        let spans = segments.translated_spans(document.translatable_count());
        let translated = self.reconstruct(&document.elements, &spans);

        let output_dir = input_file.parent().unwrap_or_else(|| Path::new("."));
        let output_path = FileManager::generate_output_path(input_file, output_dir, &self.config.target_language);
        FileManager::write_to_file(&output_path, &translated)?;
        self.store_generated(&scope, translated, &segments, &text).await?;

        let mut summary = RunSummary::new(&scope, status, message);
        summary.output_path = Some(output_path);
        summary.failed_batch_ids = report.failed_batch_ids;
        Ok(summary)
    }

    /// Count stored translations for the scope of a document
    pub async fn stored_translations(&self, input_file: &Path) -> Result<usize> {
        let text = FileManager::read_to_string(input_file)?;
        let scope = Self::scope_for(&self.parse_document(&text), input_file);
        let stored = self.repository.fetch_segments(&scope).await?;
        Ok(stored.iter().filter(|segment| segment.is_translated()).count())
    }

    /// Apply a manual edit to one segment of a stored draft
    pub async fn edit_segment(&self, scope: &str, segment_id: &str, new_text: &str, old_text: Option<&str>) -> Result<usize> {
        let (mut draft, mut segments) = self.load_workspace(scope).await?;
        if segments.get(segment_id).is_none() {
            return Err(anyhow!("Unknown segment {} in {}", segment_id, scope));
        }

        let replaced = self.merge_edit(&mut draft, &mut segments, segment_id, old_text, new_text);
        if replaced == 0 {
            warn!("Text of {} not found in the draft; only the segment was updated", segment_id);
        }

        self.store_working(&draft, &segments).await?;
        Ok(replaced)
    }

    /// Make the current draft and segments the saved baseline
    pub async fn save_draft(&self, scope: &str) -> Result<Draft> {
        let (mut draft, mut segments) = self.load_workspace(scope).await?;
        DraftMerger::save(&mut draft, &mut segments, &self.repository).await?;
        Ok(draft)
    }

    /// Drop unsaved changes of a draft
    pub async fn discard_draft(&self, scope: &str) -> Result<Draft> {
        let (mut draft, mut segments) = self.load_workspace(scope).await?;
        if draft.baseline.is_empty() && !segments.has_saved_translations() {
            // Discarding would wipe the generated translation with nothing to fall back to
            return Err(anyhow!(
                "Draft {} has never been saved; run `versedraft save {}` first",
                scope,
                scope
            ));
        }
        DraftMerger::discard(&mut draft, &mut segments);
        self.store_working(&draft, &segments).await?;
        Ok(draft)
    }

    /// Rebuild draft content from the stored segment translations
    pub async fn regenerate_draft(&self, scope: &str, source_file: &Path) -> Result<usize> {
        let raw_source = FileManager::read_to_string(source_file)?;
        let (mut draft, segments) = self.load_workspace(scope).await?;

        let replaced = DraftMerger::regenerate(&mut draft, &raw_source, &segments);
        self.store_working(&draft, &segments).await?;
        Ok(replaced)
    }

    /// Stored draft of a scope with its segment statistics
    pub async fn show_draft(&self, scope: &str) -> Result<DraftOverview> {
        let (draft, segments) = self.load_workspace(scope).await?;
        Ok(DraftOverview {
            total_segments: segments.len(),
            translated_segments: segments.iter().filter(|segment| segment.is_translated()).count(),
            dirty_segments: segments.dirty_ids(),
            draft,
        })
    }

    /// Stored scopes with their last update time, most recent first
    pub async fn list_drafts(&self) -> Result<Vec<(String, String)>> {
        self.repository.list_scopes().await
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn orchestrator(&self) -> JobOrchestrator {
        JobOrchestrator::new(
            Arc::clone(&self.provider),
            Arc::clone(&self.usage),
            self.config.poll_settings(),
        )
        .authenticated(self.config.usage.authenticated)
    }

    fn job_request(&self, document: String) -> JobRequest {
        JobRequest::new(
            document,
            &self.config.source_language,
            &self.config.target_language,
            &self.config.service.model,
        )
    }

    fn scope_for(document: &ParsedDocument, input_file: &Path) -> String {
        document.book_id().unwrap_or_else(|| {
            input_file
                .file_stem()
                .map(|stem| stem.to_string_lossy().to_string())
                .unwrap_or_else(|| crate::draft::segments::DEFAULT_BOOK.to_string())
        })
    }

    /// Copy stored state onto freshly built segments with the same id and source
    ///
    /// Pending manual edits always survive; automated translations only
    /// when `keep_automated` is set.
    fn carry_over(fresh: &mut SegmentCollection, stored: Vec<Segment>, keep_automated: bool) -> usize {
        let mut kept = 0;
        for old in stored {
            let Some(segment) = fresh.get_mut(&old.id) else {
                continue;
            };
            if segment.source_text != old.source_text {
                continue;
            }
            segment.original_translated_text = old.original_translated_text;
            if old.manual_edit || keep_automated {
                segment.translated_text = old.translated_text;
                segment.manual_edit = old.manual_edit;
            }
            kept += 1;
        }
        kept
    }

    async fn load_workspace(&self, scope: &str) -> Result<(Draft, SegmentCollection)> {
        let draft = self
            .repository
            .fetch_draft(scope)
            .await?
            .ok_or_else(|| anyhow!("No draft stored for {}", scope))?;
        let segments = SegmentCollection::from_segments(self.repository.fetch_segments(scope).await?);
        Ok((draft, segments))
    }

    async fn store_working(&self, draft: &Draft, segments: &SegmentCollection) -> Result<()> {
        self.repository.store_draft(draft).await?;
        let records: Vec<Segment> = segments.iter().cloned().collect();
        self.repository.store_segments(&draft.scope, &records).await
    }

    /// Store freshly generated content, keeping the id and baseline of an existing draft
    async fn store_generated(&self, scope: &str, content: String, segments: &SegmentCollection, source: &str) -> Result<()> {
        let draft = match self.repository.fetch_draft(scope).await? {
            Some(mut existing) => {
                existing.content = content;
                existing
            }
            None => Draft::new(scope, content),
        };

        self.repository
            .save_draft(&DraftRecord::from_draft(&draft, Repository::hash_text(source)))
            .await?;

        let records = segments
            .iter()
            .enumerate()
            .map(|(position, segment)| SegmentRecord::from_segment(scope, position, segment))
            .collect();
        self.repository.replace_segments(scope, records).await?;
        Ok(())
    }

    fn progress_bar(&self, len: u64, unit: &str) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let progress_bar = ProgressBar::new(len);
        let template = format!(
            "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {} ({{percent}}%) {{msg}} {{eta}}",
            unit
        );
        let template_result = ProgressStyle::default_bar()
            .template(&template)
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(template_result.progress_chars("█▓▒░"));
        progress_bar
    }

    // Format duration in a human-readable format
    fn format_duration(duration: std::time::Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}

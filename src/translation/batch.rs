/*!
 * Batched translation of segments.
 *
 * Segments are chunked into fixed-size batches which are translated one at
 * a time. A failing batch is recorded and the run moves on, so one bad
 * batch never discards the work of the others. The cancellation token is
 * checked between batches.
 */

use anyhow::{Result, anyhow};
use log::{debug, info, warn};
use std::future::Future;
use tokio_util::sync::CancellationToken;

use crate::draft::segments::{Segment, SegmentCollection};
use crate::errors::BatchFailure;
use crate::providers::{Credentials, JobRequest};

use super::alignment::{RemoteResult, align};
use super::job::{JobOrchestrator, JobOutcome};

/// A group of segments translated in one request
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    /// One-based batch number
    pub id: usize,
    /// Segments in document order
    pub segments: Vec<Segment>,
}

impl Batch {
    /// Source texts, one per segment
    pub fn source_lines(&self) -> Vec<String> {
        self.segments
            .iter()
            .map(|s| s.source_text.split_whitespace().collect::<Vec<_>>().join(" "))
            .collect()
    }
}

/// Splits segments into batches
#[derive(Debug, Clone, Copy)]
pub struct BatchChunker {
    batch_size: usize,
}

impl BatchChunker {
    /// Create a chunker; a size of zero is treated as one
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Split segments into order-preserving batches; the last may be short
    pub fn chunk(&self, segments: Vec<Segment>) -> Vec<Batch> {
        let mut batches = Vec::with_capacity(segments.len().div_ceil(self.batch_size));
        let mut segments = segments.into_iter().peekable();

        while segments.peek().is_some() {
            batches.push(Batch {
                id: batches.len() + 1,
                segments: segments.by_ref().take(self.batch_size).collect(),
            });
        }

        batches
    }
}

/// Overall result of a batched run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchSummary {
    AllSucceeded,
    PartialSuccess,
    AllFailed,
    Cancelled,
}

/// What a batched run produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    /// Segments that received a translation
    pub translated: Vec<Segment>,
    /// Ids of failed batches, in order
    pub failed_batch_ids: Vec<usize>,
    /// Failure details, one per failed batch
    pub failures: Vec<BatchFailure>,
    /// The run stopped early because of cancellation
    pub cancelled: bool,
    /// Batches the run was given
    pub total_batches: usize,
}

impl BatchReport {
    /// Classify the run
    pub fn summary(&self) -> BatchSummary {
        if self.cancelled {
            BatchSummary::Cancelled
        } else if self.failed_batch_ids.is_empty() {
            BatchSummary::AllSucceeded
        } else if self.failed_batch_ids.len() == self.total_batches {
            BatchSummary::AllFailed
        } else {
            BatchSummary::PartialSuccess
        }
    }

    /// Message listing the failed batches, if any
    pub fn partial_notice(&self) -> Option<String> {
        if self.failed_batch_ids.is_empty() {
            return None;
        }
        let ids: Vec<String> = self.failed_batch_ids.iter().map(|id| id.to_string()).collect();
        Some(format!(
            "{} of {} batches failed: {}",
            self.failed_batch_ids.len(),
            self.total_batches,
            ids.join(", ")
        ))
    }
}

/// Run batches strictly in order
///
/// `translate_one` returns one translation per segment. A batch fails when
/// it errors or returns the wrong number of translations; the failure is
/// recorded and the next batch runs. `on_progress` receives
/// `(completed, total)` after each batch.
pub async fn run_batches<F, Fut>(
    batches: Vec<Batch>,
    mut translate_one: F,
    cancel: &CancellationToken,
    mut on_progress: impl FnMut(usize, usize),
) -> BatchReport
where
    F: FnMut(Batch) -> Fut,
    Fut: Future<Output = Result<Vec<String>>>,
{
    let total = batches.len();
    let mut report = BatchReport {
        total_batches: total,
        ..Default::default()
    };

    for (completed, batch) in batches.into_iter().enumerate() {
        if cancel.is_cancelled() {
            info!("Cancelled before batch {} of {}", batch.id, total);
            report.cancelled = true;
            break;
        }

        let batch_id = batch.id;
        let segments = batch.segments.clone();
        debug!("Translating batch {} ({} segments)", batch_id, segments.len());

        let result = translate_one(batch).await;

        match result {
            Ok(translations) if translations.len() == segments.len() => {
                report.translated.extend(segments.into_iter().zip(translations).map(|(mut segment, text)| {
                    segment.translated_text = Some(text);
                    segment.in_progress = false;
                    segment
                }));
            }
            Ok(translations) => {
                let reason = format!("expected {} translations, got {}", segments.len(), translations.len());
                warn!("Batch {} failed: {}", batch_id, reason);
                report.failed_batch_ids.push(batch_id);
                report.failures.push(BatchFailure { batch_id, reason });
            }
            Err(_) if cancel.is_cancelled() => {
                info!("Batch {} interrupted by cancellation", batch_id);
                report.cancelled = true;
                break;
            }
            Err(e) => {
                warn!("Batch {} failed: {}", batch_id, e);
                report.failed_batch_ids.push(batch_id);
                report.failures.push(BatchFailure {
                    batch_id,
                    reason: e.to_string(),
                });
            }
        }

        on_progress(completed + 1, total);
    }

    info!(
        "Batched run finished: {} segments translated, {} of {} batches failed{}",
        report.translated.len(),
        report.failed_batch_ids.len(),
        total,
        if report.cancelled { ", cancelled" } else { "" }
    );

    report
}

/// How an existing set of translations is treated by a new run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegenerateMode {
    /// Retranslate everything except pending manual edits
    Full,
    /// Translate only segments that have no translation yet
    ContinueExisting,
}

/// Pick the segments a run should translate
pub fn select_for_translation(segments: &mut SegmentCollection, mode: RegenerateMode) -> Vec<Segment> {
    if mode == RegenerateMode::Full {
        let cleared = segments.clear_automated();
        debug!("Cleared {} automated translations for a full run", cleared);
    }
    segments
        .untranslated()
        .into_iter()
        .filter(|segment| !segment.manual_edit)
        .collect()
}

/// Translate one batch as its own plain-text job, one segment per line
pub async fn translate_batch_via_jobs(
    batch: &Batch,
    mut orchestrator: JobOrchestrator,
    template: &JobRequest,
    credentials: &Credentials,
    cancel: &CancellationToken,
) -> Result<Vec<String>> {
    let source_lines = batch.source_lines();
    let request = JobRequest {
        document: source_lines.join("\n"),
        ..template.clone()
    };

    match orchestrator.submit_and_await(request, credentials, cancel).await? {
        JobOutcome::Completed(artifact) => {
            // Blank lines carry no segment; positions come from the remaining lines
            let lines: Vec<String> = artifact
                .body
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect();
            if lines.len() != source_lines.len() {
                return Err(anyhow!(
                    "expected {} translations, got {}",
                    source_lines.len(),
                    lines.len()
                ));
            }
            Ok(align(&source_lines, &RemoteResult::Plain(lines)))
        }
        outcome => Err(anyhow!(outcome.notification())),
    }
}

/*!
 * Remote translation workflow.
 *
 * This module drives translation through the remote job service:
 *
 * - `job`: Lifecycle of a single job (submit, poll, fetch) with cancellation
 * - `batch`: Chunking segments and running batches sequentially
 * - `alignment`: Mapping the remote result back onto source lines
 * - `usage`: Daily quota for anonymous requests
 */

// Re-export main types for easier usage
pub use self::alignment::{RemoteResult, align, is_echo, split_sentences};
pub use self::batch::{Batch, BatchChunker, BatchReport, BatchSummary, RegenerateMode, run_batches};
pub use self::job::{JobOrchestrator, JobOutcome, JobPhase, JobStatus, PollSettings, TranslationJob};
pub use self::usage::{UsageCounter, UsagePolicy};

// Submodules
pub mod alignment;
pub mod batch;
pub mod job;
pub mod usage;

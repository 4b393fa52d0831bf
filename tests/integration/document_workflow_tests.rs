/*!
 * Integration tests for whole-document translation jobs
 */

use anyhow::Result;
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use versedraft::errors::JobError;
use versedraft::providers::JobRequest;
use versedraft::providers::mock::{MockBehavior, MockJobProvider};
use versedraft::translation::{JobStatus, UsagePolicy, split_sentences};
use crate::common;

const TRANSLATED_SAMPLE: &str = "\\id GEN Sample book\n\
\\h Genesis\n\
\\mt1 [fr] The Book of Genesis\n\
\\c 1\n\
\\p\n\
\\v 1 [fr] In the beginning God created the heavens and the earth.\n\
\\v 2 [fr] The earth was formless and empty.\n\
\\v 3 [fr] God said, Let there be light.\n";

const EXODUS: &str = "\\id EXO\n\\c 1\n\\v 1 These are the names of the sons of Israel.\n";

// Answers with a source/target table, one row per sentence
fn tabular_response(request: &JobRequest) -> String {
    let mut body = String::from("source\ttarget\n");
    for line in request.document.lines() {
        for sentence in split_sentences(line) {
            body.push_str(&format!("{}\t{}\n", sentence, sentence.to_uppercase()));
        }
    }
    body
}

#[tokio::test]
async fn test_translateFile_withWorkingService_shouldWriteTranslatedDocument() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "GEN.usfm", common::SAMPLE_USFM)?;
    let provider = MockJobProvider::working();
    let controller = common::test_controller(provider.clone(), common::test_config())?;

    let summary = controller
        .translate_file(&input, temp_dir.path(), &CancellationToken::new())
        .await?;

    assert_eq!(summary.status, JobStatus::Finished);
    assert_eq!(summary.scope, "GEN");
    assert_eq!(summary.message, "Translation finished");
    let output_path = temp_dir.path().join("GEN.fr.usfm");
    assert_eq!(summary.output_path.as_deref(), Some(output_path.as_path()));
    assert_eq!(fs::read_to_string(&output_path)?, TRANSLATED_SAMPLE);

    // Only the translatable text travels, one span per line
    assert_eq!(
        provider.submitted_documents(),
        vec![
            "The Book of Genesis\n\
In the beginning God created the heavens and the earth.\n\
The earth was formless and empty.\n\
God said, Let there be light."
                .to_string()
        ]
    );
    assert_eq!(provider.artifact_calls(), 1);
    Ok(())
}

#[tokio::test]
async fn test_translateFile_shouldStoreUnsavedDraft() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "GEN.usfm", common::SAMPLE_USFM)?;
    let controller = common::test_controller(MockJobProvider::working(), common::test_config())?;

    controller
        .translate_file(&input, temp_dir.path(), &CancellationToken::new())
        .await?;

    let overview = controller.show_draft("GEN").await?;
    assert_eq!(overview.draft.content, TRANSLATED_SAMPLE);
    assert!(overview.is_dirty(), "A new draft has not been saved yet");
    assert_eq!(overview.total_segments, 4);
    assert_eq!(overview.translated_segments, 4);
    Ok(())
}

#[tokio::test]
async fn test_translateFile_withTabularResult_shouldJoinSentenceRows() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let source = "\\id MRK\n\\c 1\n\\v 1 Jesus wept. Then he left.\n\\v 2 He came back.\n";
    let input = common::create_test_file(temp_dir.path(), "MRK.usfm", source)?;
    let provider = MockJobProvider::working().with_custom_response(tabular_response);
    let controller = common::test_controller(provider, common::test_config())?;

    controller
        .translate_file(&input, temp_dir.path(), &CancellationToken::new())
        .await?;

    let output = fs::read_to_string(temp_dir.path().join("MRK.fr.usfm"))?;
    assert_eq!(output, "\\id MRK\n\\c 1\n\\v 1 JESUS WEPT. THEN HE LEFT.\n\\v 2 HE CAME BACK.\n");
    Ok(())
}

#[tokio::test]
async fn test_translateFile_withoutTranslatableText_shouldSkipService() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "EMPTY.usfm", "\\id EMP\n\\c 1\n\\p\n")?;
    let provider = MockJobProvider::working();
    let controller = common::test_controller(provider.clone(), common::test_config())?;

    let summary = controller
        .translate_file(&input, temp_dir.path(), &CancellationToken::new())
        .await?;

    assert_eq!(summary.message, "Nothing to translate");
    assert!(summary.output_path.is_none());
    assert_eq!(provider.submit_calls(), 0);
    Ok(())
}

#[tokio::test]
async fn test_translateFile_whenCancelledWhilePolling_shouldNotDownload() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "GEN.usfm", common::SAMPLE_USFM)?;
    let provider = MockJobProvider::never_finishes();
    let mut config = common::test_config();
    config.polling.max_attempts = 1000;
    let controller = common::test_controller(provider.clone(), config)?;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let summary = controller.translate_file(&input, temp_dir.path(), &cancel).await?;

    assert_eq!(summary.status, JobStatus::Cancelled);
    assert_eq!(summary.message, "Translation cancelled; no result was downloaded");
    assert_eq!(provider.submit_calls(), 1);
    assert_eq!(provider.artifact_calls(), 0);
    assert!(!temp_dir.path().join("GEN.fr.usfm").exists());
    Ok(())
}

#[tokio::test]
async fn test_translateFile_whenJobNeverFinishes_shouldReportTimeout() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "GEN.usfm", common::SAMPLE_USFM)?;
    let provider = MockJobProvider::never_finishes();
    let controller = common::test_controller(provider.clone(), common::test_config())?;

    let summary = controller
        .translate_file(&input, temp_dir.path(), &CancellationToken::new())
        .await?;

    assert_eq!(summary.status, JobStatus::TimedOut);
    assert!(summary.message.contains("did not finish in time"));
    assert_eq!(provider.status_calls(), 5);
    assert_eq!(provider.artifact_calls(), 0);
    assert!(controller.show_draft("GEN").await.is_err(), "No draft for a timed out run");
    Ok(())
}

#[tokio::test]
async fn test_translateFile_whenRemoteJobFails_shouldSurfaceRawStatus() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "GEN.usfm", common::SAMPLE_USFM)?;
    let controller = common::test_controller(MockJobProvider::remote_failure(), common::test_config())?;

    let error = controller
        .translate_file(&input, temp_dir.path(), &CancellationToken::new())
        .await
        .unwrap_err();

    match error.downcast_ref::<JobError>() {
        Some(JobError::RemoteJobFailed { job_id, status }) => {
            assert_eq!(job_id, "job-1");
            assert_eq!(status, "Failed: model crashed");
        }
        other => panic!("Expected RemoteJobFailed, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_translateFile_whenResultEchoesSource_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "GEN.usfm", common::SAMPLE_USFM)?;
    let controller = common::test_controller(MockJobProvider::new(MockBehavior::Echo), common::test_config())?;

    let error = controller
        .translate_file(&input, temp_dir.path(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(error.downcast_ref::<JobError>(), Some(JobError::EmptyResult { .. })));
    assert!(!temp_dir.path().join("GEN.fr.usfm").exists());
    Ok(())
}

#[tokio::test]
async fn test_translateFile_overDailyLimit_shouldRejectBeforeSubmitting() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "GEN.usfm", common::SAMPLE_USFM)?;
    let provider = MockJobProvider::working();
    let mut config = common::test_config();
    config.usage.daily_limit = 1;
    let controller = common::test_controller(provider.clone(), config)?;
    let cancel = CancellationToken::new();

    controller.translate_file(&input, temp_dir.path(), &cancel).await?;
    let error = controller
        .translate_file(&input, temp_dir.path(), &cancel)
        .await
        .unwrap_err();

    assert!(matches!(
        error.downcast_ref::<JobError>(),
        Some(JobError::QuotaExceeded { limit: 1 })
    ));
    assert_eq!(provider.submit_calls(), 1);

    let stored = controller.repository().load_usage().await?.expect("usage counter stored");
    assert_eq!(stored.count, 1);
    Ok(())
}

#[tokio::test]
async fn test_translateFile_withSharedUsagePolicy_shouldShareQuotaAcrossControllers() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "GEN.usfm", common::SAMPLE_USFM)?;
    let provider = MockJobProvider::working();
    let usage = Arc::new(UsagePolicy::new(1));
    let first = common::test_controller(provider.clone(), common::test_config())?
        .with_usage_policy(Arc::clone(&usage));
    let second = common::test_controller(provider.clone(), common::test_config())?
        .with_usage_policy(Arc::clone(&usage));
    let cancel = CancellationToken::new();

    first.translate_file(&input, temp_dir.path(), &cancel).await?;
    let error = second
        .translate_file(&input, temp_dir.path(), &cancel)
        .await
        .unwrap_err();

    assert!(matches!(
        error.downcast_ref::<JobError>(),
        Some(JobError::QuotaExceeded { limit: 1 })
    ));
    assert_eq!(usage.remaining(), 0);
    assert_eq!(provider.submit_calls(), 1);
    Ok(())
}

#[tokio::test]
async fn test_translateFile_whenAuthenticated_shouldIgnoreDailyLimit() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "GEN.usfm", common::SAMPLE_USFM)?;
    let provider = MockJobProvider::working();
    let mut config = common::test_config();
    config.usage.daily_limit = 1;
    config.usage.authenticated = true;
    let controller = common::test_controller(provider.clone(), config)?;
    let cancel = CancellationToken::new();

    for _ in 0..3 {
        controller.translate_file(&input, temp_dir.path(), &cancel).await?;
    }

    assert_eq!(provider.submit_calls(), 3);
    Ok(())
}

#[tokio::test]
async fn test_translateFolder_shouldTranslateEachDocumentOnce() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    common::create_test_file(temp_dir.path(), "GEN.usfm", common::SAMPLE_USFM)?;
    common::create_test_file(temp_dir.path(), "EXO.usfm", EXODUS)?;
    common::create_test_file(temp_dir.path(), "GEN.fr.usfm", TRANSLATED_SAMPLE)?;
    common::create_test_file(temp_dir.path(), "notes.md", "# not a document")?;
    let provider = MockJobProvider::working();
    let controller = common::test_controller(provider.clone(), common::test_config())?;

    let report = controller
        .translate_folder(temp_dir.path(), &CancellationToken::new())
        .await?;

    let scopes: Vec<&str> = report.completed.iter().map(|s| s.scope.as_str()).collect();
    assert_eq!(scopes, vec!["EXO", "GEN"]);
    assert!(report.failed.is_empty());
    assert_eq!(provider.submit_calls(), 2);
    assert_eq!(
        fs::read_to_string(temp_dir.path().join("EXO.fr.usfm"))?,
        "\\id EXO\n\\c 1\n\\v 1 [fr] These are the names of the sons of Israel.\n"
    );
    Ok(())
}

#[tokio::test]
async fn test_translateFolder_withFailingFile_shouldContinueWithNext() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    common::create_test_file(temp_dir.path(), "EXO.usfm", EXODUS)?;
    common::create_test_file(temp_dir.path(), "GEN.usfm", common::SAMPLE_USFM)?;
    let provider = MockJobProvider::working().rejecting_submissions(&[1]);
    let controller = common::test_controller(provider, common::test_config())?;

    let report = controller
        .translate_folder(temp_dir.path(), &CancellationToken::new())
        .await?;

    assert_eq!(report.failed.len(), 1);
    assert!(report.failed[0].0.ends_with("EXO.usfm"));
    assert_eq!(report.completed.len(), 1);
    assert_eq!(report.completed[0].scope, "GEN");
    assert!(temp_dir.path().join("GEN.fr.usfm").exists());
    Ok(())
}

#[tokio::test]
async fn test_translateFolder_whenCancelled_shouldSkipRemainingFiles() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    common::create_test_file(temp_dir.path(), "EXO.usfm", EXODUS)?;
    common::create_test_file(temp_dir.path(), "GEN.usfm", common::SAMPLE_USFM)?;
    let provider = MockJobProvider::working();
    let controller = common::test_controller(provider.clone(), common::test_config())?;

    let cancel = CancellationToken::new();
    cancel.cancel();
    let report = controller.translate_folder(temp_dir.path(), &cancel).await?;

    assert_eq!(report.skipped, 2);
    assert!(report.completed.is_empty());
    assert_eq!(provider.submit_calls(), 0);
    Ok(())
}

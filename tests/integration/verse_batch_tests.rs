/*!
 * Integration tests for verse-by-verse batched translation
 */

use anyhow::Result;
use std::fs;
use tokio_util::sync::CancellationToken;

use versedraft::errors::AppError;
use versedraft::providers::mock::MockJobProvider;
use versedraft::translation::{JobStatus, RegenerateMode};
use crate::common;

#[tokio::test]
async fn test_translateVerses_withWorkingService_shouldSendOneJobPerBatch() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "GEN.usfm", common::SAMPLE_USFM)?;
    let provider = MockJobProvider::working();
    let controller = common::test_controller(provider.clone(), common::test_config())?;

    let summary = controller
        .translate_verses(&input, RegenerateMode::ContinueExisting, &CancellationToken::new())
        .await?;

    assert_eq!(summary.status, JobStatus::Finished);
    assert_eq!(summary.message, "Translation finished");
    assert!(summary.failed_batch_ids.is_empty());
    assert_eq!(
        provider.submitted_documents(),
        vec![
            "The Book of Genesis\nIn the beginning God created the heavens and the earth.".to_string(),
            "The earth was formless and empty.\nGod said, Let there be light.".to_string(),
        ]
    );

    let output = fs::read_to_string(temp_dir.path().join("GEN.fr.usfm"))?;
    assert!(output.contains("\\v 2 [fr] The earth was formless and empty.\n"));
    Ok(())
}

#[tokio::test]
async fn test_translateVerses_withFailedBatch_shouldKeepOtherBatches() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "GEN.usfm", common::SAMPLE_USFM)?;
    let provider = MockJobProvider::working().rejecting_submissions(&[3]);
    let mut config = common::test_config();
    config.batch.batch_size = 1;
    let controller = common::test_controller(provider.clone(), config)?;

    let summary = controller
        .translate_verses(&input, RegenerateMode::ContinueExisting, &CancellationToken::new())
        .await?;

    assert_eq!(summary.status, JobStatus::Finished);
    assert_eq!(summary.failed_batch_ids, vec![3]);
    assert_eq!(summary.message, "1 of 4 batches failed: 3");

    let output = fs::read_to_string(temp_dir.path().join("GEN.fr.usfm"))?;
    assert!(output.contains("\\v 1 [fr] In the beginning"));
    assert!(output.contains("\\v 2 The earth was formless and empty.\n"), "Failed verse keeps its source");
    assert!(output.contains("\\v 3 [fr] God said"));

    let overview = controller.show_draft("GEN").await?;
    assert_eq!(overview.translated_segments, 3);
    Ok(())
}

#[tokio::test]
async fn test_translateVerses_continueAfterFailure_shouldOnlySendMissingVerses() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "GEN.usfm", common::SAMPLE_USFM)?;
    let provider = MockJobProvider::working().rejecting_submissions(&[3]);
    let mut config = common::test_config();
    config.batch.batch_size = 1;
    let controller = common::test_controller(provider.clone(), config)?;
    let cancel = CancellationToken::new();

    controller.translate_verses(&input, RegenerateMode::ContinueExisting, &cancel).await?;
    let summary = controller
        .translate_verses(&input, RegenerateMode::ContinueExisting, &cancel)
        .await?;

    assert_eq!(summary.message, "Translation finished");
    assert_eq!(provider.submit_calls(), 5);
    assert_eq!(
        provider.submitted_documents().last().map(String::as_str),
        Some("The earth was formless and empty.")
    );

    let output = fs::read_to_string(temp_dir.path().join("GEN.fr.usfm"))?;
    assert!(output.contains("\\v 2 [fr] The earth was formless and empty.\n"));
    Ok(())
}

#[tokio::test]
async fn test_translateVerses_whenEverythingTranslated_shouldNotContactService() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "GEN.usfm", common::SAMPLE_USFM)?;
    let provider = MockJobProvider::working();
    let controller = common::test_controller(provider.clone(), common::test_config())?;
    let cancel = CancellationToken::new();

    controller.translate_verses(&input, RegenerateMode::ContinueExisting, &cancel).await?;
    let summary = controller
        .translate_verses(&input, RegenerateMode::ContinueExisting, &cancel)
        .await?;

    assert_eq!(summary.message, "Nothing left to translate");
    assert_eq!(provider.submit_calls(), 2);
    Ok(())
}

#[tokio::test]
async fn test_translateVerses_fullMode_shouldKeepManualEdits() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "GEN.usfm", common::SAMPLE_USFM)?;
    let provider = MockJobProvider::working();
    let controller = common::test_controller(provider.clone(), common::test_config())?;
    let cancel = CancellationToken::new();

    controller.translate_verses(&input, RegenerateMode::ContinueExisting, &cancel).await?;
    controller
        .edit_segment("GEN", "GEN.1.1", "Au commencement Dieu créa les cieux et la terre.", None)
        .await?;

    controller.translate_verses(&input, RegenerateMode::Full, &cancel).await?;

    let resubmitted = &provider.submitted_documents()[2..];
    assert_eq!(resubmitted.len(), 2);
    assert!(resubmitted.iter().all(|document| !document.contains("In the beginning")));

    let output = fs::read_to_string(temp_dir.path().join("GEN.fr.usfm"))?;
    assert!(output.contains("\\v 1 Au commencement Dieu créa les cieux et la terre.\n"));
    assert!(output.contains("\\v 3 [fr] God said, Let there be light.\n"));
    Ok(())
}

#[tokio::test]
async fn test_translateVerses_whenAllBatchesFail_shouldReturnError() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "GEN.usfm", common::SAMPLE_USFM)?;
    let controller = common::test_controller(MockJobProvider::remote_failure(), common::test_config())?;

    let error = controller
        .translate_verses(&input, RegenerateMode::ContinueExisting, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(error.downcast_ref::<AppError>(), Some(AppError::AllBatchesFailed(2))));
    assert!(!temp_dir.path().join("GEN.fr.usfm").exists());
    Ok(())
}

#[tokio::test]
async fn test_translateVerses_whenCancelled_shouldReportKeptVerses() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "GEN.usfm", common::SAMPLE_USFM)?;
    let provider = MockJobProvider::working();
    let controller = common::test_controller(provider.clone(), common::test_config())?;

    let cancel = CancellationToken::new();
    cancel.cancel();
    let summary = tokio_test::assert_ok!(
        controller
            .translate_verses(&input, RegenerateMode::ContinueExisting, &cancel)
            .await
    );

    assert_eq!(summary.status, JobStatus::Cancelled);
    assert_eq!(summary.message, "Translation cancelled; 0 translated verses kept");
    assert_eq!(provider.submit_calls(), 0);
    Ok(())
}

#[tokio::test]
async fn test_storedTranslations_shouldCountOnlyTranslatedSegments() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "GEN.usfm", common::SAMPLE_USFM)?;
    let provider = MockJobProvider::working().rejecting_submissions(&[2]);
    let controller = common::test_controller(provider, common::test_config())?;

    assert_eq!(controller.stored_translations(&input).await?, 0);
    controller
        .translate_verses(&input, RegenerateMode::ContinueExisting, &CancellationToken::new())
        .await?;

    assert_eq!(controller.stored_translations(&input).await?, 2);
    Ok(())
}

/*!
 * Integration tests for editing, saving and discarding drafts
 */

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use versedraft::app_config::Config;
use versedraft::app_controller::Controller;
use versedraft::database::{DatabaseConnection, Repository};
use versedraft::providers::mock::MockJobProvider;
use crate::common;

const NEW_VERSE_2: &str = "La terre était informe et vide.";

async fn translated_controller(dir: &Path) -> Result<Controller> {
    let input = common::create_test_file(dir, "GEN.usfm", common::SAMPLE_USFM)?;
    let controller = common::test_controller(MockJobProvider::working(), common::test_config())?;
    controller.translate_file(&input, dir, &CancellationToken::new()).await?;
    Ok(controller)
}

fn file_backed_controller(db_path: &Path, config: Config) -> Result<Controller> {
    common::init_logging();
    let repository = Repository::new(DatabaseConnection::new(db_path)?);
    Ok(Controller::with_components(config, Arc::new(MockJobProvider::working()), repository).without_progress())
}

#[tokio::test]
async fn test_editSegment_shouldReplaceCurrentTranslation() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let controller = translated_controller(temp_dir.path()).await?;
    controller.save_draft("GEN").await?;

    let replaced = controller.edit_segment("GEN", "GEN.1.2", NEW_VERSE_2, None).await?;

    assert_eq!(replaced, 1);
    let overview = controller.show_draft("GEN").await?;
    assert!(overview.draft.content.contains(&format!("\\v 2 {}\n", NEW_VERSE_2)));
    assert!(!overview.draft.content.contains("The earth was formless"));
    assert!(overview.is_dirty());
    assert_eq!(overview.dirty_segments, vec!["GEN.1.2".to_string()]);
    Ok(())
}

#[tokio::test]
async fn test_editSegment_twice_shouldNotChangeDraftAgain() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let controller = translated_controller(temp_dir.path()).await?;
    let old = "[fr] The earth was formless and empty.";

    controller.edit_segment("GEN", "GEN.1.2", NEW_VERSE_2, Some(old)).await?;
    let first = controller.show_draft("GEN").await?.draft.content;
    let replaced = controller.edit_segment("GEN", "GEN.1.2", NEW_VERSE_2, Some(old)).await?;

    assert_eq!(replaced, 0);
    assert_eq!(controller.show_draft("GEN").await?.draft.content, first);
    Ok(())
}

#[tokio::test]
async fn test_editSegment_withUnknownSegment_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let controller = translated_controller(temp_dir.path()).await?;

    tokio_test::assert_err!(controller.edit_segment("GEN", "GEN.9.9", "Rien", None).await);
    Ok(())
}

#[tokio::test]
async fn test_showDraft_withUnknownScope_shouldFail() -> Result<()> {
    let controller = common::test_controller(MockJobProvider::working(), common::test_config())?;

    let error = controller.show_draft("REV").await.unwrap_err();

    assert!(error.to_string().contains("No draft stored for REV"));
    Ok(())
}

#[tokio::test]
async fn test_listDrafts_shouldReturnTranslatedScopes() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let controller = translated_controller(temp_dir.path()).await?;

    let drafts = controller.list_drafts().await?;

    assert_eq!(drafts.len(), 1);
    assert_eq!(drafts[0].0, "GEN");
    let stats = controller.repository().connection().stats()?;
    assert_eq!(stats.draft_count, 1);
    assert_eq!(stats.segment_count, 4);
    assert_eq!(stats.translated_segments, 4);
    Ok(())
}

#[tokio::test]
async fn test_saveDraft_shouldClearDirtyState() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let controller = translated_controller(temp_dir.path()).await?;
    controller.edit_segment("GEN", "GEN.1.2", NEW_VERSE_2, None).await?;

    let saved = controller.save_draft("GEN").await?;

    assert!(!saved.is_dirty());
    let overview = controller.show_draft("GEN").await?;
    assert!(!overview.is_dirty());
    assert!(overview.draft.baseline.contains(NEW_VERSE_2));
    Ok(())
}

#[tokio::test]
async fn test_discardDraft_shouldRestoreLastSave() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let controller = translated_controller(temp_dir.path()).await?;
    let saved = controller.save_draft("GEN").await?;
    controller.edit_segment("GEN", "GEN.1.2", NEW_VERSE_2, None).await?;

    let discarded = controller.discard_draft("GEN").await?;

    assert_eq!(discarded.content, saved.content);
    let overview = controller.show_draft("GEN").await?;
    assert!(!overview.is_dirty());
    assert!(overview.dirty_segments.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_discardDraft_beforeFirstSave_shouldKeepGeneratedTranslation() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let controller = translated_controller(temp_dir.path()).await?;
    let before = controller.show_draft("GEN").await?;

    let error = controller.discard_draft("GEN").await.unwrap_err();

    assert!(error.to_string().contains("never been saved"));
    let after = controller.show_draft("GEN").await?;
    assert_eq!(after.draft.content, before.draft.content);
    assert_eq!(after.translated_segments, 4);
    Ok(())
}

#[tokio::test]
async fn test_regenerateDraft_shouldApplySegmentOnlyEdits() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let controller = translated_controller(temp_dir.path()).await?;
    controller.save_draft("GEN").await?;

    // The old text is not in the draft, so only the segment changes
    let replaced = controller
        .edit_segment("GEN", "GEN.1.3", "Dieu dit : Que la lumière soit.", Some("absent text"))
        .await?;
    assert_eq!(replaced, 0);

    let substituted = controller
        .regenerate_draft("GEN", &temp_dir.path().join("GEN.usfm"))
        .await?;

    assert_eq!(substituted, 1);
    let content = controller.show_draft("GEN").await?.draft.content;
    assert!(content.contains("\\v 3 Dieu dit : Que la lumière soit.\n"));
    assert!(content.contains("\\v 2 [fr] The earth was formless and empty.\n"));
    Ok(())
}

#[tokio::test]
async fn test_draft_withFileDatabase_shouldSurviveRestart() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let db_path = temp_dir.path().join("drafts.db");
    let input = common::create_test_file(temp_dir.path(), "GEN.usfm", common::SAMPLE_USFM)?;

    {
        let controller = file_backed_controller(&db_path, common::test_config())?;
        controller
            .translate_file(&input, temp_dir.path(), &CancellationToken::new())
            .await?;
        controller.edit_segment("GEN", "GEN.1.2", NEW_VERSE_2, None).await?;
    }

    {
        let controller = file_backed_controller(&db_path, common::test_config())?;
        controller.restore_usage().await?;
        assert_eq!(controller.usage().remaining(), 99);

        let overview = controller.show_draft("GEN").await?;
        assert!(overview.is_dirty(), "Unsaved edit is still pending");
        assert_eq!(overview.dirty_segments.len(), 4);
        controller.save_draft("GEN").await?;
    }

    let controller = file_backed_controller(&db_path, common::test_config())?;
    let overview = controller.show_draft("GEN").await?;
    assert!(!overview.is_dirty());
    assert!(overview.draft.content.contains(NEW_VERSE_2));
    Ok(())
}

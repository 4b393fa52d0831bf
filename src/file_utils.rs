use anyhow::{Result, Context};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

// @module: File and directory utilities

/// Extensions accepted as translatable documents
pub const DOCUMENT_EXTENSIONS: &[&str] = &["usfm", "sfm", "txt"];

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_dir()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.as_os_str().is_empty() && !path.exists() {
            fs::create_dir_all(path)
                .with_context(|| format!("Failed to create directory: {:?}", path))?;
        }
        Ok(())
    }

    // @checks: Extension is one of DOCUMENT_EXTENSIONS
    pub fn is_document<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref()
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .is_some_and(|ext| DOCUMENT_EXTENSIONS.contains(&ext.as_str()))
    }

    // @checks: File name already carries the language tag, e.g. `GEN.fr.usfm`
    pub fn is_translation_output<P: AsRef<Path>>(path: P, target_language: &str) -> bool {
        path.as_ref()
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_lowercase())
            .is_some_and(|stem| stem.ends_with(&format!(".{}", target_language.to_lowercase())))
    }

    // @generates: `<stem>.<target>.<ext>` inside output_dir
    pub fn generate_output_path<P1: AsRef<Path>, P2: AsRef<Path>>(
        input_file: P1,
        output_dir: P2,
        target_language: &str,
    ) -> PathBuf {
        let input_file = input_file.as_ref();
        let stem = input_file.file_stem().unwrap_or_default().to_string_lossy();
        let extension = input_file
            .extension()
            .map(|ext| ext.to_string_lossy().to_string())
            .unwrap_or_else(|| "txt".to_string());

        output_dir
            .as_ref()
            .join(format!("{}.{}.{}", stem, target_language, extension))
    }

    /// Find translatable documents below a directory, sorted by path
    ///
    /// Earlier outputs for `target_language` are skipped.
    pub fn find_documents<P: AsRef<Path>>(dir: P, target_language: &str) -> Result<Vec<PathBuf>> {
        let mut result = Vec::new();

        for entry in WalkDir::new(dir.as_ref()).follow_links(true) {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();

            if path.is_file() && Self::is_document(path) && !Self::is_translation_output(path, target_language) {
                result.push(path.to_path_buf());
            }
        }

        result.sort();
        Ok(result)
    }

    // @reads: Whole document as UTF-8
    pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
        fs::read_to_string(&path)
            .with_context(|| format!("Failed to read document: {:?}", path.as_ref()))
    }

    /// Write a document next to a temporary sibling, then rename it into place
    ///
    /// An interrupted run never leaves a truncated output behind.
    pub fn write_to_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            Self::ensure_dir(parent)?;
        }

        let mut staging = path.as_os_str().to_owned();
        staging.push(".partial");
        let staging = PathBuf::from(staging);

        fs::write(&staging, content)
            .with_context(|| format!("Failed to write document: {:?}", staging))?;
        fs::rename(&staging, path)
            .with_context(|| format!("Failed to move {:?} into place at {:?}", staging, path))?;
        Ok(())
    }
}

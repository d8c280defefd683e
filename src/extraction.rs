//! PDF text extraction backed by `pdf-extract`.

use crate::processing::progress::{EXTRACTION_RANGE, ProgressSink};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use thiserror::Error;

const PAGE_BREAK: char = '\x0C';

/// Errors raised while reading a PDF.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The path does not exist.
    #[error("The file {} does not exist.", .0.display())]
    NotFound(PathBuf),
    /// The file exists but could not be read.
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        /// File we attempted to read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The bytes are not a PDF we can extract text from.
    #[error("Failed to extract text from {source_name}: {message}")]
    Malformed {
        /// File name or label of the uploaded document.
        source_name: String,
        /// Parser diagnostic.
        message: String,
    },
}

/// Read the raw bytes of the PDF at `path`.
pub fn read_pdf(path: &Path) -> Result<Vec<u8>, ExtractionError> {
    if !path.exists() {
        return Err(ExtractionError::NotFound(path.to_path_buf()));
    }
    std::fs::read(path).map_err(|source| ExtractionError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Extract the text of each page from an in-memory PDF.
///
/// `pdf-extract` separates pages with form feeds; a trailing empty page is dropped.
pub fn extract_pages(bytes: &[u8], source_name: &str) -> Result<Vec<String>, ExtractionError> {
    let extracted = catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(bytes)))
        .map_err(|_| ExtractionError::Malformed {
            source_name: source_name.to_string(),
            message: "PDF parser panicked".into(),
        })?
        .map_err(|error| ExtractionError::Malformed {
            source_name: source_name.to_string(),
            message: error.to_string(),
        })?;

    let mut pages: Vec<String> = extracted.split(PAGE_BREAK).map(str::to_string).collect();
    if pages.len() > 1 && pages.last().is_some_and(|page| page.trim().is_empty()) {
        pages.pop();
    }
    tracing::debug!(source = source_name, pages = pages.len(), "Extracted PDF pages");
    Ok(pages)
}

/// Concatenate pages, each followed by a newline, reporting progress per page.
pub fn join_pages(pages: &[String], progress: &dyn ProgressSink) -> String {
    let total = pages.len();
    let mut text = String::with_capacity(pages.iter().map(|page| page.len() + 1).sum());
    for (index, page) in pages.iter().enumerate() {
        text.push_str(page);
        text.push('\n');
        progress.report(
            EXTRACTION_RANGE.at(index + 1, total),
            &format!("Extracted page {}/{}", index + 1, total),
        );
    }
    if total == 0 {
        progress.report(EXTRACTION_RANGE.end, "PDF contains no pages");
    }
    text
}

/// Extract all text from the PDF at `path`.
pub fn extract_text_from_pdf(
    path: &Path,
    progress: &dyn ProgressSink,
) -> Result<String, ExtractionError> {
    progress.report(EXTRACTION_RANGE.start, "Reading PDF");
    let bytes = read_pdf(path)?;
    let pages = extract_pages(&bytes, &path.display().to_string())?;
    Ok(join_pages(&pages, progress))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::progress::recording::RecordingProgress;

    #[test]
    fn missing_file_is_not_found() {
        let path = Path::new("does/not/exist.pdf");
        let error = extract_text_from_pdf(path, &RecordingProgress::default())
            .expect_err("missing file");
        assert!(matches!(&error, ExtractionError::NotFound(p) if p == path));
        assert_eq!(error.to_string(), "The file does/not/exist.pdf does not exist.");
    }

    #[test]
    fn garbage_bytes_are_malformed() {
        let error = extract_pages(b"definitely not a pdf", "upload.pdf").expect_err("malformed");
        assert!(
            matches!(&error, ExtractionError::Malformed { source_name, .. } if source_name == "upload.pdf")
        );
    }

    #[test]
    fn pages_are_joined_with_newlines_and_report_progress() {
        let pages = vec!["First page".to_string(), "Second page".to_string()];
        let progress = RecordingProgress::default();

        let text = join_pages(&pages, &progress);

        assert_eq!(text, "First page\nSecond page\n");
        assert_eq!(progress.fractions(), vec![0.25, 0.5]);
        assert_eq!(progress.updates()[1].description, "Extracted page 2/2");
    }
}

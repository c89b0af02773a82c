//! PDF text extraction and document language detection.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use compass_analysis::{DocumentContent, Language};
use regex::Regex;
use tracing::{debug, info};

use crate::error::{AppError, Result};

/// Share of Arabic letters above which a document is treated as Arabic.
const ARABIC_RATIO_THRESHOLD: f64 = 0.3;

/// Arabic, Arabic Supplement, Arabic Extended-A and the presentation forms.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static ARABIC_CHAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\x{0600}-\x{06FF}\x{0750}-\x{077F}\x{08A0}-\x{08FF}\x{FB50}-\x{FDFF}\x{FE70}-\x{FEFF}]")
        .expect("valid regex")
});

/// Word characters that are not digits.
#[allow(clippy::expect_used)]
static LETTER_CHAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\s\d\W]").expect("valid regex"));

/// Guess whether `text` is mostly Arabic or English.
///
/// # Examples
/// ```
/// use compass_analysis::Language;
/// use compass_app::pdf::detect_language;
///
/// assert_eq!(detect_language("Annual sustainability report"), Language::En);
/// assert_eq!(detect_language("تقرير الاستدامة السنوي"), Language::Ar);
/// assert_eq!(detect_language(""), Language::En);
/// ```
pub fn detect_language(text: &str) -> Language {
    let letters = LETTER_CHAR.find_iter(text).count();
    if letters == 0 {
        return Language::En;
    }
    let arabic = ARABIC_CHAR.find_iter(text).count();
    if arabic as f64 / letters as f64 > ARABIC_RATIO_THRESHOLD {
        Language::Ar
    } else {
        Language::En
    }
}

/// Extract text and page count from an in-memory PDF.
///
/// `source` is only used in error messages.
pub fn extract_document_from_bytes(bytes: &[u8], source: &Path) -> Result<DocumentContent> {
    let pdf_error = |message: String| AppError::Pdf {
        path: source.to_path_buf(),
        message,
    };

    let page_count = lopdf::Document::load_mem(bytes)
        .map_err(|e| pdf_error(e.to_string()))?
        .get_pages()
        .len();

    let text = pdf_extract::extract_text_from_mem(bytes).map_err(|e| pdf_error(e.to_string()))?;
    let text = text.trim().to_string();
    if text.is_empty() {
        return Err(pdf_error("no extractable text (scanned document?)".into()));
    }

    let language_detected = detect_language(&text);
    debug!(
        pages = page_count,
        chars = text.chars().count(),
        language = %language_detected,
        "Extracted PDF text"
    );

    Ok(DocumentContent {
        text,
        page_count,
        tables: Vec::new(),
        language_detected,
    })
}

/// Read and extract a PDF file.
pub fn extract_document(path: &Path) -> Result<DocumentContent> {
    let bytes = std::fs::read(path).map_err(|e| AppError::Pdf {
        path: PathBuf::from(path),
        message: e.to_string(),
    })?;
    let document = extract_document_from_bytes(&bytes, path)?;
    info!(
        path = %path.display(),
        pages = document.page_count,
        language = %document.language_detected,
        "Loaded document"
    );
    Ok(document)
}

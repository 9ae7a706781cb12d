use media_core::model::word_count;
use media_core::ports::{ExtractedPdf, PdfExtractError, PdfExtractor};

/// `pdf-extract`-backed implementation of the PDF text-extraction port.
/// `pdf-extract` does layout-unaware text extraction in pure Rust (no
/// libpoppler/libpdfium system dependency), which fits a synchronous, CPU-bound
/// step that the caller runs off the async runtime via `spawn_blocking`.
pub struct PdfExtractTextExtractor;

impl PdfExtractTextExtractor {
	#[must_use]
	pub const fn new() -> Self {
		Self
	}
}

impl Default for PdfExtractTextExtractor {
	fn default() -> Self {
		Self::new()
	}
}

impl PdfExtractor for PdfExtractTextExtractor {
	fn extract(&self, bytes: &[u8]) -> Result<ExtractedPdf, PdfExtractError> {
		let text = pdf_extract::extract_text_from_mem(bytes).map_err(|e| PdfExtractError::InvalidPdf(e.to_string()))?;

		if text.trim().is_empty() {
			return Err(PdfExtractError::EmptyDocument);
		}

		Ok(ExtractedPdf { word_count: word_count(&text), text })
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn rejects_garbage_bytes() {
		let extractor = PdfExtractTextExtractor::new();
		let result = extractor.extract(b"not a pdf");
		assert!(matches!(result, Err(PdfExtractError::InvalidPdf(_))));
	}
}

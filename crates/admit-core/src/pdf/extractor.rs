//! PDF text extraction using lopdf and pdf-extract.

use lopdf::Document;
use tracing::{debug, warn};

use super::{PdfProcessor, PdfType, Result};
use crate::error::PdfError;

/// Default minimum number of non-whitespace characters for a readable PDF.
const DEFAULT_MIN_TEXT_LENGTH: usize = 20;

/// PDF text extractor.
pub struct PdfExtractor {
    document: Option<Document>,
    raw_data: Vec<u8>,
    min_text_length: usize,
}

/// Text extracted from a PDF.
#[derive(Debug, Clone)]
pub struct PdfContent {
    pub pdf_type: PdfType,
    /// Text of the whole document.
    pub text: String,
    pub pages: Vec<PdfPage>,
}

/// Text of a single page.
#[derive(Debug, Clone)]
pub struct PdfPage {
    /// Page number (1-indexed).
    pub number: u32,
    pub text: String,
}

impl PdfExtractor {
    pub fn new() -> Self {
        Self {
            document: None,
            raw_data: Vec::new(),
            min_text_length: DEFAULT_MIN_TEXT_LENGTH,
        }
    }

    /// Minimum amount of text for [`PdfType::Text`].
    pub fn with_min_text_length(mut self, min_text_length: usize) -> Self {
        self.min_text_length = min_text_length;
        self
    }

    /// Whole-document text, per-page text and the classification, reading
    /// the document text once.
    pub fn extract_all(&self) -> Result<PdfContent> {
        let page_count = self.page_count();
        if self.document.is_none() {
            return Err(PdfError::Parse("No document loaded".to_string()));
        }

        let text = self.extract_text()?;
        let pages = (1..=page_count)
            .map(|number| PdfPage {
                number,
                text: self.extract_page_text(number).unwrap_or_else(|e| {
                    warn!("Could not extract text from page {}: {}", number, e);
                    String::new()
                }),
            })
            .collect();

        let pdf_type = self.classify(&text);
        debug!("PDF analysis: {} pages, {} chars text -> {:?}", page_count, text.len(), pdf_type);

        Ok(PdfContent {
            pdf_type,
            text,
            pages,
        })
    }

    fn classify(&self, text: &str) -> PdfType {
        let visible = text.chars().filter(|c| !c.is_whitespace()).count();
        if visible >= self.min_text_length {
            PdfType::Text
        } else {
            PdfType::Empty
        }
    }
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfProcessor for PdfExtractor {
    fn load(&mut self, data: &[u8]) -> Result<()> {
        let mut doc = Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

        // Handle PDFs with empty password encryption
        if doc.is_encrypted() {
            if doc.decrypt("").is_err() {
                return Err(PdfError::Encrypted);
            }
            debug!("Decrypted PDF with empty password");

            // pdf-extract reads from bytes, so keep the decrypted form
            let mut decrypted_data = Vec::new();
            doc.save_to(&mut decrypted_data)
                .map_err(|e| PdfError::Parse(format!("Failed to save decrypted PDF: {}", e)))?;
            self.raw_data = decrypted_data;
        } else {
            self.raw_data = data.to_vec();
        }

        let page_count = doc.get_pages().len();
        if page_count == 0 {
            return Err(PdfError::NoPages);
        }

        debug!("Loaded PDF with {} pages", page_count);
        self.document = Some(doc);
        Ok(())
    }

    fn page_count(&self) -> u32 {
        self.document
            .as_ref()
            .map(|d| d.get_pages().len() as u32)
            .unwrap_or(0)
    }

    fn analyze(&self) -> PdfType {
        match self.extract_text() {
            Ok(text) => self.classify(&text),
            Err(_) => PdfType::Empty,
        }
    }

    fn extract_text(&self) -> Result<String> {
        if self.document.is_none() {
            return Err(PdfError::Parse("No document loaded".to_string()));
        }
        pdf_extract::extract_text_from_mem(&self.raw_data)
            .map_err(|e| PdfError::TextExtraction(e.to_string()))
    }

    fn extract_page_text(&self, page: u32) -> Result<String> {
        let doc = self
            .document
            .as_ref()
            .ok_or_else(|| PdfError::Parse("No document loaded".to_string()))?;

        if page == 0 || page > self.page_count() {
            return Err(PdfError::TextExtraction(format!(
                "page {} out of range (1-{})",
                page,
                self.page_count()
            )));
        }

        doc.extract_text(&[page])
            .map_err(|e| PdfError::TextExtraction(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pdf_extractor_new() {
        let extractor = PdfExtractor::new();
        assert_eq!(extractor.page_count(), 0);
        assert_eq!(extractor.analyze(), PdfType::Empty);
    }

    #[test]
    fn test_operations_need_a_document() {
        let extractor = PdfExtractor::new();
        assert!(matches!(extractor.extract_text(), Err(PdfError::Parse(_))));
        assert!(matches!(extractor.extract_page_text(1), Err(PdfError::Parse(_))));
        assert!(extractor.extract_all().is_err());
    }

    #[test]
    fn test_garbage_is_a_parse_error() {
        let mut extractor = PdfExtractor::new();
        let err = extractor.load(b"definitely not a pdf").unwrap_err();
        assert!(matches!(err, PdfError::Parse(_)));
    }

    #[test]
    fn test_classify_uses_visible_characters() {
        let extractor = PdfExtractor::new().with_min_text_length(5);
        assert_eq!(extractor.classify("  \n\t  abc  "), PdfType::Empty);
        assert_eq!(extractor.classify("GPA: 3.85"), PdfType::Text);
    }

    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Object, Stream};

    /// A single-page PDF with one line of Helvetica text per entry.
    fn one_page_pdf(lines: &[&str]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("TL", vec![14.into()]),
            Operation::new("Td", vec![72.into(), 720.into()]),
        ];
        for line in lines {
            operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
            operations.push(Operation::new("T*", vec![]));
        }
        operations.push(Operation::new("ET", vec![]));
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_text_pdf() {
        let data = one_page_pdf(&["Student: John Smith", "GPA: 3.85", "SAT Score: 1450"]);
        let mut extractor = PdfExtractor::new();
        extractor.load(&data).unwrap();

        assert_eq!(extractor.page_count(), 1);
        assert_eq!(extractor.analyze(), PdfType::Text);

        let content = extractor.extract_all().unwrap();
        assert_eq!(content.pdf_type, PdfType::Text);
        assert!(content.text.contains("John Smith"), "text was {:?}", content.text);
        assert!(content.text.contains("3.85"));
        assert_eq!(content.pages.len(), 1);
        assert_eq!(content.pages[0].number, 1);
        assert!(extractor.extract_page_text(2).is_err());
    }

    #[test]
    fn test_blank_pdf_is_empty() {
        let data = one_page_pdf(&[]);
        let mut extractor = PdfExtractor::new();
        extractor.load(&data).unwrap();

        assert_eq!(extractor.page_count(), 1);
        assert_eq!(extractor.analyze(), PdfType::Empty);
        assert_eq!(extractor.extract_all().unwrap().pdf_type, PdfType::Empty);
    }

    #[test]
    fn test_pdf_without_pages() {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.add_object(dictionary! {
            "Type" => "Pages",
            "Kids" => Vec::<Object>::new(),
            "Count" => 0,
        });
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        let mut data = Vec::new();
        doc.save_to(&mut data).unwrap();

        let mut extractor = PdfExtractor::new();
        assert!(matches!(extractor.load(&data), Err(PdfError::NoPages)));
    }
}

use crate::error::PrepBookError;
use lopdf::Document as LoDocument;
use std::path::Path;

/// What a PDF reader sees in a rendered pack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfInspectReport {
    pub pdf_version: String,
    pub page_count: usize,
    pub encrypted: bool,
    pub file_size_bytes: usize,
}

pub fn inspect_pdf_bytes(bytes: &[u8]) -> Result<PdfInspectReport, PrepBookError> {
    let pdf = LoDocument::load_mem(bytes)?;
    Ok(PdfInspectReport {
        pdf_version: pdf.version.clone(),
        page_count: pdf.get_pages().len(),
        encrypted: pdf.is_encrypted(),
        file_size_bytes: bytes.len(),
    })
}

pub fn inspect_pdf_path(path: &Path) -> Result<PdfInspectReport, PrepBookError> {
    let data = std::fs::read(path)?;
    inspect_pdf_bytes(&data)
}

/// Checks that a written file is one the pack's readers can open and that
/// it carries the pages the layout produced.
pub fn require_readable(
    report: &PdfInspectReport,
    expected_pages: usize,
) -> Result<(), PrepBookError> {
    if report.encrypted {
        return Err(PrepBookError::Pdf("pdf is encrypted".to_string()));
    }
    if report.page_count != expected_pages {
        return Err(PrepBookError::Pdf(format!(
            "pdf has {} pages, layout produced {}",
            report.page_count, expected_pages
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Canvas;
    use crate::pdf::{PdfOptions, document_to_pdf};
    use crate::types::{Pt, Size};
    use std::io::Write;

    fn pdf_bytes(pages: usize) -> Vec<u8> {
        let mut canvas = Canvas::new(Size::letter());
        for index in 0..pages {
            if index > 0 {
                canvas.show_page();
            }
            canvas.draw_string(Pt::from_f32(72.0), Pt::from_f32(72.0), format!("page {index}"));
        }
        document_to_pdf(&canvas.finish(), &PdfOptions::default()).expect("pdf")
    }

    #[test]
    fn reads_version_and_page_count() {
        let bytes = pdf_bytes(3);
        let report = inspect_pdf_bytes(&bytes).expect("inspect");
        assert_eq!(report.page_count, 3);
        assert!(!report.encrypted);
        assert_eq!(report.file_size_bytes, bytes.len());
        assert_eq!(report.pdf_version, "1.7");
        require_readable(&report, 3).expect("readable");
    }

    #[test]
    fn rejects_malformed_data() {
        let err = inspect_pdf_bytes(b"not a pdf").expect_err("invalid");
        assert!(matches!(err, PrepBookError::Pdf(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let missing = std::env::temp_dir().join(format!(
            "prepbook_pdfinspect_missing_{}.pdf",
            std::process::id()
        ));
        let err = inspect_pdf_path(&missing).expect_err("missing");
        assert!(matches!(err, PrepBookError::Io(_)));
    }

    #[test]
    fn page_count_mismatch_is_reported() {
        let report = PdfInspectReport {
            pdf_version: "1.7".to_string(),
            page_count: 2,
            encrypted: false,
            file_size_bytes: 0,
        };
        let err = require_readable(&report, 3).expect_err("mismatch");
        assert!(err.to_string().contains("2 pages"));

        let encrypted = PdfInspectReport {
            encrypted: true,
            ..report
        };
        assert!(require_readable(&encrypted, 2).is_err());
    }

    #[test]
    fn path_report_matches_bytes_report() {
        let bytes = pdf_bytes(1);
        let path = std::env::temp_dir().join(format!(
            "prepbook_pdfinspect_path_{}.pdf",
            std::process::id()
        ));
        let mut file = std::fs::File::create(&path).expect("create");
        file.write_all(&bytes).expect("write");
        drop(file);

        let from_path = inspect_pdf_path(&path).expect("inspect path");
        let from_bytes = inspect_pdf_bytes(&bytes).expect("inspect bytes");
        assert_eq!(from_path, from_bytes);
        let _ = std::fs::remove_file(&path);
    }
}

use crate::canvas::Document;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageMetrics {
    pub page_number: usize,
    pub command_count: usize,
    pub block_count: usize,
    /// Size of the page's content stream as written, after compression.
    pub content_bytes: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentMetrics {
    pub pages: Vec<PageMetrics>,
    pub total_bytes: usize,
}

impl DocumentMetrics {
    pub fn collect(document: &Document, total_bytes: usize) -> Self {
        let pages = document
            .pages
            .iter()
            .enumerate()
            .map(|(index, page)| PageMetrics {
                page_number: index + 1,
                command_count: page.commands.len(),
                block_count: page.block_kinds().len(),
                content_bytes: 0,
            })
            .collect();
        Self { pages, total_bytes }
    }
}

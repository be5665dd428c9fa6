pub mod enhance;
pub mod frontmatter;
pub mod sources;

use enhance::EnhancedDocument;

/// Two-pass pipeline: raw text → (metadata, body) → enhanced document.
pub fn process_document(raw: &str) -> EnhancedDocument {
    let (metadata, body) = frontmatter::extract(raw);
    enhance::enhance(metadata, &body)
}

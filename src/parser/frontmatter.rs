use indexmap::IndexMap;

/// Ordered frontmatter keys and values.
pub type Metadata = IndexMap<String, String>;

const DELIMITER: &str = "---";

/// Split `text` into its `---` delimited key/value block and the body.
///
/// Missing or unterminated frontmatter yields empty metadata and the text
/// unchanged.
pub fn extract(text: &str) -> (Metadata, String) {
    let mut lines = text.split_inclusive('\n');

    let first = match lines.next() {
        Some(line) if line.trim_end() == DELIMITER => line,
        _ => return (Metadata::new(), text.to_string()),
    };

    let mut metadata = Metadata::new();
    let mut offset = first.len();

    for line in lines {
        offset += line.len();
        if line.trim_end() == DELIMITER {
            let body = text[offset..].trim().to_string();
            return (metadata, body);
        }
        if let Some((key, value)) = line.split_once(':') {
            metadata.insert(key.trim().to_string(), value.trim().to_string());
        }
    }

    // Never closed
    (Metadata::new(), text.to_string())
}

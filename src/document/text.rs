use std::path::Path;

use crate::error::{FactCheckError, Result};

pub fn extract_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(FactCheckError::Io)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn reads_plain_text() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "Hello, World!").unwrap();
        let text = extract_text(file.path()).unwrap();
        assert!(text.contains("Hello, World!"));
    }
}

//! File-backed code buffer.
//!
//! The buffer is the only "editor" this client has: it holds the text that
//! audit/optimize requests send and is refreshed from disk on demand.

use anyhow::{Context, Result};
use std::io::Read;
use std::path::{Path, PathBuf};

pub const PLACEHOLDER: &str = "// Paste C++ or Java code here...";

#[derive(Debug, Clone)]
pub struct CodeBuffer {
    path: Option<PathBuf>,
    text: String,
}

impl Default for CodeBuffer {
    fn default() -> Self {
        Self {
            path: None,
            text: PLACEHOLDER.to_string(),
        }
    }
}

impl CodeBuffer {
    /// Load from `path`; `-` reads stdin once (and cannot be reloaded).
    pub fn open(path: &Path) -> Result<Self> {
        if path == Path::new("-") {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("read code from stdin")?;
            return Ok(Self { path: None, text });
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read code from {}", path.display()))?;
        Ok(Self {
            path: Some(path.to_path_buf()),
            text,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn line_count(&self) -> usize {
        self.text.lines().count()
    }

    /// Re-read the backing file. Returns whether the text changed.
    pub fn reload(&mut self) -> Result<bool> {
        let Some(path) = self.path.as_ref() else {
            return Ok(false);
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read code from {}", path.display()))?;
        if text == self.text {
            return Ok(false);
        }
        self.text = text;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reload_reports_changes_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main.cpp");
        std::fs::write(&path, "int main(){}").unwrap();

        let mut buf = CodeBuffer::open(&path).unwrap();
        assert_eq!(buf.text(), "int main(){}");
        assert!(!buf.reload().unwrap());

        std::fs::write(&path, "int main(){ return 0; }").unwrap();
        assert!(buf.reload().unwrap());
        assert_eq!(buf.text(), "int main(){ return 0; }");
    }

    #[test]
    fn default_buffer_has_placeholder_and_no_file() {
        let mut buf = CodeBuffer::default();
        assert_eq!(buf.text(), PLACEHOLDER);
        assert!(!buf.reload().unwrap());
    }
}

use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceId(pub u32);

#[derive(Debug, Clone)]
pub struct SourceFile {
    pub id: SourceId,
    pub path: PathBuf,
    pub contents: String,
}

impl SourceFile {
    pub fn new(id: SourceId, path: PathBuf, contents: String) -> Self {
        Self { id, path, contents }
    }

    /// Source text that did not come from disk, such as a REPL submission.
    pub fn from_snippet(id: SourceId, label: &str, contents: impl Into<String>) -> Self {
        Self::new(id, PathBuf::from(format!("<{label}>")), contents.into())
    }

    pub fn lines(&self) -> Vec<&str> {
        self.contents.lines().collect()
    }
}

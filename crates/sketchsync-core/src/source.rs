//! The sketch being edited: an ordered list of named tabs.

use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    /// Sugared sketch code, concatenated and preprocessed
    Pde,
    /// Plain Java, compiled as-is
    Java,
}

impl FileKind {
    pub fn from_name(name: &str) -> Self {
        if name.ends_with(".java") {
            FileKind::Java
        } else {
            FileKind::Pde
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub name: String,
    pub kind: FileKind,
    pub text: String,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        let name = name.into();
        SourceFile {
            kind: FileKind::from_name(&name),
            name,
            text: text.into(),
        }
    }
}

/// Live contents of the sketch's tabs.
///
/// Read by the preprocessing worker at the start of every rebuild, so
/// implementations must hand out a consistent copy.
pub trait SketchSource: Send + Sync {
    fn files(&self) -> Vec<SourceFile>;

    fn has_java_tabs(&self) -> bool {
        self.files().iter().any(|f| f.kind == FileKind::Java)
    }
}

/// Tabs kept in memory.
#[derive(Debug, Default)]
pub struct InMemorySketch {
    files: RwLock<Vec<SourceFile>>,
}

impl InMemorySketch {
    pub fn new(files: Vec<SourceFile>) -> Self {
        InMemorySketch {
            files: RwLock::new(files),
        }
    }

    pub fn from_texts<N, T>(texts: impl IntoIterator<Item = (N, T)>) -> Self
    where
        N: Into<String>,
        T: Into<String>,
    {
        Self::new(
            texts
                .into_iter()
                .map(|(name, text)| SourceFile::new(name, text))
                .collect(),
        )
    }

    /// Replace the text of tab `index`. Returns `false` if there is no such tab.
    pub fn set_text(&self, index: usize, text: impl Into<String>) -> bool {
        let mut files = self.files.write().unwrap_or_else(PoisonError::into_inner);
        match files.get_mut(index) {
            Some(file) => {
                file.text = text.into();
                true
            }
            None => false,
        }
    }

    pub fn add_file(&self, file: SourceFile) {
        self.files
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(file);
    }

    pub fn remove_file(&self, index: usize) -> Option<SourceFile> {
        let mut files = self.files.write().unwrap_or_else(PoisonError::into_inner);
        (index < files.len()).then(|| files.remove(index))
    }

    pub fn len(&self) -> usize {
        self.files.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SketchSource for InMemorySketch {
    fn files(&self) -> Vec<SourceFile> {
        self.files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_name() {
        assert_eq!(FileKind::from_name("Bounce.pde"), FileKind::Pde);
        assert_eq!(FileKind::from_name("Helper.java"), FileKind::Java);
        assert_eq!(FileKind::from_name("untitled"), FileKind::Pde);
    }

    #[test]
    fn test_edit_tabs() {
        let sketch = InMemorySketch::from_texts([("A.pde", "int x;"), ("B.pde", "")]);
        assert!(sketch.set_text(1, "int y;"));
        assert!(!sketch.set_text(5, "nope"));
        assert_eq!(sketch.files()[1].text, "int y;");
        assert!(!sketch.has_java_tabs());

        sketch.add_file(SourceFile::new("C.java", "class C {}"));
        assert!(sketch.has_java_tabs());
        assert_eq!(sketch.remove_file(2).map(|f| f.name), Some("C.java".to_string()));
        assert_eq!(sketch.len(), 2);
    }
}

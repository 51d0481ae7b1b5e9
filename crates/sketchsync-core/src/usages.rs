//! Find-usages and rename over a snapshot.
//!
//! Both start from an original-coordinate position, look up the name the
//! binder attached to the derived text at that point, and map every
//! occurrence of the same declaration back into the tabs. Occurrences that
//! only exist in generated code (the sketch class name, for example) do not
//! survive the round trip and are dropped.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use sketchsync_frontend::keywords::is_keyword;
use sketchsync_frontend::{Bindings, DeclId, DeclKind, NameRef, Symbol};
use tracing::{debug, warn};

use crate::error::RenameError;
use crate::sketch::{FileInterval, PreprocessedSketch, SketchInterval};
use crate::source::SourceFile;

/// Occurrences of one declaration inside a single tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileUsages {
    pub file_index: usize,
    pub file_name: String,
    /// Sorted by start offset
    pub intervals: Vec<FileInterval>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Usages {
    pub name: String,
    pub kind: DeclKind,
    pub files: Vec<FileUsages>,
}

impl Usages {
    pub fn count(&self) -> usize {
        self.files.iter().map(|f| f.intervals.len()).sum()
    }
}

/// Every in-sketch occurrence of the declaration named at `start..stop` in
/// tab `file_index`.
///
/// Returns `None` when the snapshot has no bindings, nothing is named there,
/// or the name refers to something outside the sketch.
pub fn find_usages(sketch: &PreprocessedSketch, file_index: usize, start: usize, stop: usize) -> Option<Usages> {
    let bindings = sketch.bindings()?;
    let name = name_at(sketch, bindings, file_index, start, stop)?;
    let Some(Symbol::Local(decl)) = bindings.symbol_of(name.id) else {
        return None;
    };
    let decl = bindings.declaration(*decl)?;
    Some(Usages {
        name: decl.name.clone(),
        kind: decl.kind,
        files: collect(sketch, bindings, decl.id),
    })
}

fn name_at<'b>(
    sketch: &PreprocessedSketch,
    bindings: &'b Bindings,
    file_index: usize,
    start: usize,
    stop: usize,
) -> Option<&'b NameRef> {
    let derived = sketch.map_original_to_derived(file_index, start)?;
    let name = bindings.name_at(derived)?;
    if stop > start {
        let derived_stop = sketch.map_original_to_derived(file_index, stop)?;
        if derived_stop > name.span.end {
            return None;
        }
    }
    Some(name)
}

/// Declarations that share a spelling with `decl` and must move together:
/// a class and its constructors.
fn linked_declarations(bindings: &Bindings, decl: DeclId) -> BTreeSet<DeclId> {
    let mut linked = BTreeSet::from([decl]);
    let class = match bindings.declaration(decl) {
        Some(d) if d.kind == DeclKind::Constructor => d.container,
        Some(d) if d.kind.is_type() => Some(d.id),
        _ => None,
    };
    if let Some(class) = class {
        linked.insert(class);
        linked.extend(bindings.constructors_of(class).iter().copied());
    }
    linked
}

fn collect(sketch: &PreprocessedSketch, bindings: &Bindings, decl: DeclId) -> Vec<FileUsages> {
    let mut occurrences: Vec<&NameRef> = linked_declarations(bindings, decl)
        .into_iter()
        .flat_map(|id| bindings.occurrences(&Symbol::Local(id)))
        .collect();
    occurrences.sort_by_key(|n| n.span.start);
    occurrences.dedup_by_key(|n| n.span.start);

    let mut by_file: BTreeMap<usize, Vec<FileInterval>> = BTreeMap::new();
    for name in occurrences {
        let interval = sketch.map_derived_to_original(name.span.start, name.span.end);
        if !sketch.in_range(&interval) {
            debug!(name = %name.text, start = name.span.start, "Occurrence is not in the sketch text");
            continue;
        }
        if let SketchInterval::Mapped(interval) = interval {
            by_file.entry(interval.file_index).or_default().push(interval);
        }
    }

    by_file
        .into_iter()
        .map(|(file_index, mut intervals)| {
            intervals.sort_by_key(|i| i.start_file_offset);
            FileUsages {
                file_index,
                file_name: sketch.file(file_index).map(|f| f.name.clone()).unwrap_or_default(),
                intervals,
            }
        })
        .collect()
}

/// Text replacements for one rename, grouped by tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenamePlan {
    pub old_name: String,
    pub new_name: String,
    pub files: Vec<FileUsages>,
}

impl RenamePlan {
    pub fn edit_count(&self) -> usize {
        self.files.iter().map(|f| f.intervals.len()).sum()
    }

    /// Copies of `files` with the rename applied. Tabs the plan does not
    /// touch are returned unchanged.
    pub fn apply(&self, files: &[SourceFile]) -> Vec<SourceFile> {
        let mut out = files.to_vec();
        for group in &self.files {
            let Some(file) = out.get_mut(group.file_index) else {
                warn!(file_index = group.file_index, "Rename targets a missing tab");
                continue;
            };
            file.text = self.apply_to_text(&file.text, &group.intervals);
        }
        out
    }

    fn apply_to_text(&self, text: &str, intervals: &[FileInterval]) -> String {
        let mut text = text.to_string();
        // From the end so earlier offsets stay valid
        for interval in intervals.iter().rev() {
            let range = interval.start_file_offset..interval.stop_file_offset;
            if text.get(range.clone()) != Some(self.old_name.as_str()) {
                warn!(
                    start = range.start,
                    old_name = %self.old_name,
                    "Tab changed since the rename was planned; skipping occurrence"
                );
                continue;
            }
            text.replace_range(range, &self.new_name);
        }
        text
    }
}

/// Plan renaming the declaration named at `offset` in tab `file_index`.
pub fn plan_rename(
    sketch: &PreprocessedSketch,
    file_index: usize,
    offset: usize,
    new_name: &str,
) -> Result<RenamePlan, RenameError> {
    if sketch.has_syntax_errors() {
        return Err(RenameError::SyntaxErrors);
    }
    let bindings = sketch.bindings().ok_or(RenameError::SyntaxErrors)?;
    if !is_valid_identifier(new_name) {
        return Err(RenameError::InvalidName(new_name.to_string()));
    }
    let name = name_at(sketch, bindings, file_index, offset, offset).ok_or(RenameError::NoIdentifier)?;
    let decl = match bindings.symbol_of(name.id) {
        Some(Symbol::Local(decl)) => *decl,
        Some(Symbol::External(_)) => return Err(RenameError::NotInSketch(name.text.clone())),
        None => return Err(RenameError::NoIdentifier),
    };
    let old_name = bindings
        .declaration(decl)
        .map_or_else(|| name.text.clone(), |d| d.name.clone());

    let files = collect(sketch, bindings, decl);
    debug!(
        old_name = %old_name,
        new_name,
        files = files.len(),
        "Planned rename"
    );
    Ok(RenamePlan {
        old_name,
        new_name: new_name.to_string(),
        files,
    })
}

/// Plan and apply in one step.
pub fn apply_rename(
    sketch: &PreprocessedSketch,
    files: &[SourceFile],
    file_index: usize,
    offset: usize,
    new_name: &str,
) -> Result<Vec<SourceFile>, RenameError> {
    Ok(plan_rename(sketch, file_index, offset, new_name)?.apply(files))
}

fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_alphabetic() || first == '_' || first == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
        && !is_keyword(name)
        && !matches!(name, "true" | "false" | "null")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::classpath::{ClassPathCache, ClassPathProvider, DefaultClassPathProvider};
    use crate::observer::NoopObserver;
    use crate::pipeline::Pipeline;

    fn snapshot(files: &[SourceFile]) -> PreprocessedSketch {
        let provider: Arc<dyn ClassPathProvider> = Arc::new(DefaultClassPathProvider::new());
        Pipeline::new("sketch", ClassPathCache::new(provider), Arc::new(NoopObserver)).run(1, files)
    }

    fn tabs(a: &str, b: &str) -> Vec<SourceFile> {
        vec![SourceFile::new("A", a), SourceFile::new("B", b)]
    }

    #[test]
    fn test_usages_span_tabs() {
        let files = tabs("void f(){y=1;}", "int y;");
        let sketch = snapshot(&files);
        let usages = find_usages(&sketch, 0, 9, 10).unwrap();
        assert_eq!(usages.name, "y");
        assert_eq!(usages.kind, DeclKind::Field);
        assert_eq!(usages.count(), 2);
        assert_eq!(usages.files[0].file_index, 0);
        assert_eq!(usages.files[0].intervals[0].start_file_offset, 9);
        assert_eq!(usages.files[1].file_index, 1);
        assert_eq!(usages.files[1].intervals[0].start_file_offset, 4);
    }

    #[test]
    fn test_external_names_have_no_usages() {
        let files = tabs("void setup(){size(10,10);}", "");
        let sketch = snapshot(&files);
        assert!(find_usages(&sketch, 0, 13, 17).is_none());
        assert_eq!(
            plan_rename(&sketch, 0, 13, "dims").unwrap_err(),
            RenameError::NotInSketch("size".to_string())
        );
    }

    #[test]
    fn test_rename_field() {
        let files = tabs("void f(){y=1;}", "int y;");
        let sketch = snapshot(&files);
        let renamed = apply_rename(&sketch, &files, 1, 4, "z").unwrap();
        assert_eq!(renamed[0].text, "void f(){z=1;}");
        assert_eq!(renamed[1].text, "int z;");
    }

    #[test]
    fn test_rename_class_moves_constructors() {
        let files = tabs(
            "Ball b;\nvoid setup(){b=new Ball();}",
            "class Ball {\n  Ball() {}\n}",
        );
        let sketch = snapshot(&files);
        let plan = plan_rename(&sketch, 1, 6, "Puck").unwrap();
        assert_eq!(plan.old_name, "Ball");
        let renamed = plan.apply(&files);
        assert_eq!(renamed[0].text, "Puck b;\nvoid setup(){b=new Puck();}");
        assert_eq!(renamed[1].text, "class Puck {\n  Puck() {}\n}");

        // Starting from the constructor gives the same edits
        let from_ctor = plan_rename(&sketch, 1, 15, "Puck").unwrap();
        assert_eq!(from_ctor.edit_count(), plan.edit_count());
    }

    #[test]
    fn test_rename_refusals() {
        let broken = tabs("void f(){x}", "int y;");
        assert_eq!(
            plan_rename(&snapshot(&broken), 1, 4, "z").unwrap_err(),
            RenameError::SyntaxErrors
        );

        let files = tabs("void f(){y=1;}", "int y;");
        let sketch = snapshot(&files);
        assert_eq!(
            plan_rename(&sketch, 1, 4, "int").unwrap_err(),
            RenameError::InvalidName("int".to_string())
        );
        assert_eq!(
            plan_rename(&sketch, 1, 4, "9lives").unwrap_err(),
            RenameError::InvalidName("9lives".to_string())
        );
        assert_eq!(plan_rename(&sketch, 0, 12, "z").unwrap_err(), RenameError::NoIdentifier);
    }

    #[test]
    fn test_stale_text_is_skipped() {
        let files = tabs("void f(){y=1;}", "int y;");
        let sketch = snapshot(&files);
        let plan = plan_rename(&sketch, 1, 4, "z").unwrap();
        let edited = tabs("void f(){w=1;}", "int y;");
        let renamed = plan.apply(&edited);
        assert_eq!(renamed[0].text, "void f(){w=1;}");
        assert_eq!(renamed[1].text, "int z;");
    }
}

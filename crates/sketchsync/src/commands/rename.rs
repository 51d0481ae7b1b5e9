//! Rename command implementation

use anyhow::{Context, Result};
use sketchsync_core::plan_rename;
use tracing::info;

use crate::SketchArgs;

pub fn execute(args: &SketchArgs, file: usize, offset: usize, new_name: &str, write: bool) -> Result<()> {
    let loaded = super::load(args)?;
    let plan = plan_rename(&loaded.snapshot, file, offset, new_name)?;
    info!(
        old_name = %plan.old_name,
        new_name,
        edits = plan.edit_count(),
        "Renaming"
    );
    let renamed = plan.apply(&loaded.files);

    for ((original, updated), path) in loaded.files.iter().zip(&renamed).zip(&args.files) {
        if original.text == updated.text {
            continue;
        }
        if write {
            std::fs::write(path, &updated.text).with_context(|| format!("Failed to write {}", path.display()))?;
        } else {
            println!("== {} ==", updated.name);
            print!("{}", updated.text);
            if !updated.text.ends_with('\n') {
                println!();
            }
        }
    }
    Ok(())
}

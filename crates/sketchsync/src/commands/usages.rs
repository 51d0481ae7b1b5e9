//! Usages command implementation

use anyhow::Result;
use sketchsync_core::find_usages;

use crate::SketchArgs;

pub fn execute(args: &SketchArgs, file: usize, offset: usize, json: bool) -> Result<()> {
    let loaded = super::load(args)?;
    let snapshot = &loaded.snapshot;
    if snapshot.file(file).is_none() {
        anyhow::bail!("There is no tab {file}; the sketch has {}", snapshot.files().len());
    }
    let Some(usages) = find_usages(snapshot, file, offset, offset) else {
        anyhow::bail!("No sketch declaration is named at {file}:{offset}");
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&usages)?);
        return Ok(());
    }
    for group in &usages.files {
        let Some(tab) = snapshot.file(group.file_index) else {
            continue;
        };
        for interval in &group.intervals {
            let range = tab.range(interval.start_file_offset, interval.stop_file_offset);
            println!(
                "{}:{}:{}: {}",
                tab.name,
                range.start.row + 1,
                range.start.column + 1,
                usages.name
            );
        }
    }
    Ok(())
}

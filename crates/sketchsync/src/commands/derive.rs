//! Derive command implementation

use anyhow::Result;

use crate::SketchArgs;

pub fn execute(args: &SketchArgs) -> Result<()> {
    let loaded = super::load(args)?;
    if loaded.snapshot.tree().is_none() {
        anyhow::bail!("The sketch could not be preprocessed; run `sketchsync check` for details");
    }
    print!("{}", loaded.snapshot.java_code());
    Ok(())
}

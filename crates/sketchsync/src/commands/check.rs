//! Check command implementation

use anyhow::Result;
use sketchsync_core::check_sketch;
use tracing::info;

use crate::SketchArgs;

#[derive(Debug)]
pub struct CheckArgs {
    pub sketch: SketchArgs,
    pub warnings: bool,
    pub import_suggestions: bool,
    pub json: bool,
}

/// Print the sketch's problems. Returns whether any of them is an error.
pub fn execute(args: CheckArgs) -> Result<bool> {
    let loaded = super::load(&args.sketch)?;
    let mut config = loaded.config.checker;
    config.warnings_enabled |= args.warnings;
    config.import_suggest_enabled &= args.import_suggestions;

    let problems = check_sketch(&loaded.snapshot, &config);
    info!(problems = problems.len(), "Checked sketch");

    if args.json {
        println!("{}", serde_json::to_string_pretty(&problems)?);
    } else {
        for problem in &problems {
            println!("{}", problem.to_diagnostic().to_text());
        }
    }
    Ok(problems.iter().any(|p| p.is_error()))
}

//! `setdiff`: line-set difference of two files.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use harvester_core::line_set_diff;

pub fn run_setdiff_command(a: &Path, b: &Path) -> Result<()> {
    let left = fs::read_to_string(a).with_context(|| format!("Failed to read '{}'", a.display()))?;
    let right =
        fs::read_to_string(b).with_context(|| format!("Failed to read '{}'", b.display()))?;
    for line in line_set_diff(&left, &right) {
        println!("{line}");
    }
    Ok(())
}

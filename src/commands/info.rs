//! `info`: print the session header of Hansard XML files.

use std::path::PathBuf;

use anyhow::Result;
use harvester_core::SessionHeader;

/// Prints one summary line per file, stopping at the first unreadable file.
pub fn run_info_command(files: &[PathBuf]) -> Result<()> {
    for path in files {
        let header = SessionHeader::read(path)?;
        println!("{header}");
    }
    Ok(())
}

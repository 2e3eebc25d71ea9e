//! Line-set difference between two text files.

use std::collections::BTreeSet;

/// Returns `- line` for each line only in `a`, then `+ line` for each line only in `b`.
///
/// Both groups are sorted and duplicates within a file count once.
#[must_use]
pub fn line_set_diff(a: &str, b: &str) -> Vec<String> {
    let a: BTreeSet<&str> = a.lines().collect();
    let b: BTreeSet<&str> = b.lines().collect();

    a.difference(&b)
        .map(|line| format!("- {line}"))
        .chain(b.difference(&a).map(|line| format!("+ {line}")))
        .collect()
}

//! Line-level diff between two canonical snapshots.

/// One changed line in a snapshot diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffLine {
    Added(String),
    Removed(String),
}

impl std::fmt::Display for DiffLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiffLine::Added(line) => write!(f, "+ {}", line),
            DiffLine::Removed(line) => write!(f, "- {}", line),
        }
    }
}

/// Additions and removals between `old` and `new`, in document order.
///
/// Longest-common-subsequence walk over whole lines. Snapshots are short
/// canonical text, so the quadratic table is fine here.
pub fn diff_lines(old: &str, new: &str) -> Vec<DiffLine> {
    let a: Vec<&str> = old.lines().collect();
    let b: Vec<&str> = new.lines().collect();

    let mut table = vec![vec![0u32; b.len() + 1]; a.len() + 1];
    for i in (0..a.len()).rev() {
        for j in (0..b.len()).rev() {
            table[i][j] = if a[i] == b[j] {
                table[i + 1][j + 1] + 1
            } else {
                table[i + 1][j].max(table[i][j + 1])
            };
        }
    }

    let mut changes = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        if a[i] == b[j] {
            i += 1;
            j += 1;
        } else if table[i + 1][j] >= table[i][j + 1] {
            changes.push(DiffLine::Removed(a[i].to_string()));
            i += 1;
        } else {
            changes.push(DiffLine::Added(b[j].to_string()));
            j += 1;
        }
    }
    while i < a.len() {
        changes.push(DiffLine::Removed(a[i].to_string()));
        i += 1;
    }
    while j < b.len() {
        changes.push(DiffLine::Added(b[j].to_string()));
        j += 1;
    }

    changes
}

//! Line-oriented diff of two texts (longest common subsequence).

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineChange {
    Unchanged,
    Added,
    Removed,
}

impl LineChange {
    /// Marker printed in front of the line.
    pub fn marker(self) -> char {
        match self {
            Self::Unchanged => ' ',
            Self::Added => '+',
            Self::Removed => '-',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffLine {
    pub change: LineChange,
    pub text: String,
}

impl DiffLine {
    fn new(change: LineChange, text: &str) -> Self {
        Self {
            change,
            text: text.to_string(),
        }
    }
}

/// Every line of `text` marked with `change`.
pub fn uniform(text: &str, change: LineChange) -> Vec<DiffLine> {
    text.lines().map(|line| DiffLine::new(change, line)).collect()
}

/// Minimal line diff; within a changed run, removals come before additions.
pub fn diff_lines(old: &str, new: &str) -> Vec<DiffLine> {
    let old: Vec<&str> = old.lines().collect();
    let new: Vec<&str> = new.lines().collect();
    let (n, m) = (old.len(), new.len());

    // lcs[i][j] = length of the LCS of old[i..] and new[j..]
    let mut lcs = vec![vec![0u32; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lcs[i][j] = if old[i] == new[j] {
                lcs[i + 1][j + 1] + 1
            } else {
                lcs[i + 1][j].max(lcs[i][j + 1])
            };
        }
    }

    let mut lines = Vec::with_capacity(n.max(m));
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if old[i] == new[j] {
            lines.push(DiffLine::new(LineChange::Unchanged, old[i]));
            i += 1;
            j += 1;
        } else if lcs[i + 1][j] >= lcs[i][j + 1] {
            lines.push(DiffLine::new(LineChange::Removed, old[i]));
            i += 1;
        } else {
            lines.push(DiffLine::new(LineChange::Added, new[j]));
            j += 1;
        }
    }
    lines.extend(old[i..].iter().map(|l| DiffLine::new(LineChange::Removed, l)));
    lines.extend(new[j..].iter().map(|l| DiffLine::new(LineChange::Added, l)));
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn render(lines: &[DiffLine]) -> Vec<String> {
        lines
            .iter()
            .map(|l| format!("{}{}", l.change.marker(), l.text))
            .collect()
    }

    #[test]
    fn identical_texts_are_unchanged() {
        let lines = diff_lines("a\nb\n", "a\nb\n");
        assert!(lines.iter().all(|l| l.change == LineChange::Unchanged));
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn replacement_removes_before_adding() {
        let lines = diff_lines("name: a\nport: 1\n", "name: b\nport: 1\n");
        assert_eq!(render(&lines), vec!["-name: a", "+name: b", " port: 1"]);
    }

    #[test]
    fn insertion_in_the_middle() {
        let lines = diff_lines("a\nc\n", "a\nb\nc\n");
        assert_eq!(render(&lines), vec![" a", "+b", " c"]);
    }

    #[test]
    fn trailing_changes() {
        let lines = diff_lines("a\nb\n", "a\n");
        assert_eq!(render(&lines), vec![" a", "-b"]);
        let lines = diff_lines("", "x\n");
        assert_eq!(render(&lines), vec!["+x"]);
    }

    #[test]
    fn uniform_marks_all_lines() {
        let lines = uniform("a\nb\n", LineChange::Added);
        assert_eq!(render(&lines), vec!["+a", "+b"]);
    }
}

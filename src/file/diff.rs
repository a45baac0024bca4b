// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Line based text diffing.
//!
//! Computes the difference between two texts as a sequence of equal, insert,
//! and delete operations over whole lines. Line endings stay attached to
//! their lines, so concatenating the equal and delete operations always
//! reproduces the old text, and concatenating the equal and insert operations
//! always reproduces the new text.
//!
//! # Semantic Cleanup
//!
//! A raw shortest edit script happily interleaves tiny runs of equal lines
//! between large edits, e.g., a lone blank line or closing brace that both
//! sides happen to share. That is minimal, but hard to read. So,
//! [`cleanup_semantic`] folds any equality that is no longer than the edits
//! on both of its sides into those edits, and coalesces adjacent edits into
//! one delete followed by one insert.
//!
//! # See Also
//!
//! 1. [An O(ND) Difference Algorithm and Its Variations](http://www.xmailserver.org/diff2.pdf)

use std::{
    collections::HashSet,
    fmt::{Display, Formatter, Result as FmtResult},
};

/// Kind of diff operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Text present on both sides.
    Equal,

    /// Text only present in the new side.
    Insert,

    /// Text only present in the old side.
    Delete,
}

/// One diff operation over a run of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diff {
    pub operation: Operation,
    pub text: String,
}

impl Diff {
    /// Construct new diff operation.
    pub fn new(operation: Operation, text: impl Into<String>) -> Self {
        Self {
            operation,
            text: text.into(),
        }
    }
}

impl Display for Diff {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        let prefix = match self.operation {
            Operation::Equal => ' ',
            Operation::Insert => '+',
            Operation::Delete => '-',
        };

        for line in self.text.split_inclusive('\n') {
            write!(fmt, "{prefix}{line}")?;
            if !line.ends_with('\n') {
                writeln!(fmt)?;
            }
        }

        Ok(())
    }
}

/// Render diff operations as plain prefixed lines.
pub fn render(diffs: &[Diff]) -> String {
    diffs.iter().map(ToString::to_string).collect()
}

/// Compute line diff between old and new text.
///
/// Uses the linear space variant of Myers' algorithm. Deletions always come
/// before insertions within a run of edits.
pub fn diff_lines(old: &str, new: &str) -> Vec<Diff> {
    let old_lines = old.split_inclusive('\n').collect::<Vec<_>>();
    let new_lines = new.split_inclusive('\n').collect::<Vec<_>>();

    let mut diffs: Vec<Diff> = Vec::new();
    for edit in shortest_edit(&old_lines, &new_lines) {
        let (operation, line) = match edit {
            Edit::Equal(index) => (Operation::Equal, old_lines[index]),
            Edit::Delete(index) => (Operation::Delete, old_lines[index]),
            Edit::Insert(index) => (Operation::Insert, new_lines[index]),
        };

        match diffs.last_mut() {
            Some(last) if last.operation == operation => last.text.push_str(line),
            _ => diffs.push(Diff::new(operation, line)),
        }
    }

    normalize(diffs)
}

/// Fold trivial equalities into surrounding edits.
///
/// Repeats until no equality qualifies, since every fold merges edits and can
/// expose a new candidate.
pub fn cleanup_semantic(diffs: Vec<Diff>) -> Vec<Diff> {
    let mut diffs = normalize(diffs);

    loop {
        let candidate = (1..diffs.len().saturating_sub(1)).find(|&index| {
            if diffs[index].operation != Operation::Equal {
                return false;
            }

            let equal_len = diffs[index].text.chars().count();
            let (before_insert, before_delete) = edit_lengths(diffs[..index].iter().rev());
            let (after_insert, after_delete) = edit_lengths(diffs[index + 1..].iter());

            equal_len <= before_insert.max(before_delete) && equal_len <= after_insert.max(after_delete)
        });

        let Some(index) = candidate else {
            break;
        };

        let equality = diffs.remove(index);
        diffs.insert(index, Diff::new(Operation::Insert, equality.text.clone()));
        diffs.insert(index, Diff::new(Operation::Delete, equality.text));
        diffs = normalize(diffs);
    }

    diffs
}

/// Sum lengths of inserts and deletes until the next equality.
fn edit_lengths<'a>(diffs: impl Iterator<Item = &'a Diff>) -> (usize, usize) {
    let mut inserted = 0;
    let mut deleted = 0;
    for diff in diffs {
        match diff.operation {
            Operation::Equal => break,
            Operation::Insert => inserted += diff.text.chars().count(),
            Operation::Delete => deleted += diff.text.chars().count(),
        }
    }

    (inserted, deleted)
}

/// Coalesce runs of operations.
///
/// Each run of edits between two equalities becomes at most one delete
/// followed by at most one insert. Adjacent equalities are joined, and empty
/// operations are dropped.
fn normalize(diffs: Vec<Diff>) -> Vec<Diff> {
    let mut result: Vec<Diff> = Vec::with_capacity(diffs.len());
    let mut deleted = String::new();
    let mut inserted = String::new();

    let flush = |result: &mut Vec<Diff>, deleted: &mut String, inserted: &mut String| {
        if !deleted.is_empty() {
            result.push(Diff::new(Operation::Delete, std::mem::take(deleted)));
        }
        if !inserted.is_empty() {
            result.push(Diff::new(Operation::Insert, std::mem::take(inserted)));
        }
    };

    for diff in diffs {
        match diff.operation {
            Operation::Delete => deleted.push_str(&diff.text),
            Operation::Insert => inserted.push_str(&diff.text),
            Operation::Equal => {
                if diff.text.is_empty() {
                    continue;
                }

                flush(&mut result, &mut deleted, &mut inserted);
                match result.last_mut() {
                    Some(last) if last.operation == Operation::Equal => {
                        last.text.push_str(&diff.text)
                    }
                    _ => result.push(diff),
                }
            }
        }
    }
    flush(&mut result, &mut deleted, &mut inserted);

    result
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edit {
    Equal(usize),
    Delete(usize),
    Insert(usize),
}

/// Shortest edit script between two line sequences.
fn shortest_edit(old: &[&str], new: &[&str]) -> Vec<Edit> {
    let mut edits = Vec::with_capacity(old.len().max(new.len()));
    edit_range(old, new, 0, 0, &mut edits);
    edits
}

/// Append edit script of one sub range, offset by its position in the
/// complete sequences.
///
/// Common prefix and suffix are stripped first. The rest is split at its
/// middle snake, and both halves are handled recursively. So memory stays
/// linear in the length of both sequences.
fn edit_range(old: &[&str], new: &[&str], old_base: usize, new_base: usize, edits: &mut Vec<Edit>) {
    let prefix = old
        .iter()
        .zip(new)
        .take_while(|(a, b)| a == b)
        .count();
    edits.extend((0..prefix).map(|index| Edit::Equal(old_base + index)));

    let (old, new) = (&old[prefix..], &new[prefix..]);
    let (old_base, new_base) = (old_base + prefix, new_base + prefix);
    let suffix = old
        .iter()
        .rev()
        .zip(new.iter().rev())
        .take_while(|(a, b)| a == b)
        .count();
    let (old, new) = (&old[..old.len() - suffix], &new[..new.len() - suffix]);

    let split = if old.is_empty() || new.is_empty() || !share_any_line(old, new) {
        None
    } else {
        middle_snake(old, new).filter(|&split| split != (0, 0) && split != (old.len(), new.len()))
    };

    match split {
        Some((x, y)) => {
            edit_range(&old[..x], &new[..y], old_base, new_base, edits);
            edit_range(&old[x..], &new[y..], old_base + x, new_base + y, edits);
        }
        None => {
            edits.extend((0..old.len()).map(|index| Edit::Delete(old_base + index)));
            edits.extend((0..new.len()).map(|index| Edit::Insert(new_base + index)));
        }
    }

    let suffix_base = old_base + old.len();
    edits.extend((0..suffix).map(|index| Edit::Equal(suffix_base + index)));
}

fn share_any_line(old: &[&str], new: &[&str]) -> bool {
    let lines = old.iter().collect::<HashSet<_>>();
    new.iter().any(|line| lines.contains(line))
}

/// Find the point where the forward and reverse searches for the shortest
/// edit path overlap.
///
/// Both searches only keep the furthest reaching x coordinate of each
/// diagonal for the current edit distance. Returns [`None`] if the sequences
/// have nothing in common.
fn middle_snake(old: &[&str], new: &[&str]) -> Option<(usize, usize)> {
    let n = old.len() as isize;
    let m = new.len() as isize;
    let max_d = (n + m + 1) / 2;
    let offset = max_d;
    let len = 2 * max_d + 2;
    let mut forward = vec![-1isize; len as usize];
    let mut backward = vec![-1isize; len as usize];
    forward[(offset + 1) as usize] = 0;
    backward[(offset + 1) as usize] = 0;

    // INVARIANT: Only one direction needs to check for overlap, depending on
    // the parity of the diagonal the searches meet on.
    let delta = n - m;
    let front = delta % 2 != 0;

    let (mut k1_start, mut k1_end, mut k2_start, mut k2_end) = (0, 0, 0, 0);
    for d in 0..max_d {
        let mut k1 = -d + k1_start;
        while k1 <= d - k1_end {
            let index = (offset + k1) as usize;
            let mut x1 = if k1 == -d || (k1 != d && forward[index - 1] < forward[index + 1]) {
                forward[index + 1]
            } else {
                forward[index - 1] + 1
            };
            let mut y1 = x1 - k1;
            while x1 < n && y1 < m && old[x1 as usize] == new[y1 as usize] {
                x1 += 1;
                y1 += 1;
            }
            forward[index] = x1;

            if x1 > n {
                k1_end += 2;
            } else if y1 > m {
                k1_start += 2;
            } else if front {
                let other = offset + delta - k1;
                if (0..len).contains(&other)
                    && backward[other as usize] != -1
                    && x1 >= n - backward[other as usize]
                {
                    return Some((x1 as usize, y1 as usize));
                }
            }
            k1 += 2;
        }

        let mut k2 = -d + k2_start;
        while k2 <= d - k2_end {
            let index = (offset + k2) as usize;
            let mut x2 = if k2 == -d || (k2 != d && backward[index - 1] < backward[index + 1]) {
                backward[index + 1]
            } else {
                backward[index - 1] + 1
            };
            let mut y2 = x2 - k2;
            while x2 < n && y2 < m && old[(n - x2 - 1) as usize] == new[(m - y2 - 1) as usize] {
                x2 += 1;
                y2 += 1;
            }
            backward[index] = x2;

            if x2 > n {
                k2_end += 2;
            } else if y2 > m {
                k2_start += 2;
            } else if !front {
                let other = offset + delta - k2;
                if (0..len).contains(&other) && forward[other as usize] != -1 {
                    let x1 = forward[other as usize];
                    let y1 = offset + x1 - other;
                    if x1 >= n - x2 {
                        return Some((x1 as usize, y1 as usize));
                    }
                }
            }
            k2 += 2;
        }
    }

    None
}

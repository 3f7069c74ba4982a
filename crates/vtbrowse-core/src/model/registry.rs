/// Request-scoped collection of accepted entries.
///
/// Entries are pushed in discovery order into one of two buckets
/// (directories, files). Final order is always re-derived from the name
/// comparator, never from discovery order, so insertion is O(1) and the
/// renderer drains each bucket with a stable sort.
///
/// [`Registry::extract_min`] is the one-at-a-time form of the same ordering
/// and yields exactly the sequence [`Registry::drain_sorted`] does.
use super::entry::{Entry, EntryKind};
use std::cmp::Ordering;

/// Compare two names the way the menu orders them.
///
/// Byte-wise; when `case_sensitive` is false ASCII lowercase letters are
/// folded to uppercase first. The first differing byte decides, and a name
/// that is a strict prefix of the other sorts first.
pub fn compare_names(a: &str, b: &str, case_sensitive: bool) -> Ordering {
    if case_sensitive {
        a.as_bytes().cmp(b.as_bytes())
    } else {
        a.bytes()
            .map(|c| c.to_ascii_uppercase())
            .cmp(b.bytes().map(|c| c.to_ascii_uppercase()))
    }
}

/// Accepted entries of one scan, split by kind.
#[derive(Debug, Default)]
pub struct Registry {
    directories: Vec<Entry>,
    files: Vec<Entry>,
    case_sensitive: bool,
}

impl Registry {
    /// Create an empty registry ordering names with the given case rule.
    pub fn new(case_sensitive: bool) -> Self {
        Self {
            directories: Vec::new(),
            files: Vec::new(),
            case_sensitive,
        }
    }

    /// Take ownership of `entry`. O(1).
    pub fn insert(&mut self, entry: Entry) {
        match entry.kind {
            EntryKind::Directory => self.directories.push(entry),
            EntryKind::File => self.files.push(entry),
        }
    }

    /// Remove and return the smallest entry of `kind`, or `None` if no
    /// entry of that kind remains.
    ///
    /// Among equal names the earliest inserted wins. O(n) per call.
    pub fn extract_min(&mut self, kind: EntryKind) -> Option<Entry> {
        let case_sensitive = self.case_sensitive;
        let bucket = self.bucket_mut(kind);
        let pos = bucket
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| compare_names(&a.filename, &b.filename, case_sensitive))
            .map(|(i, _)| i)?;
        Some(bucket.remove(pos))
    }

    /// Sort the `kind` bucket by name and move every entry out of it.
    ///
    /// The sort is stable, so equal names keep discovery order.
    pub fn drain_sorted(&mut self, kind: EntryKind) -> std::vec::IntoIter<Entry> {
        let case_sensitive = self.case_sensitive;
        let mut bucket = std::mem::take(self.bucket_mut(kind));
        bucket.sort_by(|a, b| compare_names(&a.filename, &b.filename, case_sensitive));
        bucket.into_iter()
    }

    /// Number of entries of `kind` still held.
    pub fn count(&self, kind: EntryKind) -> usize {
        match kind {
            EntryKind::Directory => self.directories.len(),
            EntryKind::File => self.files.len(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.directories.len() + self.files.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.directories.is_empty() && self.files.is_empty()
    }

    fn bucket_mut(&mut self, kind: EntryKind) -> &mut Vec<Entry> {
        match kind {
            EntryKind::Directory => &mut self.directories,
            EntryKind::File => &mut self.files,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::entry::ImageKind;

    fn file(name: &str) -> Entry {
        Entry::new_file(name, ImageKind::Iso, 4096, format!("file {name}\n"))
    }

    fn dir(name: &str) -> Entry {
        Entry::new_dir(name, format!("dir {name}\n"))
    }

    fn names(it: impl Iterator<Item = Entry>) -> Vec<String> {
        it.map(|e| e.filename.to_string()).collect()
    }

    // ── compare_names ────────────────────────────────────────────────────

    #[test]
    fn prefix_sorts_first() {
        assert_eq!(compare_names("ab", "abc", true), Ordering::Less);
        assert_eq!(compare_names("abc", "ab", false), Ordering::Greater);
        assert_eq!(compare_names("", "a", false), Ordering::Less);
    }

    #[test]
    fn case_insensitive_folds_lowercase() {
        assert_eq!(compare_names("abc", "ABC", false), Ordering::Equal);
        assert_eq!(compare_names("b", "A", false), Ordering::Greater);
        // 'a' folds to 'A' (0x41), which sorts before '_' (0x5F).
        assert_eq!(compare_names("a", "_", false), Ordering::Less);
    }

    #[test]
    fn case_sensitive_uses_raw_bytes() {
        // 'B' (0x42) < 'a' (0x61).
        assert_eq!(compare_names("a", "B", true), Ordering::Greater);
        assert_eq!(compare_names("a", "_", true), Ordering::Greater);
    }

    // ── Registry ─────────────────────────────────────────────────────────

    #[test]
    fn extract_min_returns_ascending_then_none() {
        let mut reg = Registry::new(false);
        for n in ["delta.iso", "Alpha.iso", "charlie.iso", "bravo.iso"] {
            reg.insert(file(n));
        }
        let mut out = Vec::new();
        while let Some(e) = reg.extract_min(EntryKind::File) {
            out.push(e.filename.to_string());
        }
        assert_eq!(out, ["Alpha.iso", "bravo.iso", "charlie.iso", "delta.iso"]);
        assert!(reg.is_empty());
        assert!(reg.extract_min(EntryKind::File).is_none());
    }

    #[test]
    fn extract_min_respects_kind() {
        let mut reg = Registry::new(true);
        reg.insert(file("a.iso"));
        reg.insert(dir("z"));
        assert_eq!(reg.extract_min(EntryKind::Directory).unwrap().filename.as_str(), "z");
        assert!(reg.extract_min(EntryKind::Directory).is_none());
        assert_eq!(reg.count(EntryKind::File), 1);
    }

    /// Draining with the stable sort must match repeated extract-min,
    /// including the order of equal names.
    #[test]
    fn drain_sorted_matches_repeated_extract_min() {
        let input = ["b", "A", "a", "B", "ab", "Ab", "c", "a"];

        let mut one = Registry::new(false);
        let mut two = Registry::new(false);
        for (i, n) in input.iter().enumerate() {
            one.insert(Entry::new_dir(n, i.to_string()));
            two.insert(Entry::new_dir(n, i.to_string()));
        }

        let drained: Vec<String> = one
            .drain_sorted(EntryKind::Directory)
            .map(|e| e.rendered_text)
            .collect();
        let mut extracted = Vec::new();
        while let Some(e) = two.extract_min(EntryKind::Directory) {
            extracted.push(e.rendered_text);
        }

        assert_eq!(drained, extracted);
        assert!(one.is_empty());
    }

    #[test]
    fn drain_sorted_case_sensitive() {
        let mut reg = Registry::new(true);
        for n in ["b.iso", "B.iso", "a.iso", "A.iso"] {
            reg.insert(file(n));
        }
        assert_eq!(
            names(reg.drain_sorted(EntryKind::File)),
            ["A.iso", "B.iso", "a.iso", "b.iso"]
        );
    }

    #[test]
    fn duplicates_are_kept() {
        let mut reg = Registry::new(false);
        reg.insert(file("x.iso"));
        reg.insert(file("x.iso"));
        assert_eq!(reg.len(), 2);
        assert_eq!(names(reg.drain_sorted(EntryKind::File)).len(), 2);
    }
}

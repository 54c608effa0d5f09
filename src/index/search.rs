// Longest-match search over a suffix array.
//
// Binary search narrows the sorted suffixes to the two neighbours that
// bracket the target string; the longer of their common prefixes with the
// target is the longest match anywhere in the old data.

use std::cmp::Ordering;

use super::qsufsort::SuffixArray;

/// Result of a longest-match search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Match {
    /// Number of matching bytes.
    pub len: usize,
    /// Offset of the match in the old data.
    pub pos: usize,
}

/// Length of the common prefix of two byte strings.
#[inline]
pub fn match_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

/// Lexicographic comparison over the common length of both slices.
///
/// A slice that is a prefix of the other compares equal.
#[inline]
pub fn compare_bytes(a: &[u8], b: &[u8]) -> Ordering {
    let n = a.len().min(b.len());
    a[..n].cmp(&b[..n])
}

impl SuffixArray {
    /// Longest match for `new[new_offset..]` among the suffixes between
    /// sorted positions `lo` and `hi` (inclusive).
    pub fn search(&self, old: &[u8], new: &[u8], new_offset: usize, lo: usize, hi: usize) -> Match {
        let target = &new[new_offset..];
        let (mut lo, mut hi) = (lo, hi);
        while hi - lo >= 2 {
            let mid = lo + (hi - lo) / 2;
            if compare_bytes(&old[self.get(mid)..], target) == Ordering::Less {
                lo = mid;
            } else {
                hi = mid;
            }
        }

        let lo_pos = self.get(lo);
        let hi_pos = self.get(hi);
        let lo_len = match_len(&old[lo_pos..], target);
        let hi_len = match_len(&old[hi_pos..], target);
        if lo_len > hi_len {
            Match {
                len: lo_len,
                pos: lo_pos,
            }
        } else {
            Match {
                len: hi_len,
                pos: hi_pos,
            }
        }
    }

    /// Longest match for `new[new_offset..]` anywhere in `old`.
    ///
    /// `self` must have been built from `old`.
    pub fn longest_match(&self, old: &[u8], new: &[u8], new_offset: usize) -> Match {
        self.search(old, new, new_offset, 0, self.len() - 1)
    }
}

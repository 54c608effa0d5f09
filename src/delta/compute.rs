// Greedy copy/extra decomposition of the new file.
//
// The scan walks the new data looking for a position where a fresh suffix
// array match beats simply continuing the previous alignment by more than
// a small slack. Each time it switches, the region since the last switch is
// split into:
//   1. a forward extension of the previous alignment (stored as bytewise
//      differences against the old data)
//   2. literal bytes with no good old counterpart
//   3. a backward extension of the new match, which becomes the start of
//      the next copy region
// and one control triple is emitted describing that split.

use crate::format::Control;
use crate::index::SuffixArray;

/// A new match must beat the continued alignment by more than this many
/// agreeing bytes before the scan switches to it.
const SWITCH_SLACK: isize = 8;

/// Diff output: everything needed to rebuild the new data from the old.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delta {
    pub controls: Vec<Control>,
    /// `new - old` (mod 256) for every copied byte, in order.
    pub diff: Vec<u8>,
    /// Literal new bytes for every inserted region, in order.
    pub extra: Vec<u8>,
    /// Length of the new data.
    pub new_size: u64,
}

impl Delta {
    /// Bytes of the new data covered by copy regions.
    pub fn copied(&self) -> u64 {
        self.controls.iter().map(|c| c.copy_len as u64).sum()
    }

    /// Bytes of the new data stored literally.
    pub fn inserted(&self) -> u64 {
        self.controls.iter().map(|c| c.extra_len as u64).sum()
    }
}

/// Compute the delta from `old` to `new`, building the suffix array first.
pub fn compute(old: &[u8], new: &[u8]) -> Delta {
    let index = SuffixArray::new(old);
    compute_with_index(&index, old, new)
}

/// Compute the delta using a suffix array already built over `old`.
pub fn compute_with_index(index: &SuffixArray, old: &[u8], new: &[u8]) -> Delta {
    let old_len = old.len();
    let new_len = new.len();

    let mut controls = Vec::new();
    let mut diff = Vec::with_capacity(new_len);
    let mut extra = Vec::with_capacity(new_len);

    // Does new[i] agree with old under the alignment `offset` (old = new + offset)?
    let agrees = |i: usize, offset: isize| -> bool {
        match i.checked_add_signed(offset) {
            Some(j) if j < old_len => old[j] == new[i],
            _ => false,
        }
    };

    let mut scan = 0usize;
    let mut len = 0usize;
    let mut pos = 0usize;
    let mut last_scan = 0usize;
    let mut last_pos = 0usize;
    let mut last_offset = 0isize;

    while scan < new_len {
        let mut old_score = 0isize;
        scan += len;
        let mut scsc = scan;

        while scan < new_len {
            let m = index.longest_match(old, new, scan);
            len = m.len;
            pos = m.pos;

            while scsc < scan + len {
                if agrees(scsc, last_offset) {
                    old_score += 1;
                }
                scsc += 1;
            }

            let ilen = len as isize;
            if (ilen == old_score && len != 0) || ilen > old_score + SWITCH_SLACK {
                break;
            }
            if agrees(scan, last_offset) {
                old_score -= 1;
            }
            scan += 1;
        }

        if len as isize == old_score && scan != new_len {
            continue;
        }

        // Forward extension of the previous alignment.
        let mut lenf = 0usize;
        {
            let mut s = 0isize;
            let mut best = 0isize;
            let mut i = 0usize;
            while last_scan + i < scan && last_pos + i < old_len {
                if old[last_pos + i] == new[last_scan + i] {
                    s += 1;
                }
                i += 1;
                if s * 2 - i as isize > best * 2 - lenf as isize {
                    best = s;
                    lenf = i;
                }
            }
        }

        // Backward extension of the new match.
        let mut lenb = 0usize;
        if scan < new_len {
            let mut s = 0isize;
            let mut best = 0isize;
            let mut i = 1usize;
            while scan >= last_scan + i && pos >= i {
                if old[pos - i] == new[scan - i] {
                    s += 1;
                }
                if s * 2 - i as isize > best * 2 - lenb as isize {
                    best = s;
                    lenb = i;
                }
                i += 1;
            }
        }

        // Both extensions claim the same new bytes: pick the best boundary.
        if last_scan + lenf > scan - lenb {
            let overlap = (last_scan + lenf) - (scan - lenb);
            let mut s = 0isize;
            let mut best = 0isize;
            let mut lens = 0usize;
            for i in 0..overlap {
                if new[last_scan + lenf - overlap + i] == old[last_pos + lenf - overlap + i] {
                    s += 1;
                }
                if new[scan - lenb + i] == old[pos - lenb + i] {
                    s -= 1;
                }
                if s > best {
                    best = s;
                    lens = i + 1;
                }
            }
            lenf -= overlap - lens;
            lenb -= lens;
        }

        let copy_end = last_scan + lenf;
        let extra_end = scan - lenb;

        diff.extend(
            new[last_scan..copy_end]
                .iter()
                .zip(&old[last_pos..last_pos + lenf])
                .map(|(n, o)| n.wrapping_sub(*o)),
        );
        extra.extend_from_slice(&new[copy_end..extra_end]);

        controls.push(Control::new(
            lenf as i64,
            (extra_end - copy_end) as i64,
            (pos as i64 - lenb as i64) - (last_pos + lenf) as i64,
        ));

        last_scan = extra_end;
        last_pos = pos - lenb;
        last_offset = pos as isize - scan as isize;
    }

    log::debug!(
        "delta computed: {} controls, {} diff bytes, {} extra bytes for {} -> {} bytes",
        controls.len(),
        diff.len(),
        extra.len(),
        old_len,
        new_len
    );

    Delta {
        controls,
        diff,
        extra,
        new_size: new_len as u64,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

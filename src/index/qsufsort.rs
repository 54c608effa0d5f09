// Suffix array construction (Larsson-Sadakane qsufsort).
//
// The array has n+1 entries: every suffix of the old data plus the empty
// suffix at offset n, which always sorts first. Construction works on two
// signed arrays:
//   - `sa`:   suffix offsets in current order; a negative entry -k at the
//             start of a run marks k suffixes as fully sorted
//   - `rank`: for each suffix, the index of the last slot of its group
// Each round doubles the compared prefix length `h` and refines every
// unsorted group by the rank of the suffix `h` bytes further on.

/// Suffix array over a byte sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuffixArray {
    indices: Vec<usize>,
}

/// Groups below this size are split by repeated minimum selection.
const SELECT_SORT_THRESHOLD: usize = 16;

enum Task {
    /// Refine `sa[start..start + len]` by the keys at distance h.
    Split { start: usize, len: usize },
    /// Assign the final rank of an equal-key group `sa[start..end]`.
    Settle { start: usize, end: usize },
}

impl SuffixArray {
    /// Build the suffix array of `data`.
    pub fn new(data: &[u8]) -> Self {
        let n = data.len();
        let mut buckets = [0usize; 256];
        for &b in data {
            buckets[b as usize] += 1;
        }
        for i in 1..256 {
            buckets[i] += buckets[i - 1];
        }
        for i in (1..256).rev() {
            buckets[i] = buckets[i - 1];
        }
        buckets[0] = 0;

        // Slot 0 is reserved for the empty suffix.
        let mut sa = vec![0isize; n + 1];
        for (i, &b) in data.iter().enumerate() {
            buckets[b as usize] += 1;
            sa[buckets[b as usize]] = i as isize;
        }
        sa[0] = n as isize;

        let mut rank = vec![0isize; n + 1];
        for (i, &b) in data.iter().enumerate() {
            rank[i] = buckets[b as usize] as isize;
        }
        rank[n] = 0;

        for i in 1..256 {
            if buckets[i] == buckets[i - 1] + 1 {
                sa[buckets[i]] = -1;
            }
        }
        sa[0] = -1;

        let total = (n + 1) as isize;
        let mut stack = Vec::new();
        let mut h = 1usize;
        while sa[0] != -total {
            let mut sorted_run = 0isize;
            let mut i = 0usize;
            while i < n + 1 {
                if sa[i] < 0 {
                    sorted_run -= sa[i];
                    i += (-sa[i]) as usize;
                } else {
                    if sorted_run != 0 {
                        sa[i - sorted_run as usize] = -sorted_run;
                    }
                    let len = (rank[sa[i] as usize] + 1) as usize - i;
                    split(&mut sa, &mut rank, i, len, h, &mut stack);
                    i += len;
                    sorted_run = 0;
                }
            }
            if sorted_run != 0 {
                sa[i - sorted_run as usize] = -sorted_run;
            }
            h += h;
        }

        for (offset, &r) in rank.iter().enumerate() {
            sa[r as usize] = offset as isize;
        }

        log::debug!("suffix array built over {n} bytes in {} rounds", h.trailing_zeros());

        Self {
            indices: sa.into_iter().map(|v| v as usize).collect(),
        }
    }

    /// Number of entries (input length + 1, so never zero).
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.indices
    }

    /// Suffix offset stored at sorted position `i`.
    #[inline]
    pub fn get(&self, i: usize) -> usize {
        self.indices[i]
    }
}

#[inline]
fn key(sa: &[isize], rank: &[isize], i: usize, h: usize) -> isize {
    rank[sa[i] as usize + h]
}

// Three-way refinement of one unsorted group. Work is ordered exactly as the
// recursive formulation: lower partition, equal group, upper partition.
fn split(
    sa: &mut [isize],
    rank: &mut [isize],
    start: usize,
    len: usize,
    h: usize,
    stack: &mut Vec<Task>,
) {
    stack.push(Task::Split { start, len });
    while let Some(task) = stack.pop() {
        match task {
            Task::Settle { start, end } => {
                for i in start..end {
                    rank[sa[i] as usize] = (end - 1) as isize;
                }
                if start == end - 1 {
                    sa[start] = -1;
                }
            }
            Task::Split { start, len } if len < SELECT_SORT_THRESHOLD => {
                select_split(sa, rank, start, len, h);
            }
            Task::Split { start, len } => {
                let end = start + len;
                let pivot = key(sa, rank, start + len / 2, h);

                let mut lt = 0;
                let mut eq = 0;
                for i in start..end {
                    let k = key(sa, rank, i, h);
                    if k < pivot {
                        lt += 1;
                    } else if k == pivot {
                        eq += 1;
                    }
                }
                let eq_start = start + lt;
                let gt_start = eq_start + eq;

                let mut i = start;
                let mut j = 0;
                let mut k = 0;
                while i < eq_start {
                    let v = key(sa, rank, i, h);
                    if v < pivot {
                        i += 1;
                    } else if v == pivot {
                        sa.swap(i, eq_start + j);
                        j += 1;
                    } else {
                        sa.swap(i, gt_start + k);
                        k += 1;
                    }
                }
                while eq_start + j < gt_start {
                    if key(sa, rank, eq_start + j, h) == pivot {
                        j += 1;
                    } else {
                        sa.swap(eq_start + j, gt_start + k);
                        k += 1;
                    }
                }

                if end > gt_start {
                    stack.push(Task::Split {
                        start: gt_start,
                        len: end - gt_start,
                    });
                }
                stack.push(Task::Settle {
                    start: eq_start,
                    end: gt_start,
                });
                if eq_start > start {
                    stack.push(Task::Split {
                        start,
                        len: eq_start - start,
                    });
                }
            }
        }
    }
}

// Small groups: repeatedly pull the run of minimum keys to the front.
fn select_split(sa: &mut [isize], rank: &mut [isize], start: usize, len: usize, h: usize) {
    let end = start + len;
    let mut k = start;
    while k < end {
        let mut run = 1;
        let mut min = key(sa, rank, k, h);
        let mut i = 1;
        while k + i < end {
            let v = key(sa, rank, k + i, h);
            if v < min {
                min = v;
                run = 0;
            }
            if v == min {
                sa.swap(k + run, k + i);
                run += 1;
            }
            i += 1;
        }
        for i in 0..run {
            rank[sa[k + i] as usize] = (k + run - 1) as isize;
        }
        if run == 1 {
            sa[k] = -1;
        }
        k += run;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

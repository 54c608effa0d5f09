use std::io::Read;

use bzip2::read::BzDecoder;
use oxipatch::delta;
use oxipatch::engine::{self, DiffOptions};
use oxipatch::format::{CONTROL_SIZE, HEADER_SIZE, PatchHeader};
use oxipatch::index::SuffixArray;
use proptest::prelude::*;

fn diff(old: &[u8], new: &[u8], level: u32) -> Vec<u8> {
    engine::diff(old, new, &DiffOptions { level }).unwrap()
}

fn decompress(segment: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    BzDecoder::new(segment).read_to_end(&mut out).unwrap();
    out
}

proptest! {
    #[test]
    fn prop_diff_patch_roundtrip(
        old in proptest::collection::vec(any::<u8>(), 0..4096),
        new in proptest::collection::vec(any::<u8>(), 0..4096),
        level in 1u32..=9u32
    ) {
        let patch = diff(&old, &new, level);
        let rebuilt = engine::patch(&old, &patch).unwrap();
        prop_assert_eq!(rebuilt, new);
    }

    #[test]
    fn prop_small_alphabet_roundtrip(
        old in proptest::collection::vec(0u8..4, 0..2048),
        new in proptest::collection::vec(0u8..4, 0..2048)
    ) {
        let patch = diff(&old, &new, 9);
        prop_assert_eq!(engine::patch(&old, &patch).unwrap(), new);
    }

    #[test]
    fn prop_suffix_array_is_sorted_permutation(
        data in proptest::collection::vec(0u8..8, 0..512)
    ) {
        let sa = SuffixArray::new(&data);
        prop_assert_eq!(sa.len(), data.len() + 1);
        prop_assert_eq!(sa.get(0), data.len());

        let mut seen = vec![false; data.len() + 1];
        for &i in sa.as_slice() {
            prop_assert!(!seen[i], "duplicate suffix {}", i);
            seen[i] = true;
        }
        for w in sa.as_slice().windows(2) {
            prop_assert!(data[w[0]..] < data[w[1]..], "{} !< {}", w[0], w[1]);
        }
    }

    #[test]
    fn prop_header_matches_segments(
        old in proptest::collection::vec(any::<u8>(), 0..1024),
        new in proptest::collection::vec(any::<u8>(), 0..1024)
    ) {
        let computed = delta::compute(&old, &new);
        let patch = diff(&old, &new, 9);
        let header = PatchHeader::parse(&patch).unwrap();
        prop_assert_eq!(header.new_size, new.len() as u64);

        let diff_at = header.diff_offset() as usize;
        let extra_at = header.extra_offset() as usize;
        prop_assert!(extra_at <= patch.len());

        let control = decompress(&patch[HEADER_SIZE..diff_at]);
        let diff_bytes = decompress(&patch[diff_at..extra_at]);
        let extra = decompress(&patch[extra_at..]);

        prop_assert_eq!(control.len(), computed.controls.len() * CONTROL_SIZE);
        prop_assert_eq!(&diff_bytes, &computed.diff);
        prop_assert_eq!(&extra, &computed.extra);
        prop_assert_eq!(computed.copied() + computed.inserted(), new.len() as u64);
    }

    #[test]
    fn prop_identical_data_is_highly_compressible(
        data in proptest::collection::vec(any::<u8>(), 1024..8192)
    ) {
        let patch = diff(&data, &data, 9);
        prop_assert!(patch.len() < data.len(), "patch={} data={}", patch.len(), data.len());
    }

    #[test]
    fn prop_random_patch_bytes_never_panic(
        old in proptest::collection::vec(any::<u8>(), 0..256),
        tail in proptest::collection::vec(any::<u8>(), 0..256)
    ) {
        let mut patch = b"BSDIFF40".to_vec();
        patch.extend_from_slice(&tail);
        let _ = engine::patch(&old, &patch);
    }
}

#[test]
#[ignore = "performance properties are workload and machine dependent"]
fn perf_property_patch_not_pathological() {
    use std::time::Instant;
    let make = |n: usize| -> Vec<u8> { (0..n).map(|i| (i % 251) as u8).collect() };
    let old = make(4 * 1024 * 1024);
    let mut new = old.clone();
    for i in (0..new.len()).step_by(4096) {
        new[i] = new[i].wrapping_add(3);
    }

    let patch = diff(&old, &new, 6);
    let t0 = Instant::now();
    let rebuilt = engine::patch(&old, &patch).unwrap();
    let dt = t0.elapsed();
    assert_eq!(rebuilt, new);
    assert!(dt.as_secs_f64() < 20.0, "patch took {:?}", dt);
}

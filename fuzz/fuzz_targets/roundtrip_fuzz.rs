#![no_main]
use libfuzzer_sys::fuzz_target;
use oxipatch::engine::{self, DiffOptions};

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    // First byte picks the split point and compression level.
    let ctl = data[0];
    let payload = &data[1..];
    let split = (ctl as usize * payload.len()) / 255;
    let (old, new) = payload.split_at(split.min(payload.len()));
    let level = u32::from(ctl % 9) + 1;

    let patch = engine::diff(old, new, &DiffOptions { level }).unwrap();
    let rebuilt = engine::patch(old, &patch).unwrap();
    assert_eq!(rebuilt, new);
});

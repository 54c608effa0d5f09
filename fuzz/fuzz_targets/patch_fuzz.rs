#![no_main]
use libfuzzer_sys::fuzz_target;
use oxipatch::engine;
use oxipatch::format::MAGIC;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes must only ever produce errors, never panics.
    let _ = engine::patch(&[], data);

    if data.len() >= 2 {
        let split = data.len() / 2;
        let (old, patch) = data.split_at(split);
        let _ = engine::patch(old, patch);

        // Same payload behind a valid magic so header checks get past the
        // signature.
        let mut framed = MAGIC.to_vec();
        framed.extend_from_slice(patch);
        let _ = engine::patch(old, &framed);
    }
});

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // The bitset and the sorted-window paths must agree.
    let trigrams = regrep::utils::extract_trigrams(data);
    assert_eq!(trigrams, regrep::utils::literal_trigrams(data));

    let view = regrep::utils::searchable_view(data, 16);
    let _ = regrep::utils::extract_trigrams(&view);
    let _ = regrep::utils::is_text(data);
});

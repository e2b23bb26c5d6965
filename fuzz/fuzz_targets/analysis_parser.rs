#![no_main]

use libfuzzer_sys::fuzz_target;

use docaudit::analysis::{Dimension, parser::parse_response};

fuzz_target!(|data: &[u8]| {
    let raw = String::from_utf8_lossy(data);
    for dimension in Dimension::ALL {
        if let Ok(result) = parse_response(dimension, &raw, 55.0) {
            if let Some(score) = result.score {
                assert!(score.is_finite());
            }
        }
    }
});

#![no_main]

use libfuzzer_sys::fuzz_target;
use markup::ParserConfig;
use markup::char_ref::{decode_with, encode_with};

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    let config = ParserConfig::default();
    let encoded = encode_with(&text, &config);
    assert!(encoded.is_ascii(), "encoded text is ASCII");
    let decoded = decode_with(&encoded, false, &config);
    assert_eq!(decoded, text, "decode inverts encode");
    decode_with(&text, true, &config);
});

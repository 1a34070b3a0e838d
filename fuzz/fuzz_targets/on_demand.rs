#![no_main]

use libfuzzer_sys::fuzz_target;
use markup::{Document, ParserConfig, TagFilter};

fuzz_target!(|data: &[u8]| {
    let source = String::from_utf8_lossy(data);
    let mut config = ParserConfig::default();
    config.recognize_unregistered = data.first().is_some_and(|b| b & 1 == 1);
    config.max_enclosure_depth = 4;
    let mut doc = Document::with_config(source.as_ref(), config);

    let mut pos = 0;
    while let Some(id) = doc.tag_after(pos, TagFilter::Any) {
        let span = doc.tag_span(id).expect("recognized tag is in the arena");
        assert!(span.begin >= pos && span.end <= doc.len());
        doc.element(id);
        pos = span.end.max(span.begin + 1);
    }
    if !doc.is_empty() {
        doc.enclosing_element(doc.len() / 2);
        doc.tag_before(doc.len() - 1, TagFilter::Any);
    }
});

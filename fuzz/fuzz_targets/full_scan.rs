#![no_main]

use libfuzzer_sys::fuzz_target;
use markup::{Document, ParserConfig};

fuzz_target!(|data: &[u8]| {
    let source = String::from_utf8_lossy(data);
    let mut doc = Document::with_config(source.as_ref(), ParserConfig::default());

    let nodes = doc.nodes();
    let mut cursor = 0;
    for node in &nodes {
        assert_eq!(node.span.begin, cursor, "nodes must tile the source");
        cursor = node.span.end;
    }
    assert_eq!(cursor, doc.len());

    let mut previous = 0;
    for id in doc.all_tags() {
        let span = doc.tag_span(id).expect("scanned tag is in the arena");
        assert!(span.begin >= previous, "scan result is ordered");
        assert!(span.end <= doc.len());
        previous = span.begin;
        if let Some(element) = doc.element(id) {
            assert!(element.span.begin == span.begin && element.span.end <= doc.len());
            assert!(element.span.encloses(element.content()));
        }
    }
});

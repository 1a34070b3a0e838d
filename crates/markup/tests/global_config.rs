//! Mutates the process-wide configuration, so it lives in its own test
//! binary and in a single test function.

use markup::{CompatibilityProfile, Document, ParserConfig, TagType};

#[test]
fn global_configuration_applies_to_new_documents() {
    ParserConfig::reset_global();
    let mut before = Document::new("<?php echo 1 ?>&#x41");

    ParserConfig::update_global(|config| {
        config.registry.register(TagType::php()).unwrap();
        config.profile = CompatibilityProfile::mozilla();
        config.encode_apostrophe = true;
    });
    let mut after = Document::new("<?php echo 1 ?>&#x41");

    // Existing documents keep their snapshot.
    assert!(before.tag_at(0).is_none_or(|id| before.tag(id).unwrap().tag_type() != &TagType::php()));
    assert_eq!(before.character_reference_at(15), None);

    let php = after.tag_at(0).unwrap();
    assert_eq!(after.tag(php).unwrap().tag_type(), &TagType::php());
    assert_eq!(after.character_reference_at(15).map(|r| r.character), Some('A'));
    assert_eq!(markup::encode("it's"), "it&#39;s");
    assert_eq!(markup::decode("&#x41"), "A");

    ParserConfig::reset_global();
    assert_eq!(markup::encode("it's"), "it's");
    assert_eq!(markup::decode("&#x41"), "&#x41");
    let mut reset = Document::new("<?php echo 1 ?>");
    assert!(reset.server_tag_at(0).is_none());
}

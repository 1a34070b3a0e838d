use std::fs;
use std::path::{Path, PathBuf};

use markup::{Document, ParserConfig, Tag};
use serde::Deserialize;

const ELEMENTS_FORMAT_V1: &str = "markup-elements-v1";

#[derive(Clone, Debug, Deserialize)]
struct ElementManifest {
    format: String,
    cases: Vec<ElementCase>,
}

#[derive(Clone, Debug, Deserialize)]
struct ElementCase {
    id: String,
    source: String,
    #[serde(default)]
    diagnostics: Vec<String>,
    elements: Vec<ExpectedElement>,
}

#[derive(Clone, Debug, Deserialize)]
struct ExpectedElement {
    at: usize,
    text: String,
    content: String,
    end: EndKind,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum EndKind {
    Tag,
    Implicit,
    None,
}

fn manifest_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("elements.toml")
}

fn load_manifest() -> ElementManifest {
    let path = manifest_path();
    let content = fs::read_to_string(&path)
        .unwrap_or_else(|err| panic!("failed to read element fixtures {path:?}: {err}"));
    let manifest: ElementManifest = toml::from_str(&content)
        .unwrap_or_else(|err| panic!("failed to parse element fixtures {path:?}: {err}"));
    assert_eq!(
        manifest.format, ELEMENTS_FORMAT_V1,
        "unsupported element fixture format in {path:?}"
    );
    manifest
}

fn end_kind(doc: &Document, end_tag: Option<markup::TagId>) -> EndKind {
    match end_tag.and_then(|id| doc.tag(id)) {
        Some(Tag::End(end)) if end.implicit => EndKind::Implicit,
        Some(_) => EndKind::Tag,
        None => EndKind::None,
    }
}

fn check_case(case: &ElementCase, full_scan_first: bool) {
    let mut doc = Document::with_config(case.source.as_str(), ParserConfig::default());
    if full_scan_first {
        doc.full_scan();
    }
    for expected in &case.elements {
        let element = doc
            .element_at(expected.at)
            .unwrap_or_else(|| panic!("[{}] no element at {}", case.id, expected.at));
        assert_eq!(
            doc.text(element.span),
            Some(expected.text.as_str()),
            "[{}] element text at {}",
            case.id,
            expected.at
        );
        assert_eq!(
            doc.text(element.content()),
            Some(expected.content.as_str()),
            "[{}] element content at {}",
            case.id,
            expected.at
        );
        assert_eq!(
            end_kind(&doc, element.end_tag),
            expected.end,
            "[{}] end tag kind at {}",
            case.id,
            expected.at
        );
    }
    let diagnostics: Vec<String> = doc
        .diagnostics()
        .iter()
        .map(|d| format!("{:?}", d.kind))
        .collect();
    assert_eq!(diagnostics, case.diagnostics, "[{}] diagnostics", case.id);
}

#[test]
fn element_fixtures_on_demand() {
    let manifest = load_manifest();
    assert!(!manifest.cases.is_empty(), "element fixture manifest is empty");
    for case in &manifest.cases {
        check_case(case, false);
    }
}

#[test]
fn element_fixtures_after_full_scan() {
    for case in &load_manifest().cases {
        check_case(case, true);
    }
}

#[test]
fn fixture_ids_are_unique() {
    let manifest = load_manifest();
    let mut ids: Vec<&str> = manifest.cases.iter().map(|case| case.id.as_str()).collect();
    ids.sort_unstable();
    let before = ids.len();
    ids.dedup();
    assert_eq!(before, ids.len(), "duplicate fixture ids in {:?}", manifest_path());
}

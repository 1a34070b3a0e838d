use std::sync::Arc;

use markup::{
    Construction, ConstructContext, CustomSyntax, DiagnosticKind, Document, Incomplete,
    ParserConfig, RowColumn, Severity, Span, TagFilter, TagType, TagTypeDescriptor,
};

fn doc(source: &str) -> Document {
    Document::with_config(source, ParserConfig::default())
}

#[test]
fn positional_queries_with_filters() {
    let mut doc = doc("<html><body><p class=x>a</p><br></body></html>");
    let p = doc.tag_after(0, TagFilter::StartNamed("p")).unwrap();
    assert_eq!(doc.tag_text(p), Some("<p class=x>"));
    let end = doc.tag_after(0, TagFilter::EndNamed("P")).unwrap();
    assert_eq!(doc.tag_span(end), Some(Span::new(24, 28)));
    let before = doc.tag_before(30, TagFilter::Any).unwrap();
    assert_eq!(doc.tag_text(before), Some("<br>"));
    let body = doc.tag_before(30, TagFilter::Named("body")).unwrap();
    assert_eq!(doc.tag_span(body), Some(Span::new(6, 12)));
    let enclosing = doc.enclosing_tag(15).unwrap();
    assert_eq!(enclosing, p);
    assert_eq!(doc.enclosing_tag(23), None);
    let inside = doc.all_tags_in(Span::new(12, 32));
    assert_eq!(inside.len(), 3);
}

#[test]
fn enclosing_tag_matches_the_full_scan_at_every_position() {
    let source = r#"x <p title="<b>x</b>" data-x='<i>'>t</p><!-- <a> --><br/>"#;
    let spans: Vec<Span> = {
        let mut scanned = doc(source);
        let ids = scanned.all_tags();
        ids.into_iter().filter_map(|id| scanned.tag_span(id)).collect()
    };
    assert_eq!(spans.len(), 4);
    let mut doc = doc(source);
    for span in spans {
        for pos in span.begin..span.end {
            let id = doc.enclosing_tag(pos).unwrap();
            assert_eq!(doc.tag_span(id), Some(span), "position {pos}");
        }
    }
}

#[test]
fn attribute_queries_decode_values() {
    let mut doc = doc(r#"<a HREF="/q?a=1&amp;b=2" title=caf&eacute; disabled>"#);
    let a = doc.tag_at(0).unwrap();
    let attributes = doc.attributes_of(a).unwrap();
    let keys: Vec<&str> = attributes.iter().map(|a| a.key.as_str()).collect();
    assert_eq!(keys, vec!["href", "title", "disabled"]);
    assert_eq!(attributes.get("href").unwrap().name, "HREF");
    assert!(!attributes.get("disabled").unwrap().has_value());
    assert_eq!(doc.attribute_value(a, "href").as_deref(), Some("/q?a=1&b=2"));
    assert_eq!(doc.attribute_value(a, "TITLE").as_deref(), Some("café"));
    assert_eq!(doc.attribute_value(a, "missing"), None);
}

#[test]
fn standalone_attribute_parsing() {
    let mut doc = doc("x a=1 b='2'> tail");
    let list = doc.parse_attributes(1, None, 2).unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(doc.text(list.span), Some("a=1 b='2'"));
    let bounded = doc.parse_attributes(1, Some(4), 2).unwrap();
    assert_eq!(bounded.len(), 1);
}

#[test]
fn codec_round_trip() {
    let doc = doc("");
    let text = "5 < 6 & \"quoted\" café ☃";
    let encoded = doc.encode(text);
    assert_eq!(encoded, "5 &lt; 6 &amp; &quot;quoted&quot; caf&eacute; &#9731;");
    assert_eq!(doc.decode(&encoded), text);
    assert_eq!(doc.decode("no references"), "no references");
}

#[test]
fn ignored_regions_are_skipped_and_cache_rebuilt() {
    let mut doc = doc("<p>a</p><?tpl <b> ?><i>i</i>");
    let before = doc.all_tags().len();
    assert_eq!(before, 5);
    assert!(doc.ignore_when_parsing(Span::new(8, 20)));
    let after = doc.all_tags();
    assert_eq!(after.len(), 4);
    for id in after {
        let begin = doc.tag_span(id).unwrap().begin;
        assert!(!(8..20).contains(&begin), "tag at {begin} inside ignored region");
    }
    // Clearing for an ignored region happens before the rescan.
    assert!(doc.diagnostics().iter().all(|d| d.kind != DiagnosticKind::DiscardedCache));
}

#[test]
fn diagnostics_locate_problems() {
    let mut doc = doc("<div>\n  <span>\n</div>");
    doc.all_tags();
    doc.element_at(8);
    let warnings: Vec<_> = doc
        .diagnostics()
        .iter()
        .filter(|d| d.severity() == Severity::Warn)
        .collect();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].kind, DiagnosticKind::MissingRequiredEndTag);
    assert_eq!(warnings[0].location, RowColumn { row: 2, column: 3 });
    assert!(warnings[0].to_string().starts_with("(2:3)"));
    assert_eq!(doc.row_column(doc.len()), RowColumn { row: 3, column: 7 });
}

struct Handlebars;

impl CustomSyntax for Handlebars {
    fn construct(
        &self,
        ctx: &ConstructContext<'_>,
        tag_type: &TagType,
        pos: usize,
    ) -> Result<Option<Construction>, Incomplete> {
        let body = pos + tag_type.start_delimiter().len();
        let close = ctx.find(body, tag_type.closing_delimiter()).ok_or(Incomplete)?;
        let name = ctx.source()[body..close].trim().to_string();
        Ok(Some(Construction {
            end: close + tag_type.closing_delimiter().len(),
            name: Some(name),
        }))
    }
}

#[test]
fn custom_server_syntax_nests_in_attributes() {
    let handlebars = TagType::custom(
        TagTypeDescriptor::new("handlebars", "<{{", "}}>").server(),
        Arc::new(Handlebars),
    );
    let mut config = ParserConfig::default();
    config.registry.register(handlebars.clone()).unwrap();
    let mut doc = Document::with_config(r#"<img src="<{{ url }}>">"#, config);
    let img = doc.tag_at(0).unwrap();
    assert_eq!(doc.tag_span(img), Some(Span::new(0, 23)));
    let inner = doc.server_tag_at(10).unwrap();
    let tag = doc.tag(inner).unwrap();
    assert_eq!(tag.tag_type(), &handlebars);
    assert_eq!(tag.name(), "url");
}

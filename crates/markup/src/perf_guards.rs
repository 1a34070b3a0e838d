use std::time::Instant;

use crate::perf_fixtures::{make_blocks, make_nested};
use crate::{Document, ParserConfig};

const SMALL_BLOCKS: usize = 500;
const LARGE_BLOCKS: usize = 5_000;
// For BLOCK_TEMPLATE: div, p, a, /a, br, comment, /div.
const TAGS_PER_BLOCK: usize = 7;
// Ten times the input should cost well under a hundred times the time.
const MAX_SCALING_RATIO: f64 = 40.0;

fn scan_time(blocks: usize) -> f64 {
    let mut doc = Document::with_config(make_blocks(blocks), ParserConfig::default());
    let start = Instant::now();
    let tags = doc.all_tags();
    let elapsed = start.elapsed().as_secs_f64();
    assert_eq!(tags.len(), blocks * TAGS_PER_BLOCK);
    elapsed
}

fn on_demand_time(blocks: usize) -> f64 {
    let mut doc = Document::with_config(make_blocks(blocks), ParserConfig::default());
    let start = Instant::now();
    let mut count = 0;
    let mut pos = 0;
    while let Some(id) = doc.tag_after(pos, crate::TagFilter::Any) {
        count += 1;
        pos = doc.tag_span(id).map_or(pos + 1, |span| span.end);
    }
    let elapsed = start.elapsed().as_secs_f64();
    assert_eq!(count, blocks * TAGS_PER_BLOCK);
    elapsed
}

#[test]
fn perf_guard_full_scan_is_linear() {
    let small = scan_time(SMALL_BLOCKS).max(1e-6);
    let large = scan_time(LARGE_BLOCKS);
    let ratio = large / small;
    assert!(
        ratio <= MAX_SCALING_RATIO,
        "full scan scaling ratio {ratio:.1} exceeded guard {MAX_SCALING_RATIO}"
    );
}

#[test]
fn perf_guard_on_demand_walk_is_linear() {
    let small = on_demand_time(SMALL_BLOCKS).max(1e-6);
    let large = on_demand_time(LARGE_BLOCKS);
    let ratio = large / small;
    assert!(
        ratio <= MAX_SCALING_RATIO,
        "on-demand walk scaling ratio {ratio:.1} exceeded guard {MAX_SCALING_RATIO}"
    );
}

#[test]
fn perf_guard_deep_nesting_resolves() {
    let depth = 100_000;
    let mut doc = Document::with_config(make_nested(depth), ParserConfig::default());
    let element = doc.element_at(0).expect("outer element");
    assert_eq!(element.span.end, doc.len());
}

//! Position-indexed tag memo.
//!
//! Two tiers: `entries` remembers the result of full recognition at a
//! position (misses included), `special` remembers instances of the
//! markup-suppressing types keyed by `(position, suppressing index)` for
//! enclosure checks. After an exhaustive scan the cache is *complete*: it
//! holds the ordered tag list and answers every query without constructing
//! anything.

use std::collections::BTreeMap;

use crate::chars::find_all;
use crate::tag::TagId;

#[derive(Debug, Default)]
pub(crate) struct TagCache {
    entries: BTreeMap<usize, Option<TagId>>,
    special: BTreeMap<(usize, usize), Option<TagId>>,
    ordered: Option<Vec<(usize, TagId)>>,
    /// Outermost tag covering the tag that begins at a position.
    covers: BTreeMap<usize, TagId>,
    /// Server-only recognition at positions where `entries` holds another
    /// type's tag or a miss.
    server_tags: BTreeMap<usize, Option<TagId>>,
    /// Start delimiter positions per suppressing type, built on first use.
    delimiters: BTreeMap<usize, Vec<usize>>,
}

impl TagCache {
    pub(crate) fn get(&self, pos: usize) -> Option<Option<TagId>> {
        match &self.ordered {
            Some(ordered) => Some(
                ordered
                    .binary_search_by_key(&pos, |(begin, _)| *begin)
                    .ok()
                    .map(|i| ordered[i].1),
            ),
            None => self.entries.get(&pos).copied(),
        }
    }

    pub(crate) fn insert(&mut self, pos: usize, found: Option<TagId>) {
        if self.ordered.is_none() {
            self.entries.insert(pos, found);
        }
    }

    pub(crate) fn special(&self, pos: usize, index: usize) -> Option<Option<TagId>> {
        self.special.get(&(pos, index)).copied()
    }

    pub(crate) fn insert_special(&mut self, pos: usize, index: usize, found: Option<TagId>) {
        if self.ordered.is_none() {
            self.special.insert((pos, index), found);
        }
    }

    pub(crate) fn server_tag(&self, pos: usize) -> Option<Option<TagId>> {
        self.server_tags.get(&pos).copied()
    }

    pub(crate) fn insert_server_tag(&mut self, pos: usize, found: Option<TagId>) {
        if self.ordered.is_none() {
            self.server_tags.insert(pos, found);
        }
    }

    pub(crate) fn cover(&self, pos: usize) -> Option<TagId> {
        self.covers.get(&pos).copied()
    }

    pub(crate) fn insert_cover(&mut self, pos: usize, cover: TagId) {
        if self.ordered.is_none() {
            self.covers.insert(pos, cover);
        }
    }

    pub(crate) fn is_complete(&self) -> bool {
        self.ordered.is_some()
    }

    /// Every tag found by the exhaustive scan, ordered by begin position.
    pub(crate) fn ordered(&self) -> Option<&[(usize, TagId)]> {
        self.ordered.as_deref()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
            && self.special.is_empty()
            && self.covers.is_empty()
            && self.server_tags.is_empty()
            && self.ordered.is_none()
    }

    /// Number of memoized positions, misses included.
    pub(crate) fn len(&self) -> usize {
        match &self.ordered {
            Some(ordered) => ordered.len(),
            None => self.entries.len(),
        }
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.special.clear();
        self.ordered = None;
        self.covers.clear();
        self.server_tags.clear();
        self.delimiters.clear();
    }

    /// Last occurrence of the start delimiter of suppressing type `index`
    /// beginning strictly before `before`.
    pub(crate) fn delimiter_before(
        &mut self,
        index: usize,
        parse_text: &[u8],
        delimiter: &[u8],
        before: usize,
    ) -> Option<usize> {
        let positions = self
            .delimiters
            .entry(index)
            .or_insert_with(|| find_all(parse_text, delimiter));
        let count = positions.partition_point(|&pos| pos < before);
        count.checked_sub(1).map(|last| positions[last])
    }

    /// Replace everything with the result of an exhaustive scan.
    ///
    /// `special` lists the scanned tags of suppressing types with their index
    /// in the configuration's suppressing list.
    pub(crate) fn install_scan(
        &mut self,
        ordered: Vec<(usize, TagId)>,
        special: impl IntoIterator<Item = (usize, usize, TagId)>,
    ) {
        self.clear();
        self.special = special
            .into_iter()
            .map(|(pos, index, id)| ((pos, index), Some(id)))
            .collect();
        self.ordered = Some(ordered);
    }

    /// Index of the first ordered tag beginning at or after `pos`.
    pub(crate) fn first_at_or_after(&self, pos: usize) -> Option<usize> {
        let ordered = self.ordered.as_ref()?;
        Some(ordered.partition_point(|(begin, _)| *begin < pos))
    }
}

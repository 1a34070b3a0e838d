use super::TagType;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("the unregistered sentinel types cannot be registered or deregistered")]
    Sentinel,
    #[error("tag type `{0}` is not registered")]
    NotRegistered(String),
}

/// The set of tag types the recognizer tries, in precedence order.
///
/// Precedence: longer start delimiters first; among equal lengths, the most
/// recently registered type first. The sentinel types are never stored here
/// and are always tried last.
#[derive(Clone, Debug)]
pub struct TagTypeRegistry {
    /// Registration order, oldest first.
    registered: Vec<TagType>,
    /// Precedence order, rebuilt on every change.
    ordered: Vec<TagType>,
}

impl Default for TagTypeRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.registered = TagType::default_registered();
        registry.reorder();
        registry
    }
}

impl TagTypeRegistry {
    pub fn empty() -> Self {
        Self {
            registered: Vec::new(),
            ordered: Vec::new(),
        }
    }

    /// Register `tag_type`. Registering an already registered type makes it
    /// the most recent one.
    pub fn register(&mut self, tag_type: TagType) -> Result<(), RegistryError> {
        if tag_type.is_unregistered() {
            return Err(RegistryError::Sentinel);
        }
        self.registered.retain(|t| t != &tag_type);
        log::debug!(target: "markup.tags", "register tag type {}", tag_type.name());
        self.registered.push(tag_type);
        self.reorder();
        Ok(())
    }

    pub fn deregister(&mut self, tag_type: &TagType) -> Result<(), RegistryError> {
        if tag_type.is_unregistered() {
            return Err(RegistryError::Sentinel);
        }
        let before = self.registered.len();
        self.registered.retain(|t| t != tag_type);
        if self.registered.len() == before {
            return Err(RegistryError::NotRegistered(tag_type.name().to_string()));
        }
        log::debug!(target: "markup.tags", "deregister tag type {}", tag_type.name());
        self.reorder();
        Ok(())
    }

    pub fn is_registered(&self, tag_type: &TagType) -> bool {
        self.registered.iter().any(|t| t == tag_type)
    }

    /// Registered types in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &TagType> {
        self.registered.iter()
    }

    /// Registered types in precedence order.
    pub fn by_precedence(&self) -> impl Iterator<Item = &TagType> {
        self.ordered.iter()
    }

    pub fn len(&self) -> usize {
        self.registered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registered.is_empty()
    }

    /// Types whose start delimiter matches `parse_text` at `pos`, in the order
    /// they must be tried, followed by the matching sentinel when `pos` holds
    /// a `<`.
    pub fn candidates_at<'r>(
        &'r self,
        parse_text: &'r [u8],
        pos: usize,
    ) -> impl Iterator<Item = &'r TagType> + 'r {
        self.ordered
            .iter()
            .filter(move |t| t.matches_at(parse_text, pos))
            .chain(
                parse_text
                    .get(pos)
                    .is_some_and(|b| *b == b'<')
                    .then(|| TagType::sentinel_for(parse_text, pos)),
            )
    }

    fn reorder(&mut self) {
        // Stable sort over the reversed registration order keeps "newest
        // first" among equal delimiter lengths.
        let mut ordered: Vec<TagType> = self.registered.iter().rev().cloned().collect();
        ordered.sort_by(|a, b| b.start_lower().len().cmp(&a.start_lower().len()));
        self.ordered = ordered;
    }
}

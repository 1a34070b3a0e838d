//! Row/column lookup for byte offsets in a text buffer.
//!
//! Rows and columns are 1-based. Columns count Unicode scalar values, not
//! bytes, so a locator printed in a diagnostic matches what an editor shows.
//! Line breaks are `\n`, `\r\n` and a lone `\r`.

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowColumn {
    pub row: usize,
    pub column: usize,
}

impl std::fmt::Display for RowColumn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}:{})", self.row, self.column)
    }
}

/// Byte offsets of every line start, built once per buffer.
#[derive(Clone, Debug)]
pub struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let bytes = text.as_bytes();
        let mut starts = vec![0];
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'\n' => starts.push(i + 1),
                b'\r' => {
                    if bytes.get(i + 1) == Some(&b'\n') {
                        i += 1;
                    }
                    starts.push(i + 1);
                }
                _ => {}
            }
            i += 1;
        }
        Self { starts }
    }

    pub fn line_count(&self) -> usize {
        self.starts.len()
    }

    /// Locate `pos` in `text`, which must be the buffer this index was built from.
    ///
    /// Offsets past the end clamp to the end of the buffer; offsets inside a
    /// multi-byte character count that character as already passed.
    pub fn row_column(&self, text: &str, pos: usize) -> RowColumn {
        let pos = pos.min(text.len());
        let row_index = match self.starts.binary_search(&pos) {
            Ok(exact) => exact,
            Err(insert) => insert - 1,
        };
        let line_start = self.starts[row_index];
        let column = text.as_bytes()[line_start..pos]
            .iter()
            .filter(|&&b| (b & 0xC0) != 0x80)
            .count();
        RowColumn {
            row: row_index + 1,
            column: column + 1,
        }
    }
}

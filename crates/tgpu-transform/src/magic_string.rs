//! Offset-keyed edit buffer over an original source
//!
//! Edits are recorded against original byte offsets and applied in one pass,
//! so recording order never shifts later edits. Unchanged text keeps its
//! position mapping, which [`MagicString::generate_map`] turns into a source
//! map.

use crate::sourcemap::{MappingsBuilder, SourceMap};

/// Which neighbour an insertion sticks to when it lands on an overwrite
/// boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Side {
    /// End of the text before the position
    Left,
    /// Start of the text after the position
    Right,
}

/// Part of an overwrite. Copied original text keeps a mapping for each of
/// its lines; new text maps to a single position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Piece {
    /// `original[start..end]`, unchanged
    Original { start: usize, end: usize },
    /// New text, mapped to `origin` when there is one
    Generated { text: String, origin: Option<usize> },
}

impl Piece {
    pub fn generated(text: impl Into<String>, origin: Option<usize>) -> Self {
        Piece::Generated {
            text: text.into(),
            origin,
        }
    }

    pub fn text<'a>(&'a self, original: &'a str) -> &'a str {
        match self {
            Piece::Original { start, end } => original.get(*start..*end).unwrap_or_default(),
            Piece::Generated { text, .. } => text,
        }
    }
}

/// The text `pieces` produce over `original`
pub fn join_pieces(original: &str, pieces: &[Piece]) -> String {
    pieces.iter().map(|piece| piece.text(original)).collect()
}

#[derive(Debug, Clone)]
struct Overwrite {
    start: usize,
    end: usize,
    content: Vec<Piece>,
}

#[derive(Debug, Clone)]
struct Insertion {
    pos: usize,
    side: Side,
    seq: usize,
    content: String,
}

/// A piece of the generated output
#[derive(Debug, Clone, PartialEq, Eq)]
struct Chunk<'a> {
    text: std::borrow::Cow<'a, str>,
    /// Original offset the first character maps to
    origin: Option<usize>,
    /// Whether `text` is a verbatim slice of the original
    verbatim: bool,
}

#[derive(Debug, Clone)]
pub struct MagicString<'s> {
    original: &'s str,
    overwrites: Vec<Overwrite>,
    insertions: Vec<Insertion>,
}

impl<'s> MagicString<'s> {
    pub fn new(original: &'s str) -> Self {
        Self {
            original,
            overwrites: Vec::new(),
            insertions: Vec::new(),
        }
    }

    pub fn original(&self) -> &'s str {
        self.original
    }

    pub fn has_changes(&self) -> bool {
        !self.overwrites.is_empty() || !self.insertions.is_empty()
    }

    /// Replace `start..end`. Returns `false`, leaving the buffer unchanged,
    /// when the range overlaps an earlier overwrite or is out of bounds.
    pub fn overwrite(&mut self, start: usize, end: usize, content: impl Into<String>) -> bool {
        self.overwrite_pieces(start, end, vec![Piece::generated(content, Some(start))])
    }

    /// [`MagicString::overwrite`] with content assembled from pieces
    pub fn overwrite_pieces(&mut self, start: usize, end: usize, content: Vec<Piece>) -> bool {
        if start > end || end > self.original.len() {
            return false;
        }
        let copies_in_bounds = content.iter().all(|piece| match piece {
            Piece::Original { start, end } => self.original.get(*start..*end).is_some(),
            Piece::Generated { .. } => true,
        });
        if !copies_in_bounds {
            return false;
        }
        if self
            .overwrites
            .iter()
            .any(|o| start < o.end && o.start < end)
        {
            log::debug!("rejected overlapping edit {}..{}", start, end);
            return false;
        }
        self.overwrites.push(Overwrite {
            start,
            end,
            content,
        });
        true
    }

    /// Insert before the original text at `pos`
    pub fn prepend(&mut self, pos: usize, content: impl Into<String>) {
        self.insert(pos, Side::Right, content.into());
    }

    /// Insert after the original text ending at `pos`
    pub fn append(&mut self, pos: usize, content: impl Into<String>) {
        self.insert(pos, Side::Left, content.into());
    }

    fn insert(&mut self, pos: usize, side: Side, content: String) {
        let pos = pos.min(self.original.len());
        let seq = self.insertions.len();
        self.insertions.push(Insertion {
            pos,
            side,
            seq,
            content,
        });
    }

    fn chunks(&self) -> Vec<Chunk<'_>> {
        let mut overwrites: Vec<&Overwrite> = self.overwrites.iter().collect();
        overwrites.sort_by_key(|o| o.start);
        let mut insertions: Vec<&Insertion> = self.insertions.iter().collect();
        insertions.sort_by_key(|i| (i.pos, i.side, i.seq));

        let mut chunks = Vec::new();
        let mut cursor = 0;
        let mut pending = insertions.into_iter().peekable();

        for overwrite in overwrites {
            while let Some(insertion) = pending.next_if(|i| i.pos <= overwrite.start) {
                push_verbatim(&mut chunks, self.original, cursor, insertion.pos);
                cursor = insertion.pos;
                chunks.push(Chunk {
                    text: insertion.content.as_str().into(),
                    origin: None,
                    verbatim: false,
                });
            }
            push_verbatim(&mut chunks, self.original, cursor, overwrite.start);
            for piece in &overwrite.content {
                match piece {
                    Piece::Original { start, end } => {
                        push_verbatim(&mut chunks, self.original, *start, *end)
                    }
                    Piece::Generated { text, origin } if !text.is_empty() => chunks.push(Chunk {
                        text: text.as_str().into(),
                        origin: *origin,
                        verbatim: false,
                    }),
                    Piece::Generated { .. } => {}
                }
            }
            cursor = overwrite.end;
            // Insertions inside replaced text have nothing to attach to
            while pending.next_if(|i| i.pos < overwrite.end).is_some() {}
        }
        for insertion in pending {
            push_verbatim(&mut chunks, self.original, cursor, insertion.pos);
            cursor = insertion.pos;
            chunks.push(Chunk {
                text: insertion.content.as_str().into(),
                origin: None,
                verbatim: false,
            });
        }
        push_verbatim(&mut chunks, self.original, cursor, self.original.len());
        chunks
    }

    /// Map from the generated text back to the original. Verbatim text,
    /// including original pieces inside an overwrite, is mapped at every
    /// line start; new text maps to its origin.
    pub fn generate_map(&self, source_name: &str, include_content: bool) -> SourceMap {
        let mut builder = MappingsBuilder::new(self.original);
        for chunk in self.chunks() {
            match chunk.origin {
                Some(origin) if chunk.verbatim => builder.add_verbatim(&chunk.text, origin),
                Some(origin) => builder.add_replaced(&chunk.text, origin),
                None => builder.add_unmapped(&chunk.text),
            }
        }
        SourceMap::new(
            source_name,
            include_content.then(|| self.original.to_string()),
            builder.finish(),
        )
    }
}

fn push_verbatim<'a>(chunks: &mut Vec<Chunk<'a>>, original: &'a str, from: usize, to: usize) {
    if from < to {
        chunks.push(Chunk {
            text: original[from..to].into(),
            origin: Some(from),
            verbatim: true,
        });
    }
}

impl std::fmt::Display for MagicString<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for chunk in self.chunks() {
            f.write_str(&chunk.text)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edits_apply_in_original_coordinates() {
        let mut buffer = MagicString::new("let a = f(x);");
        assert!(buffer.overwrite(10, 11, "y + 1"));
        assert!(buffer.overwrite(4, 5, "b"));
        assert_eq!(buffer.to_string(), "let b = f(y + 1);");
    }

    #[test]
    fn test_overlapping_overwrite_rejected() {
        let mut buffer = MagicString::new("abcdef");
        assert!(buffer.overwrite(1, 4, "X"));
        assert!(!buffer.overwrite(3, 5, "Y"));
        assert!(!buffer.overwrite(2, 9, "Y"));
        assert_eq!(buffer.to_string(), "aXef");
    }

    #[test]
    fn test_insertions_around_overwrite() {
        let mut buffer = MagicString::new("const k = g(h);");
        buffer.prepend(10, "wrap(");
        buffer.append(14, ", \"k\")");
        assert!(buffer.overwrite(12, 13, "H"));
        assert_eq!(buffer.to_string(), "const k = wrap(g(H), \"k\");");
    }

    #[test]
    fn test_insertions_at_overwrite_edges() {
        let mut buffer = MagicString::new("[x]");
        assert!(buffer.overwrite(1, 2, "y"));
        buffer.prepend(1, "<");
        buffer.append(2, ">");
        buffer.append(1, "|");
        assert_eq!(buffer.to_string(), "[|<y>]");
    }

    #[test]
    fn test_overwrite_with_pieces() {
        let source = "f(a,\n  b);";
        let mut buffer = MagicString::new(source);
        let pieces = vec![
            Piece::generated("wrap(", Some(2)),
            Piece::Original { start: 2, end: 8 },
            Piece::generated(")", None),
        ];
        assert_eq!(join_pieces(source, &pieces), "wrap(a,\n  b)");
        assert!(buffer.overwrite_pieces(2, 8, pieces));
        assert_eq!(buffer.to_string(), "f(wrap(a,\n  b));");
        assert!(!buffer.overwrite_pieces(0, 1, vec![Piece::Original { start: 5, end: 99 }]));

        let lines = buffer.generate_map("p.js", false).decode_mappings().unwrap();
        // The copied second line still starts at its own original line
        assert_eq!(lines[1][0], [0, 0, 1, 0]);
    }

    #[test]
    fn test_untouched_buffer() {
        let buffer = MagicString::new("a\nb");
        assert!(!buffer.has_changes());
        assert_eq!(buffer.to_string(), "a\nb");
    }
}

//! Source map v3 output
//!
//! Columns are counted in UTF-16 code units, as JS tooling expects.

use base64::Engine;
use serde::{Deserialize, Serialize};

/// Digits of a base64 VLQ, one per 6-bit group
const VLQ_DIGITS: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMap {
    pub version: u32,
    pub sources: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources_content: Option<Vec<String>>,
    pub names: Vec<String>,
    pub mappings: String,
}

impl SourceMap {
    pub fn new(source: &str, content: Option<String>, mappings: String) -> Self {
        Self {
            version: 3,
            sources: vec![source.to_string()],
            sources_content: content.map(|c| vec![c]),
            names: Vec::new(),
            mappings,
        }
    }

    pub fn to_json(&self) -> String {
        // A map of plain strings always serializes
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn to_url(&self) -> String {
        format!(
            "data:application/json;charset=utf-8;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(self.to_json())
        )
    }

    /// `//# sourceMappingURL=` comment carrying the whole map
    pub fn inline_comment(&self) -> String {
        format!("//# sourceMappingURL={}", self.to_url())
    }

    /// Decode `mappings` into `[generated_column, source, line, column]`
    /// segments per generated line
    pub fn decode_mappings(&self) -> Option<Vec<Vec<[i64; 4]>>> {
        let mut lines = Vec::new();
        let mut state = [0i64; 4];
        for line in self.mappings.split(';') {
            state[0] = 0;
            let mut segments = Vec::new();
            for segment in line.split(',').filter(|s| !s.is_empty()) {
                let fields = vlq_decode(segment)?;
                if fields.len() != 4 {
                    return None;
                }
                for (slot, delta) in state.iter_mut().zip(&fields) {
                    *slot += delta;
                }
                segments.push(state);
            }
            lines.push(segments);
        }
        Some(lines)
    }
}

pub fn vlq_encode(value: i64, out: &mut String) {
    let mut rest = if value < 0 {
        ((-value) << 1) | 1
    } else {
        value << 1
    } as u64;
    loop {
        let mut digit = (rest & 0b11111) as usize;
        rest >>= 5;
        if rest > 0 {
            digit |= 0b100000;
        }
        out.push(VLQ_DIGITS[digit] as char);
        if rest == 0 {
            break;
        }
    }
}

pub fn vlq_decode(segment: &str) -> Option<Vec<i64>> {
    let mut values = Vec::new();
    let mut value: u64 = 0;
    let mut shift = 0;
    for byte in segment.bytes() {
        let digit = VLQ_DIGITS.iter().position(|&b| b == byte)? as u64;
        value |= (digit & 0b11111) << shift;
        if digit & 0b100000 != 0 {
            shift += 5;
            if shift > 60 {
                return None;
            }
            continue;
        }
        let magnitude = (value >> 1) as i64;
        values.push(if value & 1 == 1 { -magnitude } else { magnitude });
        value = 0;
        shift = 0;
    }
    (shift == 0).then_some(values)
}

/// Incremental writer for the `mappings` field of a single-source map
pub struct MappingsBuilder<'s> {
    original: &'s str,
    line_starts: Vec<usize>,
    mappings: String,
    gen_col: usize,
    /// Last emitted values, for delta encoding
    prev_gen_col: i64,
    prev_src_line: i64,
    prev_src_col: i64,
    line_has_segment: bool,
}

impl<'s> MappingsBuilder<'s> {
    pub fn new(original: &'s str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(original.match_indices('\n').map(|(i, _)| i + 1));
        Self {
            original,
            line_starts,
            mappings: String::new(),
            gen_col: 0,
            prev_gen_col: 0,
            prev_src_line: 0,
            prev_src_col: 0,
            line_has_segment: false,
        }
    }

    fn original_position(&self, offset: usize) -> (usize, usize) {
        let line = self.line_starts.partition_point(|&start| start <= offset) - 1;
        let start = self.line_starts[line];
        let column = self
            .original
            .get(start..offset)
            .map_or(0, |s| s.encode_utf16().count());
        (line, column)
    }

    fn segment(&mut self, offset: usize) {
        let (src_line, src_col) = self.original_position(offset);
        if self.line_has_segment {
            self.mappings.push(',');
        }
        vlq_encode(self.gen_col as i64 - self.prev_gen_col, &mut self.mappings);
        vlq_encode(0, &mut self.mappings);
        vlq_encode(src_line as i64 - self.prev_src_line, &mut self.mappings);
        vlq_encode(src_col as i64 - self.prev_src_col, &mut self.mappings);
        self.prev_gen_col = self.gen_col as i64;
        self.prev_src_line = src_line as i64;
        self.prev_src_col = src_col as i64;
        self.line_has_segment = true;
    }

    fn newline(&mut self) {
        self.mappings.push(';');
        self.gen_col = 0;
        self.prev_gen_col = 0;
        self.line_has_segment = false;
    }

    fn advance(&mut self, text: &str) {
        self.gen_col += text.encode_utf16().count();
    }

    /// Text copied from the original starting at `origin`
    pub fn add_verbatim(&mut self, text: &str, origin: usize) {
        let mut offset = origin;
        for (i, line) in text.split('\n').enumerate() {
            if i > 0 {
                self.newline();
            }
            if !line.is_empty() {
                self.segment(offset);
            }
            self.advance(line);
            offset += line.len() + 1;
        }
    }

    /// Generated text standing in for original text at `origin`
    pub fn add_replaced(&mut self, text: &str, origin: usize) {
        for (i, line) in text.split('\n').enumerate() {
            if i > 0 {
                self.newline();
            } else if !line.is_empty() {
                self.segment(origin);
            }
            self.advance(line);
        }
    }

    pub fn add_unmapped(&mut self, text: &str) {
        for (i, line) in text.split('\n').enumerate() {
            if i > 0 {
                self.newline();
            }
            self.advance(line);
        }
    }

    pub fn finish(self) -> String {
        self.mappings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::magic_string::MagicString;

    #[test]
    fn test_vlq_known_values() {
        let mut out = String::new();
        for value in [0, 1, -1, 15, 16, -17, 1000] {
            vlq_encode(value, &mut out);
            out.push(',');
        }
        assert_eq!(out, "A,C,D,e,gB,jB,w+B,");
        assert_eq!(vlq_decode("AACA"), Some(vec![0, 0, 1, 0]));
        assert_eq!(vlq_decode("w+B"), Some(vec![1000]));
        assert_eq!(vlq_decode("g"), None);
    }

    #[test]
    fn test_identity_map() {
        let buffer = MagicString::new("a;\nb;");
        let map = buffer.generate_map("in.js", false);
        assert_eq!(map.mappings, "AAAA;AACA");
        assert_eq!(map.sources, ["in.js"]);
        assert!(map.sources_content.is_none());
    }

    #[test]
    fn test_map_after_overwrite() {
        let source = "let x;\nfoo(bar);\nbaz;";
        let mut buffer = MagicString::new(source);
        assert!(buffer.overwrite(11, 14, "replacement"));
        let map = buffer.generate_map("in.js", true);
        let lines = map.decode_mappings().unwrap();
        assert_eq!(lines.len(), 3);
        // `foo(` verbatim, then the replacement at the start of `bar`
        // `);` after the replacement continues from the end of `bar`
        assert_eq!(lines[1], vec![[0, 0, 1, 0], [4, 0, 1, 4], [15, 0, 1, 7]]);
        assert_eq!(lines[2], vec![[0, 0, 2, 0]]);
        assert_eq!(map.sources_content, Some(vec![source.to_string()]));
    }

    #[test]
    fn test_json_and_url() {
        let map = SourceMap::new("a.ts", None, "AAAA".to_string());
        let json = map.to_json();
        assert_eq!(
            json,
            r#"{"version":3,"sources":["a.ts"],"names":[],"mappings":"AAAA"}"#
        );
        let back: SourceMap = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
        assert!(map.to_url().starts_with("data:application/json;charset=utf-8;base64,eyJ2"));
        let encoded = map.to_url().rsplit(',').next().unwrap().to_string();
        let decoded = base64::engine::general_purpose::STANDARD.decode(encoded).unwrap();
        assert_eq!(String::from_utf8(decoded).unwrap(), json);
    }
}

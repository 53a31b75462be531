//! Pass 0: literal zone detection
//!
//! Literal zones are fenced verbatim regions: a line holding a bare key
//! identifier, followed by a fence of three or more backticks at the same
//! indent. Inside a zone nothing is tokenized, tabs are legal, and NFC
//! normalization is bypassed, so embedded code (including OCTAVE-about-
//! OCTAVE) survives byte for byte.

use regex::Regex;

#[derive(Debug, Clone, PartialEq)]
pub struct LiteralZoneSpan {
    /// 1-indexed line holding the key identifier.
    pub key_line: usize,
    /// 1-indexed line of the opening fence.
    pub fence_line: usize,
    /// 1-indexed line of the closing fence (last line of input when
    /// auto-closed at EOF).
    pub close_line: usize,
    pub fence_width: usize,
    /// Info tag after the opening fence, e.g. `python`.
    pub info: String,
    /// Indent of the key line, in columns.
    pub indent: usize,
    /// False when the zone ran to EOF without a closing fence.
    pub closed: bool,
}

pub struct LiteralScanner {
    key_re: Regex,
    fence_re: Regex,
}

impl LiteralScanner {
    pub fn new() -> Self {
        Self {
            key_re: Regex::new(r"^( *)([A-Za-z_][A-Za-z0-9_]*)\s*$").unwrap(),
            fence_re: Regex::new(r"^( *)(`{3,})(.*)$").unwrap(),
        }
    }

    pub fn scan(&self, text: &str) -> Vec<LiteralZoneSpan> {
        let lines: Vec<&str> = text.lines().collect();
        let mut zones = Vec::new();
        let mut current: Option<LiteralZoneSpan> = None;

        for (idx, line) in lines.iter().enumerate() {
            let line_num = idx + 1;

            if let Some(ref mut zone) = current {
                if let Some(caps) = self.fence_re.captures(line) {
                    let indent = caps.get(1).map(|m| m.as_str().len()).unwrap_or(0);
                    let width = caps.get(2).map(|m| m.as_str().len()).unwrap_or(0);
                    let trailing = caps.get(3).map(|m| m.as_str().trim()).unwrap_or("");
                    // The closer must match the opener's width and indent
                    // and carry no info tag.
                    if indent == zone.indent && width == zone.fence_width && trailing.is_empty() {
                        zone.close_line = line_num;
                        zone.closed = true;
                        zones.push(current.take().unwrap());
                    }
                }
                continue;
            }

            // Zone opener: key line whose successor is a fence at the same
            // indent.
            if let Some(key_caps) = self.key_re.captures(line) {
                let indent = key_caps.get(1).map(|m| m.as_str().len()).unwrap_or(0);
                if let Some(next) = lines.get(idx + 1) {
                    if let Some(fence_caps) = self.fence_re.captures(next) {
                        let fence_indent =
                            fence_caps.get(1).map(|m| m.as_str().len()).unwrap_or(0);
                        if fence_indent == indent {
                            current = Some(LiteralZoneSpan {
                                key_line: line_num,
                                fence_line: line_num + 1,
                                close_line: line_num + 1,
                                fence_width: fence_caps
                                    .get(2)
                                    .map(|m| m.as_str().len())
                                    .unwrap_or(3),
                                info: fence_caps
                                    .get(3)
                                    .map(|m| m.as_str().trim().to_string())
                                    .unwrap_or_default(),
                                indent,
                                closed: false,
                            });
                        }
                    }
                }
            }
        }

        // Unclosed zone runs to EOF; the lexer reports the auto-close.
        if let Some(mut zone) = current {
            zone.close_line = lines.len();
            zone.closed = false;
            zones.push(zone);
        }

        zones
    }

    /// True when `line_num` lies anywhere inside a zone, key line included.
    pub fn in_zone(line_num: usize, zones: &[LiteralZoneSpan]) -> bool {
        zones
            .iter()
            .any(|z| z.key_line <= line_num && line_num <= z.close_line)
    }
}

impl Default for LiteralScanner {
    fn default() -> Self {
        Self::new()
    }
}

//! Line-oriented INI document model.
//!
//! The document keeps every line it parsed. Comments, blank lines and
//! untouched `key = value` pairs round-trip verbatim; only lines the
//! engine actually edits are re-rendered. Keys appearing before any
//! `[section]` header belong to the designated `DEFAULT` section.

use std::collections::HashSet;
use std::ops::Range;
use std::path::Path;

use crate::error::{Error, Result};

/// Name of the section holding keys that appear before any header.
pub const DEFAULT_SECTION: &str = "DEFAULT";

/// One parsed line of the file.
#[derive(Debug, Clone)]
enum Line {
    /// Blank line or `#`/`;` comment, preserved exactly
    Verbatim(String),
    /// `[name]` header; raw text kept for round-tripping
    Section { name: String, raw: String },
    /// `key = value` pair; `raw` is the original text while untouched
    Pair {
        key: String,
        value: String,
        raw: Option<String>,
    },
}

/// Outcome of an upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetOutcome {
    /// Key did not exist and was inserted
    Added,
    /// Key existed with a different value
    Changed { old: String },
    /// Key already had the desired value
    Unchanged,
}

/// An ordered, comment-preserving INI document.
#[derive(Debug, Clone, Default)]
pub struct IniDocument {
    lines: Vec<Line>,
}

impl IniDocument {
    /// Parse INI text. `path` is only used to name the file in errors.
    pub fn parse(path: &Path, text: &str) -> Result<Self> {
        let mut lines = Vec::new();

        for (idx, raw) in text.lines().enumerate() {
            let trimmed = raw.trim();

            if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
                lines.push(Line::Verbatim(raw.to_string()));
            } else if trimmed.starts_with('[') {
                let name = trimmed
                    .strip_prefix('[')
                    .and_then(|rest| rest.strip_suffix(']'))
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .ok_or_else(|| Error::Parse {
                        path: path.to_path_buf(),
                        line: idx + 1,
                        reason: format!("malformed section header {trimmed:?}"),
                    })?;
                lines.push(Line::Section {
                    name: name.to_string(),
                    raw: raw.to_string(),
                });
            } else if let Some((key, value)) = raw.split_once('=') {
                let key = key.trim();
                if key.is_empty() {
                    return Err(Error::Parse {
                        path: path.to_path_buf(),
                        line: idx + 1,
                        reason: "missing key before '='".to_string(),
                    });
                }
                lines.push(Line::Pair {
                    key: key.to_string(),
                    value: value.trim().to_string(),
                    raw: Some(raw.to_string()),
                });
            } else {
                return Err(Error::Parse {
                    path: path.to_path_buf(),
                    line: idx + 1,
                    reason: format!("expected key = value, got {trimmed:?}"),
                });
            }
        }

        Ok(Self { lines })
    }

    /// Render the document back to text. Non-empty documents end with a
    /// newline.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            match line {
                Line::Verbatim(raw) | Line::Section { raw, .. } => out.push_str(raw),
                Line::Pair { key, value, raw } => match raw {
                    Some(raw) => out.push_str(raw),
                    None => {
                        out.push_str(key);
                        out.push('=');
                        out.push_str(value);
                    }
                },
            }
            out.push('\n');
        }
        out
    }

    /// Current value of `section/key`, if present.
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        for range in self.section_spans(section) {
            for line in &self.lines[range] {
                if let Line::Pair { key: k, value, .. } = line
                    && k == key
                {
                    return Some(value);
                }
            }
        }
        None
    }

    /// Upsert `section/key` to `value`, creating the section when missing.
    pub fn set(&mut self, section: &str, key: &str, value: &str) -> SetOutcome {
        let spans = self.section_spans(section);

        // Update in place when the key already exists.
        for range in &spans {
            for idx in range.clone() {
                if let Line::Pair {
                    key: k,
                    value: v,
                    raw,
                } = &mut self.lines[idx]
                    && k == key
                {
                    if v == value {
                        return SetOutcome::Unchanged;
                    }
                    let old = std::mem::replace(v, value.to_string());
                    *raw = None;
                    return SetOutcome::Changed { old };
                }
            }
        }

        let pair = Line::Pair {
            key: key.to_string(),
            value: value.to_string(),
            raw: None,
        };

        if let Some(range) = spans.last() {
            // Insert at the end of the section, before its trailing blanks.
            let mut at = range.end;
            while at > range.start
                && matches!(&self.lines[at - 1], Line::Verbatim(raw) if raw.trim().is_empty())
            {
                at -= 1;
            }
            self.lines.insert(at, pair);
        } else {
            // New section appended at end of file.
            self.lines.push(Line::Section {
                name: section.to_string(),
                raw: format!("[{section}]"),
            });
            self.lines.push(pair);
        }

        SetOutcome::Added
    }

    /// Remove `section/key`, returning the old value when it was present.
    pub fn remove(&mut self, section: &str, key: &str) -> Option<String> {
        for range in self.section_spans(section) {
            for idx in range {
                if let Line::Pair { key: k, value, .. } = &self.lines[idx]
                    && k == key
                {
                    let old = value.clone();
                    self.lines.remove(idx);
                    return Some(old);
                }
            }
        }
        None
    }

    /// All (section, key, value) triples in file order.
    pub fn entries(&self) -> Vec<(String, String, String)> {
        let mut out = Vec::new();
        let mut section = DEFAULT_SECTION.to_string();
        for line in &self.lines {
            match line {
                Line::Section { name, .. } => section = name.clone(),
                Line::Pair { key, value, .. } => {
                    out.push((section.clone(), key.clone(), value.clone()));
                }
                Line::Verbatim(_) => {}
            }
        }
        out
    }

    /// Remove every pair whose (section, key) identity is not in `keep`.
    /// Returns the removed triples in file order.
    pub fn retain_keys(&mut self, keep: &HashSet<(String, String)>) -> Vec<(String, String, String)> {
        let mut removed = Vec::new();
        let mut section = DEFAULT_SECTION.to_string();
        let mut kept = Vec::with_capacity(self.lines.len());

        for line in self.lines.drain(..) {
            match &line {
                Line::Section { name, .. } => {
                    section = name.clone();
                    kept.push(line);
                }
                Line::Pair { key, value, .. } => {
                    if keep.contains(&(section.clone(), key.clone())) {
                        kept.push(line);
                    } else {
                        removed.push((section.clone(), key.clone(), value.clone()));
                    }
                }
                Line::Verbatim(_) => kept.push(line),
            }
        }

        self.lines = kept;
        removed
    }

    /// Drop explicit sections that contain no key/value pairs, comments
    /// included. The `DEFAULT` section is always kept.
    pub fn prune_empty_sections(&mut self) {
        loop {
            let mut victim: Option<Range<usize>> = None;

            for (idx, line) in self.lines.iter().enumerate() {
                let Line::Section { name, .. } = line else {
                    continue;
                };
                if name == DEFAULT_SECTION {
                    continue;
                }
                let end = self.next_header(idx + 1);
                let has_pairs = self.lines[idx + 1..end]
                    .iter()
                    .any(|l| matches!(l, Line::Pair { .. }));
                if !has_pairs {
                    victim = Some(idx..end);
                    break;
                }
            }

            match victim {
                Some(range) => {
                    self.lines.drain(range);
                }
                None => break,
            }
        }
    }

    /// Section names in file order, the implicit `DEFAULT` first when it
    /// holds any content.
    pub fn sections(&self) -> Vec<String> {
        let mut out = Vec::new();
        if !self.implicit_default_span().is_empty() {
            out.push(DEFAULT_SECTION.to_string());
        }
        for line in &self.lines {
            if let Line::Section { name, .. } = line
                && !out.contains(name)
            {
                out.push(name.clone());
            }
        }
        out
    }

    /// Index of the next section header at or after `from`.
    fn next_header(&self, from: usize) -> usize {
        self.lines[from..]
            .iter()
            .position(|l| matches!(l, Line::Section { .. }))
            .map_or(self.lines.len(), |off| from + off)
    }

    /// The implicit top-of-file region belonging to `DEFAULT`.
    fn implicit_default_span(&self) -> Range<usize> {
        0..self.next_header(0)
    }

    /// Line ranges holding content of `section`, in file order. For
    /// `DEFAULT` this is the implicit top region plus any explicit
    /// `[DEFAULT]` blocks; ranges exclude the header lines themselves.
    fn section_spans(&self, section: &str) -> Vec<Range<usize>> {
        let mut spans = Vec::new();
        if section == DEFAULT_SECTION {
            spans.push(self.implicit_default_span());
        }
        let mut idx = 0;
        while idx < self.lines.len() {
            if let Line::Section { name, .. } = &self.lines[idx]
                && name == section
            {
                let end = self.next_header(idx + 1);
                spans.push(idx + 1..end);
                idx = end;
            } else {
                idx += 1;
            }
        }
        spans
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> IniDocument {
        IniDocument::parse(Path::new("test.ini"), text).unwrap()
    }

    #[test]
    fn parse_empty() {
        let doc = parse("");
        assert!(doc.entries().is_empty());
        assert_eq!(doc.render(), "");
    }

    #[test]
    fn parse_sections_and_pairs() {
        let doc = parse("[ml2]\ntype_drivers = local,flat\npath_mtu=0\n");
        assert_eq!(doc.get("ml2", "type_drivers"), Some("local,flat"));
        assert_eq!(doc.get("ml2", "path_mtu"), Some("0"));
        assert_eq!(doc.get("ml2", "missing"), None);
    }

    #[test]
    fn keys_before_headers_belong_to_default() {
        let doc = parse("debug = False\n[agent]\nreport_interval = 30\n");
        assert_eq!(doc.get("DEFAULT", "debug"), Some("False"));
        assert_eq!(doc.get("agent", "report_interval"), Some("30"));
        assert_eq!(doc.sections(), vec!["DEFAULT", "agent"]);
    }

    #[test]
    fn explicit_default_header() {
        let doc = parse("[DEFAULT]\ndebug = True\n");
        assert_eq!(doc.get("DEFAULT", "debug"), Some("True"));
    }

    #[test]
    fn comments_and_blanks_round_trip() {
        let text = "# managed by choro\n\n[ml2]\n; drivers\ntype_drivers = local\n";
        let doc = parse(text);
        assert_eq!(doc.render(), text);
    }

    #[test]
    fn untouched_pairs_keep_their_spacing() {
        let text = "[ml2]\npath_mtu   =    9000\n";
        let mut doc = parse(text);
        assert_eq!(doc.render(), text);

        // An update to a sibling key must not reformat this one.
        doc.set("ml2", "type_drivers", "vlan");
        assert!(doc.render().contains("path_mtu   =    9000"));
    }

    #[test]
    fn malformed_header_is_a_parse_error() {
        let err = IniDocument::parse(Path::new("bad.ini"), "[ml2\nkey = v\n").unwrap_err();
        assert!(matches!(err, Error::Parse { line: 1, .. }));
    }

    #[test]
    fn bare_word_is_a_parse_error() {
        let err = IniDocument::parse(Path::new("bad.ini"), "[ml2]\nnot-a-pair\n").unwrap_err();
        assert!(matches!(err, Error::Parse { line: 2, .. }));
    }

    #[test]
    fn set_updates_existing_key() {
        let mut doc = parse("[ml2]\npath_mtu = 0\n");
        let outcome = doc.set("ml2", "path_mtu", "9000");
        assert_eq!(
            outcome,
            SetOutcome::Changed {
                old: "0".to_string()
            }
        );
        assert_eq!(doc.get("ml2", "path_mtu"), Some("9000"));
    }

    #[test]
    fn set_same_value_is_unchanged() {
        let text = "[ml2]\npath_mtu = 9000\n";
        let mut doc = parse(text);
        assert_eq!(doc.set("ml2", "path_mtu", "9000"), SetOutcome::Unchanged);
        assert_eq!(doc.render(), text);
    }

    #[test]
    fn set_appends_to_existing_section() {
        let mut doc = parse("[ml2]\npath_mtu = 0\n\n[securitygroup]\n");
        assert_eq!(doc.set("ml2", "type_drivers", "vlan"), SetOutcome::Added);
        let rendered = doc.render();
        // New key lands inside [ml2], before the blank separator.
        let ml2_at = rendered.find("[ml2]").unwrap();
        let new_at = rendered.find("type_drivers=vlan").unwrap();
        let sg_at = rendered.find("[securitygroup]").unwrap();
        assert!(ml2_at < new_at && new_at < sg_at);
    }

    #[test]
    fn set_creates_missing_section_at_end() {
        let mut doc = parse("[ml2]\npath_mtu = 0\n");
        doc.set("ml2_type_vlan", "network_vlan_ranges", "10:50");
        assert_eq!(
            doc.render(),
            "[ml2]\npath_mtu = 0\n[ml2_type_vlan]\nnetwork_vlan_ranges=10:50\n"
        );
    }

    #[test]
    fn set_default_on_empty_document() {
        let mut doc = parse("");
        doc.set("DEFAULT", "debug", "False");
        assert_eq!(doc.get("DEFAULT", "debug"), Some("False"));
        assert_eq!(doc.render(), "debug=False\n");
    }

    #[test]
    fn remove_returns_old_value() {
        let mut doc = parse("[ml2]\npath_mtu = 9000\n");
        assert_eq!(doc.remove("ml2", "path_mtu"), Some("9000".to_string()));
        assert_eq!(doc.remove("ml2", "path_mtu"), None);
        assert_eq!(doc.get("ml2", "path_mtu"), None);
    }

    #[test]
    fn retain_keys_drops_unmanaged_pairs() {
        let mut doc = parse("[ml2]\nfoo = bar\npath_mtu = 9000\n");
        let keep: HashSet<_> = [("ml2".to_string(), "path_mtu".to_string())].into();
        let removed = doc.retain_keys(&keep);
        assert_eq!(
            removed,
            vec![("ml2".to_string(), "foo".to_string(), "bar".to_string())]
        );
        assert_eq!(doc.get("ml2", "path_mtu"), Some("9000"));
        assert_eq!(doc.get("ml2", "foo"), None);
    }

    #[test]
    fn prune_drops_emptied_sections_but_not_default() {
        let mut doc = parse("[DEFAULT]\n[ml2]\n# leftover comment\n\n[agent]\nextensions = qos\n");
        doc.prune_empty_sections();
        let rendered = doc.render();
        assert!(!rendered.contains("[ml2]"));
        assert!(!rendered.contains("leftover"));
        assert!(rendered.contains("[DEFAULT]"));
        assert!(rendered.contains("[agent]"));
    }

    #[test]
    fn entries_walk_file_order() {
        let doc = parse("debug = False\n[ml2]\na = 1\nb = 2\n");
        assert_eq!(
            doc.entries(),
            vec![
                ("DEFAULT".to_string(), "debug".to_string(), "False".to_string()),
                ("ml2".to_string(), "a".to_string(), "1".to_string()),
                ("ml2".to_string(), "b".to_string(), "2".to_string()),
            ]
        );
    }
}

//! Just enough of a query tokenizer to split templates, find variables and
//! substitute them without touching IRIs or string literals.

use regex::Regex;
use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

/// One lexical piece of query text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Piece<'a> {
    /// A `?name` or `$name` token; the name without its sigil.
    Var(&'a str),
    /// Everything else, verbatim.
    Text(&'a str),
}

fn is_var_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Length of the IRI reference starting at `<`, or None when the `<` is an
/// operator (whitespace or a quote before the closing `>`).
pub(crate) fn iri_len(s: &str) -> Option<usize> {
    for (i, c) in s.char_indices().skip(1) {
        match c {
            '>' => return Some(i + 1),
            c if c.is_whitespace() || c == '"' || c == '<' || c == '{' || c == '}' => return None,
            _ => {}
        }
    }
    None
}

/// Length of the string literal starting at a quote, escapes honoured.
/// Unterminated literals run to the end of the text.
pub(crate) fn string_len(s: &str) -> usize {
    let mut chars = s.char_indices().skip(1);
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '"' => return i + 1,
            _ => {}
        }
    }
    s.len()
}

/// Split text into variables and opaque text. IRIs and string literals are
/// never split, so `"?x"` or `<http://h/?x>` are not variables.
pub fn pieces(text: &str) -> Vec<Piece<'_>> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut i = 0;
    let bytes = text.as_bytes();
    while i < text.len() {
        let rest = &text[i..];
        match bytes[i] {
            b'"' => i += string_len(rest),
            b'<' => i += iri_len(rest).unwrap_or(1),
            b'?' | b'$' => {
                let name_len: usize = rest[1..]
                    .chars()
                    .take_while(|c| is_var_char(*c))
                    .map(char::len_utf8)
                    .sum();
                if name_len == 0 {
                    i += 1;
                    continue;
                }
                if start < i {
                    out.push(Piece::Text(&text[start..i]));
                }
                out.push(Piece::Var(&rest[1..1 + name_len]));
                i += 1 + name_len;
                start = i;
            }
            _ => i += rest.chars().next().map_or(1, char::len_utf8),
        }
    }
    if start < text.len() {
        out.push(Piece::Text(&text[start..]));
    }
    out
}

/// Distinct variable names in order of first appearance.
pub fn variables(text: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for piece in pieces(text) {
        if let Piece::Var(name) = piece {
            if !out.iter().any(|v| v == name) {
                out.push(name.to_string());
            }
        }
    }
    out
}

/// Byte offset of the bracket closing the one at `open`, skipping brackets
/// inside IRIs and string literals.
pub fn matching_close(text: &str, open: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let (o, c) = match bytes.get(open)? {
        b'{' => (b'{', b'}'),
        b'(' => (b'(', b')'),
        b'[' => (b'[', b']'),
        _ => return None,
    };
    let mut depth = 0usize;
    let mut i = open;
    while i < text.len() {
        let rest = &text[i..];
        let b = bytes[i];
        if b == b'"' {
            i += string_len(rest);
            continue;
        }
        if b == b'<' {
            i += iri_len(rest).unwrap_or(1);
            continue;
        }
        if b == o {
            depth += 1;
        } else if b == c {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
        i += rest.chars().next().map_or(1, char::len_utf8);
    }
    None
}

fn guard_start() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)FILTER\s+NOT\s+EXISTS\s*\{").ok())
        .as_ref()
}

/// Byte ranges of every guard block (`FILTER NOT EXISTS { ... }`), braces
/// included. An unterminated guard runs to the end.
pub fn guard_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let Some(re) = guard_start() else {
        return spans;
    };
    let masked = mask_opaque(text);
    let mut from = 0;
    while let Some(m) = re.find_at(&masked, from) {
        let open = m.end() - 1;
        let end = matching_close(text, open).map_or(text.len(), |c| c + 1);
        spans.push((m.start(), end));
        from = end;
        if from >= text.len() {
            break;
        }
    }
    spans
}

/// The text with every guard block blanked out.
pub fn strip_guards(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for (start, end) in guard_spans(text) {
        out.push_str(&text[last..start]);
        out.push(' ');
        last = end;
    }
    out.push_str(&text[last..]);
    out
}

/// Position of the first case-insensitive keyword occurrence that stands
/// alone (not part of a longer word), outside IRIs and literals.
pub fn find_keyword(text: &str, keyword: &str) -> Option<usize> {
    let re = keyword_regex(keyword)?;
    let masked = mask_opaque(text);
    re.find(&masked).map(|m| m.start())
}

/// Compiled once per keyword, case-folded.
fn keyword_regex(keyword: &str) -> Option<Regex> {
    static CACHE: OnceLock<Mutex<HashMap<String, Regex>>> = OnceLock::new();
    let key = keyword.to_ascii_uppercase();
    let mut cache = CACHE
        .get_or_init(|| Mutex::new(HashMap::new()))
        .lock()
        .unwrap_or_else(|e| e.into_inner());
    if let Some(re) = cache.get(&key) {
        return Some(re.clone());
    }
    let re = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(&key))).ok()?;
    cache.insert(key, re.clone());
    Some(re)
}

/// Same length as `text`, with IRI and literal contents replaced by spaces.
pub(crate) fn mask_opaque(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < text.len() {
        let rest = &text[i..];
        let len = match bytes[i] {
            b'"' => string_len(rest),
            b'<' => iri_len(rest).unwrap_or(0),
            _ => 0,
        };
        if len > 0 {
            out.extend(std::iter::repeat(' ').take(len));
            i += len;
        } else {
            let c = rest.chars().next().unwrap_or(' ');
            if c.is_ascii() {
                out.push(c);
            } else {
                out.extend(std::iter::repeat(' ').take(c.len_utf8()));
            }
            i += c.len_utf8();
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variables_skip_iris_and_literals() {
        let q = r#"?a <http://h/x?y=1> "say ?b" . ?c ?a $d"#;
        assert_eq!(variables(q), vec!["a", "c", "d"]);
    }

    #[test]
    fn variables_are_maximal() {
        assert_eq!(variables("?i1 ?i10 ?i1"), vec!["i1", "i10"]);
    }

    #[test]
    fn less_than_is_not_an_iri() {
        assert_eq!(variables("FILTER(?v < ?w)"), vec!["v", "w"]);
    }

    #[test]
    fn matching_close_skips_literals() {
        let q = r#"{ ?a <p> "}" . { ?b } }"#;
        assert_eq!(matching_close(q, 0), Some(q.len() - 1));
        assert_eq!(matching_close("( ?a ", 0), None);
    }

    #[test]
    fn guards_are_stripped() {
        let q = "?i0 a <T> . FILTER NOT EXISTS { ?s <p> ?i0 . { ?s <q> ?z } } . ?i0 <v> ?v0";
        let stripped = strip_guards(q);
        assert_eq!(variables(&stripped), vec!["i0", "v0"]);
        assert_eq!(guard_spans(q).len(), 1);
    }

    #[test]
    fn keyword_ignores_iris() {
        let q = "SELECT ?x WHERE { ?x <http://h/WHERE> ?y }";
        assert_eq!(find_keyword(q, "where"), Some(10));
        assert_eq!(find_keyword("SOMEWHERE", "where"), None);
        // cached under the folded keyword
        assert_eq!(find_keyword(q, "WHERE"), Some(10));
    }
}

//! Parsing of the `?out <algo>( args )` invocation fragment.

use crate::lexer::{self, iri_len, string_len};
use factloop_core::{vocab, ArgToken, BindingError, Namespaces};
use regex::Regex;
use std::ops::Range;
use std::sync::OnceLock;

/// Byte positions of one invocation fragment inside a larger text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Located {
    /// Start of the `?out` token.
    pub start: usize,
    pub algorithm: Range<usize>,
    /// The `(` opening the argument list.
    pub open: usize,
    /// The matching `)`, if the list is closed.
    pub close: Option<usize>,
}

fn out_var() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[?$]out\b").ok()).as_ref()
}

fn skip_ws(text: &str, mut at: usize) -> usize {
    while let Some(c) = text[at..].chars().next() {
        if !c.is_whitespace() {
            break;
        }
        at += c.len_utf8();
    }
    at
}

fn prefixed_len(s: &str) -> usize {
    let len: usize = s
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | ':' | '.'))
        .map(char::len_utf8)
        .sum();
    s[..len].trim_end_matches('.').len()
}

/// Find the first `?out` followed by an algorithm name and `(`.
pub(crate) fn locate(text: &str) -> Option<Located> {
    let re = out_var()?;
    let masked = lexer::mask_opaque(text);
    for m in re.find_iter(&masked) {
        let name_at = skip_ws(text, m.end());
        let rest = &text[name_at..];
        let name_len = if rest.starts_with('<') {
            iri_len(rest).unwrap_or(0)
        } else {
            let len = prefixed_len(rest);
            if rest[..len].contains(':') {
                len
            } else {
                0
            }
        };
        if name_len == 0 {
            continue;
        }
        let open = skip_ws(text, name_at + name_len);
        if !text[open..].starts_with('(') {
            continue;
        }
        return Some(Located {
            start: m.start(),
            algorithm: name_at..name_at + name_len,
            open,
            close: lexer::matching_close(text, open),
        });
    }
    None
}

/// Full IRI of an algorithm name written as `<iri>` or `prefix:local`.
pub fn algorithm_iri(raw: &str, namespaces: &Namespaces) -> Option<String> {
    match raw.strip_prefix('<').and_then(|r| r.strip_suffix('>')) {
        Some(iri) => Some(iri.to_string()),
        None => namespaces.expand(raw),
    }
}

/// A grounded invocation ready for dispatch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    pub algorithm: String,
    pub args: Vec<ArgToken>,
}

impl Invocation {
    /// Parse the invocation out of a grounded execute query.
    pub fn parse(exec_query: &str, namespaces: &Namespaces) -> Result<Self, BindingError> {
        let found = locate(exec_query).ok_or_else(|| {
            BindingError::InvalidInvocation(format!("no ?out invocation in '{exec_query}'"))
        })?;
        let close = found.close.ok_or_else(|| {
            BindingError::InvalidInvocation(format!(
                "argument list opened at byte {} is never closed",
                found.open
            ))
        })?;
        let raw = &exec_query[found.algorithm.clone()];
        let algorithm = algorithm_iri(raw, namespaces)
            .ok_or_else(|| BindingError::InvalidInvocation(format!("unknown prefix in {raw}")))?;
        let args = tokenize(&exec_query[found.open + 1..close], namespaces)?;
        Ok(Self { algorithm, args })
    }
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

fn bare_len(s: &str) -> usize {
    s.chars()
        .take_while(|c| !c.is_whitespace() && !matches!(c, '(' | ')' | ',' | '"' | '<'))
        .map(char::len_utf8)
        .sum()
}

fn bare_token(word: &str, namespaces: &Namespaces) -> Result<ArgToken, BindingError> {
    let literal = |lexical: &str, dt: &str| ArgToken::Literal {
        lexical: lexical.to_string(),
        datatype: Some(dt.to_string()),
    };
    if word == "true" || word == "false" {
        return Ok(literal(word, vocab::XSD_BOOLEAN));
    }
    if word.parse::<i64>().is_ok() {
        return Ok(literal(word, vocab::XSD_INTEGER));
    }
    if word.parse::<f64>().is_ok() && word.chars().next().is_some_and(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.')) {
        let dt = if word.contains(['e', 'E']) {
            vocab::XSD_DOUBLE
        } else {
            vocab::XSD_DECIMAL
        };
        return Ok(literal(word, dt));
    }
    if let Some(id) = word.strip_prefix("_:") {
        return Ok(ArgToken::text(format!("_:{id}")));
    }
    match namespaces.expand(word) {
        Some(iri) => Ok(ArgToken::Iri(iri)),
        None => Err(BindingError::InvalidInvocation(format!(
            "cannot read argument '{word}'"
        ))),
    }
}

/// Split an argument list into tokens.
pub fn tokenize(args: &str, namespaces: &Namespaces) -> Result<Vec<ArgToken>, BindingError> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < args.len() {
        let rest = &args[i..];
        let Some(c) = rest.chars().next() else { break };
        if c.is_whitespace() || c == ',' {
            i += c.len_utf8();
            continue;
        }
        match c {
            '<' => {
                let len = iri_len(rest).ok_or_else(|| {
                    BindingError::InvalidInvocation(format!("unterminated IRI in '{args}'"))
                })?;
                out.push(ArgToken::Iri(rest[1..len - 1].to_string()));
                i += len;
            }
            '"' => {
                let len = string_len(rest);
                if len < 2 || !rest[..len].ends_with('"') {
                    return Err(BindingError::InvalidInvocation(format!(
                        "unterminated literal in '{args}'"
                    )));
                }
                let lexical = unescape(&rest[1..len - 1]);
                i += len;
                let tail = &args[i..];
                let datatype = if let Some(dt) = tail.strip_prefix("^^") {
                    if dt.starts_with('<') {
                        let dlen = iri_len(dt).ok_or_else(|| {
                            BindingError::InvalidInvocation(format!("unterminated datatype in '{args}'"))
                        })?;
                        i += 2 + dlen;
                        Some(dt[1..dlen - 1].to_string())
                    } else {
                        let dlen = prefixed_len(dt);
                        i += 2 + dlen;
                        let name = &dt[..dlen];
                        Some(namespaces.expand(name).ok_or_else(|| {
                            BindingError::InvalidInvocation(format!("unknown datatype {name}"))
                        })?)
                    }
                } else if let Some(lang) = tail.strip_prefix('@') {
                    // language tags are dropped, the value binds as text
                    i += 1 + bare_len(lang);
                    None
                } else {
                    None
                };
                out.push(ArgToken::Literal { lexical, datatype });
            }
            '?' | '$' => {
                let len = bare_len(&rest[1..]);
                return Err(BindingError::UnboundVariable(rest[..1 + len].to_string()));
            }
            _ => {
                let len = bare_len(rest).max(c.len_utf8());
                out.push(bare_token(&rest[..len], namespaces)?);
                i += len;
            }
        }
    }
    Ok(out)
}

//! Textual front-end: split a hand-authored
//! `CONSTRUCT{ insert } WHERE{ precondition ?out algo(args) }` query.

use crate::invocation::{self, algorithm_iri};
use crate::lexer;
use crate::template::CompiledTemplate;
use factloop_core::{Namespaces, TemplateError};

/// Byte range of the body of the `{ ... }` block following `keyword`.
fn block_after(query: &str, keyword: &'static str, from: usize) -> Result<(usize, usize), TemplateError> {
    let at = lexer::find_keyword(&query[from..], keyword)
        .map(|p| p + from)
        .ok_or(TemplateError::MissingFragment { fragment: keyword })?;
    let open = query[at + keyword.len()..]
        .find(|c: char| !c.is_whitespace())
        .map(|p| p + at + keyword.len())
        .filter(|&p| query.as_bytes()[p] == b'{')
        .ok_or_else(|| TemplateError::Malformed(format!("{keyword} is not followed by a '{{' block")))?;
    let close = lexer::matching_close(query, open)
        .ok_or(TemplateError::Unbalanced { open: '{', at: open })?;
    Ok((open + 1, close))
}

/// Compile one combined query. Nothing touches a store; every structural
/// problem is reported here.
pub fn compile_text(
    name: impl Into<String>,
    query: &str,
    namespaces: &Namespaces,
) -> Result<CompiledTemplate, TemplateError> {
    let (insert_start, insert_end) = block_after(query, "CONSTRUCT", 0)?;
    let (where_start, where_end) = block_after(query, "WHERE", insert_end + 1)?;
    let body = &query[where_start..where_end];

    let found = invocation::locate(body).ok_or(TemplateError::MissingFragment {
        fragment: "algorithm invocation",
    })?;
    let close = found.close.ok_or(TemplateError::Unbalanced {
        open: '(',
        at: where_start + found.open,
    })?;
    let raw = &body[found.algorithm.clone()];
    if algorithm_iri(raw, namespaces).is_none() {
        return Err(TemplateError::Malformed(format!(
            "algorithm name {raw} uses an undeclared prefix"
        )));
    }

    let invocation = &body[found.start..=close];
    let precondition = format!("{} {}", &body[..found.start], &body[close + 1..]);

    CompiledTemplate::assemble(
        name,
        &precondition,
        invocation,
        &query[insert_start..insert_end],
    )
}

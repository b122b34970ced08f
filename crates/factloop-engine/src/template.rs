//! The compiled template: what both front-ends produce and the interpreter runs.

use crate::lexer::{self, Piece};
use factloop_core::TemplateError;
use serde::Serialize;
use std::collections::HashMap;

/// Name of the algorithm's result variable.
pub const OUT: &str = "out";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
enum Segment {
    Text(String),
    Slot(String),
}

/// Query text split into literal text and named variable slots. Filling a
/// slot never rescans the inserted value, so a value can not be mistaken for
/// a variable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Pending {
    segments: Vec<Segment>,
}

impl Pending {
    pub fn parse(text: &str) -> Self {
        let segments = lexer::pieces(text)
            .into_iter()
            .map(|p| match p {
                Piece::Var(name) => Segment::Slot(name.to_string()),
                Piece::Text(t) => Segment::Text(t.to_string()),
            })
            .collect();
        Self { segments }
    }

    /// Open slot names, in order, duplicates included.
    pub fn slots(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Slot(name) => Some(name.as_str()),
            Segment::Text(_) => None,
        })
    }

    /// Fill every slot named in `values` with its text; others stay open.
    pub fn fill(&self, values: &HashMap<String, String>) -> Pending {
        let mut segments: Vec<Segment> = Vec::with_capacity(self.segments.len());
        for seg in &self.segments {
            let seg = match seg {
                Segment::Slot(name) => match values.get(name) {
                    Some(v) => Segment::Text(v.clone()),
                    None => seg.clone(),
                },
                Segment::Text(_) => seg.clone(),
            };
            // merge adjacent text
            match (segments.last_mut(), seg) {
                (Some(Segment::Text(prev)), Segment::Text(t)) => prev.push_str(&t),
                (_, seg) => segments.push(seg),
            }
        }
        Pending { segments }
    }

    pub fn fill_one(&self, name: &str, value: &str) -> Pending {
        let mut values = HashMap::with_capacity(1);
        values.insert(name.to_string(), value.to_string());
        self.fill(&values)
    }

    pub fn is_ground(&self) -> bool {
        self.slots().next().is_none()
    }

    /// Final text; fails on the first slot still open.
    pub fn render(&self) -> Result<String, TemplateError> {
        if let Some(open) = self.slots().next() {
            return Err(TemplateError::UnfilledSlot(format!("?{open}")));
        }
        Ok(self.to_text())
    }

    /// Text with open slots written back as `?name`.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for seg in &self.segments {
            match seg {
                Segment::Text(t) => out.push_str(t),
                Segment::Slot(name) => {
                    out.push('?');
                    out.push_str(name);
                }
            }
        }
        out
    }
}

/// `selectQuery` / `execQuery` / `insertTemplate` plus the variables that
/// carry values from the first to the other two.
#[derive(Clone, Debug, Serialize)]
pub struct CompiledTemplate {
    /// Human label: the algorithm name or a position in a replay file.
    pub name: String,
    pub select_query: String,
    pub exec_query: Pending,
    pub insert_template: Pending,
    /// Ordered, without `out`.
    pub shared_variables: Vec<String>,
}

impl CompiledTemplate {
    /// Build the three queries from their bodies.
    ///
    /// * `where_body`: preconditions, guards included.
    /// * `invocation`: `?out <algo>( ... )`.
    /// * `insert_body`: statements mentioning `?out` and selected variables.
    pub fn assemble(
        name: impl Into<String>,
        where_body: &str,
        invocation: &str,
        insert_body: &str,
    ) -> Result<Self, TemplateError> {
        let projection: Vec<String> = lexer::variables(&lexer::strip_guards(where_body))
            .into_iter()
            .filter(|v| v != OUT)
            .collect();
        if projection.is_empty() {
            return Err(TemplateError::Malformed(
                "precondition selects no variable".to_string(),
            ));
        }

        let exec_query = format!("SELECT ?{OUT} WHERE{{ {} }}", invocation.trim());
        let insert_text = format!("INSERT DATA{{ {} }}", insert_body.trim());
        let exec_vars = lexer::variables(&exec_query);
        let insert_vars = lexer::variables(&insert_text);

        if !exec_vars.iter().any(|v| v == OUT) {
            return Err(TemplateError::MissingFragment {
                fragment: "?out result variable",
            });
        }

        let mut shared: Vec<String> = Vec::new();
        for (var, clause) in exec_vars
            .iter()
            .map(|v| (v, "execute"))
            .chain(insert_vars.iter().map(|v| (v, "insert")))
        {
            if var == OUT || shared.contains(var) {
                continue;
            }
            if !projection.contains(var) {
                return Err(TemplateError::UnboundVariable {
                    var: format!("?{var}"),
                    clause,
                });
            }
            shared.push(var.clone());
        }

        let select_query = format!(
            "SELECT {} WHERE{{ {} }}",
            projection
                .iter()
                .map(|v| format!("?{v}"))
                .collect::<Vec<_>>()
                .join(" "),
            where_body.trim()
        );

        Ok(Self {
            name: name.into(),
            select_query,
            exec_query: Pending::parse(&exec_query),
            insert_template: Pending::parse(&insert_text),
            shared_variables: shared,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_is_token_safe() {
        let p = Pending::parse("?i1 <p> ?i10 . ?i1 <q> \"?i1\"");
        let filled = p.fill_one("i1", "<urn:a>");
        assert_eq!(filled.to_text(), "<urn:a> <p> ?i10 . <urn:a> <q> \"?i1\"");
        assert!(!filled.is_ground());
    }

    #[test]
    fn inserted_values_are_not_rescanned() {
        let p = Pending::parse("?a ?b");
        let filled = p.fill_one("a", "\"?b\"");
        let done = filled.fill_one("b", "<urn:b>");
        assert_eq!(done.render().unwrap(), "\"?b\" <urn:b>");
    }

    #[test]
    fn render_reports_open_slot() {
        let err = Pending::parse("?x <p> ?y").fill_one("x", "<urn:x>").render().unwrap_err();
        assert_eq!(err, TemplateError::UnfilledSlot("?y".into()));
    }

    #[test]
    fn assemble_orders_shared_execute_first() {
        let t = CompiledTemplate::assemble(
            "t",
            "?i0 a <T> . ?i0 <v> ?v0 . FILTER NOT EXISTS { ?i0 <s> ?x }",
            "?out <urn:A>( \"hasValue=\" ?v0 )",
            "?i0 <s> ?out .",
        )
        .unwrap();
        assert_eq!(t.shared_variables, vec!["v0", "i0"]);
        assert!(t.select_query.starts_with("SELECT ?i0 ?v0 WHERE{"));
        assert!(!t.select_query.contains("SELECT ?i0 ?v0 ?x"));
    }

    #[test]
    fn insert_variable_must_be_selected() {
        let err = CompiledTemplate::assemble(
            "t",
            "?i0 a <T> . FILTER NOT EXISTS { ?i0 <s> ?x }",
            "?out <urn:A>( \"hasInput=\" ?i0 )",
            "?x <s> ?out .",
        )
        .unwrap_err();
        assert_eq!(
            err,
            TemplateError::UnboundVariable {
                var: "?x".into(),
                clause: "insert"
            }
        );
    }
}

//! Ontology front-end: synthesise a template from an algorithm descriptor.
//!
//! Inputs bind `?i{n}`, parameters `?p{n}`, scalar values `?v{k}`. The guard
//! is derived from how the output attaches to the inputs, so a satisfied
//! input never selects again.

use crate::ontology::Ontology;
use crate::template::CompiledTemplate;
use factloop_core::vocab::{self, kd};
use factloop_core::{local_name, AlgorithmDescriptor, Restriction, TemplateError};

/// A property paired with the variable carrying its value.
#[derive(Clone, Debug)]
struct PropVar {
    property: String,
    var: String,
}

/// Where the algorithm's `?out` goes.
enum Output {
    /// `?out` is a value of `property` on an existing entity.
    Characterizes(PropVar),
    /// `?out` is a new entity of type `ty`, linked back to inputs and parameters.
    Entity {
        ty: String,
        by_inputs: Vec<PropVar>,
        by_params: Vec<PropVar>,
    },
}

fn unsupported(desc: &AlgorithmDescriptor, reason: &str) -> TemplateError {
    TemplateError::Unsupported {
        algorithm: desc.name().to_string(),
        reason: reason.to_string(),
    }
}

fn first_match(restrictions: &[Restriction], required: &str, onto: &Ontology) -> Option<usize> {
    restrictions.iter().position(|r| {
        r.target_type()
            .is_some_and(|t| onto.is_subclass_of(t, required))
    })
}

fn output_of(desc: &AlgorithmDescriptor, onto: &Ontology) -> Result<Output, TemplateError> {
    if desc.outputs.len() > 1 {
        return Err(unsupported(desc, "more than one output restriction"));
    }
    if let Some(out) = desc.outputs.first() {
        let ty = out
            .target_type()
            .ok_or_else(|| unsupported(desc, "output restriction does not name a type"))?
            .to_string();
        let characteristics = onto.category(&onto.restrictions_of(&ty), kd::HAS_CHARA);
        let mut by_inputs = Vec::new();
        let mut by_params = Vec::new();
        for chara in &characteristics {
            let Some(required) = chara.target_type() else {
                continue;
            };
            if let Some(i) = first_match(&desc.inputs, required, onto) {
                by_inputs.push(PropVar {
                    property: chara.property.clone(),
                    var: format!("?i{i}"),
                });
            } else if let Some(p) = first_match(&desc.parameters, required, onto) {
                by_params.push(PropVar {
                    property: chara.property.clone(),
                    var: format!("?p{p}"),
                });
            } else {
                return Err(TemplateError::UnsatisfiableOutput {
                    algorithm: desc.name().to_string(),
                    property: chara.property_name().to_string(),
                    required: local_name(required).to_string(),
                });
            }
        }
        return Ok(Output::Entity {
            ty,
            by_inputs,
            by_params,
        });
    }

    let data = desc
        .data_outputs
        .first()
        .ok_or_else(|| unsupported(desc, "no output and no data output restriction"))?;
    let alias = match onto.see_also(&data.property) {
        [one] => one.clone(),
        [] => {
            return Err(TemplateError::Malformed(format!(
                "{}: data output {} has no seeAlso annotation",
                desc.name(),
                data.property_name()
            )))
        }
        _ => {
            return Err(TemplateError::Malformed(format!(
                "{}: data output {} has more than one seeAlso annotation",
                desc.name(),
                data.property_name()
            )))
        }
    };
    let var = if desc.inputs.is_empty() { "?p0" } else { "?i0" };
    Ok(Output::Characterizes(PropVar {
        property: alias,
        var: var.to_string(),
    }))
}

/// Argument pairs for one input or parameter: one per declared scalar value
/// of its type, or the variable itself.
fn fill_prop_vars(restriction: &Restriction, var: &str, onto: &Ontology, out: &mut Vec<PropVar>) {
    let values = restriction
        .target_type()
        .map(|t| onto.category(&onto.restrictions_of(t), kd::HAS_VALUE))
        .unwrap_or_default();
    if values.is_empty() {
        out.push(PropVar {
            property: restriction.property.clone(),
            var: var.to_string(),
        });
    } else {
        out.extend(values.into_iter().map(|v| PropVar {
            property: v.property,
            var: var.to_string(),
        }));
    }
}

pub fn compile_descriptor(
    desc: &AlgorithmDescriptor,
    onto: &Ontology,
) -> Result<CompiledTemplate, TemplateError> {
    if desc.is_abstract() {
        return Err(unsupported(desc, "no input and no parameter restriction"));
    }
    let output = output_of(desc, onto)?;
    let mut where_body = String::new();
    let nothing = onto.namespaces().term(kd::NOTHING);

    for (i, input) in desc.inputs.iter().enumerate() {
        let ty = input
            .target_type()
            .ok_or_else(|| unsupported(desc, "input restriction does not name a type"))?;
        where_body.push_str(&format!(
            "?i{i} <{}> <{ty}> .\nFILTER NOT EXISTS {{ ?i{i} <{}> <{nothing}> }}\n",
            vocab::RDF_TYPE,
            vocab::RDF_TYPE
        ));
    }

    let guard = match &output {
        Output::Entity { by_inputs, .. } if !by_inputs.is_empty() => links_guard(by_inputs),
        Output::Entity { by_params, .. } if !by_params.is_empty() => links_guard(by_params),
        Output::Characterizes(pv) => format!("{} <{}> ?x", pv.var, pv.property),
        Output::Entity { .. } => {
            return Err(TemplateError::Malformed(format!(
                "{}: output is not linked to any input or parameter, nothing guards re-execution",
                desc.name()
            )))
        }
    };
    where_body.push_str(&format!("FILTER NOT EXISTS {{ {guard} }}\n"));

    for (n, para) in desc.parameters.iter().enumerate() {
        let ty = para
            .target_type()
            .ok_or_else(|| unsupported(desc, "parameter restriction does not name a type"))?;
        where_body.push_str(&format!("?p{n} <{}> <{ty}> .\n", vocab::RDF_TYPE));
        for relevant in &desc.relevant_to {
            let Some(target) = relevant.target_type() else {
                continue;
            };
            where_body.push_str(&format!(
                "?entity <{}> <{target}> .\n?entity <{}> ?p{n} .\n",
                vocab::RDF_TYPE,
                para.property
            ));
        }
    }

    let mut prop_vars = Vec::new();
    for (i, input) in desc.inputs.iter().enumerate() {
        fill_prop_vars(input, &format!("?i{i}"), onto, &mut prop_vars);
    }
    for (n, para) in desc.parameters.iter().enumerate() {
        fill_prop_vars(para, &format!("?p{n}"), onto, &mut prop_vars);
    }
    for (k, pv) in prop_vars.iter_mut().enumerate() {
        if onto.is_datatype_property(&pv.property) {
            where_body.push_str(&format!("{} <{}> ?v{k} .\n", pv.var, pv.property));
            pv.var = format!("?v{k}");
        }
    }

    let args: Vec<String> = prop_vars
        .iter()
        .map(|pv| format!("\"{}=\" {}", local_name(&pv.property), pv.var))
        .collect();
    let invocation = format!("?out <{}>( {} )", desc.iri, args.join(" "));

    let insert_body = match &output {
        Output::Characterizes(pv) => format!("{} <{}> ?out .", pv.var, pv.property),
        Output::Entity {
            ty,
            by_inputs,
            by_params,
        } => {
            let mut s = format!("?out <{}> <{ty}> .", vocab::RDF_TYPE);
            for pv in by_params.iter().chain(by_inputs) {
                s.push_str(&format!(" ?out <{}> {} .", pv.property, pv.var));
            }
            s
        }
    };

    CompiledTemplate::assemble(desc.name(), &where_body, &invocation, &insert_body)
}

fn links_guard(links: &[PropVar]) -> String {
    links
        .iter()
        .map(|pv| format!("?something <{}> {}", pv.property, pv.var))
        .collect::<Vec<_>>()
        .join(" . ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use factloop_core::Namespaces;

    fn ns() -> Namespaces {
        Namespaces::default()
    }

    fn t(local: &str) -> String {
        ns().term(local)
    }

    fn getter_onto() -> Ontology {
        let mut onto = Ontology::new(ns());
        onto.add_see_also(&t("hasDataOutput"), &t("hasSize"));
        onto
    }

    fn getter() -> AlgorithmDescriptor {
        let mut d = AlgorithmDescriptor::new(t("GetPatchSize"));
        d.inputs.push(Restriction::some(&d.iri, &t("hasInput"), &t("Patch")));
        d.data_outputs
            .push(Restriction::some(&d.iri, &t("hasDataOutput"), vocab::XSD_INTEGER));
        d
    }

    #[test]
    fn data_output_characterizes_first_input() {
        let tpl = compile_descriptor(&getter(), &getter_onto()).unwrap();
        let size = t("hasSize");
        assert!(tpl.select_query.starts_with("SELECT ?i0 WHERE{"));
        assert!(tpl
            .select_query
            .contains(&format!("FILTER NOT EXISTS {{ ?i0 <{size}> ?x }}")));
        assert_eq!(
            tpl.exec_query.to_text(),
            format!("SELECT ?out WHERE{{ ?out <{}>( \"hasInput=\" ?i0 ) }}", t("GetPatchSize"))
        );
        assert_eq!(
            tpl.insert_template.to_text(),
            format!("INSERT DATA{{ ?i0 <{size}> ?out . }}")
        );
        assert_eq!(tpl.shared_variables, vec!["i0"]);
    }

    #[test]
    fn missing_alias_is_rejected() {
        let err = compile_descriptor(&getter(), &Ontology::new(ns())).unwrap_err();
        assert!(matches!(err, TemplateError::Malformed(msg) if msg.contains("seeAlso")));
    }

    #[test]
    fn value_properties_are_flattened() {
        let mut onto = getter_onto();
        onto.add_datatype_property(&t("threshold"))
            .add_restriction(Restriction::some(&t("Config"), &t("threshold"), vocab::XSD_DOUBLE))
            .add_subproperty(&t("threshold"), &t(kd::HAS_VALUE));
        let mut d = getter();
        d.parameters.push(Restriction::some(&d.iri, &t("hasChara"), &t("Config")));
        let tpl = compile_descriptor(&d, &onto).unwrap();
        assert!(tpl
            .exec_query
            .to_text()
            .contains("\"hasInput=\" ?i0 \"threshold=\" ?v1"));
        assert!(tpl.select_query.contains(&format!("?p0 <{}> ?v1 .", t("threshold"))));
        assert_eq!(tpl.shared_variables, vec!["i0", "v1"]);
    }

    #[test]
    fn entity_output_links_back_to_input() {
        let mut onto = Ontology::new(ns());
        onto.add_subclass(&t("Wall"), &t("Patch")).add_restriction(Restriction::some(
            &t("Segment"),
            &t("hasChara"),
            &t("Patch"),
        ));
        let mut d = AlgorithmDescriptor::new(t("Segmenter"));
        d.inputs.push(Restriction::some(&d.iri, &t("hasInput"), &t("Wall")));
        d.outputs.push(Restriction::some(&d.iri, &t("hasOutput"), &t("Segment")));
        let tpl = compile_descriptor(&d, &onto).unwrap();
        let chara = t("hasChara");
        assert!(tpl
            .select_query
            .contains(&format!("FILTER NOT EXISTS {{ ?something <{chara}> ?i0 }}")));
        assert!(tpl
            .insert_template
            .to_text()
            .contains(&format!("?out <{chara}> ?i0 .")));
    }

    #[test]
    fn unsatisfiable_characteristic() {
        let mut onto = Ontology::new(ns());
        onto.add_restriction(Restriction::some(&t("Segment"), &t("hasChara"), &t("Cloud")));
        let mut d = AlgorithmDescriptor::new(t("Segmenter"));
        d.inputs.push(Restriction::some(&d.iri, &t("hasInput"), &t("Patch")));
        d.outputs.push(Restriction::some(&d.iri, &t("hasOutput"), &t("Segment")));
        let err = compile_descriptor(&d, &onto).unwrap_err();
        assert_eq!(
            err,
            TemplateError::UnsatisfiableOutput {
                algorithm: "Segmenter".into(),
                property: "hasChara".into(),
                required: "Cloud".into(),
            }
        );
    }

    #[test]
    fn two_outputs_unsupported() {
        let mut d = getter();
        d.outputs.push(Restriction::some(&d.iri, &t("hasOutput"), &t("A")));
        d.outputs.push(Restriction::some(&d.iri, &t("hasOutput"), &t("B")));
        let err = compile_descriptor(&d, &getter_onto()).unwrap_err();
        assert!(matches!(err, TemplateError::Unsupported { .. }));
    }
}

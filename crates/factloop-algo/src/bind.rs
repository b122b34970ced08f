//! Argument binding: flat `key=value` token lists into algorithm fields.
//!
//! Tokens arrive as the invocation wrote them: `"hasInput=" <iri>
//! "hasMaxSize=" "0.5"^^xsd:double`. Literal fragments accumulate until one
//! containing `=` starts the next pair, so a value may span several tokens.

use crate::contract::{ArgValue, ParamTable};
use crate::env::ExecEnv;
use factloop_core::{local_name, vocab::kd, ArgToken, BindingError};

/// Group tokens into `(raw key, raw value)` pairs.
pub fn split_pairs(tokens: &[ArgToken]) -> Result<Vec<(String, String)>, BindingError> {
    let mut pairs = Vec::new();
    let mut current: Option<String> = None;

    for token in tokens {
        let fragment = token.fragment();
        let starts_pair = matches!(token, ArgToken::Literal { .. }) && fragment.contains('=');
        if starts_pair {
            if let Some(done) = current.take() {
                pairs.push(finish(&done)?);
            }
            current = Some(fragment);
        } else {
            match current.as_mut() {
                Some(acc) => acc.push_str(&fragment),
                None => {
                    return Err(BindingError::InvalidInvocation(format!(
                        "value '{fragment}' appears before any key"
                    )))
                }
            }
        }
    }
    if let Some(done) = current {
        pairs.push(finish(&done)?);
    }
    Ok(pairs)
}

fn finish(acc: &str) -> Result<(String, String), BindingError> {
    let (key, value) = acc
        .split_once('=')
        .ok_or_else(|| BindingError::InvalidInvocation(format!("'{acc}' is not key=value")))?;
    Ok((key.to_string(), value.to_string()))
}

/// Bare field name for a raw key: trimmed, namespace stripped, legacy alias applied.
pub fn field_name(raw_key: &str) -> String {
    let key = local_name(raw_key.trim());
    if key == kd::IS_AVAILABLE_ON {
        kd::HAS_INPUT.to_string()
    } else {
        key.to_string()
    }
}

/// Resolve a raw value: memory object, typed scalar, or plain text.
pub fn resolve_value(value: &str, env: &ExecEnv) -> Result<ArgValue, BindingError> {
    if let Some(resource) = env.resolve(value) {
        return Ok(ArgValue::Resolved {
            address: value.to_string(),
            resource,
        });
    }
    let typed = value.split_once("^^");
    if typed.is_none() && looks_like_iri(value) {
        if env.is_deprecated(value) {
            return Err(BindingError::Deprecated {
                value: value.to_string(),
            });
        }
        return Err(BindingError::DanglingReference {
            value: value.to_string(),
        });
    }
    let Some((lexical, datatype)) = typed else {
        return Ok(ArgValue::Str(value.to_string()));
    };
    if lexical.is_empty() {
        return Ok(ArgValue::Null);
    }
    coerce(lexical, datatype, value)
}

fn looks_like_iri(value: &str) -> bool {
    value.contains("://") || value.starts_with("urn:")
}

fn coerce(lexical: &str, datatype: &str, raw: &str) -> Result<ArgValue, BindingError> {
    let tag = datatype.trim().trim_start_matches('<').trim_end_matches('>');
    let tag = tag.strip_prefix("xsd:").unwrap_or(tag);
    let tag = if tag.contains("://") { local_name(tag) } else { tag };

    let fail = |reason: String| BindingError::Coercion {
        value: lexical.to_string(),
        datatype: tag.to_string(),
        reason,
    };
    let value = match tag {
        "double" => ArgValue::Double(lexical.trim().parse().map_err(|e| fail(format!("{e}")))?),
        "float" => ArgValue::Float(lexical.trim().parse().map_err(|e| fail(format!("{e}")))?),
        "int" | "integer" => {
            ArgValue::Int(lexical.trim().parse().map_err(|e| fail(format!("{e}")))?)
        }
        "string" => ArgValue::Str(lexical.to_string()),
        "boolean" => match lexical.trim() {
            "true" | "1" => ArgValue::Bool(true),
            "false" | "0" => ArgValue::Bool(false),
            other => return Err(fail(format!("'{other}' is not a boolean"))),
        },
        _ => ArgValue::Raw(raw.to_string()),
    };
    Ok(value)
}

/// Bind every pair of `tokens` into `target` through its parameter table.
pub fn bind_arguments<A>(
    target: &mut A,
    table: &ParamTable<A>,
    algorithm: &str,
    tokens: &[ArgToken],
    env: &ExecEnv,
) -> Result<(), BindingError> {
    for (raw_key, raw_value) in split_pairs(tokens)? {
        let name = field_name(&raw_key);
        let value = resolve_value(&raw_value, env)?;
        tracing::trace!(algorithm, param = %name, kind = value.type_name(), "bind");
        table.assign(target, algorithm, &name, value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use factloop_core::{vocab, Namespaces};
    use factloop_memory::{Memory, PointCloud};
    use std::sync::Arc;

    fn env() -> ExecEnv {
        ExecEnv::new(Arc::new(Memory::new()), Namespaces::default())
    }

    fn typed(lexical: &str, dt: &str) -> ArgToken {
        ArgToken::Literal {
            lexical: lexical.into(),
            datatype: Some(dt.into()),
        }
    }

    #[test]
    fn fragments_accumulate_until_next_key() {
        let tokens = vec![
            ArgToken::text("hasSource="),
            ArgToken::text("/data/"),
            ArgToken::text("scan.xyz"),
            ArgToken::text("hasMaxSize="),
            typed("0.5", vocab::XSD_DOUBLE),
        ];
        let pairs = split_pairs(&tokens).unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0], ("hasSource".into(), "/data/scan.xyz".into()));
        assert_eq!(pairs[1].1, format!("0.5^^{}", vocab::XSD_DOUBLE));
    }

    #[test]
    fn value_before_key_is_invalid() {
        let err = split_pairs(&[ArgToken::Iri("http://x.org/a".into())]).unwrap_err();
        assert!(matches!(err, BindingError::InvalidInvocation(_)));
    }

    #[test]
    fn key_is_trimmed_stripped_and_aliased() {
        assert_eq!(field_name("  http://x.org/ns#hasMaxSize "), "hasMaxSize");
        assert_eq!(field_name("isAvailableOn"), "hasInput");
    }

    #[test]
    fn typed_literals_coerce() {
        let e = env();
        assert!(matches!(
            resolve_value(&format!("3.5^^{}", vocab::XSD_DOUBLE), &e).unwrap(),
            ArgValue::Double(v) if v == 3.5
        ));
        assert!(matches!(
            resolve_value("7^^xsd:int", &e).unwrap(),
            ArgValue::Int(7)
        ));
        assert!(matches!(
            resolve_value("1.5^^<http://www.w3.org/2001/XMLSchema#float>", &e).unwrap(),
            ArgValue::Float(v) if v == 1.5
        ));
        assert!(matches!(
            resolve_value("^^xsd:double", &e).unwrap(),
            ArgValue::Null
        ));
        assert!(matches!(
            resolve_value("2020-01-01^^xsd:date", &e).unwrap(),
            ArgValue::Raw(s) if s == "2020-01-01^^xsd:date"
        ));
    }

    #[test]
    fn bad_number_is_coercion_error() {
        let err = resolve_value("abc^^xsd:double", &env()).unwrap_err();
        assert!(matches!(err, BindingError::Coercion { .. }));
    }

    #[test]
    fn dangling_and_deprecated_iris() {
        let e = env();
        let err = resolve_value("http://x.org/ns#p9", &e).unwrap_err();
        assert!(matches!(err, BindingError::DanglingReference { .. }));
        let wall = Namespaces::default().term("wall");
        let err = resolve_value(&wall, &e).unwrap_err();
        assert!(matches!(err, BindingError::Deprecated { .. }));
    }

    #[test]
    fn memory_addresses_resolve_to_objects() {
        let e = env();
        e.memory.alloc("http://x.org/ns#c1", PointCloud::default());
        let v = resolve_value("http://x.org/ns#c1", &e).unwrap();
        assert!(matches!(v, ArgValue::Resolved { .. }));
    }
}

//! Tests for factloop-algo: binding through the registry, built-ins, and the contract

use factloop_algo::*;
use factloop_core::{vocab, ArgToken, BindingError, Literal, Namespaces, RegistryError, Term};
use factloop_memory::{Memory, Patch, Point3, PointCloud};
use std::sync::{Arc, Mutex};

fn env() -> ExecEnv {
    ExecEnv::new(Arc::new(Memory::new()), Namespaces::default())
}

fn typed(lexical: &str, dt: &str) -> ArgToken {
    ArgToken::Literal {
        lexical: lexical.into(),
        datatype: Some(dt.into()),
    }
}

/// Records what it was bound with.
#[derive(Default)]
struct Probe {
    ratio: Option<f64>,
    enabled: Option<bool>,
    labels: Vec<String>,
    seen: Arc<Mutex<Vec<String>>>,
}

impl Algorithm for Probe {
    const NAME: &'static str = "Probe";

    fn parameters() -> ParamTable<Self> {
        ParamTable::new()
            .single("ratio", |a: &mut Self, v: ArgValue| {
                a.ratio = Some(v.into_double("ratio")?);
                Ok(())
            })
            .single("enabled", |a: &mut Self, v: ArgValue| {
                a.enabled = Some(v.into_bool("enabled")?);
                Ok(())
            })
            .many("label", |a: &mut Self, v: ArgValue| {
                a.labels.push(v.into_string("label")?);
                Ok(())
            })
    }

    fn process(&mut self, _env: &ExecEnv) -> Result<Vec<Term>, BindingError> {
        let mut seen = self.seen.lock().unwrap();
        seen.push(format!("{:?}/{:?}/{}", self.ratio, self.enabled, self.labels.join(",")));
        Ok(vec![Literal::boolean(true).into()])
    }
}

fn probe_registry() -> (AlgorithmRegistry, Arc<Mutex<Vec<String>>>, String) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut reg = AlgorithmRegistry::new(Namespaces::default());
    let shared = Arc::clone(&seen);
    let iri = reg.add_with(move || Probe {
        seen: Arc::clone(&shared),
        ..Default::default()
    });
    (reg, seen, iri)
}

// ===========================================================================
// Argument round-trip
// ===========================================================================

#[test]
fn double_and_boolean_round_trip() {
    let (reg, seen, iri) = probe_registry();
    let args = vec![
        ArgToken::text("ratio="),
        typed("3.5", vocab::XSD_DOUBLE),
        ArgToken::text("enabled="),
        typed("true", vocab::XSD_BOOLEAN),
    ];
    reg.invoke(&iri, &args, &env()).unwrap();
    assert_eq!(seen.lock().unwrap()[0], "Some(3.5)/Some(true)/");
}

#[test]
fn repeated_key_appends_to_collection() {
    let (reg, seen, iri) = probe_registry();
    let args = vec![
        ArgToken::text("label="),
        typed("a", vocab::XSD_STRING),
        ArgToken::text("label="),
        typed("b", vocab::XSD_STRING),
    ];
    reg.invoke(&iri, &args, &env()).unwrap();
    assert_eq!(seen.lock().unwrap()[0], "None/None/a,b");
}

#[test]
fn namespaced_key_is_stripped() {
    let (reg, seen, iri) = probe_registry();
    let args = vec![
        ArgToken::text("http://lab.ponciano.info/knowdip#ratio="),
        typed("2", vocab::XSD_INTEGER),
    ];
    reg.invoke(&iri, &args, &env()).unwrap();
    assert_eq!(seen.lock().unwrap()[0], "Some(2.0)/None/");
}

#[test]
fn binding_error_skips_process() {
    let (reg, seen, iri) = probe_registry();
    let args = vec![ArgToken::text("ratio="), ArgToken::Iri("http://x.org/ns#p9".into())];
    let err = reg.invoke(&iri, &args, &env()).unwrap_err();
    assert!(matches!(err, BindingError::DanglingReference { .. }));
    assert!(seen.lock().unwrap().is_empty());
}

#[test]
fn unknown_parameter_skips_process() {
    let (reg, seen, iri) = probe_registry();
    let args = vec![ArgToken::text("colour="), typed("red", vocab::XSD_STRING)];
    let err = reg.invoke(&iri, &args, &env()).unwrap_err();
    assert!(matches!(err, BindingError::UnknownParameter { .. }));
    assert!(seen.lock().unwrap().is_empty());
}

// ===========================================================================
// Registry
// ===========================================================================

#[test]
fn default_registry_lists_builtins() {
    let reg = create_default_registry(Namespaces::default());
    let ns = Namespaces::default();
    assert_eq!(reg.len(), 5);
    for name in ["LoadCloud", "PatchesSegmentation", "GetPatchMinZ", "GetPatchDistanceX", "GetPatchSize"] {
        assert!(reg.contains(&ns.term(name)), "{name} missing");
    }
    let params = reg.get(&ns.term("GetPatchSize")).unwrap().parameters();
    assert_eq!(params, vec!["hasInput", "patchID"]);
}

#[test]
fn unregister_unknown_fails() {
    let mut reg = create_default_registry(Namespaces::default());
    let iri = Namespaces::default().term("LoadCloud");
    reg.unregister(&iri).unwrap();
    assert!(!reg.contains(&iri));
    assert_eq!(
        reg.unregister(&iri),
        Err(RegistryError::NotAnAlgorithm(iri.clone()))
    );
}

#[test]
fn invoke_unknown_algorithm() {
    let reg = AlgorithmRegistry::new(Namespaces::default());
    let err = reg.invoke("http://x.org/ns#Nope", &[], &env()).unwrap_err();
    assert_eq!(err, BindingError::UnknownAlgorithm("http://x.org/ns#Nope".into()));
}

// ===========================================================================
// Built-ins through the registry
// ===========================================================================

fn scene_env() -> ExecEnv {
    let env = env();
    let cloud_addr = env.namespaces.term("scene");
    let mut cloud = PointCloud::default();
    cloud.add_patch(Patch::new(
        "p1",
        vec![
            Point3::new(0.0, 0.0, 2.0),
            Point3::new(3.0, 0.0, 1.0),
            Point3::new(1.0, 1.0, 4.0),
        ],
    ));
    env.memory.alloc(cloud_addr.clone(), cloud);
    env.with_owners(vec![cloud_addr])
}

#[test]
fn getters_resolve_patch_sub_object() {
    let reg = create_default_registry(Namespaces::default());
    let env = scene_env();
    let p1 = env.namespaces.term("p1");
    let args = vec![ArgToken::text("hasInput="), ArgToken::Iri(p1)];

    let size = reg.invoke(&env.namespaces.term("GetPatchSize"), &args, &env).unwrap();
    assert_eq!(size, vec![Term::from(Literal::integer(3))]);

    let min_z = reg.invoke(&env.namespaces.term("GetPatchMinZ"), &args, &env).unwrap();
    assert_eq!(min_z, vec![Term::from(Literal::double(1.0))]);

    let dx = reg.invoke(&env.namespaces.term("GetPatchDistanceX"), &args, &env).unwrap();
    assert_eq!(dx, vec![Term::from(Literal::double(3.0))]);
}

#[test]
fn getter_accepts_cloud_plus_patch_id() {
    let reg = create_default_registry(Namespaces::default());
    let env = scene_env();
    let args = vec![
        ArgToken::text("isAvailableOn="),
        ArgToken::Iri(env.namespaces.term("scene")),
        ArgToken::text("patchID="),
        typed(&env.namespaces.term("p1"), vocab::XSD_STRING),
    ];
    let size = reg.invoke(&env.namespaces.term("GetPatchSize"), &args, &env).unwrap();
    assert_eq!(size, vec![Term::from(Literal::integer(3))]);
}

#[test]
fn patch_outside_known_clouds_is_dangling() {
    let reg = create_default_registry(Namespaces::default());
    let env = scene_env().with_owners(Vec::new());
    let args = vec![ArgToken::text("hasInput="), ArgToken::Iri(env.namespaces.term("p1"))];
    let err = reg
        .invoke(&env.namespaces.term("GetPatchSize"), &args, &env)
        .unwrap_err();
    assert!(matches!(err, BindingError::DanglingReference { .. }));
}

#[test]
fn load_then_segment() {
    let tmp = tempfile::tempdir().unwrap();
    let file = tmp.path().join("scan.xyz");
    std::fs::write(&file, "0.1 0.1 0.1\n0.2 0.2 0.2\n5.5 0.1 0.1\n").unwrap();

    let reg = create_default_registry(Namespaces::default());
    let env = env();
    let loaded = reg
        .invoke(
            &env.namespaces.term("LoadCloud"),
            &[ArgToken::text("hasSource="), typed(&file.display().to_string(), vocab::XSD_STRING)],
            &env,
        )
        .unwrap();
    let cloud = loaded[0].as_iri().unwrap().to_string();

    let patches = reg
        .invoke(
            &env.namespaces.term("PatchesSegmentation"),
            &[
                ArgToken::text("hasInput="),
                ArgToken::Iri(cloud.clone()),
                ArgToken::text("hasMaxSize="),
                typed("1.0", vocab::XSD_DOUBLE),
            ],
            &env,
        )
        .unwrap();
    assert_eq!(patches.len(), 2);
    let env = env.with_owners(vec![cloud]);
    for p in &patches {
        assert!(env.resolve(p.as_iri().unwrap()).is_some());
    }
}

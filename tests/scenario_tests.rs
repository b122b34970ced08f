//! End-to-end scenarios through the `factloop` facade: a work directory is
//! prepared, reopened and saturated the way the CLI does it.

use factloop::{Literal, Term};
use factloop::engine::Outcome;
use factloop::memory::{Patch, Point3, PointCloud};
use factloop::{Engine, EngineConfig};
use std::path::Path;

const ONTOLOGY: &str = r#"
@prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .
@prefix owl: <http://www.w3.org/2002/07/owl#> .
@prefix xsd: <http://www.w3.org/2001/XMLSchema#> .
@prefix kd: <http://lab.ponciano.info/knowdip#> .

kd:GetPatchSize rdfs:subClassOf kd:Algorithm ,
    [ a owl:Restriction ; owl:onProperty kd:hasInput ; owl:someValuesFrom kd:Patch ] ,
    [ a owl:Restriction ; owl:onProperty kd:hasDataOutput ; owl:someValuesFrom xsd:integer ] .
kd:hasDataOutput rdfs:seeAlso kd:hasSize .
kd:hasSize a owl:DatatypeProperty .
kd:Large rdfs:subClassOf kd:Object ,
    [ a owl:Restriction ; owl:onProperty kd:hasSize ;
      owl:someValuesFrom [ a rdfs:Datatype ; owl:onDatatype xsd:integer ;
                           owl:withRestrictions ( [ xsd:minInclusive 3 ] ) ] ] .
"#;

const RULES: &str = r#"
# sizes for every patch that has none yet
CONSTRUCT { ?p knowdip:hasSize ?out . }
WHERE {
    ?p rdf:type knowdip:Patch .
    FILTER NOT EXISTS { ?p knowdip:hasSize ?s }
    ?out knowdip:GetPatchSize( "hasInput=" ?p ) .
}
"#;

fn config_for(workdir: &Path, ontology: &Path) -> EngineConfig {
    let text = format!(
        "[paths]\nworkdir = {:?}\nontology = {:?}\n\n[fixpoint]\nmax_passes = 8\n",
        workdir.display().to_string(),
        ontology.display().to_string()
    );
    EngineConfig::from_toml(&text).unwrap()
}

/// Work dir with one cloud `scene` holding patches p1 (3 points) and p2 (1).
fn prepare(config: &EngineConfig) {
    let engine = Engine::in_memory(config.clone()).unwrap();
    let ns = engine.namespaces().clone();
    let mut cloud = PointCloud::default();
    cloud.add_patch(Patch::new(
        "p1",
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
        ],
    ));
    cloud.add_patch(Patch::new("p2", vec![Point3::new(0.0, 2.0, 0.0)]));
    engine.memory().alloc(ns.term("scene"), cloud);
    engine
        .update(
            "INSERT DATA { knowdip:scene rdf:type knowdip:FullPointCloud . \
             knowdip:p1 rdf:type knowdip:Patch . knowdip:p2 rdf:type knowdip:Patch }",
        )
        .unwrap();
    engine.save().unwrap();
}

fn size_of(engine: &Engine, patch: &str) -> Option<Term> {
    let query = format!(
        "SELECT ?s WHERE {{ <{}> knowdip:hasSize ?s }}",
        engine.namespaces().term(patch)
    );
    engine.select(&query).unwrap().first().and_then(|r| r.get("s").cloned())
}

#[test]
fn saturated_work_dir_survives_a_restart() {
    let tmp = tempfile::tempdir().unwrap();
    let ontology = tmp.path().join("knowdip.ttl");
    std::fs::write(&ontology, ONTOLOGY).unwrap();
    let config = config_for(&tmp.path().join("work"), &ontology);
    prepare(&config);

    let engine = Engine::open(config.clone()).unwrap();
    let report = engine.saturate().unwrap();
    assert_eq!(report.outcome, Outcome::Success);
    assert_eq!(report.inserted, 2);
    assert_eq!(size_of(&engine, "p1"), Some(Literal::integer(3).into()));
    engine.save().unwrap();

    // ontology and saved graph both reload; nothing is left to derive
    let reopened = Engine::open(config).unwrap();
    let again = reopened.saturate().unwrap();
    assert_eq!(again.inserted, 0);
    assert_eq!(again.passes, 1);
    let large = reopened
        .select("SELECT ?p WHERE { ?p rdf:type knowdip:Large }")
        .unwrap();
    assert_eq!(large.len(), 1);
}

#[test]
fn replay_file_then_report_as_yaml() {
    let tmp = tempfile::tempdir().unwrap();
    let ontology = tmp.path().join("knowdip.ttl");
    std::fs::write(&ontology, ONTOLOGY).unwrap();
    let rules = tmp.path().join("rules.rq");
    std::fs::write(&rules, RULES).unwrap();
    let config = config_for(&tmp.path().join("work"), &ontology);
    prepare(&config);

    let engine = Engine::open(config).unwrap();
    let report = engine.replay_file(&rules).unwrap();
    assert_eq!(report.passes, 1);
    assert_eq!(report.inserted, 2);
    assert_eq!(size_of(&engine, "p2"), Some(Literal::integer(1).into()));

    let yaml = report.to_yaml().unwrap();
    assert!(yaml.contains("mode: replay"));
    assert!(yaml.contains("query 1"));
}

#[test]
fn missing_config_file_means_defaults() {
    let tmp = tempfile::tempdir().unwrap();
    let config = EngineConfig::load(tmp.path().join("absent.toml")).unwrap();
    assert_eq!(config.fixpoint.max_passes, 64);
    assert_eq!(config.graph_path(), Path::new("output").join("graph.ttl"));
}

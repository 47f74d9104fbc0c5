// Loading the fixture Cargo workspace and reading its dependencies with syn.

use std::path::PathBuf;

use depreader::application::{Extractor, ReadDependencies};
use depreader::domain::callgraph::FunctionId;
use depreader::domain::policy::InclusionPolicy;
use depreader::domain::relation::DependencyRelation;
use depreader::infrastructure::project_loader::ProjectLoader;
use depreader::infrastructure::SynProvider;
use depreader::ports::ProgramModelProvider;

fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/demo_ws")
}

fn read(root: &str) -> Vec<(String, String)> {
    let provider = SynProvider::new(Some(2));
    let extractor = Extractor::new(InclusionPolicy::new(root));
    let mut out: Vec<DependencyRelation> = Vec::new();
    ReadDependencies {
        provider: &provider,
        extractor: &extractor,
    }
    .run(&fixture(), &mut out)
    .unwrap();
    out.into_iter().map(|r| (r.caller, r.callee)).collect()
}

fn pair(caller: &str, callee: &str) -> (String, String) {
    (caller.to_string(), callee.to_string())
}

#[test]
fn loads_every_member_with_module_paths() {
    let files = ProjectLoader::load_workspace(&fixture()).unwrap();
    let scopes: Vec<String> = files.iter().map(|f| f.scope().join("/")).collect();
    assert_eq!(scopes, vec!["app", "app/report", "core_lib", "core_lib/shapes"]);
    assert!(files.iter().all(|f| !f.code.is_empty()));
}

#[test]
fn closures_and_cross_crate_calls_are_resolved() {
    let graph = SynProvider::new(Some(1))
        .build_call_graph("app", &fixture())
        .unwrap();
    let callees: Vec<String> = graph
        .callees_of(&FunctionId::new("app", "main"))
        .into_iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(
        callees,
        vec![
            "core_lib.init",
            "core_lib.compute",
            "app/report.print",
            "core_lib/shapes.Square.area",
            "app/report.print",
        ]
    );
    assert!(graph.node_id(&FunctionId::new("app", "main$1")).is_none());
}

#[test]
fn root_app_relations_in_traversal_order() {
    assert_eq!(
        read("app"),
        vec![
            pair("app.main", "core_lib.compute"),
            pair("app.main", "app/report.print"),
            pair("app.main", "core_lib/shapes.Square.area"),
            pair("app.main", "app/report.print"),
            pair("app/report.print", "app/report.format_value"),
        ]
    );
}

#[test]
fn initializer_calls_are_left_out() {
    assert_eq!(
        read("core_lib"),
        vec![
            pair("core_lib.compute", "core_lib/shapes.area"),
            pair("core_lib/shapes.Square.area", "core_lib/shapes.area"),
        ]
    );
}

#[test]
fn unknown_root_yields_no_relations() {
    assert!(read("missing").is_empty());
}

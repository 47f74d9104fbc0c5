//! Benchmarks for depreader: relation extraction and SCIP ingestion.
//!
//! Run with: `cargo bench`

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use depreader::application::{Extractor, Ordering};
use depreader::domain::callgraph::{CallGraph, FunctionId};
use depreader::domain::policy::InclusionPolicy;
use depreader::domain::scip_ingest::ScipIngestor;
use depreader::ports::json_lines::JsonLinesSink;
use memmap2::Mmap;
use protobuf::Message;
use tempfile::tempdir;

/// `packages` packages of `funcs` functions; every function calls the
/// next `fanout` functions, wrapping into the next package.
fn synthetic_graph(packages: usize, funcs: usize, fanout: usize) -> CallGraph {
    let mut graph = CallGraph::new();
    let ids: Vec<_> = (0..packages * funcs)
        .map(|i| {
            let package = if i / funcs % 2 == 0 {
                format!("app/pkg{}", i / funcs)
            } else {
                format!("vendor/pkg{}", i / funcs)
            };
            let name = if i % funcs == 0 { "init".to_string() } else { format!("f{}", i % funcs) };
            graph.add_node(FunctionId::new(package, name), false)
        })
        .collect();
    for (i, &caller) in ids.iter().enumerate() {
        for step in 1..=fanout {
            graph.add_edge(caller, ids[(i + step) % ids.len()]);
        }
    }
    graph
}

fn synthetic_scip_index(
    documents: usize,
    defs_per_doc: usize,
    refs_per_def: usize,
) -> scip::types::Index {
    let symbol = |doc: usize, def: usize| {
        format!("scip-go gomod example.com/app v1.0.0 `example.com/app/pkg{}`/F{}().", doc, def)
    };
    let mut index = scip::types::Index::new();
    for doc_idx in 0..documents {
        let mut doc = scip::types::Document::new();
        doc.relative_path = format!("pkg{}/file.go", doc_idx);
        for def_idx in 0..defs_per_doc {
            let start = (def_idx * 20) as i32;
            let mut def = scip::types::Occurrence::new();
            def.symbol = symbol(doc_idx, def_idx);
            def.range = vec![start, 5, 10];
            def.enclosing_range = vec![start, 0, start + 15, 1];
            def.symbol_roles = 1;
            doc.occurrences.push(def);

            for r in 0..refs_per_def {
                let mut occ = scip::types::Occurrence::new();
                occ.symbol = symbol((doc_idx + 1) % documents, r % defs_per_doc);
                occ.range = vec![start + 1 + r as i32, 4, 12];
                doc.occurrences.push(occ);
            }
        }
        index.documents.push(doc);
    }
    index
}

fn write_index(index: &scip::types::Index) -> (tempfile::TempDir, PathBuf) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bench.scip");
    File::create(&path)
        .unwrap()
        .write_all(&index.write_to_bytes().unwrap())
        .unwrap();
    (dir, path)
}

fn bench_extract(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract");
    for packages in [10, 100, 400] {
        let graph = synthetic_graph(packages, 50, 4);
        group.throughput(Throughput::Elements(graph.edge_count() as u64));

        let orderings = [
            ("traversal", Ordering::Traversal),
            ("lexicographic", Ordering::Lexicographic),
        ];
        for (label, ordering) in orderings {
            let extractor = Extractor::new(InclusionPolicy::new("app")).with_ordering(ordering);
            group.bench_with_input(BenchmarkId::new(label, packages), &graph, |b, graph| {
                b.iter(|| {
                    let mut sink = JsonLinesSink::new(io::sink());
                    black_box(extractor.extract(graph, &mut sink).unwrap())
                })
            });
        }
    }
    group.finish();
}

fn bench_delete_synthetic(c: &mut Criterion) {
    let mut group = c.benchmark_group("delete_synthetic_nodes");
    group.sample_size(30);
    for funcs in [1_000usize, 5_000] {
        group.bench_with_input(BenchmarkId::from_parameter(funcs), &funcs, |b, &funcs| {
            b.iter_with_setup(
                || {
                    let mut graph = CallGraph::new();
                    let mut prev = graph.add_node(FunctionId::new("app", "f0"), false);
                    for i in 1..funcs {
                        let node = graph.add_node(FunctionId::new("app", format!("f{}", i)), false);
                        let closure_id = FunctionId::new("app", format!("f{}$1", i));
                        let closure = graph.add_node(closure_id, true);
                        graph.add_edge(prev, closure);
                        graph.add_edge(closure, node);
                        prev = node;
                    }
                    graph
                },
                |mut graph| black_box(graph.delete_synthetic_nodes()),
            )
        });
    }
    group.finish();
}

fn bench_scip_ingest(c: &mut Criterion) {
    let mut group = c.benchmark_group("scip_ingest");
    group.sample_size(30);
    for documents in [10, 100, 250] {
        let (_dir, path) = write_index(&synthetic_scip_index(documents, 10, 5));
        group.throughput(Throughput::Elements((documents * 10) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(documents), &path, |b, path| {
            b.iter(|| black_box(ScipIngestor::ingest_file(path).unwrap()))
        });
    }
    group.finish();
}

fn bench_mmap_vs_read(c: &mut Criterion) {
    let (_dir, path) = write_index(&synthetic_scip_index(200, 10, 5));
    let file_size = std::fs::metadata(&path).unwrap().len();
    let mut group = c.benchmark_group("index_io");
    group.throughput(Throughput::Bytes(file_size));

    group.bench_function("read_to_vec", |b| {
        b.iter(|| {
            let mut bytes = Vec::new();
            File::open(&path).unwrap().read_to_end(&mut bytes).unwrap();
            black_box(scip::types::Index::parse_from_bytes(&bytes).unwrap())
        })
    });
    group.bench_function("mmap", |b| {
        b.iter(|| {
            let file = File::open(&path).unwrap();
            let mmap = unsafe { Mmap::map(&file).unwrap() };
            black_box(scip::types::Index::parse_from_bytes(&mmap).unwrap())
        })
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_extract,
    bench_delete_synthetic,
    bench_scip_ingest,
    bench_mmap_vs_read
);
criterion_main!(benches);

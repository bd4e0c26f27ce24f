use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use netlayout::{Graph, LayoutConfig, RouteStrategy, compute_layout};
use std::hint::black_box;

/// A ring of `nodes` with `extra_edges` chords, similar in density to the
/// mid-sized graphs the layout targets.
fn dense_graph(nodes: usize, extra_edges: usize) -> Graph {
    let mut edges = Vec::new();
    for i in 0..nodes {
        edges.push((format!("n{i}"), format!("n{}", (i + 1) % nodes)));
    }
    let mut count = 0usize;
    'outer: for i in 0..nodes {
        for j in (i + 2)..nodes {
            if count >= extra_edges {
                break 'outer;
            }
            edges.push((format!("n{i}"), format!("n{j}")));
            count += 1;
        }
    }
    Graph::from_edges(edges)
}

fn bench_node_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("node_layout");
    let config = LayoutConfig::default();
    for (nodes, extra_edges) in [(20usize, 20usize), (60, 120), (100, 300)] {
        let name = format!("dense_{}_{}", nodes, extra_edges);
        let graph = dense_graph(nodes, extra_edges);
        group.bench_with_input(BenchmarkId::from_parameter(name), &graph, |b, graph| {
            b.iter(|| {
                let layout = compute_layout(black_box(graph), None, &config).unwrap();
                black_box(layout.positions.len());
            });
        });
    }
    group.finish();
}

fn bench_routing_strategies(c: &mut Criterion) {
    let mut group = c.benchmark_group("edge_routing");
    let graph = dense_graph(40, 80);
    for strategy in [
        RouteStrategy::Straight,
        RouteStrategy::Curved,
        RouteStrategy::Arced,
        RouteStrategy::Bundled,
    ] {
        let mut config = LayoutConfig::default();
        config.routing.strategy = strategy;
        group.bench_with_input(
            BenchmarkId::from_parameter(strategy.name()),
            &graph,
            |b, graph| {
                b.iter(|| {
                    let layout = compute_layout(black_box(graph), None, &config).unwrap();
                    black_box(layout.paths.len());
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_node_layout, bench_routing_strategies);
criterion_main!(benches);

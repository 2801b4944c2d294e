//! Benchmarks for tree building, filtering and inheritance resolution.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;
use wsaccess_core::workspace::{
    build_tree, filter_tree, resolve_effective, BindingIndex, PermissionGrant, RoleBinding,
    SubjectType, TreeView, VisibilityPolicy, WorkspaceId, WorkspaceRecord, WorkspaceScope,
};

/// Root plus `n` records arranged `fan` wide per level.
fn records(n: usize, fan: usize) -> Vec<WorkspaceRecord> {
    let mut out = Vec::with_capacity(n + 1);
    out.push(WorkspaceRecord::root("ws-0", "Default"));
    for i in 1..=n {
        let parent = (i - 1) / fan;
        out.push(WorkspaceRecord::child(format!("ws-{i}"), format!("ws-{parent}"), format!("Workspace {i}")));
    }
    out
}

fn bench_tree_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("tree_build");
    for size in [10, 100, 1_000, 10_000] {
        let input = records(size, 8);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &input, |b, input| {
            b.iter(|| black_box(build_tree(input).unwrap()));
        });
    }
    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("tree_search");
    for size in [100, 1_000, 10_000] {
        let tree = Arc::new(build_tree(&records(size, 8)).unwrap());
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &tree, |b, tree| {
            b.iter(|| black_box(filter_tree(tree, "space 7")));
        });
    }
    group.finish();
}

fn bench_search_and_restrict(c: &mut Criterion) {
    let tree = Arc::new(build_tree(&records(10_000, 8)).unwrap());
    let ids: Vec<String> = (0..10_000).step_by(7).map(|i| format!("ws-{i}")).collect();
    let policy = VisibilityPolicy::from_grants(
        &[PermissionGrant::scoped("inventory:groups:read", ids)],
        &WorkspaceScope::default(),
    );

    c.bench_function("search_then_restrict_10000", |b| {
        b.iter(|| black_box(TreeView::new(Arc::clone(&tree)).search("1").restrict(&policy)));
    });
}

fn bench_resolve_effective(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve_effective");
    for fan in [2, 8, 64] {
        let input = records(10_000, fan);
        let tree = build_tree(&input).unwrap();
        let index: BindingIndex = input
            .iter()
            .flat_map(|r| {
                (0..3).map(move |k| {
                    RoleBinding::new(format!("role-{k}"), "Role", format!("group-{k}"), SubjectType::Group, r.id.clone())
                })
            })
            .collect();
        let target = WorkspaceId::new("ws-10000");

        group.bench_with_input(BenchmarkId::new("fan", fan), &fan, |b, _| {
            b.iter(|| black_box(resolve_effective(&tree, &target, &index).unwrap()));
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_tree_build,
    bench_search,
    bench_search_and_restrict,
    bench_resolve_effective
);
criterion_main!(benches);

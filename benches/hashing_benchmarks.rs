use bead::models::time_from_timestamp;
use bead::storage::hash::{hash_bytes, hash_tree};
use bead::storage::{BeadBox, QueryCondition};
use bead::workspace::Workspace;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::fs;
use tempfile::TempDir;

fn bench_hash_bytes(c: &mut Criterion) {
    let mut group = c.benchmark_group("hash_bytes");

    for size in [1024usize, 64 * 1024, 1024 * 1024] {
        let data = vec![0x5au8; size];
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &data, |b, data| {
            b.iter(|| hash_bytes(black_box(data)))
        });
    }

    group.finish();
}

fn bench_hash_tree(c: &mut Criterion) {
    let mut group = c.benchmark_group("hash_tree");

    for count in [10usize, 100, 1000] {
        let entries: Vec<(String, String)> = (0..count)
            .map(|i| (format!("code/file_{}.py", i), hash_bytes(i.to_string().as_bytes())))
            .collect();
        group.bench_with_input(BenchmarkId::from_parameter(count), &entries, |b, entries| {
            b.iter(|| hash_tree(black_box(entries.clone())))
        });
    }

    group.finish();
}

fn bench_box_lookup(c: &mut Criterion) {
    let temp_dir = TempDir::new().unwrap();
    let box_dir = temp_dir.path().join("box");
    fs::create_dir_all(&box_dir).unwrap();
    let bead_box = BeadBox::new("bench", &box_dir);

    let workspace = Workspace::new(temp_dir.path().join("bead"));
    workspace.create("bench_kind").unwrap();
    fs::write(workspace.directory().join("output/data.txt"), "payload\n").unwrap();
    for day in 1..=28 {
        let freeze_time =
            time_from_timestamp(&format!("200002{:02}T120000000000+0000", day)).unwrap();
        bead_box.store(&workspace, freeze_time).unwrap();
    }

    let condition = QueryCondition::ByName("bead".to_string());
    let query_time = time_from_timestamp("20000214T000000000000+0000").unwrap();

    c.bench_function("box_get_at_28_versions", |b| {
        b.iter(|| bead_box.get_at(black_box(&condition), black_box(query_time)).unwrap())
    });
    c.bench_function("box_all_beads_28_versions", |b| {
        b.iter(|| bead_box.all_beads().count())
    });
}

criterion_group!(benches, bench_hash_bytes, bench_hash_tree, bench_box_lookup);
criterion_main!(benches);

//! Scan performance benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use watcher::{CaseSensitivity, NameOrdering, WatchRoot};

/// Build `dirs` directories holding `files` files each
fn populate(root: &Path, dirs: usize, files: usize) {
    for d in 0..dirs {
        let dir = root.join(format!("dir_{:03}", d));
        fs::create_dir(&dir).unwrap();
        for f in 0..files {
            fs::write(dir.join(format!("file_{:04}.txt", f)), b"payload").unwrap();
        }
    }
}

fn bench_unchanged_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("unchanged_scan");

    for &(dirs, files) in &[(10, 10), (20, 50), (50, 200)] {
        let temp_dir = TempDir::new().unwrap();
        populate(temp_dir.path(), dirs, files);

        let root = WatchRoot::builder(temp_dir.path())
            .case_sensitivity(CaseSensitivity::Sensitive)
            .build()
            .unwrap();
        root.initialize().unwrap();

        group.bench_with_input(
            BenchmarkId::from_parameter(dirs * files),
            &root,
            |b, root| b.iter(|| root.scan()),
        );
    }

    group.finish();
}

fn bench_initialize(c: &mut Criterion) {
    let temp_dir = TempDir::new().unwrap();
    populate(temp_dir.path(), 20, 50);
    let root = WatchRoot::new(temp_dir.path()).unwrap();

    c.bench_function("initialize_1000_entries", |b| {
        b.iter(|| root.initialize().unwrap());
    });
}

fn bench_ordering(c: &mut Criterion) {
    let names: Vec<_> = (0..1000)
        .rev()
        .map(|i| Path::new("/w").join(format!("Entry_{:04}.TXT", i)))
        .collect();

    for case in [CaseSensitivity::Sensitive, CaseSensitivity::Insensitive] {
        let ordering = NameOrdering::new(case);
        c.bench_function(&format!("sort_1000_names_{:?}", case).to_lowercase(), |b| {
            b.iter(|| {
                let mut paths = names.clone();
                ordering.sort(&mut paths);
                black_box(paths)
            });
        });
    }
}

criterion_group!(benches, bench_unchanged_scan, bench_initialize, bench_ordering);
criterion_main!(benches);

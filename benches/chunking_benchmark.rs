// Benchmarks for chunk planning and similarity grouping
use archlens::chunking::{ChunkPlanner, SimilarityGrouper, detect_boundaries};
use archlens::config::Config;
use archlens::types::SourceFile;
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

fn cobol_program(sections: usize, statements: usize) -> String {
    let mut source = String::from(
        "       IDENTIFICATION DIVISION.\n\
         \x20      PROGRAM-ID. BENCH.\n\
         \x20      DATA DIVISION.\n\
         \x20      WORKING-STORAGE SECTION.\n\
         \x20      01 WS-COUNT PIC 9(6) VALUE 0.\n\
         \x20      PROCEDURE DIVISION.\n",
    );
    for s in 0..sections {
        source.push_str(&format!("       S{:04}-SECTION SECTION.\n", s));
        source.push_str(&format!("       P{:04}-PARA.\n", s));
        for i in 0..statements {
            source.push_str(&format!(
                "           ADD {} TO WS-COUNT GIVING WS-COUNT ROUNDED.\n",
                i
            ));
        }
    }
    source.push_str("           STOP RUN.\n");
    source
}

fn python_repo(count: usize) -> Vec<SourceFile> {
    (0..count)
        .map(|i| {
            let mut content = format!("import os\n\nclass Service{}:\n", i);
            for f in 0..40 {
                content.push_str(&format!(
                    "    def handler_{}(self, request):\n        return request.get('{}')\n\n",
                    f, f
                ));
            }
            SourceFile::with_language(format!("app/services/service_{}.py", i), "python", content)
        })
        .collect()
}

fn heuristic_config(max_tokens: usize) -> Config {
    let mut config = Config::default();
    config.tokenizer.estimator = "heuristic".to_string();
    config.chunking.max_tokens = max_tokens;
    config
}

fn benchmark_boundaries(c: &mut Criterion) {
    let mut group = c.benchmark_group("boundaries");

    for sections in [10, 100].iter() {
        let source = cobol_program(*sections, 50);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_sections", sections)),
            &source,
            |b, source| {
                b.iter(|| {
                    let lines: Vec<&str> = source.lines().collect();
                    detect_boundaries(black_box(&lines), "cobol")
                });
            },
        );
    }

    group.finish();
}

fn benchmark_planning(c: &mut Criterion) {
    let mut group = c.benchmark_group("planning");
    let planner = ChunkPlanner::from_config(&heuristic_config(4_000));

    for sections in [10, 100].iter() {
        let files = vec![SourceFile::with_language(
            "BENCH.cbl",
            "cobol",
            cobol_program(*sections, 50),
        )];
        group.bench_with_input(
            BenchmarkId::new("cobol", format!("{}_sections", sections)),
            &files,
            |b, files| b.iter(|| planner.plan(black_box(files)).unwrap()),
        );
    }

    for count in [10, 50, 100].iter() {
        let files = python_repo(*count);
        group.bench_with_input(
            BenchmarkId::new("multi", format!("{}_files", count)),
            &files,
            |b, files| b.iter(|| planner.plan(black_box(files)).unwrap()),
        );
    }

    group.finish();
}

fn benchmark_grouping(c: &mut Criterion) {
    let mut group = c.benchmark_group("similarity");
    let config = heuristic_config(4_000);
    let planner = ChunkPlanner::from_config(&config);
    let grouper = SimilarityGrouper::new(config.similarity.clone());

    for count in [10, 50].iter() {
        let plan = planner.plan(&python_repo(*count)).unwrap();
        let documents: Vec<String> = plan.chunks().iter().map(|c| c.content.clone()).collect();
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_chunks", documents.len())),
            &documents,
            |b, documents| {
                let refs: Vec<&str> = documents.iter().map(String::as_str).collect();
                b.iter(|| grouper.group(black_box(&refs)));
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_boundaries,
    benchmark_planning,
    benchmark_grouping
);
criterion_main!(benches);

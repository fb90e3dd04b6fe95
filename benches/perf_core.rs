use chaos_reviewer::llm::{fallback_fix, PromptStyle};
use chaos_reviewer::quips::RemarkSelector;
use chaos_reviewer::triage::{classify, extract_text, keyword_fallback};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

/// A long log with noise lines and a handful of real diagnostics near the end.
fn synthetic_log(noise_lines: usize, tail: &str) -> String {
    let mut log = String::with_capacity(noise_lines * 48 + tail.len());
    for i in 0..noise_lines {
        log.push_str(&format!("[{i:06}] compiling module_{:03}.o ... ok\n", i % 250));
    }
    log.push_str(tail);
    log
}

const GCC_TAIL: &str = "\
src/main.c:10:1: error: control reaches end of non-void function
src/util.c:22:5: error: 'count' undeclared (first use in this function)
src/util.c:40:12: error: incompatible types when assigning
";

const TRACEBACK_TAIL: &str = "\
Traceback (most recent call last):
  File \"app/main.py\", line 12, in <module>
    run()
  File \"app/core.py\", line 40, in run
    return total / count
ZeroDivisionError: division by zero
";

const KEYWORD_TAIL: &str = "\
running 48 tests
test result: FAILED. 45 passed; 3 failed
error: test failed, to rerun pass `--lib`
";

fn bench_extract(c: &mut Criterion) {
    let gcc = synthetic_log(20_000, GCC_TAIL);
    c.bench_function("extract_compiler_20k", |b| {
        b.iter(|| black_box(extract_text(black_box(&gcc))));
    });

    let traceback = synthetic_log(20_000, TRACEBACK_TAIL);
    c.bench_function("extract_traceback_20k", |b| {
        b.iter(|| black_box(extract_text(black_box(&traceback))));
    });

    let keywords = synthetic_log(20_000, KEYWORD_TAIL);
    c.bench_function("keyword_fallback_20k", |b| {
        b.iter(|| black_box(keyword_fallback(black_box(&keywords))));
    });
}

fn bench_offline_reply_parts(c: &mut Criterion) {
    let findings = extract_text(GCC_TAIL);
    let mut selector = RemarkSelector::seeded(42);

    c.bench_function("offline_fix_and_remark", |b| {
        b.iter(|| {
            let language = classify(&findings);
            let fix = fallback_fix(&findings[0], PromptStyle::Playful);
            let remark = selector.select(language, false);
            black_box((fix, remark));
        });
    });
}

criterion_group!(perf_core, bench_extract, bench_offline_reply_parts);
criterion_main!(perf_core);

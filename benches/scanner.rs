use criterion::{Criterion, black_box, criterion_group, criterion_main};
use fourpp_processor::config::AnalysisConfig;
use fourpp_processor::extractor::find_skip_rows;
use fourpp_processor::models::SourceKind;
use fourpp_processor::scanner::scan;
use fourpp_processor::source::RawContent;

fn library_export() -> RawContent {
    let mut lines = vec!["Materials library 12".to_string(), "x,y,R1,R2,R3".to_string()];
    for i in 0..342 {
        let (x, y) = ((i % 18) as f64 * 4.5, (i / 18) as f64 * 4.5);
        lines.push(format!("{},{},{},{},{}", x, y, 100.0 + i as f64, 101.5, 99.25));
    }
    RawContent::Text(lines)
}

fn bench_profile(c: &mut Criterion) {
    let content = library_export();
    let config = AnalysisConfig::default();

    c.bench_function("scan_library_export", |b| {
        b.iter(|| scan(black_box(&content), SourceKind::Csv, &config))
    });
    c.bench_function("find_skip_rows_library_export", |b| {
        b.iter(|| find_skip_rows(black_box(&content), &config))
    });
}

criterion_group!(benches, bench_profile);
criterion_main!(benches);

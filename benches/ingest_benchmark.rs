//! Benchmarks for detection, ingestion and serialization.
//!
//! Run with: cargo bench

use std::io::sink;

use bboxes::render::{to_json, write_json_lines};
use bboxes::{Collection, ExtractOptions, JsonFormat};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

/// Creates a PDF with `page_count` pages of `lines` text lines each.
fn create_test_pdf(page_count: usize, lines: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for page in 0..page_count {
        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 10.into()]),
            Operation::new("TL", vec![12.into()]),
            Operation::new("Td", vec![50.into(), 750.into()]),
        ];
        for line in 0..lines {
            let text = format!("Page {} line {} of benchmark content", page + 1, line + 1);
            operations.push(Operation::new("Tj", vec![Object::string_literal(text)]));
            operations.push(Operation::new("T*", vec![]));
        }
        operations.push(Operation::new("ET", vec![]));

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

fn create_test_text(page_count: usize, lines: usize) -> Vec<u8> {
    let pages: Vec<String> = (0..page_count)
        .map(|page| {
            (0..lines)
                .map(|line| format!("page {} line {}\n", page + 1, line + 1))
                .collect()
        })
        .collect();
    pages.join("\x0C").into_bytes()
}

/// Benchmark format detection.
fn bench_format_detection(c: &mut Criterion) {
    let pdf_data = create_test_pdf(1, 1);
    let text_data = create_test_text(1, 200);

    c.bench_function("detect_pdf", |b| {
        b.iter(|| bboxes::detect(black_box(&pdf_data)));
    });

    c.bench_function("detect_text", |b| {
        b.iter(|| bboxes::detect(black_box(&text_data)));
    });
}

/// Benchmark PDF ingestion, sequential against page-parallel decoding.
fn bench_pdf_ingest(c: &mut Criterion) {
    let mut group = c.benchmark_group("pdf_ingest");

    for page_count in [1, 10, 50] {
        let data = create_test_pdf(page_count, 40);
        for parallel in [false, true] {
            let label = if parallel { "parallel" } else { "sequential" };
            group.bench_with_input(BenchmarkId::new(label, page_count), &data, |b, data| {
                b.iter(|| {
                    let options = ExtractOptions::new().with_parallel(parallel);
                    let mut cursor = bboxes::open_with_options(data.clone(), options).unwrap();
                    black_box(cursor.bboxes().unwrap().count())
                });
            });
        }
    }

    group.finish();
}

/// Benchmark eager JSON against streamed JSON lines.
fn bench_serialization(c: &mut Criterion) {
    let data = create_test_text(20, 100);
    let mut group = c.benchmark_group("serialize_bboxes");

    group.bench_function("eager_json", |b| {
        b.iter(|| {
            let mut cursor = bboxes::open(data.clone()).unwrap();
            black_box(to_json(&mut cursor, Collection::BBoxes, JsonFormat::Compact).unwrap())
        });
    });

    group.bench_function("json_lines", |b| {
        b.iter(|| {
            let mut cursor = bboxes::open(data.clone()).unwrap();
            black_box(write_json_lines(&mut cursor, Collection::BBoxes, sink()).unwrap())
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_format_detection,
    bench_pdf_ingest,
    bench_serialization,
);
criterion_main!(benches);

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use golden_core::Image;
use golden_sift::preprocessing::ImagePreprocessing;
use golden_sift::pyramid::ImagePyramid;
use golden_sift::{ExtractorBuilder, ExtractorConfig, SiftExtractor};

/// Screen-like benchmark image: gradient background, panels and round indicators
fn create_benchmark_image(width: usize, height: usize) -> Image {
    Image::from_fn(width, height, |x, y| {
        let mut v = 90 + (x * 60 / width.max(1)) as i32;
        if (x / 40 + y / 30) % 3 == 0 && x % 40 > 6 && y % 30 > 5 {
            v += 70;
        }
        let (cx, cy) = ((x % 64) as i32 - 32, (y % 48) as i32 - 24);
        if cx * cx + cy * cy < 36 {
            v -= 60;
        }
        v.clamp(0, 255) as u8
    })
}

fn bench_extraction(c: &mut Criterion) {
    let mut group = c.benchmark_group("extraction");
    group.sample_size(10);

    for &(width, height) in &[(160, 120), (320, 240)] {
        let img = create_benchmark_image(width, height);
        for (name, cfg) in [
            ("default", ExtractorConfig::default()),
            ("fast", ExtractorConfig::fast_preset()),
        ] {
            let Ok(extractor) = SiftExtractor::new(cfg) else {
                continue;
            };
            group.bench_with_input(
                BenchmarkId::new(format!("{}x{}", width, height), name),
                &img,
                |b, img| b.iter(|| extractor.extract(black_box(img))),
            );
        }
    }
    group.finish();
}

fn bench_scale_space(c: &mut Criterion) {
    let mut group = c.benchmark_group("scale_space");
    let img = create_benchmark_image(320, 240);

    group.bench_function("base_image", |b| {
        b.iter(|| ImagePreprocessing::base_image(black_box(&img), 1.6, true))
    });

    let base = ImagePreprocessing::base_image(&img, 1.6, false);
    group.bench_function("build_pyramid", |b| {
        b.iter(|| ImagePyramid::build(black_box(base.clone()), 3, 1.6))
    });
    group.finish();
}

fn bench_builder(c: &mut Criterion) {
    c.bench_function("builder_summary", |b| {
        b.iter(|| ExtractorBuilder::new().preset_fine_detail().max_features(300).summary())
    });
}

criterion_group!(benches, bench_extraction, bench_scale_space, bench_builder);
criterion_main!(benches);

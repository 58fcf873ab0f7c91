use bimba::{demosaic, CfaPattern, DcbParams, RawImage, RgbPlanes};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn noise_input(width: usize, height: usize) -> Vec<f32> {
    let mut state = 0x9e3779b97f4a7c15u64;
    (0..width * height)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            0.05 + 0.9 * ((state >> 40) as f32 / (1u64 << 24) as f32)
        })
        .collect()
}

fn bench_dcb(c: &mut Criterion) {
    let (width, height) = (768, 512);
    let data = noise_input(width, height);
    let cfa = CfaPattern::rggb();

    let mut group = c.benchmark_group("dcb");
    group.sample_size(10);

    for (name, enhance) in [("fast", false), ("enhanced", true)] {
        group.bench_function(name, |b| {
            let raw = RawImage::new(&data, width, height, cfa).unwrap();
            let mut planes = RgbPlanes::new(width, height);
            let params = DcbParams::default().with_enhance(enhance);
            b.iter(|| {
                demosaic(&raw, &params, &mut planes, None).unwrap();
                black_box(&planes);
            })
        });
    }

    group.bench_function("single_thread", |b| {
        let raw = RawImage::new(&data, width, height, cfa).unwrap();
        let mut planes = RgbPlanes::new(width, height);
        let params = DcbParams::default().with_threads(1);
        b.iter(|| {
            demosaic(&raw, &params, &mut planes, None).unwrap();
            black_box(&planes);
        })
    });

    group.finish();
}

criterion_group!(benches, bench_dcb);
criterion_main!(benches);

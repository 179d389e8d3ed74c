use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use motionscope::motion::MotionTransform;

fn bench_transform(c: &mut Criterion) {
    let luminance_len = 640 * 480;
    let frame_len = luminance_len + luminance_len / 2;

    c.bench_function("transform_vga_yuv420", |b| {
        let transform = MotionTransform::new();
        let mut previous = vec![0u8; luminance_len];
        let mut frame: Vec<u8> = (0..frame_len).map(|i| (i % 251) as u8).collect();
        b.iter(|| {
            transform.apply(
                black_box(&mut frame),
                black_box(luminance_len),
                black_box(&mut previous),
            );
        });
    });
}

criterion_group!(benches, bench_transform);
criterion_main!(benches);

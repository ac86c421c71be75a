//! Resampler benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use transcode_resample_dyn::{FilterConstants, Quality, Resampler, ResamplerConfig, SliceProvider};

const OUTPUT_FRAMES: usize = 4800;

fn generate_test_signal(frames: usize, channels: usize) -> Vec<i16> {
    (0..frames * channels)
        .map(|i| (((i * 7919) % 40000) as i32 - 20000) as i16)
        .collect()
}

fn bench_resample(c: &mut Criterion) {
    let mut group = c.benchmark_group("resample");
    group.throughput(Throughput::Elements(OUTPUT_FRAMES as u64));

    // 44.1k -> 48k uses interpolated kernels, 24k -> 48k and 96k -> 48k are locked.
    for (input_rate, name) in [(44100u32, "44k1_to_48k"), (24000, "24k_to_48k"), (96000, "96k_to_48k")] {
        for quality in Quality::ALL {
            let config = ResamplerConfig::new(48000)
                .with_channels(2)
                .with_quality(quality)
                .with_input_rate(input_rate);
            let input_frames = OUTPUT_FRAMES * input_rate as usize / 48000 + 64;
            let input = generate_test_signal(input_frames, 2);

            group.bench_with_input(BenchmarkId::new(name, quality), &input, |b, input| {
                let mut out = vec![0i32; 2 * OUTPUT_FRAMES];
                b.iter_batched(
                    || {
                        (
                            Resampler::new(config.clone()).unwrap(),
                            SliceProvider::new(input.clone(), 2),
                        )
                    },
                    |(mut resampler, mut provider)| {
                        black_box(resampler.resample(&mut out, OUTPUT_FRAMES, &mut provider))
                    },
                    criterion::BatchSize::SmallInput,
                );
            });
        }
    }

    group.finish();
}

fn bench_stride(c: &mut Criterion) {
    let mut group = c.benchmark_group("resample_stride");
    group.throughput(Throughput::Elements(OUTPUT_FRAMES as u64));
    let input = generate_test_signal(OUTPUT_FRAMES + 64, 1);

    for stride in [1usize, 4, 16] {
        let config = ResamplerConfig::new(48000)
            .with_channels(1)
            .with_quality(Quality::High)
            .with_max_stride(stride)
            .with_input_rate(44100);

        group.bench_with_input(BenchmarkId::from_parameter(stride), &input, |b, input| {
            let mut out = vec![0i32; 2 * OUTPUT_FRAMES];
            b.iter_batched(
                || {
                    (
                        Resampler::new(config.clone()).unwrap(),
                        SliceProvider::new(input.clone(), 1),
                    )
                },
                |(mut resampler, mut provider)| {
                    black_box(resampler.resample(&mut out, OUTPUT_FRAMES, &mut provider))
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn bench_filter_design(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter_design");

    for quality in Quality::ALL {
        group.bench_function(BenchmarkId::from_parameter(quality), |b| {
            b.iter(|| black_box(FilterConstants::build(quality, black_box(44100), 48000)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_resample, bench_stride, bench_filter_design);
criterion_main!(benches);

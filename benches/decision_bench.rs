use criterion::{black_box, criterion_group, criterion_main, Criterion};
use layoutlab::{classify, normalize, DeviceId, FrameKey, FrameMachine, LabConfig, Orientation, RenderingStrategy};

const INPUTS: &[&str] = &[
    "chatgpt.com",
    "localhost:3000",
    "  https://my-app.vercel.app/dashboard  ",
    "HTTP://Example.org/path?q=1",
    "127.0.0.1:8080",
    "some-unknown-site.io/a/b/c",
];

fn bench_normalize(c: &mut Criterion) {
    c.bench_function("normalize", |b| {
        b.iter(|| {
            for raw in INPUTS {
                black_box(normalize(black_box(raw)));
            }
        })
    });
}

fn bench_classify(c: &mut Criterion) {
    let urls: Vec<String> = INPUTS.iter().map(|raw| normalize(raw)).collect();
    c.bench_function("classify", |b| {
        b.iter(|| {
            for url in &urls {
                black_box(classify(black_box(url)));
            }
        })
    });
}

// Building a frame includes encoding the snapshot request URL.
fn bench_frame_build(c: &mut Criterion) {
    let endpoints = LabConfig::default().endpoints().expect("default endpoints");
    c.bench_function("frame_machine_new", |b| {
        b.iter(|| {
            for device in DeviceId::ALL {
                let key = FrameKey {
                    url: "https://chatgpt.com/".to_string(),
                    orientation: Orientation::Portrait,
                    generation: 0,
                };
                let mut frame = FrameMachine::new(device, key, RenderingStrategy::Snapshot, &endpoints);
                black_box(frame.start());
            }
        })
    });
}

criterion_group!(benches, bench_normalize, bench_classify, bench_frame_build);
criterion_main!(benches);

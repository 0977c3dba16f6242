use criterion::{criterion_group, criterion_main, Criterion};
use scenereel::{
    EncoderInvocation, EncoderLauncher, EncoderProcess, EncoderSettings, FrameSchedule,
    RenderRequest, RenderSettings, Surface, SurfaceProvider, Viewport,
};
use std::path::PathBuf;

// Null collaborators: measures the orchestration overhead per frame
// (worker round-trips and encoder writes), not browser or codec speed.

#[derive(Clone)]
struct NullProvider;

struct NullSurface {
    frame: Vec<u8>,
}

impl SurfaceProvider for NullProvider {
    type Surface = NullSurface;

    fn open(&self, _viewport: Viewport) -> scenereel::Result<NullSurface> {
        Ok(NullSurface { frame: vec![0u8; 8 * 1024] })
    }
}

impl Surface for NullSurface {
    fn load(&mut self, _url: &str) -> scenereel::Result<()> {
        Ok(())
    }
    fn freeze(&mut self, _hidden: &[String]) -> scenereel::Result<()> {
        Ok(())
    }
    fn seek(&mut self, _offset_ms: f64) -> scenereel::Result<()> {
        Ok(())
    }
    fn capture_png(&mut self) -> scenereel::Result<Vec<u8>> {
        Ok(self.frame.clone())
    }
    fn close(self) -> scenereel::Result<()> {
        Ok(())
    }
}

struct SinkLauncher;

struct SinkProcess {
    bytes: u64,
}

impl EncoderLauncher for SinkLauncher {
    type Process = SinkProcess;

    fn launch(&self, _invocation: &EncoderInvocation) -> scenereel::Result<SinkProcess> {
        Ok(SinkProcess { bytes: 0 })
    }
}

impl EncoderProcess for SinkProcess {
    async fn write_frame(&mut self, _index: u64, frame: &[u8]) -> scenereel::Result<()> {
        self.bytes += frame.len() as u64;
        Ok(())
    }
    async fn close_input(&mut self) -> scenereel::Result<()> {
        Ok(())
    }
    async fn wait(self) -> scenereel::Result<()> {
        criterion::black_box(self.bytes);
        Ok(())
    }
}

fn bench_frame_loop(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to build runtime");

    let settings = RenderSettings { settle_delay_ms: 0, ..Default::default() };
    let request = RenderRequest {
        label: "bench".into(),
        document_url: "http://bench.invalid/scene.html".into(),
        viewport: Viewport::new(1080, 1080),
        duration_secs: 10.0,
        audio: None,
        output: PathBuf::from("bench.mp4"),
    };

    c.bench_function("render_one_300_frames", |b| {
        b.iter(|| {
            rt.block_on(scenereel::render_one(&NullProvider, &SinkLauncher, &request, &settings))
                .unwrap();
        })
    });
}

fn bench_planning(c: &mut Criterion) {
    let config = scenereel::RenderConfig::default();
    let encoder = EncoderSettings::default();

    c.bench_function("plan_and_build_invocations", |b| {
        b.iter(|| {
            let units = config.plan(None, None).unwrap();
            for unit in &units {
                let schedule = FrameSchedule::new(30, unit.job.duration_secs).unwrap();
                let inv = EncoderInvocation::new(
                    &encoder,
                    schedule.frame_rate(),
                    unit.format.viewport(),
                    unit.job.audio.as_deref(),
                    &unit.output,
                );
                criterion::black_box(inv);
            }
        })
    });
}

criterion_group!(benches, bench_frame_loop, bench_planning);
criterion_main!(benches);

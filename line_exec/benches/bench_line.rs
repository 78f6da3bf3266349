//! # Racing Line Benchmark

use criterion::{criterion_group, criterion_main, Criterion};

use line_lib::{
    line::{LineParams, RacingLine},
    pursuit::{PursuitCtrl, PursuitParams},
    track::ClosedPath,
};
use track_if::{track::CentrelineSpec, vehicle::TickInput};

/// An S bend between two straights, closed by two wide arcs.
fn s_bend_track() -> ClosedPath {
    let r = 15.0;
    let gap = 2.0;
    let big_r = 60.0;
    let big_r2 = r + 0.5 * gap + big_r;
    let quarter = std::f64::consts::FRAC_PI_2 * r;
    let pi = std::f64::consts::PI;

    ClosedPath::from_spec(&CentrelineSpec::Pieces {
        separation_m: 1.0,
        seq: vec![
            0.0,
            30.0,
            1.0 / r,
            quarter,
            0.0,
            gap,
            -1.0 / r,
            quarter,
            0.0,
            30.0,
            1.0 / big_r,
            pi * big_r,
            0.0,
            90.0,
            1.0 / big_r2,
            pi * big_r2,
        ],
    })
    .unwrap()
}

fn line_benchmark(c: &mut Criterion) {
    let track = s_bend_track();
    let params = LineParams::default();

    let mut group = c.benchmark_group("line");
    group.sample_size(10);

    group.bench_function("build", |b| {
        b.iter(|| RacingLine::build(&track, 12.0, &params).unwrap())
    });

    group.finish();
}

fn pursuit_benchmark(c: &mut Criterion) {
    let line = RacingLine::build(&s_bend_track(), 12.0, &LineParams::default()).unwrap();

    let mut ctrl = PursuitCtrl::new(PursuitParams::default()).unwrap();
    ctrl.set_line(line.points().to_vec());

    // Sit just off the line and let the cursor settle before timing
    let p = line.point(40);
    let input = TickInput {
        x_m: p.position_m[0] + 0.5,
        y_m: p.position_m[1] - 0.5,
        heading_rad: p.tangent[1].atan2(p.tangent[0]),
        vel_x_ms: 20.0 * p.tangent[0],
        vel_y_ms: 20.0 * p.tangent[1],
        dt_s: 0.01,
    };
    ctrl.proc(&input);

    c.bench_function("pursuit tick", |b| b.iter(|| ctrl.proc(&input)));
}

criterion_group!(benches, line_benchmark, pursuit_benchmark);
criterion_main!(benches);

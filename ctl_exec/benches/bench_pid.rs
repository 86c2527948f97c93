//! # PID Controller Benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use ctl_lib::pid::{Pid, PidGains};

fn pid_benchmark(c: &mut Criterion) {
    c.bench_function("pid update and control", |b| {
        let mut pid = Pid::new(PidGains {
            kp: 0.375,
            ki: 0.003125,
            kd: 5.625,
        });

        // A decaying oscillation, roughly the error profile of a converging
        // run
        let mut cte = 0.76;

        b.iter(|| {
            cte = -0.9 * cte;
            pid.update_error(black_box(cte), 1.0);
            black_box(pid.control_value())
        });
    });
}

criterion_group!(benches, pid_benchmark);
criterion_main!(benches);

use std::time::Instant;

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use thermowatch::{Direction, Sensor, TemperatureScale, ThresholdSpec};

fn make_sensor_with_observations(count: u32) -> Sensor {
    let sensor = Sensor::new(TemperatureScale::Celsius);

    // Thresholds spread from 0.0 to 25.5 so a sweep crosses some of them.
    for i in 0..count {
        let direction = if i % 2 == 0 { Direction::Rise } else { Direction::Drop };
        let spec = ThresholdSpec::new(direction, format!("t{i}"), f64::from(i) * 0.1).with_sensitivity(0.5);
        // Dropping the handle leaves the observation registered.
        let _ = sensor
            .register(spec, thermowatch::FnObserver(|s: &thermowatch::ThresholdSnapshot| {
                black_box(s.current_reading);
            }))
            .unwrap();
    }

    sensor
}

fn bench_set_reading_sweep(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");
    group.throughput(Throughput::Elements(1));

    group.bench_function("set_reading_256_observations", |b| {
        b.iter_custom(|iters| {
            // Fresh state per sample so hysteresis state does not leak between samples.
            let sensor = make_sensor_with_observations(256);

            let start = Instant::now();
            for i in 0..iters {
                #[allow(clippy::cast_precision_loss)]
                let value = (i % 300) as f64 * 0.1;
                let _ = sensor.set_reading(black_box(value)).unwrap();
            }
            start.elapsed()
        });
    });

    group.finish();
}

fn bench_register_release(c: &mut Criterion) {
    let sensor = Sensor::new(TemperatureScale::Celsius);

    c.bench_function("dispatch/register_release", |b| {
        b.iter(|| {
            let sub = sensor
                .notify_on(Direction::Rise, "bench", 10.0, 1.0, |_| {})
                .unwrap();
            sub.release();
        });
    });
}

criterion_group!(benches, bench_set_reading_sweep, bench_register_release);
criterion_main!(benches);

use std::sync::{Arc, Mutex};

use thermowatch::{
    Direction, Sensor, TemperatureScale, ThermoError, ThresholdSnapshot, ThresholdSpec, ValidationError,
};

type Seen = Arc<Mutex<Vec<ThresholdSnapshot>>>;

fn recorder() -> (Seen, impl Fn(&ThresholdSnapshot) + Send + Sync + 'static) {
    let seen: Seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    (seen, move |s: &ThresholdSnapshot| sink.lock().unwrap().push(s.clone()))
}

fn readings(seen: &Seen) -> Vec<f64> {
    seen.lock().unwrap().iter().map(|s| s.current_reading).collect()
}

#[test]
fn drop_threshold_fires_once_on_first_reading() {
    let sensor = Sensor::new(TemperatureScale::Celsius);
    let (seen, callback) = recorder();
    let _sub = sensor
        .notify_on(Direction::Drop, "boiling", 100.0, 0.0, callback)
        .unwrap();

    let report = sensor.set_reading(100.0).unwrap();
    assert_eq!(report.notified, 1);

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    let snap = &seen[0];
    assert_eq!(snap.name, "boiling");
    assert_eq!(snap.threshold, 100.0);
    assert_eq!(snap.scale, TemperatureScale::Celsius);
    assert_eq!(snap.sensitivity, 0.0);
    assert_eq!(snap.last_notified, None);
    assert_eq!(snap.current_reading, 100.0);
}

#[test]
fn registering_after_a_reading_waits_for_the_next_one() {
    let sensor = Sensor::new(TemperatureScale::Celsius);
    sensor.set_reading(100.0).unwrap();

    let (seen, callback) = recorder();
    let _sub = sensor
        .notify_on(Direction::Drop, "boiling", 100.0, 0.0, callback)
        .unwrap();
    assert!(readings(&seen).is_empty());

    // First notification for this observation.
    sensor.set_reading(100.0).unwrap();
    assert_eq!(readings(&seen), vec![100.0]);

    // Same value again never re-fires.
    sensor.set_reading(100.0).unwrap();
    assert_eq!(readings(&seen), vec![100.0]);
}

#[test]
fn sensitivity_band_gates_repeat_notifications() {
    let sensor = Sensor::new(TemperatureScale::Celsius);
    let (seen, callback) = recorder();
    let _sub = sensor
        .notify_on(Direction::Rise, "boiling", 100.0, 10.0, callback)
        .unwrap();

    sensor.set_reading(105.0).unwrap();
    sensor.set_reading(112.0).unwrap();
    sensor.set_reading(115.0).unwrap();

    assert_eq!(readings(&seen), vec![105.0, 115.0]);
    let last = seen.lock().unwrap()[1].clone();
    assert_eq!(last.last_notified, Some(105.0));
    assert_eq!(last.delta(), Some(10.0));
}

#[test]
fn released_before_any_reading_is_never_called() {
    let sensor = Sensor::new(TemperatureScale::Celsius);
    let (seen, callback) = recorder();
    let sub = sensor
        .notify_on(Direction::Drop, "boiling", 100.0, 0.0, callback)
        .unwrap();
    sub.release();
    sub.release();

    for v in [100.0, 90.0, 50.0, -10.0] {
        sensor.set_reading(v).unwrap();
    }
    assert!(readings(&seen).is_empty());
    assert_eq!(sensor.observation_count(Direction::Drop), 0);
}

#[test]
fn release_stops_future_notifications() {
    let sensor = Sensor::new(TemperatureScale::Celsius);
    let (seen, callback) = recorder();
    let sub = sensor
        .notify_on(Direction::Drop, "freezing", 0.0, 0.0, callback)
        .unwrap();

    sensor.set_reading(-1.0).unwrap();
    sub.release();
    sensor.set_reading(-5.0).unwrap();

    assert_eq!(readings(&seen), vec![-1.0]);
}

#[test]
fn readings_that_miss_the_threshold_do_not_notify() {
    let sensor = Sensor::new(TemperatureScale::Celsius);
    let (drops, on_drop) = recorder();
    let (rises, on_rise) = recorder();
    let _d = sensor
        .notify_on(Direction::Drop, "boiling", 100.0, 0.0, on_drop)
        .unwrap();
    let _r = sensor
        .notify_on(Direction::Rise, "boiling", 100.0, 0.0, on_rise)
        .unwrap();

    sensor.set_reading(101.0).unwrap();
    assert!(readings(&drops).is_empty());
    assert_eq!(readings(&rises), vec![101.0]);

    sensor.set_reading(99.0).unwrap();
    assert_eq!(readings(&drops), vec![99.0]);
    assert_eq!(readings(&rises), vec![101.0]);
}

#[test]
fn zero_sensitivity_notifies_every_distinct_qualifying_reading() {
    let sensor = Sensor::new(TemperatureScale::Celsius);
    let (seen, callback) = recorder();
    let _sub = sensor
        .notify_on(Direction::Drop, "freezing", 0.0, 0.0, callback)
        .unwrap();

    for v in [-1.0, -1.0, -1.5, 2.0, -1.5, -1.5, 0.0] {
        sensor.set_reading(v).unwrap();
    }
    assert_eq!(readings(&seen), vec![-1.0, -1.5, 0.0]);
}

#[test]
fn observations_in_the_same_direction_are_independent() {
    let sensor = Sensor::new(TemperatureScale::Celsius);
    let (coarse, on_coarse) = recorder();
    let (fine, on_fine) = recorder();
    let _a = sensor
        .notify_on(Direction::Rise, "coarse", 30.0, 5.0, on_coarse)
        .unwrap();
    let _b = sensor
        .notify_on(Direction::Rise, "fine", 30.0, 1.0, on_fine)
        .unwrap();

    for v in [31.0, 33.0, 36.0] {
        sensor.set_reading(v).unwrap();
    }
    assert_eq!(readings(&coarse), vec![31.0, 36.0]);
    assert_eq!(readings(&fine), vec![31.0, 33.0, 36.0]);
}

#[test]
fn get_reading_converts_between_scales() {
    let sensor = Sensor::new(TemperatureScale::Celsius);
    assert_eq!(sensor.reading(TemperatureScale::Celsius).unwrap(), None);

    sensor.set_reading(37.0).unwrap();
    assert_eq!(sensor.reading(TemperatureScale::Celsius).unwrap(), Some(37.0));
    let f = sensor.reading(TemperatureScale::Fahrenheit).unwrap().unwrap();
    assert!((f - 98.6).abs() < 1e-9);

    let sensor = Sensor::new(TemperatureScale::Fahrenheit);
    sensor.set_reading(50.0).unwrap();
    assert_eq!(sensor.reading(TemperatureScale::Fahrenheit).unwrap(), Some(50.0));
    let c = sensor.reading(TemperatureScale::Celsius).unwrap().unwrap();
    assert!((c - 10.0).abs() < 1e-9);
}

#[test]
fn unsupported_scale_and_direction_are_rejected() {
    let sensor = Sensor::new(TemperatureScale::Celsius);
    sensor.set_reading(20.0).unwrap();

    let lookup = |scale: &str| -> Result<Option<f64>, ThermoError> {
        let scale: TemperatureScale = scale.parse()?;
        sensor.reading(scale)
    };
    assert_eq!(lookup("fahrenheit").unwrap(), Some(68.0));
    assert_eq!(
        lookup("kelvin").unwrap_err(),
        ThermoError::Validation(ValidationError::InvalidScale {
            value: "kelvin".to_string()
        })
    );

    let err = "sideways".parse::<Direction>().unwrap_err();
    assert!(matches!(err, ValidationError::InvalidDirection { .. }));
}

#[test]
fn invalid_thresholds_are_rejected_at_registration() {
    let sensor = Sensor::new(TemperatureScale::Celsius);

    let err = sensor
        .notify_on(Direction::Rise, "hot", 30.0, -1.0, |_| {})
        .unwrap_err();
    assert!(err.is_validation());

    let err = sensor
        .notify_on(Direction::Rise, "", 30.0, 0.0, |_| {})
        .unwrap_err();
    assert_eq!(err, ThermoError::Validation(ValidationError::EmptyThresholdName));

    assert_eq!(sensor.observation_count(Direction::Rise), 0);
}

#[test]
fn threshold_declared_in_fahrenheit_on_a_celsius_sensor() {
    let sensor = Sensor::new(TemperatureScale::Celsius);
    let spec: ThresholdSpec = serde_json::from_str(
        r#"{"direction":"drop","name":"freezing","threshold":32.0,"sensitivity":1.8,"scale":"fahrenheit"}"#,
    )
    .unwrap();
    let (seen, callback) = recorder();
    let _sub = sensor.register(spec, thermowatch::FnObserver(callback)).unwrap();

    sensor.set_reading(0.5).unwrap(); // 32.9 F, not reached
    sensor.set_reading(0.0).unwrap(); // 32 F, fires
    sensor.set_reading(-0.5).unwrap(); // 31.1 F, within 1.8 F band
    sensor.set_reading(-2.0).unwrap(); // 28.4 F, fires

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert!(seen.iter().all(|s| s.scale == TemperatureScale::Fahrenheit));
    assert!((seen[0].current_reading - 32.0).abs() < 1e-9);
    assert!((seen[1].current_reading - 28.4).abs() < 1e-9);
    assert!((seen[1].last_notified.unwrap() - 32.0).abs() < 1e-9);
}

#[test]
fn observer_may_release_itself_during_dispatch() {
    let sensor = Arc::new(Sensor::new(TemperatureScale::Celsius));
    let slot: Arc<Mutex<Option<thermowatch::Subscription>>> = Arc::new(Mutex::new(None));
    let calls = Arc::new(Mutex::new(0u32));

    let handle = Arc::clone(&slot);
    let counter = Arc::clone(&calls);
    let sub = sensor
        .notify_on(Direction::Rise, "once", 10.0, 0.0, move |_| {
            *counter.lock().unwrap() += 1;
            if let Some(sub) = handle.lock().unwrap().as_ref() {
                sub.release();
            }
        })
        .unwrap();
    *slot.lock().unwrap() = Some(sub);

    sensor.set_reading(11.0).unwrap();
    sensor.set_reading(12.0).unwrap();

    assert_eq!(*calls.lock().unwrap(), 1);
    assert_eq!(sensor.observation_count(Direction::Rise), 0);
}

#[test]
fn sensor_built_from_json_config() {
    let cfg = thermowatch::SensorConfig::from_json(r#"{"label":"kiln","scale":"fahrenheit","stream_capacity":4}"#)
        .unwrap();
    let sensor = Sensor::with_config(cfg);
    assert_eq!(sensor.label(), "kiln");
    assert_eq!(sensor.scale(), TemperatureScale::Fahrenheit);

    sensor.set_reading(212.0).unwrap();
    let latest = sensor.latest().unwrap().unwrap();
    assert_eq!(latest.value, 212.0);
    assert_eq!(latest.scale, TemperatureScale::Fahrenheit);
}

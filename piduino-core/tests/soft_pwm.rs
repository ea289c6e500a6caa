//! PWM dispatch: soft-PWM workers, hardware call sequences, tone, pulse_in

mod common;

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use piduino_core::{Board, Error, Level, PinMode, PWM_RESOLUTION};

use common::{high_ratio, FakeGpio, FakePwm, PwmCall};

fn fake_board() -> (Board, Arc<FakeGpio>, Arc<FakePwm>) {
    let gpio = Arc::new(FakeGpio::new());
    let pwm = Arc::new(FakePwm::new());
    let board = Board::with_backends(gpio.clone(), gpio.clone(), pwm.clone());
    (board, gpio, pwm)
}

#[test]
fn test_degenerate_duties_are_static() {
    let (board, gpio, _) = fake_board();
    board.pin_mode(5, PinMode::Output).unwrap();

    board.analog_write(5, 0).unwrap();
    assert_eq!(gpio.level(5), Level::Low);
    let count = gpio.write_count(5);
    thread::sleep(Duration::from_millis(60));
    // No worker behind a static level
    assert_eq!(gpio.write_count(5), count);

    board.analog_write(5, PWM_RESOLUTION - 1).unwrap();
    assert_eq!(gpio.level(5), Level::High);
    let count = gpio.write_count(5);
    thread::sleep(Duration::from_millis(60));
    assert_eq!(gpio.write_count(5), count);
}

#[test]
fn test_soft_pwm_ratio_tracks_duty() {
    let (board, gpio, _) = fake_board();
    board.pin_mode(6, PinMode::Output).unwrap();

    board.set_pwm_frequency(6, 100.0).unwrap();
    board.analog_write(6, 128).unwrap();
    thread::sleep(Duration::from_millis(500));
    board.analog_write(6, 0).unwrap();

    let writes = gpio.writes(6);
    assert!(writes.len() > 20, "only {} transitions recorded", writes.len());
    let ratio = high_ratio(&writes);
    // 128/255 with generous scheduler tolerance
    assert!(
        (0.35..=0.65).contains(&ratio),
        "high ratio {ratio} is not near 0.5"
    );
}

#[test]
fn test_reprogram_leaves_no_orphan_worker() {
    let (board, gpio, _) = fake_board();
    board.pin_mode(7, PinMode::Output).unwrap();

    board.analog_write(7, 64).unwrap();
    thread::sleep(Duration::from_millis(50));
    board.analog_write(7, 192).unwrap();
    thread::sleep(Duration::from_millis(50));

    board.analog_write(7, 0).unwrap();
    let count = gpio.write_count(7);
    thread::sleep(Duration::from_millis(100));
    // Every worker from the earlier configurations is gone
    assert_eq!(gpio.write_count(7), count);
    assert_eq!(gpio.level(7), Level::Low);
}

#[test]
fn test_pin_mode_stops_pwm() {
    let (board, gpio, _) = fake_board();
    board.pin_mode(8, PinMode::Output).unwrap();
    board.analog_write(8, 100).unwrap();
    thread::sleep(Duration::from_millis(50));

    board.pin_mode(8, PinMode::Input).unwrap();
    let count = gpio.write_count(8);
    thread::sleep(Duration::from_millis(100));
    assert_eq!(gpio.write_count(8), count);
}

#[test]
fn test_duty_out_of_range_rejected() {
    let (board, _, _) = fake_board();
    board.pin_mode(5, PinMode::Output).unwrap();

    let err = board.analog_write(5, PWM_RESOLUTION).unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidDutyCycle { pin: 5, duty } if duty == PWM_RESOLUTION
    ));
}

#[test]
fn test_analog_write_requires_output_mode() {
    let (board, _, _) = fake_board();
    board.pin_mode(5, PinMode::Input).unwrap();

    let err = board.analog_write(5, 10).unwrap_err();
    assert!(matches!(err, Error::NotPwmConfigured(5)));
}

#[test]
fn test_hardware_pwm_call_sequence() {
    let (board, _, pwm) = fake_board();

    board.pin_mode(18, PinMode::MmioPwm).unwrap();
    // A duty change alone must not rewrite the clock divisor
    board.analog_write(18, 100).unwrap();
    board.set_pwm_frequency(18, 1000.0).unwrap();

    let calls = pwm.calls();
    assert_eq!(calls[0], PwmCall::Configure(18));
    assert!(matches!(calls[1], PwmCall::SetFrequency(18, hz, 0) if hz == 490.0));
    assert_eq!(calls[2], PwmCall::SetDuty(18, 100));
    assert!(matches!(calls[3], PwmCall::SetFrequency(18, hz, 100) if hz == 1000.0));
    assert_eq!(calls.len(), 4);
}

#[test]
fn test_rejected_frequency_is_not_recorded() {
    let (board, _, pwm) = fake_board();
    board.pin_mode(18, PinMode::MmioPwm).unwrap();
    pwm.reject_below(100.0);

    let err = board.set_pwm_frequency(18, 10.0).unwrap_err();
    assert!(matches!(err, Error::UnsupportedFrequency { .. }));

    // The rejected frequency must not have become current: asking for it
    // again has to hit the backend again and fail again, not short-circuit
    // into a duty-only update.
    let err = board.set_pwm_frequency_duty(18, 10.0, 100).unwrap_err();
    assert!(matches!(err, Error::UnsupportedFrequency { .. }));

    // The record still carries the last accepted frequency, so a plain
    // duty change stays on the data-register path.
    board.analog_write(18, 200).unwrap();
    assert_eq!(*pwm.calls().last().unwrap(), PwmCall::SetDuty(18, 200));
}

#[test]
fn test_degenerate_frequencies_rejected() {
    let (board, gpio, _) = fake_board();
    board.pin_mode(5, PinMode::Output).unwrap();
    board.analog_write(5, 0).unwrap();
    let count = gpio.write_count(5);

    // A zero period would leave a worker toggling with no sleep at all
    let err = board.set_pwm_period_us(5, 0.0).unwrap_err();
    assert!(matches!(err, Error::UnsupportedFrequency { .. }));
    let err = board.set_pwm_frequency_duty(5, -50.0, 128).unwrap_err();
    assert!(matches!(err, Error::UnsupportedFrequency { .. }));

    thread::sleep(Duration::from_millis(50));
    assert_eq!(gpio.write_count(5), count);
}

#[test]
fn test_tone_blocking_ends_low() {
    let (board, gpio, _) = fake_board();
    board.pin_mode(9, PinMode::Output).unwrap();

    let started = Instant::now();
    board.tone(9, 1000.0, 30, true).unwrap();
    assert!(started.elapsed() >= Duration::from_millis(30));
    assert_eq!(gpio.level(9), Level::Low);

    let count = gpio.write_count(9);
    thread::sleep(Duration::from_millis(60));
    assert_eq!(gpio.write_count(9), count);
}

#[test]
fn test_tone_one_shot_stops_itself() {
    let (board, gpio, _) = fake_board();
    board.pin_mode(9, PinMode::Output).unwrap();

    board.tone(9, 500.0, 40, false).unwrap();
    thread::sleep(Duration::from_millis(200));

    assert_eq!(gpio.level(9), Level::Low);
    let count = gpio.write_count(9);
    thread::sleep(Duration::from_millis(100));
    assert_eq!(gpio.write_count(9), count);
}

#[test]
fn test_no_tone_stops_endless_tone() {
    let (board, gpio, _) = fake_board();
    board.pin_mode(9, PinMode::Output).unwrap();

    board.tone(9, 500.0, 0, false).unwrap();
    thread::sleep(Duration::from_millis(50));
    board.no_tone(9).unwrap();

    assert_eq!(gpio.level(9), Level::Low);
    let count = gpio.write_count(9);
    thread::sleep(Duration::from_millis(100));
    assert_eq!(gpio.write_count(9), count);
}

#[test]
fn test_pulse_in_times_a_synthetic_pulse() {
    let (board, gpio, _) = fake_board();
    board.pin_mode(10, PinMode::Input).unwrap();

    let origin = Instant::now();
    gpio.set_read_fn(10, move || {
        let t = origin.elapsed();
        let high = t >= Duration::from_millis(10) && t < Duration::from_millis(30);
        Level::from(high)
    });

    let width = board.pulse_in(10, Level::High, 500_000).unwrap();
    assert!(
        (5_000..=100_000).contains(&width),
        "measured {width} us for a 20 ms pulse"
    );
}

#[test]
fn test_pulse_in_timeout_returns_zero() {
    let (board, _, _) = fake_board();
    board.pin_mode(10, PinMode::Input).unwrap();

    let started = Instant::now();
    assert_eq!(board.pulse_in(10, Level::High, 20_000).unwrap(), 0);
    assert!(started.elapsed() < Duration::from_secs(2));
}

use std::sync::Arc;

use gdo_core::mocks::{LevelPin, ManualClock};
use gdo_core::{ObstructionCfg, ObstructionClassifier};

const WINDOW_MS: u64 = 51;

fn classifier(pin: LevelPin, clock: &ManualClock) -> ObstructionClassifier<LevelPin> {
    ObstructionClassifier::new(pin, ObstructionCfg::default(), Arc::new(clock.clone()))
}

#[test]
fn four_pulses_in_one_window_is_clear() {
    let clock = ManualClock::new();
    let mut cls = classifier(LevelPin::new(true), &clock);
    let isr = cls.isr_handle();

    for _ in 0..4 {
        isr.increment();
    }
    clock.advance_ms(WINDOW_MS);
    assert_eq!(cls.poll(), Some(false));
    assert_eq!(cls.state(), Some(false));
}

#[test]
fn three_pulses_is_inconclusive() {
    let clock = ManualClock::new();
    let mut cls = classifier(LevelPin::new(true), &clock);
    let isr = cls.isr_handle();

    for _ in 0..3 {
        isr.increment();
    }
    clock.advance_ms(WINDOW_MS);
    assert_eq!(cls.poll(), None);
    assert_eq!(cls.state(), None);
}

#[test]
fn steady_high_after_sleep_obstructs_once_after_grace() {
    let clock = ManualClock::new();
    let pin = LevelPin::new(false);
    let mut cls = classifier(pin.clone(), &clock);

    // A few asleep windows: line low, no pulses.
    let mut now = 0;
    for _ in 0..4 {
        clock.advance_ms(WINDOW_MS);
        now += WINDOW_MS;
        assert_eq!(cls.poll(), None);
    }
    let last_asleep = now;

    // Line goes high with no pulses: the wake-up plateau. Nothing may be
    // classified until the line has been high for more than 700 ms.
    pin.set_high(true);
    let mut changes = Vec::new();
    while now - last_asleep < 1_000 {
        clock.advance_ms(WINDOW_MS);
        now += WINDOW_MS;
        if let Some(state) = cls.poll() {
            changes.push((now, state));
        }
    }

    assert_eq!(changes.len(), 1, "state must change exactly once");
    let (at, state) = changes[0];
    assert!(state, "steady high past the grace period means obstructed");
    assert!(
        at - last_asleep > 700,
        "obstruction fired {} ms after sleep, before the grace elapsed",
        at - last_asleep
    );
}

#[test]
fn high_for_only_650_ms_never_obstructs() {
    let clock = ManualClock::new();
    let pin = LevelPin::new(false);
    let mut cls = classifier(pin.clone(), &clock);

    clock.advance_ms(WINDOW_MS);
    assert_eq!(cls.poll(), None); // asleep sample

    pin.set_high(true);
    let mut elapsed = 0;
    while elapsed < 650 {
        clock.advance_ms(WINDOW_MS);
        elapsed += WINDOW_MS;
        assert_eq!(cls.poll(), None);
    }
    assert_eq!(cls.state(), None);
}

#[test]
fn first_window_after_boot_does_not_obstruct() {
    let clock = ManualClock::new();
    let mut cls = classifier(LevelPin::new(true), &clock);

    // Line high from boot with no pulses: the grace check must not be
    // satisfied retroactively in the first windows.
    clock.advance_ms(WINDOW_MS);
    assert_eq!(cls.poll(), None);
    clock.advance_ms(WINDOW_MS);
    assert_eq!(cls.poll(), None);
}

#[test]
fn obstruction_clears_when_pulses_resume() {
    let clock = ManualClock::new();
    let pin = LevelPin::new(false);
    let mut cls = classifier(pin.clone(), &clock);
    let isr = cls.isr_handle();

    clock.advance_ms(WINDOW_MS);
    assert_eq!(cls.poll(), None); // asleep sample

    pin.set_high(true);
    clock.advance_ms(750);
    assert_eq!(cls.poll(), Some(true));

    // Sensor starts pulsing again: awake and clear.
    for _ in 0..8 {
        isr.increment();
    }
    clock.advance_ms(WINDOW_MS);
    assert_eq!(cls.poll(), Some(false));
}

use gdo_core::mocks::{ManualClock, SpyTrigger};
use gdo_core::{CoverCall, CoverController, CoverOperation};
use proptest::prelude::*;

fn controller(position: f32, duration_ms: u64, clock: &ManualClock) -> CoverController {
    CoverController::builder()
        .with_triggers(SpyTrigger::new(), SpyTrigger::new())
        .with_durations_ms(duration_ms, duration_ms)
        .with_restored_position(position)
        .with_clock(clock.clone())
        .build()
        .expect("build controller")
}

/// One externally visible action on the controller or its clock.
#[derive(Debug, Clone)]
enum Step {
    Control(f32),
    Stop,
    Advance(u64),
    Tick,
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        (0.0f32..=1.0).prop_map(Step::Control),
        Just(Step::Stop),
        (0u64..5_000).prop_map(Step::Advance),
        Just(Step::Tick),
    ]
}

proptest! {
    // Opening for t ms from p0 lands on clamp(p0 + t/d, 0, 1).
    #[test]
    fn opening_recompute_is_linear_and_clamped(
        p0 in 0.0f32..1.0f32,
        t in 0u64..30_000,
        d in 1_000u64..60_000,
    ) {
        let clock = ManualClock::new();
        let mut cover = controller(p0, d, &clock);

        cover.control(CoverCall::to_position(1.0));
        prop_assert_eq!(cover.operation(), CoverOperation::Opening);

        clock.advance_ms(t);
        cover.tick();

        let expected = (p0 + t as f32 / d as f32).clamp(0.0, 1.0);
        prop_assert!((cover.position() - expected).abs() < 1e-5);
        prop_assert!((0.0..=1.0).contains(&cover.position()));
    }

    // Closing is symmetric, with subtraction.
    #[test]
    fn closing_recompute_is_linear_and_clamped(
        p0 in 0.01f32..=1.0f32,
        t in 0u64..30_000,
        d in 1_000u64..60_000,
    ) {
        let clock = ManualClock::new();
        let mut cover = controller(p0, d, &clock);

        cover.control(CoverCall::to_position(0.0));
        prop_assert_eq!(cover.operation(), CoverOperation::Closing);

        clock.advance_ms(t);
        cover.tick();

        let expected = (p0 - t as f32 / d as f32).clamp(0.0, 1.0);
        prop_assert!((cover.position() - expected).abs() < 1e-5);
        prop_assert!((0.0..=1.0).contains(&cover.position()));
    }

    // Issuing control(position = current) never changes operation or fires
    // a press, regardless of where the cover sits.
    #[test]
    fn control_at_current_position_never_fires(p0 in 0.0f32..=1.0f32) {
        let clock = ManualClock::new();
        let single = SpyTrigger::new();
        let double = SpyTrigger::new();
        let mut cover = CoverController::builder()
            .with_triggers(single.clone(), double.clone())
            .with_durations_ms(10_000, 10_000)
            .with_restored_position(p0)
            .with_clock(clock.clone())
            .build()
            .expect("build controller");

        cover.control(CoverCall::to_position(p0));

        prop_assert_eq!(cover.operation(), CoverOperation::Idle);
        prop_assert_eq!(cover.position(), p0);
        prop_assert_eq!(single.fired() + double.fired(), 0);
    }

    // The position estimate never leaves [0, 1], no matter how commands,
    // ticks, and elapsed time interleave.
    #[test]
    fn position_stays_in_range_under_arbitrary_interleavings(
        p0 in 0.0f32..=1.0f32,
        steps in proptest::collection::vec(step(), 1..50),
    ) {
        let clock = ManualClock::new();
        let mut cover = controller(p0, 7_000, &clock);

        for step in steps {
            match step {
                Step::Control(target) => cover.control(CoverCall::to_position(target)),
                Step::Stop => cover.control(CoverCall::stop()),
                Step::Advance(ms) => clock.advance_ms(ms),
                Step::Tick => cover.tick(),
            }
            prop_assert!(
                (0.0..=1.0).contains(&cover.position()),
                "position {} escaped the unit range",
                cover.position()
            );
        }
    }
}

//! Property-based tests for tick-unit durations.

use veil_core::{
    AdvInterval, ConnInterval, Duration, Microseconds, Milliseconds, ScanDuration, ScanInterval,
};

type ByteMillis = Duration<u8, 1_000>;

proptest::proptest! {
    /// new() clamps every raw value into the valid tick range.
    #[test]
    fn new_clamps_into_range(ticks in 0u16..=u16::MAX) {
        let d = ConnInterval::new(ticks);
        assert_eq!(d.value(), ticks.clamp(0x06, 0x0C80));
    }

    /// try_new() accepts exactly the values new() leaves unchanged.
    #[test]
    fn try_new_agrees_with_new(ticks in 0u16..=u16::MAX) {
        let in_range = ConnInterval::new(ticks).value() == ticks;
        assert_eq!(ConnInterval::try_new(ticks).is_ok(), in_range);
    }

    /// Casting to a coarser unit and back never reports less time.
    #[test]
    fn coarse_round_trip_never_loses_time(us in 0u32..=4_000_000_000u32) {
        let fine = Microseconds::new(us);
        let coarse: Milliseconds = fine.cast();
        let back: Microseconds = coarse.cast();
        assert!(back >= fine, "{:?} -> {:?} -> {:?}", fine, coarse, back);
    }

    /// Same property across BLE tick bases (625 us -> 10 ms -> 625 us).
    #[test]
    fn ble_round_trip_never_loses_time(ticks in 0x20u32..=0xFFFF * 16) {
        let adv = AdvInterval::new(ticks);
        let coarse: ScanDuration = adv.cast();
        let back: AdvInterval = coarse.cast();
        assert!(back >= adv);
        assert!(coarse >= adv);
    }

    /// cast() preserves ordering.
    #[test]
    fn cast_is_monotonic(a in 0u32..=1_000_000u32, b in 0u32..=1_000_000u32) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let lo: Milliseconds = Microseconds::new(lo).cast();
        let hi: Milliseconds = Microseconds::new(hi).cast();
        assert!(lo <= hi);
    }

    /// Cross-base comparison agrees with comparing microseconds.
    #[test]
    fn cross_base_comparison_uses_micros(a in 0x06u16..=0x0C80, b in 0x04u16..=u16::MAX) {
        let conn = ConnInterval::new(a);
        let scan = ScanInterval::new(b);
        assert_eq!(conn < scan, conn.as_micros() < scan.as_micros());
        assert_eq!(conn == scan, conn.as_micros() == scan.as_micros());
    }

    /// Unbounded durations keep every raw value.
    #[test]
    fn unbounded_keeps_value(ticks in 0u8..=u8::MAX) {
        assert_eq!(ByteMillis::new(ticks).value(), ticks);
    }
}

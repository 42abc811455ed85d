//! Tick-unit checked durations
//!
//! BLE timing parameters are counted in controller ticks of different sizes:
//! 625 µs for advertising and scanning, 1.25 ms for connection intervals,
//! 10 ms for timeouts, 1 s for the RPA rotation period. A [`Duration`]
//! carries its tick size and valid range in the type, so an advertising
//! interval can't be passed where a connection interval is expected and
//! every unit conversion is explicit.
//!
//! Construction with [`Duration::new`] clamps into the valid range;
//! [`Duration::try_new`] rejects out-of-range values instead.

use core::cmp::Ordering;
use core::fmt;
use core::hash::{Hash, Hasher};
use core::marker::PhantomData;
use core::ops::{Add, Sub};

/// Integer storage for a tick count
pub trait Rep: Copy + Ord + fmt::Debug {
    /// Largest tick count the storage can hold
    const REP_MAX: u32;

    fn to_u32(self) -> u32;

    /// Convert, saturating at [`Rep::REP_MAX`]
    fn from_u32_saturating(value: u32) -> Self;
}

macro_rules! impl_rep {
    ($($t:ty),*) => {
        $(
            impl Rep for $t {
                const REP_MAX: u32 = <$t>::MAX as u32;

                fn to_u32(self) -> u32 {
                    self as u32
                }

                fn from_u32_saturating(value: u32) -> Self {
                    if value > Self::REP_MAX {
                        <$t>::MAX
                    } else {
                        value as $t
                    }
                }
            }
        )*
    };
}

impl_rep!(u8, u16, u32);

/// Valid tick range of a duration type
pub trait Range {
    const MIN: u32;
    const MAX: u32;
}

/// Any value the storage can hold
pub struct Unbounded;

impl Range for Unbounded {
    const MIN: u32 = 0;
    const MAX: u32 = u32::MAX;
}

/// Inclusive tick range `LO..=HI`
pub struct Bounded<const LO: u32, const HI: u32>;

impl<const LO: u32, const HI: u32> Range for Bounded<LO, HI> {
    const MIN: u32 = LO;
    const MAX: u32 = HI;
}

/// Optional "never ends" sentinel of a duration type
pub trait ForeverValue {
    const VALUE: Option<u32>;
}

/// The duration type has no forever sentinel
pub struct NoForever;

impl ForeverValue for NoForever {
    const VALUE: Option<u32> = None;
}

/// Tick value `V` means "forever", even when outside the range
pub struct Forever<const V: u32>;

impl<const V: u32> ForeverValue for Forever<V> {
    const VALUE: Option<u32> = Some(V);
}

/// Rejected by [`Duration::try_new`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OutOfRange {
    /// Requested tick count
    pub ticks: u32,
    /// Smallest valid tick count
    pub min: u32,
    /// Largest valid tick count
    pub max: u32,
}

impl fmt::Display for OutOfRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ticks outside valid range {}..={}",
            self.ticks, self.min, self.max
        )
    }
}

impl core::error::Error for OutOfRange {}

/// Time quantity of `R` ticks, each `TB` microseconds long
///
/// `G` bounds the tick count, `F` optionally names a forever sentinel.
pub struct Duration<R, const TB: u32, G = Unbounded, F = NoForever> {
    ticks: R,
    _range: PhantomData<fn() -> (G, F)>,
}

struct AssertMultiple<const SOURCE: u32, const TARGET: u32>;

impl<const SOURCE: u32, const TARGET: u32> AssertMultiple<SOURCE, TARGET> {
    const OK: () = assert!(
        TARGET != 0 && SOURCE % TARGET == 0,
        "source time base must be an integer multiple of the target time base"
    );
}

fn saturate(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

impl<R: Rep, const TB: u32, G: Range, F: ForeverValue> Duration<R, TB, G, F> {
    /// Microseconds per tick
    pub const TIME_BASE_US: u32 = TB;

    fn upper() -> u32 {
        if G::MAX < R::REP_MAX {
            G::MAX
        } else {
            R::REP_MAX
        }
    }

    fn clamp_ticks(ticks: u32) -> u32 {
        if F::VALUE == Some(ticks) {
            return ticks;
        }
        Self::clamp_range(ticks)
    }

    fn clamp_range(ticks: u32) -> u32 {
        ticks.max(G::MIN).min(Self::upper())
    }

    fn from_u32(ticks: u32) -> Self {
        Self {
            ticks: R::from_u32_saturating(Self::clamp_ticks(ticks)),
            _range: PhantomData,
        }
    }

    /// Computed tick counts are times, never the sentinel
    fn from_elapsed(ticks: u32) -> Self {
        Self {
            ticks: R::from_u32_saturating(Self::clamp_range(ticks)),
            _range: PhantomData,
        }
    }

    /// Create from a tick count, clamped into the valid range
    ///
    /// The forever sentinel, if the type has one, is kept as is.
    pub fn new(ticks: R) -> Self {
        Self::from_u32(ticks.to_u32())
    }

    /// Create from a tick count, rejecting values outside the valid range
    pub fn try_new(ticks: R) -> Result<Self, OutOfRange> {
        let raw = ticks.to_u32();
        if F::VALUE == Some(raw) || (G::MIN..=Self::upper()).contains(&raw) {
            Ok(Self {
                ticks,
                _range: PhantomData,
            })
        } else {
            Err(OutOfRange {
                ticks: raw,
                min: G::MIN,
                max: Self::upper(),
            })
        }
    }

    /// Shortest valid duration
    pub fn min() -> Self {
        Self::from_u32(G::MIN)
    }

    /// Longest valid duration
    pub fn max() -> Self {
        Self::from_u32(Self::upper())
    }

    /// Raw tick count
    pub fn value(&self) -> R {
        self.ticks
    }

    /// Duration in microseconds
    pub fn as_micros(&self) -> u64 {
        u64::from(self.ticks.to_u32()) * u64::from(TB)
    }

    /// Convert from a duration with a coarser (or equal) tick
    ///
    /// The source tick must be an integer multiple of this tick; other
    /// combinations fail to compile. The result is clamped; forever maps to
    /// forever when both types have a sentinel.
    pub fn from_duration<R2: Rep, const TB2: u32, G2: Range, F2: ForeverValue>(
        other: Duration<R2, TB2, G2, F2>,
    ) -> Self {
        #[allow(clippy::let_unit_value)]
        let () = AssertMultiple::<TB2, TB>::OK;
        if other.is_forever_value() {
            if let Some(forever) = <Self as DurationType>::forever_value() {
                return forever;
            }
        }
        let ticks = u64::from(other.ticks.to_u32()) * u64::from(TB2 / TB);
        Self::from_elapsed(saturate(ticks))
    }

    /// Convert to another duration type, rounding up
    ///
    /// Converting to a coarser unit never under-represents the elapsed time.
    pub fn cast<Out: DurationType>(self) -> Out {
        duration_cast(self)
    }
}

impl<R: Rep, const TB: u32, G: Range, const V: u32> Duration<R, TB, G, Forever<V>> {
    /// The "never ends" sentinel
    pub fn forever() -> Self {
        Self {
            ticks: R::from_u32_saturating(V),
            _range: PhantomData,
        }
    }

    /// Check for the "never ends" sentinel
    pub fn is_forever(&self) -> bool {
        self.ticks.to_u32() == V
    }
}

/// Common view over all [`Duration`] instantiations, used by [`duration_cast`]
pub trait DurationType: Copy {
    /// Microseconds per tick
    const TIME_BASE_US: u32;

    /// Duration in microseconds
    fn micros(&self) -> u64;

    /// Whether this value is the type's forever sentinel
    fn is_forever_value(&self) -> bool;

    /// The type's forever sentinel, if it has one
    fn forever_value() -> Option<Self>;

    /// Create from microseconds, rounding up and clamping
    fn from_micros_ceil(micros: u64) -> Self;
}

impl<R: Rep, const TB: u32, G: Range, F: ForeverValue> DurationType for Duration<R, TB, G, F> {
    const TIME_BASE_US: u32 = TB;

    fn micros(&self) -> u64 {
        self.as_micros()
    }

    fn is_forever_value(&self) -> bool {
        F::VALUE == Some(self.ticks.to_u32())
    }

    fn forever_value() -> Option<Self> {
        F::VALUE.map(|v| Self {
            ticks: R::from_u32_saturating(v),
            _range: PhantomData,
        })
    }

    fn from_micros_ceil(micros: u64) -> Self {
        Self::from_elapsed(saturate(micros.div_ceil(u64::from(TB))))
    }
}

/// Convert between duration types with ceiling division
///
/// Forever maps to forever when both types have a sentinel.
pub fn duration_cast<Out: DurationType, In: DurationType>(input: In) -> Out {
    if input.is_forever_value() {
        if let Some(forever) = Out::forever_value() {
            return forever;
        }
    }
    Out::from_micros_ceil(input.micros())
}

impl<R: Rep, const TB: u32, G: Range, F: ForeverValue> Default for Duration<R, TB, G, F> {
    fn default() -> Self {
        Self::min()
    }
}

impl<R: Copy, const TB: u32, G, F> Clone for Duration<R, TB, G, F> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R: Copy, const TB: u32, G, F> Copy for Duration<R, TB, G, F> {}

impl<R, const TB: u32, G, F, R2, const TB2: u32, G2, F2> PartialEq<Duration<R2, TB2, G2, F2>>
    for Duration<R, TB, G, F>
where
    R: Rep,
    G: Range,
    F: ForeverValue,
    R2: Rep,
    G2: Range,
    F2: ForeverValue,
{
    fn eq(&self, other: &Duration<R2, TB2, G2, F2>) -> bool {
        if TB == TB2 {
            self.ticks.to_u32() == other.ticks.to_u32()
        } else {
            self.as_micros() == other.as_micros()
        }
    }
}

impl<R: Rep, const TB: u32, G: Range, F: ForeverValue> Eq for Duration<R, TB, G, F> {}

impl<R, const TB: u32, G, F, R2, const TB2: u32, G2, F2> PartialOrd<Duration<R2, TB2, G2, F2>>
    for Duration<R, TB, G, F>
where
    R: Rep,
    G: Range,
    F: ForeverValue,
    R2: Rep,
    G2: Range,
    F2: ForeverValue,
{
    fn partial_cmp(&self, other: &Duration<R2, TB2, G2, F2>) -> Option<Ordering> {
        if TB == TB2 {
            Some(self.ticks.to_u32().cmp(&other.ticks.to_u32()))
        } else {
            Some(self.as_micros().cmp(&other.as_micros()))
        }
    }
}

impl<R: Rep, const TB: u32, G: Range, F: ForeverValue> Ord for Duration<R, TB, G, F> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.ticks.cmp(&other.ticks)
    }
}

impl<R: Rep + Hash, const TB: u32, G, F> Hash for Duration<R, TB, G, F> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ticks.hash(state);
    }
}

// Arithmetic happens in the left-hand unit. The right-hand side is rounded
// up into that unit; the result saturates and is clamped. The forever
// sentinel has no arithmetic meaning.
impl<R, const TB: u32, G, F, R2, const TB2: u32, G2, F2> Add<Duration<R2, TB2, G2, F2>>
    for Duration<R, TB, G, F>
where
    R: Rep,
    G: Range,
    F: ForeverValue,
    R2: Rep,
    G2: Range,
    F2: ForeverValue,
{
    type Output = Self;

    fn add(self, rhs: Duration<R2, TB2, G2, F2>) -> Self {
        let rhs_ticks = rhs.as_micros().div_ceil(u64::from(TB));
        Self::from_elapsed(saturate(
            u64::from(self.ticks.to_u32()).saturating_add(rhs_ticks),
        ))
    }
}

impl<R, const TB: u32, G, F, R2, const TB2: u32, G2, F2> Sub<Duration<R2, TB2, G2, F2>>
    for Duration<R, TB, G, F>
where
    R: Rep,
    G: Range,
    F: ForeverValue,
    R2: Rep,
    G2: Range,
    F2: ForeverValue,
{
    type Output = Self;

    fn sub(self, rhs: Duration<R2, TB2, G2, F2>) -> Self {
        let rhs_ticks = rhs.as_micros().div_ceil(u64::from(TB));
        Self::from_elapsed(saturate(
            u64::from(self.ticks.to_u32()).saturating_sub(rhs_ticks),
        ))
    }
}

impl<R: Rep, const TB: u32, G, F> fmt::Debug for Duration<R, TB, G, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Duration({} x {}us)", self.ticks.to_u32(), TB)
    }
}

#[cfg(feature = "defmt")]
impl<R: Rep, const TB: u32, G, F> defmt::Format for Duration<R, TB, G, F> {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "Duration({=u32} x {=u32}us)", self.ticks.to_u32(), TB)
    }
}

#[cfg(feature = "serde")]
impl<R: Rep + serde::Serialize, const TB: u32, G, F> serde::Serialize for Duration<R, TB, G, F> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.ticks.serialize(serializer)
    }
}

#[cfg(feature = "serde")]
impl<'de, R, const TB: u32, G, F> serde::Deserialize<'de> for Duration<R, TB, G, F>
where
    R: Rep + serde::Deserialize<'de>,
    G: Range,
    F: ForeverValue,
{
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        R::deserialize(deserializer).map(Self::new)
    }
}

/// Plain microseconds
pub type Microseconds = Duration<u32, 1>;

/// Plain milliseconds
pub type Milliseconds = Duration<u32, 1_000>;

/// Plain seconds
pub type Seconds = Duration<u32, 1_000_000>;

/// Advertising interval: 625 µs ticks, 20 ms to 10485.759375 s
pub type AdvInterval = Duration<u32, 625, Bounded<0x20, 0xFF_FFFF>>;

/// Scan interval: 625 µs ticks, 2.5 ms to 40.959375 s
pub type ScanInterval = Duration<u16, 625, Bounded<0x04, 0xFFFF>>;

/// Scan window: 625 µs ticks, 2.5 ms to 40.959375 s
pub type ScanWindow = Duration<u16, 625, Bounded<0x04, 0xFFFF>>;

/// Connection interval: 1.25 ms ticks, 7.5 ms to 4 s
pub type ConnInterval = Duration<u16, 1_250, Bounded<0x06, 0x0C80>>;

/// Supervision timeout: 10 ms ticks, 100 ms to 32 s
pub type SupervisionTimeout = Duration<u16, 10_000, Bounded<0x0A, 0x0C80>>;

/// Advertising duration: 10 ms ticks, 0 means "until disabled"
pub type AdvDuration = Duration<u16, 10_000, Bounded<0x01, 0xFFFF>, Forever<0>>;

/// Scan duration: 10 ms ticks, 0 means "until disabled"
pub type ScanDuration = Duration<u16, 10_000, Bounded<0x01, 0xFFFF>, Forever<0>>;

/// Scan period: 1.28 s ticks, 0 means "scan continuously"
pub type ScanPeriod = Duration<u16, 1_280_000, Bounded<0x01, 0xFFFF>, Forever<0>>;

/// RPA rotation period used by LL privacy: 1 s ticks, 1 s to 11.5 h
pub type ResolvableAddressTimeout = Duration<u16, 1_000_000, Bounded<0x0001, 0xA1B8>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_clamps() {
        assert_eq!(ScanInterval::new(0).value(), 0x04);
        assert_eq!(ScanInterval::new(0x10).value(), 0x10);
        assert_eq!(ConnInterval::new(0xFFFF).value(), 0x0C80);
        assert_eq!(ResolvableAddressTimeout::new(0).value(), 1);
    }

    #[test]
    fn test_try_new_rejects() {
        assert!(ConnInterval::try_new(0x06).is_ok());
        let err = ConnInterval::try_new(0x05).unwrap_err();
        assert_eq!(
            err,
            OutOfRange {
                ticks: 5,
                min: 6,
                max: 0x0C80
            }
        );
    }

    #[test]
    fn test_forever() {
        let d = AdvDuration::forever();
        assert!(d.is_forever());
        assert_eq!(d.value(), 0);
        // the sentinel survives construction although it is below the range
        assert!(AdvDuration::new(0).is_forever());
        assert!(AdvDuration::try_new(0).is_ok());
        assert!(!AdvDuration::new(1).is_forever());
    }

    #[test]
    fn test_from_duration_multiplies() {
        let s = Seconds::new(3);
        let ms = Milliseconds::from_duration(s);
        assert_eq!(ms.value(), 3_000);

        let timeout = ResolvableAddressTimeout::new(900);
        assert_eq!(Milliseconds::from_duration(timeout).value(), 900_000);
    }

    #[test]
    fn test_cast_clamps() {
        let ms = Milliseconds::new(100_000);
        let sup: SupervisionTimeout = ms.cast();
        assert_eq!(sup.value(), 0x0C80);
    }

    #[test]
    fn test_cast_rounds_up() {
        // 0x21 * 625 us = 20.625 ms -> 3 ticks of 10 ms
        let adv = AdvInterval::new(0x21);
        let coarse: ScanDuration = adv.cast();
        assert_eq!(coarse.value(), 3);

        // exact multiple does not round
        let adv = AdvInterval::new(0x20);
        let coarse: ScanDuration = adv.cast();
        assert_eq!(coarse.value(), 2);
    }

    #[test]
    fn test_cast_keeps_forever() {
        let scan: ScanPeriod = ScanDuration::forever().cast();
        assert!(scan.is_forever());
    }

    #[test]
    fn test_zero_time_is_not_forever() {
        let cast: AdvDuration = Milliseconds::new(0).cast();
        assert!(!cast.is_forever());
        assert_eq!(cast, AdvDuration::min());

        let diff = AdvDuration::new(5) - Milliseconds::new(100);
        assert!(!diff.is_forever());
        assert_eq!(diff, AdvDuration::min());

        assert!(!ScanDuration::from_duration(Seconds::new(0)).is_forever());
    }

    #[test]
    fn test_cross_base_comparison() {
        // 8 x 1.25 ms == 16 x 625 us == 10 ms
        let conn = ConnInterval::new(8);
        let scan = ScanInterval::new(16);
        assert!(conn == scan);
        assert!(ScanInterval::new(17) > conn);
        assert!(Milliseconds::new(9) < conn);
    }

    #[test]
    fn test_same_base_ordering() {
        assert!(ScanInterval::new(5) < ScanInterval::new(6));
        assert_eq!(ScanInterval::new(5).cmp(&ScanInterval::new(5)), Ordering::Equal);
    }

    #[test]
    fn test_add_in_left_unit() {
        // 1 ms rounds up to two 625 us ticks
        let sum = ScanInterval::new(16) + Milliseconds::new(1);
        assert_eq!(sum.value(), 18);

        let diff = ConnInterval::new(10) - Milliseconds::new(100);
        assert_eq!(diff, ConnInterval::min());
    }

    #[test]
    fn test_default_is_min() {
        assert_eq!(SupervisionTimeout::default().value(), 0x0A);
    }
}

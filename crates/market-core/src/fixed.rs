use fixed::types::I32F32;

/// Q32.32 fixed-point: 32 integer bits, 32 fractional bits.
pub type Fixed64 = I32F32;

/// Ticks are the atomic unit of simulation time.
pub type Ticks = u64;

/// Convert a probability in `[0, 1]` to Fixed64, clamping anything outside.
///
/// Tuning holds probabilities as f64; the roll itself happens on fixed-point
/// bits so it is identical on every platform.
#[inline]
pub fn probability(v: f64) -> Fixed64 {
    if !v.is_finite() {
        return Fixed64::ZERO;
    }
    Fixed64::from_num(v.clamp(0.0, 1.0))
}

//! The demo's busy work: sum every integer below `cycles * ITERATIONS_PER_CYCLE`.

use std::hint::black_box;

use offload_types::{Interrupt, WorkError};

pub const ITERATIONS_PER_CYCLE: u64 = 1_000_000;

/// How many iterations pass between interrupt checks.
const INTERRUPT_STRIDE: u64 = 1 << 16;

/// Closed form of [`busy_sum`], or `None` when the sum does not fit in `u64`.
#[must_use]
pub fn expected_sum(cycles: u64) -> Option<u64> {
    let n = cycles.checked_mul(ITERATIONS_PER_CYCLE)?;
    if n == 0 {
        return Some(0);
    }
    u64::try_from(u128::from(n) * u128::from(n - 1) / 2).ok()
}

/// Sums `0..cycles * ITERATIONS_PER_CYCLE` the slow way.
///
/// Fails up front if the result would overflow, and stops early once the
/// interrupt is raised.
pub fn busy_sum(cycles: u64, interrupt: &Interrupt) -> Result<u64, WorkError> {
    if expected_sum(cycles).is_none() {
        return Err(WorkError::raised(format!(
            "sum over {cycles} cycles overflows u64"
        )));
    }
    let iterations = cycles * ITERATIONS_PER_CYCLE;

    let mut total = 0_u64;
    for i in 0..iterations {
        if i % INTERRUPT_STRIDE == 0 && interrupt.is_requested() {
            return Err(WorkError::raised(format!(
                "interrupted after {i} of {iterations} iterations"
            )));
        }
        total += black_box(i);
    }
    Ok(total)
}

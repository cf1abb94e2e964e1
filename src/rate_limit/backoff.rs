// self
use crate::_prelude::*;

/// First delay between retries.
pub const INITIAL_BACKOFF: Duration = Duration::seconds(1);
/// Upper bound for a single delay.
pub const MAX_BACKOFF: Duration = Duration::seconds(30);

/// Doubling delay sequence: 1s, 2s, 4s, ... capped at [`MAX_BACKOFF`]. Never ends.
#[derive(Clone, Debug)]
pub struct Backoff {
	next: Duration,
	cap: Duration,
}
impl Backoff {
	/// Creates a sequence starting at `initial` and capped at `cap`.
	pub fn new(initial: Duration, cap: Duration) -> Self {
		Self { next: initial.min(cap), cap }
	}
}
impl Default for Backoff {
	fn default() -> Self {
		Self::new(INITIAL_BACKOFF, MAX_BACKOFF)
	}
}
impl Iterator for Backoff {
	type Item = Duration;

	fn next(&mut self) -> Option<Self::Item> {
		let current = self.next;

		self.next = current.saturating_mul(2).min(self.cap);

		Some(current)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn delays_double_then_cap() {
		let delays = Backoff::default().take(8).map(|d| d.whole_seconds()).collect::<Vec<_>>();

		assert_eq!(delays, [1, 2, 4, 8, 16, 30, 30, 30]);
	}
}

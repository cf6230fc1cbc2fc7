// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Per-strategy counters of token endpoint exchanges.
#[derive(Debug, Default)]
pub struct GrantMetrics {
	attempts: AtomicU64,
	success: AtomicU64,
	failure: AtomicU64,
}
impl GrantMetrics {
	/// Total number of exchanges started.
	pub fn attempts(&self) -> u64 {
		self.attempts.load(Ordering::Relaxed)
	}

	/// Number of exchanges that produced a token.
	pub fn successes(&self) -> u64 {
		self.success.load(Ordering::Relaxed)
	}

	/// Number of exchanges that failed, including local validation failures.
	pub fn failures(&self) -> u64 {
		self.failure.load(Ordering::Relaxed)
	}

	/// Counts an attempt, then a success or failure depending on `result`.
	pub(crate) fn track<T, E>(&self, result: Result<T, E>) -> Result<T, E> {
		self.attempts.fetch_add(1, Ordering::Relaxed);

		match &result {
			Ok(_) => self.success.fetch_add(1, Ordering::Relaxed),
			Err(_) => self.failure.fetch_add(1, Ordering::Relaxed),
		};

		result
	}
}

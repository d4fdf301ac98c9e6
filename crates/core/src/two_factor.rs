//! Out-of-band delivery of one-time login codes.
//!
//! An acquisition that hits a second-factor prompt parks on
//! [`TwoFactorBridge::request_code`] while an unrelated caller (the HTTP
//! facade) later hands the code over with [`TwoFactorBridge::submit_code`].
//! The bridge holds a single reply slot and a deadline timer; an expired
//! deadline resolves the waiter with an empty code instead of leaving it
//! suspended.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{info, warn};

/// How long a challenge waits for a code unless configured otherwise.
pub const DEFAULT_CHALLENGE_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Source of one-time codes for the login flow.
///
/// An empty string means no code is available (timed out, cancelled, or the
/// user entered nothing); callers treat it as a rejected challenge.
#[async_trait]
pub trait CodeProvider: Send + Sync {
	async fn request_code(&self, timeout_message: &str) -> String;
}

struct PendingChallenge {
	id: u64,
	reply: oneshot::Sender<String>,
	deadline: Instant,
}

/// Deadline task of one challenge.
struct ArmedTimer {
	challenge: u64,
	handle: JoinHandle<()>,
}

#[derive(Default)]
struct BridgeState {
	next_id: u64,
	pending: Option<PendingChallenge>,
	timer: Option<ArmedTimer>,
}

impl BridgeState {
	fn disarm(&mut self) {
		if let Some(timer) = self.timer.take() {
			timer.handle.abort();
		}
	}

	/// Resolves challenge `id` with an empty code if it is still the live one.
	fn expire(&mut self, id: u64, timeout_message: &str) {
		if self.timer.as_ref().is_some_and(|t| t.challenge == id) {
			self.timer = None;
		}
		if !self.pending.as_ref().is_some_and(|p| p.id == id) {
			return;
		}
		if let Some(pending) = self.pending.take() {
			warn!(target = "arrivals.twofactor", challenge = pending.id, "{timeout_message}");
			let _ = pending.reply.send(String::new());
		}
	}
}

/// Single-slot mailbox between a waiting login flow and a code submitter.
pub struct TwoFactorBridge {
	state: Arc<Mutex<BridgeState>>,
	timeout: Duration,
}

impl TwoFactorBridge {
	pub fn new(timeout: Duration) -> Self {
		Self {
			state: Arc::new(Mutex::new(BridgeState::default())),
			timeout,
		}
	}

	/// Returns `true` while a login flow is waiting for a code.
	pub fn is_pending(&self) -> bool {
		self.state.lock().pending.is_some()
	}

	/// Deadline of the outstanding challenge, if any.
	pub fn deadline(&self) -> Option<Instant> {
		self.state.lock().pending.as_ref().map(|p| p.deadline)
	}

	/// Delivers a code to the waiting login flow.
	///
	/// Returns `false` when nothing is waiting. At most one submission per
	/// challenge is accepted; the slot is cleared before this returns.
	pub fn submit_code(&self, code: &str) -> bool {
		let pending = {
			let mut state = self.state.lock();
			let Some(pending) = state.pending.take() else {
				return false;
			};
			state.disarm();
			pending
		};

		let delivered = pending.reply.send(code.to_owned()).is_ok();
		if delivered {
			info!(target = "arrivals.twofactor", challenge = pending.id, "two-factor code delivered");
		}
		delivered
	}

	/// Drops any outstanding challenge and its timer.
	///
	/// A suspended waiter resolves with an empty code.
	pub fn reset(&self) {
		let mut state = self.state.lock();
		if let Some(pending) = state.pending.take() {
			info!(target = "arrivals.twofactor", challenge = pending.id, "two-factor challenge discarded");
		}
		state.disarm();
	}

	async fn wait_for_code(&self, timeout_message: &str) -> String {
		let (tx, rx) = oneshot::channel();
		let id = {
			let mut state = self.state.lock();
			if state.pending.is_some() {
				warn!(target = "arrivals.twofactor", "a two-factor challenge is already outstanding");
				return String::new();
			}
			state.next_id += 1;
			let id = state.next_id;
			state.pending = Some(PendingChallenge {
				id,
				reply: tx,
				deadline: Instant::now() + self.timeout,
			});
			if state.timer.is_none() {
				state.timer = Some(ArmedTimer {
					challenge: id,
					handle: self.arm_timer(id, timeout_message.to_owned()),
				});
			}
			id
		};

		info!(
			target = "arrivals.twofactor",
			challenge = id,
			timeout_secs = self.timeout.as_secs(),
			"waiting for two-factor code"
		);

		let _guard = PendingGuard { state: &self.state, id };
		rx.await.unwrap_or_default()
	}

	fn arm_timer(&self, id: u64, timeout_message: String) -> JoinHandle<()> {
		let state = Arc::clone(&self.state);
		let timeout = self.timeout;
		tokio::spawn(async move {
			tokio::time::sleep(timeout).await;
			state.lock().expire(id, &timeout_message);
		})
	}
}

impl Default for TwoFactorBridge {
	fn default() -> Self {
		Self::new(DEFAULT_CHALLENGE_TIMEOUT)
	}
}

impl std::fmt::Debug for TwoFactorBridge {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("TwoFactorBridge")
			.field("timeout", &self.timeout)
			.field("pending", &self.is_pending())
			.finish()
	}
}

#[async_trait]
impl CodeProvider for TwoFactorBridge {
	async fn request_code(&self, timeout_message: &str) -> String {
		self.wait_for_code(timeout_message).await
	}
}

/// Clears the slot if the waiting future is dropped before resolution.
struct PendingGuard<'a> {
	state: &'a Mutex<BridgeState>,
	id: u64,
}

impl Drop for PendingGuard<'_> {
	fn drop(&mut self) {
		let mut state = self.state.lock();
		if state.pending.as_ref().is_some_and(|p| p.id == self.id) {
			state.pending = None;
			state.disarm();
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	async fn until_pending(bridge: &TwoFactorBridge) {
		while !bridge.is_pending() {
			tokio::task::yield_now().await;
		}
	}

	#[tokio::test]
	async fn submit_without_challenge_is_rejected() {
		let bridge = TwoFactorBridge::default();
		assert!(!bridge.is_pending());
		assert!(!bridge.submit_code("123456"));
	}

	#[tokio::test(start_paused = true)]
	async fn submitted_code_reaches_the_waiter_once() {
		let bridge = Arc::new(TwoFactorBridge::new(Duration::from_secs(60)));
		let waiter = {
			let bridge = Arc::clone(&bridge);
			tokio::spawn(async move { bridge.request_code("timed out").await })
		};

		until_pending(&bridge).await;
		assert!(bridge.deadline().is_some());
		assert!(bridge.submit_code("424242"));
		assert!(!bridge.is_pending());
		assert!(!bridge.submit_code("000000"));

		assert_eq!(waiter.await.unwrap(), "424242");
	}

	#[tokio::test(start_paused = true)]
	async fn deadline_resolves_with_empty_code() {
		let bridge = TwoFactorBridge::new(Duration::from_secs(300));
		let started = Instant::now();

		let code = bridge.request_code("no code received").await;

		assert_eq!(code, "");
		assert!(!bridge.is_pending());
		assert!(started.elapsed() >= Duration::from_secs(300));
		assert!(!bridge.submit_code("late"));
	}

	#[tokio::test(start_paused = true)]
	async fn code_before_deadline_cancels_timer() {
		let bridge = Arc::new(TwoFactorBridge::new(Duration::from_secs(10)));
		let waiter = {
			let bridge = Arc::clone(&bridge);
			tokio::spawn(async move { bridge.request_code("timed out").await })
		};
		until_pending(&bridge).await;
		tokio::time::advance(Duration::from_secs(5)).await;
		assert!(bridge.submit_code("111111"));
		assert_eq!(waiter.await.unwrap(), "111111");

		// A new challenge gets its own full deadline.
		let second = {
			let bridge = Arc::clone(&bridge);
			tokio::spawn(async move { bridge.request_code("timed out").await })
		};
		until_pending(&bridge).await;
		tokio::time::advance(Duration::from_secs(6)).await;
		assert!(bridge.is_pending());
		assert!(bridge.submit_code("222222"));
		assert_eq!(second.await.unwrap(), "222222");
	}

	#[tokio::test(start_paused = true)]
	async fn concurrent_request_gets_empty_code() {
		let bridge = Arc::new(TwoFactorBridge::new(Duration::from_secs(60)));
		let first = {
			let bridge = Arc::clone(&bridge);
			tokio::spawn(async move { bridge.request_code("timed out").await })
		};
		until_pending(&bridge).await;

		assert_eq!(bridge.request_code("timed out").await, "");
		assert!(bridge.is_pending());

		assert!(bridge.submit_code("333333"));
		assert_eq!(first.await.unwrap(), "333333");
	}

	#[tokio::test(start_paused = true)]
	async fn reset_releases_waiter() {
		let bridge = Arc::new(TwoFactorBridge::new(Duration::from_secs(60)));
		let waiter = {
			let bridge = Arc::clone(&bridge);
			tokio::spawn(async move { bridge.request_code("timed out").await })
		};
		until_pending(&bridge).await;

		bridge.reset();

		assert_eq!(waiter.await.unwrap(), "");
		assert!(!bridge.is_pending());
	}

	#[tokio::test(start_paused = true)]
	async fn stale_deadline_leaves_the_next_challenge_alone() {
		let bridge = Arc::new(TwoFactorBridge::new(Duration::from_secs(60)));
		let first = {
			let bridge = Arc::clone(&bridge);
			tokio::spawn(async move { bridge.request_code("timed out").await })
		};
		until_pending(&bridge).await;
		assert!(bridge.submit_code("111111"));
		assert_eq!(first.await.unwrap(), "111111");

		let second = {
			let bridge = Arc::clone(&bridge);
			tokio::spawn(async move { bridge.request_code("timed out").await })
		};
		until_pending(&bridge).await;

		// The first challenge's deadline task wakes after the second was armed.
		bridge.state.lock().expire(1, "timed out");

		{
			let state = bridge.state.lock();
			assert_eq!(state.pending.as_ref().map(|p| p.id), Some(2));
			assert_eq!(state.timer.as_ref().map(|t| t.challenge), Some(2));
		}
		assert!(bridge.submit_code("222222"));
		assert_eq!(second.await.unwrap(), "222222");
	}

	#[tokio::test(start_paused = true)]
	async fn dropped_waiter_clears_pending() {
		let bridge = TwoFactorBridge::new(Duration::from_secs(60));
		let result = tokio::time::timeout(Duration::from_secs(1), bridge.request_code("timed out")).await;
		assert!(result.is_err());
		assert!(!bridge.is_pending());
	}
}

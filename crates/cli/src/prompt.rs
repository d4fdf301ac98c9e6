//! Terminal code prompt for one-shot runs.

use std::io::Write;
use std::time::Duration;

use arrivals::CodeProvider;
use async_trait::async_trait;
use tracing::warn;

/// Reads a one-time code from stdin, giving up after `timeout`.
#[derive(Debug, Clone)]
pub struct StdinCodePrompt {
	timeout: Duration,
}

impl StdinCodePrompt {
	pub fn new(timeout: Duration) -> Self {
		Self { timeout }
	}
}

#[async_trait]
impl CodeProvider for StdinCodePrompt {
	async fn request_code(&self, timeout_message: &str) -> String {
		eprintln!();
		eprint!("Two-factor code (check your e-mail): ");
		let _ = std::io::stderr().flush();

		let read_line = tokio::task::spawn_blocking(|| {
			let mut input = String::new();
			std::io::stdin().read_line(&mut input).map(|_| input)
		});

		tokio::select! {
			line = read_line => match line {
				Ok(Ok(input)) => input.trim().to_string(),
				_ => String::new(),
			},
			_ = tokio::time::sleep(self.timeout) => {
				eprintln!();
				warn!(target = "arrivals.twofactor", "{timeout_message}");
				String::new()
			}
		}
	}
}

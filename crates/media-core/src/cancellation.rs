use tokio_util::sync::CancellationToken;

/// Two independent cancellation hierarchies coexist in this service
/// (spec.md §5, §9):
///
/// - A per-request token, owned by the axum handler, cancelled once the
///   response future completes (or the client disconnects). It is threaded
///   through synchronous persistence calls and any IO the handler itself
///   performs.
/// - A process-lifetime background scope, cancelled only on shutdown. Every
///   job handed to the worker pool runs under a child of *this* token, never
///   the request token that enqueued it — the request returns 202 long
///   before the job finishes, and its token would already be cancelled by
///   the time a worker picks the job up.
#[derive(Clone, Debug)]
pub struct BackgroundScope {
	token: CancellationToken,
}

impl BackgroundScope {
	#[must_use]
	pub fn new() -> Self {
		Self { token: CancellationToken::new() }
	}

	/// Token for one job's lifetime, cancelled early only if the whole
	/// process is shutting down.
	#[must_use]
	pub fn job_token(&self) -> CancellationToken {
		self.token.child_token()
	}

	/// Begin graceful shutdown: no new job tokens are unaffected by this
	/// directly, but `cancel` fires and every outstanding job token observes
	/// it via `child_token` propagation.
	pub fn shutdown(&self) {
		self.token.cancel();
	}

	#[must_use]
	pub fn is_shutting_down(&self) -> bool {
		self.token.is_cancelled()
	}
}

impl Default for BackgroundScope {
	fn default() -> Self {
		Self::new()
	}
}

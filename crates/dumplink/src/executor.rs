// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Single background thread running submitted tasks one at a time, in
//! submission order.
//!
//! The thread hosts a current-thread tokio runtime. Callers post boxed
//! futures from any thread; [`TaskExecutor::post`] only blocks while the
//! thread is still bootstrapping, never for the task itself.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle, ThreadId};

use futures::FutureExt;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info};

use crate::error::ExecutorError;

/// Default name of the executor thread.
pub const DEFAULT_THREAD_NAME: &str = "dumplink-worker";

pub type Task = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

enum State {
	Starting,
	Ready(UnboundedSender<Task>),
	Failed(String),
	Closed,
}

struct Shared {
	state: Mutex<State>,
	ready: Condvar,
}

impl Shared {
	fn lock(&self) -> MutexGuard<'_, State> {
		self.state.lock().unwrap_or_else(PoisonError::into_inner)
	}

	fn transition(&self, state: State) {
		*self.lock() = state;
		self.ready.notify_all();
	}
}

/// Owner of the background thread. Dropping it shuts the thread down after
/// the queued tasks finish.
pub struct TaskExecutor {
	shared: Arc<Shared>,
	handle: Mutex<Option<JoinHandle<()>>>,
	thread_id: ThreadId,
	name: String,
}

impl TaskExecutor {
	/// Spawns the named background thread. Returns before the runtime is up;
	/// the first [`post`](Self::post) waits for it.
	pub fn start(name: impl Into<String>) -> Result<Self, ExecutorError> {
		let name = name.into();
		let shared = Arc::new(Shared {
			state: Mutex::new(State::Starting),
			ready: Condvar::new(),
		});

		let worker_shared = Arc::clone(&shared);
		let handle = thread::Builder::new()
			.name(name.clone())
			.spawn(move || run_worker(worker_shared))
			.map_err(ExecutorError::Spawn)?;

		debug!(thread = %name, "executor thread spawned");

		Ok(Self {
			shared,
			thread_id: handle.thread().id(),
			handle: Mutex::new(Some(handle)),
			name,
		})
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// Whether the current thread is the executor thread.
	pub fn is_worker_thread(&self) -> bool {
		thread::current().id() == self.thread_id
	}

	/// Queues a task behind everything posted before it.
	pub fn post<F>(&self, task: F) -> Result<(), ExecutorError>
	where
		F: Future<Output = ()> + Send + 'static,
	{
		let guard = self.shared.lock();
		let guard = self
			.shared
			.ready
			.wait_while(guard, |state| matches!(state, State::Starting))
			.unwrap_or_else(PoisonError::into_inner);

		// Sending under the lock keeps queue order identical to lock order.
		match &*guard {
			State::Ready(sender) => sender.send(Box::pin(task)).map_err(|_| ExecutorError::Shutdown),
			State::Failed(reason) => Err(ExecutorError::StartupFailed(reason.clone())),
			State::Starting | State::Closed => Err(ExecutorError::Shutdown),
		}
	}

	/// Closes the queue, lets queued tasks finish and joins the thread.
	///
	/// Idempotent. When called from a task on the executor thread the queue
	/// is closed but the thread is not joined.
	pub fn shutdown(&self) {
		self.shared.transition(State::Closed);

		if self.is_worker_thread() {
			return;
		}

		let handle = self
			.handle
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.take();
		if let Some(handle) = handle {
			if handle.join().is_err() {
				error!(thread = %self.name, "executor thread panicked");
			}
			debug!(thread = %self.name, "executor thread joined");
		}
	}
}

impl Drop for TaskExecutor {
	fn drop(&mut self) {
		self.shutdown();
	}
}

fn run_worker(shared: Arc<Shared>) {
	let runtime = match tokio::runtime::Builder::new_current_thread()
		.enable_all()
		.build()
	{
		Ok(runtime) => runtime,
		Err(e) => {
			error!(error = %e, "could not build executor runtime");
			shared.transition(State::Failed(e.to_string()));
			return;
		}
	};

	let (sender, receiver) = mpsc::unbounded_channel();
	{
		let mut state = shared.lock();
		if matches!(*state, State::Closed) {
			return;
		}
		*state = State::Ready(sender);
	}
	shared.ready.notify_all();
	info!("executor ready");

	runtime.block_on(drain(receiver));
	debug!("executor queue closed");
}

async fn drain(mut receiver: UnboundedReceiver<Task>) {
	while let Some(task) = receiver.recv().await {
		if AssertUnwindSafe(task).catch_unwind().await.is_err() {
			error!("executor task panicked");
		}
	}
}

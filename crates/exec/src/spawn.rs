use std::sync::OnceLock;

/// Returns the ambient tokio runtime handle, or a shared fallback runtime.
///
/// The fallback is built on first use and lives for the rest of the process.
pub fn runtime_handle() -> tokio::runtime::Handle {
	if let Ok(handle) = tokio::runtime::Handle::try_current() {
		return handle;
	}

	static GLOBAL_RT: OnceLock<tokio::runtime::Runtime> = OnceLock::new();
	let runtime = GLOBAL_RT.get_or_init(|| {
		tokio::runtime::Builder::new_multi_thread()
			.enable_all()
			.worker_threads(2)
			.thread_name("warden-exec-global")
			.build()
			.expect("failed to build warden-exec global tokio runtime")
	});
	runtime.handle().clone()
}

/// Spawns a dedicated named OS thread.
pub fn spawn_named_thread<F, R>(name: impl Into<String>, f: F) -> std::io::Result<std::thread::JoinHandle<R>>
where
	F: FnOnce() -> R + Send + 'static,
	R: Send + 'static,
{
	let name = name.into();
	tracing::trace!(thread = %name, "exec.spawn_named_thread");
	std::thread::Builder::new().name(name).spawn(f)
}

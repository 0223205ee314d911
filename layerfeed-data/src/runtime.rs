//! Synchronous bridge over the async HTTP client.
//!
//! The core traits are synchronous so the orchestrator stays embeddable in
//! plain threads. HTTP adapters own a current-thread Tokio runtime and block
//! on it for every request.

use std::future::Future;

use tokio::runtime::{Handle, Runtime, RuntimeFlavor};

/// A current-thread runtime used to drive one adapter's requests.
pub(crate) struct BlockingRuntime {
    runtime: Runtime,
}

impl std::fmt::Debug for BlockingRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("<tokio::runtime::Runtime>")
    }
}

impl BlockingRuntime {
    pub(crate) fn new() -> std::io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(Self { runtime })
    }

    /// Drive `future` to completion.
    ///
    /// Inside a multi-threaded runtime the caller's handle is used through
    /// `block_in_place`; anywhere else the owned runtime runs the future. A
    /// caller on a `current_thread` runtime may deadlock if this request
    /// depends on IO that runtime is driving.
    pub(crate) fn block_on<F: Future>(&self, future: F) -> F::Output {
        match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                tokio::task::block_in_place(|| handle.block_on(future))
            }
            _ => self.runtime.block_on(future),
        }
    }
}

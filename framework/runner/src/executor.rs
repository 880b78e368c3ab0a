use std::future::Future;

use surge_core::prelude::{ShutdownHandle, ShutdownSignalError};
use tokio::runtime::Handle;

#[derive(Debug)]
pub struct Executor {
    handle: Handle,
    shutdown_handle: ShutdownHandle,
}

impl Executor {
    pub(crate) fn new(handle: Handle, shutdown_handle: ShutdownHandle) -> Self {
        Self {
            handle,
            shutdown_handle,
        }
    }

    /// Run async code in place, blocking until it completes.
    ///
    /// This is intended for the setup hook, which runs before any scenario has started. It must
    /// not be called from inside an iteration, which is already async.
    ///
    /// Note that the future will be cancelled if the runner is shutdown. You do not need to do anything
    /// special to handle this, but you should be aware that submitting a future which does not support
    /// cancelling may prevent the runner from shutting down.
    pub fn execute_in_place<T>(
        &self,
        fut: impl Future<Output = anyhow::Result<T>>,
    ) -> anyhow::Result<T> {
        let mut shutdown_listener = self.shutdown_handle.new_listener();
        self.handle.block_on(async move {
            tokio::select! {
                result = fut => result,
                _ = shutdown_listener.wait_for_shutdown() => {
                    Err(anyhow::anyhow!(ShutdownSignalError::default()))
                },
            }
        })
    }

    /// Submit async code to be run in the background.
    ///
    /// Note that the future will not be cancelled if the runner is shutdown. It is also not guaranteed
    /// that the runner will wait for the future to complete before shutting down.
    pub fn spawn(&self, fut: impl Future<Output = ()> + Send + 'static) {
        self.handle.spawn(fut);
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn spawn_runs_in_the_background() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let executor = Executor::new(runtime.handle().clone(), ShutdownHandle::new());

        let (tx, rx) = tokio::sync::oneshot::channel();
        executor.spawn(async move {
            let _ = tx.send(42);
        });

        assert_eq!(42, runtime.block_on(rx).unwrap());
    }

    #[test]
    fn execute_in_place_is_cancelled_on_shutdown() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let shutdown_handle = ShutdownHandle::new();
        let executor = Executor::new(runtime.handle().clone(), shutdown_handle.clone());

        shutdown_handle.shutdown();
        let result = executor.execute_in_place(std::future::pending::<anyhow::Result<()>>());

        assert!(result.unwrap_err().is::<ShutdownSignalError>());
    }
}

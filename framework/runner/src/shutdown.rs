use surge_core::prelude::ShutdownHandle;
use tokio::signal;

use crate::executor::Executor;

/// Trigger `handle` on Ctrl-C, listening in the background on the executor's runtime.
pub(crate) fn start_shutdown_listener(executor: &Executor, handle: ShutdownHandle) {
    executor.spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                log::info!("Received shutdown signal, shutting down...");
                handle.shutdown();
            }
            Err(e) => {
                log::error!("Failed to listen for Ctrl-C, the run can only end on its own: {e:?}");
            }
        }
    });
}

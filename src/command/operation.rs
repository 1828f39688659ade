use crate::{ManagedSdkError, Result};
use futures_util::FutureExt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::thread;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// A whole SDK operation running on the blocking pool.
///
/// Await it for the operation's result. `cancel()` is best effort: the
/// downloader and extractor stop at the next chunk or entry and clean up, a
/// running child process is killed at the next wait poll.
///
/// Outside a tokio runtime the operation gets its own thread, so the handle
/// can be driven by any executor.
pub struct OperationHandle<T> {
    cancel: CancellationToken,
    task: Task<T>,
}

enum Task<T> {
    Pool(JoinHandle<Result<T>>),
    Thread {
        result: oneshot::Receiver<Result<T>>,
        thread: Option<thread::JoinHandle<()>>,
    },
}

impl<T: Send + 'static> OperationHandle<T> {
    pub fn spawn<F>(operation: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Result<T> + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let task = match Handle::try_current() {
            Ok(runtime) => Task::Pool(runtime.spawn_blocking(move || operation(token))),
            Err(_) => {
                let (sender, result) = oneshot::channel();
                // a failed spawn drops the sender, which surfaces as a task error
                let thread = thread::Builder::new()
                    .name("managed-sdk-operation".to_string())
                    .spawn(move || {
                        let _ = sender.send(operation(token));
                    })
                    .ok();
                Task::Thread { result, thread }
            }
        };
        Self { cancel, task }
    }
}

impl<T> OperationHandle<T> {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        match &self.task {
            Task::Pool(join) => join.is_finished(),
            Task::Thread { thread, .. } => thread.as_ref().map_or(true, |t| t.is_finished()),
        }
    }
}

impl<T> Future for OperationHandle<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.get_mut().task {
            Task::Pool(join) => join.poll_unpin(cx).map(|joined| match joined {
                Ok(result) => result,
                Err(e) if e.is_cancelled() => Err(ManagedSdkError::interrupted("Operation cancelled")),
                Err(e) => Err(ManagedSdkError::command_execution(format!(
                    "Operation task failed: {}",
                    e
                ))),
            }),
            Task::Thread { result, .. } => result.poll_unpin(cx).map(|received| {
                received.unwrap_or_else(|_| {
                    Err(ManagedSdkError::command_execution(
                        "Operation task failed: thread ended without a result",
                    ))
                })
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_resolves_to_operation_result() {
        let handle = OperationHandle::spawn(|_cancel| Ok(42));
        assert_eq!(handle.await.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_cancel_reaches_operation() {
        let handle = OperationHandle::spawn(|cancel: CancellationToken| {
            while !cancel.is_cancelled() {
                std::thread::sleep(Duration::from_millis(5));
            }
            Err::<(), _>(ManagedSdkError::interrupted("stopped"))
        });
        handle.cancel();
        assert!(handle.is_cancelled());
        let err = handle.await.unwrap_err();
        assert!(err.is_interrupted());
    }

    #[tokio::test]
    async fn test_panic_becomes_error() {
        let handle: OperationHandle<()> = OperationHandle::spawn(|_cancel| panic!("boom"));
        let err = handle.await.unwrap_err();
        assert!(matches!(err, ManagedSdkError::CommandExecution { .. }));
    }

    fn block_on<T>(handle: OperationHandle<T>) -> Result<T> {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(handle)
    }

    #[test]
    fn test_spawn_outside_runtime_uses_own_thread() {
        let handle = OperationHandle::spawn(|_cancel| Ok("installed"));
        assert!(matches!(handle.task, Task::Thread { .. }));
        assert_eq!(block_on(handle).unwrap(), "installed");
    }

    #[test]
    fn test_cancel_outside_runtime() {
        let handle = OperationHandle::spawn(|cancel: CancellationToken| {
            while !cancel.is_cancelled() {
                std::thread::sleep(Duration::from_millis(5));
            }
            Err::<(), _>(ManagedSdkError::interrupted("stopped"))
        });
        handle.cancel();
        assert!(block_on(handle).unwrap_err().is_interrupted());
    }

    #[test]
    fn test_thread_panic_becomes_error() {
        let handle: OperationHandle<()> = OperationHandle::spawn(|_cancel| panic!("boom"));
        let err = block_on(handle).unwrap_err();
        assert!(matches!(err, ManagedSdkError::CommandExecution { .. }));
    }
}

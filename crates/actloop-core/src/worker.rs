use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use crate::action::Action;
use crate::context::Context;
use crate::error::ActionError;
use crate::ids::LoopId;
use crate::stats::Counters;

/// Callback for fire-and-forget errors. Runs on the worker.
pub type ErrorHandler = Box<dyn FnMut(ActionError) + Send + 'static>;

pub(crate) type BoxedAction<S> = Box<dyn Action<S>>;

/// The sole owner of the state.
///
/// - `shutdown` が立ったら queue に残っているものは実行せずに抜ける
/// - `done` is flipped only after the loop has returned and the state is dropped
pub(crate) struct Worker<S> {
    pub(crate) id: LoopId,
    pub(crate) state: S,
    pub(crate) inbox: mpsc::Receiver<BoxedAction<S>>,
    pub(crate) shutdown: watch::Receiver<bool>,
    pub(crate) done: watch::Sender<bool>,
    pub(crate) on_error: Option<ErrorHandler>,
    pub(crate) counters: Arc<Counters>,
}

impl<S: Send + 'static> Worker<S> {
    pub(crate) async fn run(self) {
        let Worker {
            id,
            mut state,
            mut inbox,
            mut shutdown,
            done,
            mut on_error,
            counters,
        } = self;

        tracing::debug!(loop_id = %id, "worker started");
        let background = Context::background();

        loop {
            // shutdown を先に見る: 積まれていても drain しない
            let action = tokio::select! {
                biased;
                // Err means the loop handle was dropped; treat it as shutdown.
                _ = shutdown.wait_for(|down| *down) => break,
                action = inbox.recv() => match action {
                    Some(action) => action,
                    None => break,
                },
            };

            tracing::trace!(loop_id = %id, "dispatching action");
            let result = action.act(&background, &mut state).await;
            counters.record_executed(result.is_err());

            if let Err(err) = result
                && let Some(handler) = on_error.as_mut()
            {
                handler(err);
            }
        }

        drop(inbox);
        drop(state);
        tracing::debug!(loop_id = %id, executed = counters.executed(), "worker exited");
        done.send_replace(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::action_fn;
    use std::sync::Mutex;

    fn worker(
        capacity: usize,
        on_error: Option<ErrorHandler>,
    ) -> (
        Worker<Vec<u32>>,
        mpsc::Sender<BoxedAction<Vec<u32>>>,
        watch::Sender<bool>,
        watch::Receiver<bool>,
    ) {
        let (tx, inbox) = mpsc::channel(capacity);
        let (shutdown_tx, shutdown) = watch::channel(false);
        let (done, done_rx) = watch::channel(false);
        let w = Worker {
            id: LoopId::new(),
            state: Vec::new(),
            inbox,
            shutdown,
            done,
            on_error,
            counters: Arc::new(Counters::default()),
        };
        (w, tx, shutdown_tx, done_rx)
    }

    fn push(n: u32) -> BoxedAction<Vec<u32>> {
        Box::new(action_fn(move |_, v: &mut Vec<u32>| {
            v.push(n);
            Ok(())
        }))
    }

    #[tokio::test]
    async fn does_not_drain_after_shutdown() {
        let (w, tx, shutdown_tx, mut done_rx) = worker(4, None);
        let counters = Arc::clone(&w.counters);

        tx.send(push(1)).await.unwrap();
        tx.send(push(2)).await.unwrap();
        shutdown_tx.send_replace(true);

        tokio::spawn(w.run());
        done_rx.wait_for(|d| *d).await.unwrap();
        assert_eq!(counters.executed(), 0);
    }

    #[tokio::test]
    async fn routes_action_errors_to_handler() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let handler: ErrorHandler = Box::new({
            let seen = Arc::clone(&seen);
            move |err| seen.lock().unwrap().push(err.to_string())
        });
        let (w, tx, shutdown_tx, mut done_rx) = worker(4, Some(handler));
        tokio::spawn(w.run());

        tx.send(Box::new(action_fn(|_, _: &mut Vec<u32>| Err(ActionError::msg("first")))))
            .await
            .unwrap();
        tx.send(push(1)).await.unwrap();
        // 最後の action が完了したら handler も呼ばれ済み
        let (ack_tx, ack_rx) = tokio::sync::oneshot::channel();
        tx.send(Box::new(action_fn(move |_, _: &mut Vec<u32>| {
            let _ = ack_tx.send(());
            Ok(())
        })))
        .await
        .unwrap();
        ack_rx.await.unwrap();

        assert_eq!(*seen.lock().unwrap(), vec!["first".to_string()]);

        shutdown_tx.send_replace(true);
        done_rx.wait_for(|d| *d).await.unwrap();
    }

    #[tokio::test]
    async fn exits_when_handle_is_dropped() {
        let (w, tx, shutdown_tx, mut done_rx) = worker(1, None);
        let join = tokio::spawn(w.run());

        drop(shutdown_tx);
        join.await.unwrap();
        assert!(*done_rx.borrow_and_update());
        drop(tx);
    }
}

//! The single control task that owns the dispatcher

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::assistant::AssistantApi;
use crate::dispatcher::{Dispatcher, KeyInput};
use crate::prefs::KeyValueStore;

/// Drop keys typed while a command or the boot held the input line closed
fn discard_pending(keys: &mut mpsc::UnboundedReceiver<KeyInput>) {
    let mut dropped = 0;
    while keys.try_recv().is_ok() {
        dropped += 1;
    }
    if dropped > 0 {
        debug!(dropped, "discarded keys typed while busy");
    }
}

/// Start up, then process keys strictly one at a time
pub async fn run<A, S>(
    mut dispatcher: Dispatcher<A, S>,
    mut keys: mpsc::UnboundedReceiver<KeyInput>,
    play_boot: bool,
) where
    A: AssistantApi,
    S: KeyValueStore,
{
    dispatcher.start(play_boot).await;
    discard_pending(&mut keys);

    while let Some(key) = keys.recv().await {
        // a blank Enter reopens the line at once, so keys behind it stay
        if dispatcher.handle_key(key).await {
            discard_pending(&mut keys);
        }
    }
}

pub fn spawn<A, S>(dispatcher: Dispatcher<A, S>, play_boot: bool) -> (mpsc::UnboundedSender<KeyInput>, JoinHandle<()>)
where
    A: AssistantApi + 'static,
    S: KeyValueStore + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(run(dispatcher, rx, play_boot));
    (tx, handle)
}

//! Tokio event loop driving one [`LayoutController`].
//!
//! Every input (screen changes, definition events, platform notifications)
//! arrives on a single unbounded channel, so the controller is only ever
//! touched from one task.  Follow-ups returned by the controller are posted
//! back to the same channel by short-lived sleep tasks.

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info};

use crate::application::events::{Scheduled, ShellEvent};
use crate::application::manage_layout::LayoutController;

/// Creates the channel the loop reads from.
pub fn channel() -> (UnboundedSender<ShellEvent>, UnboundedReceiver<ShellEvent>) {
    mpsc::unbounded_channel()
}

/// Posts `scheduled.event` to `tx` once its delay has elapsed.
pub fn schedule(tx: &UnboundedSender<ShellEvent>, scheduled: Scheduled) {
    let tx = tx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(scheduled.delay).await;
        // The loop may already have stopped.
        let _ = tx.send(scheduled.event);
    });
}

/// Runs `controller` until a [`ShellEvent::Shutdown`] is received, then
/// returns it torn down.
pub async fn run(
    mut controller: LayoutController,
    tx: UnboundedSender<ShellEvent>,
    mut rx: UnboundedReceiver<ShellEvent>,
) -> LayoutController {
    info!("event loop for layout {} started", controller.name());

    while let Some(event) = rx.recv().await {
        let shutdown = event == ShellEvent::Shutdown;
        for follow_up in controller.handle(event) {
            debug!("scheduling {:?} in {:?}", follow_up.event, follow_up.delay);
            schedule(&tx, follow_up);
        }
        if shutdown {
            info!("event loop for layout {} stopped", controller.name());
            return controller;
        }
    }

    controller.teardown();
    controller
}

//! Terminal input pump.
//!
//! One background task multiplexes crossterm input with the app's two
//! internal clocks: a 4 Hz tick driving edge animation and data-age
//! labels, and a ~30 FPS render pulse. The app loop consumes a single
//! channel and never touches crossterm directly.

use std::time::Duration;

use crossterm::event::{Event as CrosstermEvent, EventStream, KeyEvent, KeyEventKind};
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Cadence of [`Event::Tick`].
const TICK_INTERVAL: Duration = Duration::from_millis(250);
/// Cadence of [`Event::Render`].
const RENDER_INTERVAL: Duration = Duration::from_millis(33);

#[derive(Debug)]
pub enum Event {
    /// A key was pressed.
    Key(KeyEvent),
    /// Terminal was resized to (cols, rows).
    Resize(u16, u16),
    /// Animation / data-age tick.
    Tick,
    /// Time to draw a frame.
    Render,
}

/// Handle to the input pump task.
pub struct EventReader {
    rx: mpsc::UnboundedReceiver<Event>,
    cancel: CancellationToken,
}

impl EventReader {
    /// Spawn the pump. Events start flowing immediately.
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let task_cancel = cancel.clone();
        tokio::spawn(async move {
            let mut input = EventStream::new();
            let mut ticks = tokio::time::interval(TICK_INTERVAL);
            let mut frames = tokio::time::interval(RENDER_INTERVAL);
            // A stalled loop must not replay a burst of queued ticks.
            ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
            frames.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                let event = tokio::select! {
                    () = task_cancel.cancelled() => break,
                    _ = ticks.tick() => Event::Tick,
                    _ = frames.tick() => Event::Render,
                    maybe = input.next() => match maybe {
                        Some(Ok(CrosstermEvent::Key(key)))
                            if key.kind == KeyEventKind::Press =>
                        {
                            Event::Key(key)
                        }
                        Some(Ok(CrosstermEvent::Resize(w, h))) => Event::Resize(w, h),
                        // Releases, repeats, focus and paste noise.
                        Some(Ok(_)) => continue,
                        // Terminal input is gone; the app should wind down.
                        Some(Err(_)) | None => break,
                    },
                };

                if tx.send(event).is_err() {
                    break;
                }
            }
        });

        Self { rx, cancel }
    }

    /// Next event, or `None` once the pump has stopped.
    pub async fn next(&mut self) -> Option<Event> {
        self.rx.recv().await
    }

    /// Stop the pump task.
    pub fn stop(&self) {
        self.cancel.cancel();
    }
}

impl Drop for EventReader {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use crossterm::event::{self, Event, KeyEvent, KeyEventKind, KeyEventState};

pub enum AppEvent {
    Key(KeyEvent),
    /// No input within the tick rate; drives background polling.
    Tick,
}

/// Reads terminal input on its own thread and forwards it to the event loop.
pub struct EventHandler {
    rx: mpsc::Receiver<AppEvent>,
}

impl EventHandler {
    pub fn new(tick_rate: Duration) -> Self {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            loop {
                let event = if event::poll(tick_rate).unwrap_or(false) {
                    match event::read() {
                        // Release/Repeat would double-count keystrokes.
                        Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => AppEvent::Key(key),
                        Ok(_) => AppEvent::Tick,
                        Err(_) => return,
                    }
                } else {
                    AppEvent::Tick
                };
                if tx.send(event).is_err() {
                    return;
                }
            }
        });

        Self { rx }
    }

    pub fn next(&self) -> anyhow::Result<AppEvent> {
        Ok(self.rx.recv()?)
    }
}

/// Caps Lock state carried by a key event. Terminals only report it once
/// keyboard enhancement flags are pushed; otherwise this is always false.
pub fn caps_lock_on(key: &KeyEvent) -> bool {
    key.state.contains(KeyEventState::CAPS_LOCK)
}

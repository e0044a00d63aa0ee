//! Narration sinks

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

/// Fire-and-forget narration sink, e.g. a text to speech engine
pub trait Speaker: Send {
    /// Whether the sink can accept messages yet
    fn is_ready(&self) -> bool {
        true
    }

    fn speak(&mut self, text: &str) -> Result<(), String>;
}

/// Messages kept while the speaker is not ready; the oldest go first
const MAX_PENDING: usize = 64;

/// Attempts before a rejected message is dropped
const MAX_ATTEMPTS: u32 = 3;

/// Front of a speaker that is still warming up or failing.
///
/// Messages said while the speaker is not ready are queued, up to
/// `MAX_PENDING`, and flushed in order once it is. A message the speaker
/// rejects is retried on the next flush and dropped after `MAX_ATTEMPTS`,
/// so it never holds back the ones behind it for long.
pub struct Announcer {
    speaker: Box<dyn Speaker>,
    pending: VecDeque<(String, u32)>,
}

impl Announcer {
    pub fn new(speaker: Box<dyn Speaker>) -> Self {
        Self {
            speaker,
            pending: VecDeque::new(),
        }
    }

    pub fn announce(&mut self, text: &str) {
        info!("Announcing: {}", text);

        if self.pending.len() >= MAX_PENDING {
            if let Some((dropped, _)) = self.pending.pop_front() {
                warn!("Announcement queue full, dropping: {}", dropped);
            }
        }
        self.pending.push_back((text.to_string(), 0));
        self.flush();
    }

    /// Hand queued messages to the speaker while it accepts them
    pub fn flush(&mut self) {
        if !self.speaker.is_ready() {
            debug!(queued = self.pending.len(), "Speaker not ready");
            return;
        }

        while let Some((text, attempts)) = self.pending.front_mut() {
            match self.speaker.speak(text) {
                Ok(()) => {
                    self.pending.pop_front();
                }
                Err(e) if *attempts + 1 >= MAX_ATTEMPTS => {
                    warn!("Speaker failed {} times, dropping `{}`: {}", MAX_ATTEMPTS, text, e);
                    self.pending.pop_front();
                }
                Err(e) => {
                    *attempts += 1;
                    warn!("Speaker failed, keeping {} queued: {}", self.pending.len(), e);
                    return;
                }
            }
        }
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Drop everything still queued
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

/// Prints every message on stdout
pub struct ConsoleSpeaker {
    prefix: String,
}

impl ConsoleSpeaker {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
        }
    }
}

impl Speaker for ConsoleSpeaker {
    fn speak(&mut self, text: &str) -> Result<(), String> {
        println!("{}{}", self.prefix, text);

        Ok(())
    }
}

/// Keeps spoken messages in memory, readable through a shared handle
#[derive(Clone, Default)]
pub struct MemorySpeaker {
    spoken: Arc<Mutex<Vec<String>>>,
    ready: Arc<Mutex<bool>>,
}

impl MemorySpeaker {
    pub fn new() -> Self {
        Self {
            spoken: Arc::new(Mutex::new(vec![])),
            ready: Arc::new(Mutex::new(true)),
        }
    }

    /// Starts not ready, like an engine still initializing
    pub fn warming_up() -> Self {
        let speaker = Self::new();
        speaker.set_ready(false);

        speaker
    }

    pub fn set_ready(&self, ready: bool) {
        *self.ready.lock() = ready;
    }

    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().clone()
    }
}

impl Speaker for MemorySpeaker {
    fn is_ready(&self) -> bool {
        *self.ready.lock()
    }

    fn speak(&mut self, text: &str) -> Result<(), String> {
        self.spoken.lock().push(text.to_string());

        Ok(())
    }
}

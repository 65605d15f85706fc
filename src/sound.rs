//! Sound cue capability.
//!
//! Playback hardware is opened lazily, on the first cue after the user has
//! interacted with sound enabled, and torn down when sound is disabled. The
//! on/off preference is persisted under [`SOUND_KEY`].

use std::io::Write;

use tracing::{debug, warn};

use crate::store::{KeyValueStore, StoreError};

pub const SOUND_KEY: &str = "stargate_sound_enabled";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum SoundCue {
    Click,
    Success,
    Error,
    Reveal,
    Type,
}

impl SoundCue {
    pub fn for_outcome(correct: bool) -> Self {
        if correct {
            SoundCue::Success
        } else {
            SoundCue::Error
        }
    }
}

/// Something that can render a cue
pub trait SoundBackend {
    fn play(&mut self, cue: SoundCue);
}

/// Rings the terminal bell for outcome cues
#[derive(Debug, Default)]
pub struct TerminalBell;

impl SoundBackend for TerminalBell {
    fn play(&mut self, cue: SoundCue) {
        if matches!(cue, SoundCue::Success | SoundCue::Error | SoundCue::Reveal) {
            let mut err = std::io::stderr();
            let _ = err.write_all(b"\x07").and_then(|_| err.flush());
        }
    }
}

#[derive(Debug, Default)]
pub struct SilentBackend;

impl SoundBackend for SilentBackend {
    fn play(&mut self, _cue: SoundCue) {}
}

/// Read the persisted preference; absent or unreadable means enabled
pub fn load_preference<K: KeyValueStore + ?Sized>(kv: &K) -> bool {
    match kv.get(SOUND_KEY) {
        Ok(Some(v)) => v == "true",
        Ok(None) => true,
        Err(err) => {
            warn!(error = %err, "could not read sound preference");
            true
        }
    }
}

pub fn save_preference<K: KeyValueStore + ?Sized>(
    kv: &mut K,
    enabled: bool,
) -> Result<(), StoreError> {
    kv.set(SOUND_KEY, if enabled { "true" } else { "false" })
}

pub struct SoundSystem<B: SoundBackend> {
    enabled: bool,
    interacted: bool,
    backend: Option<B>,
    open: Box<dyn Fn() -> B>,
}

impl<B: SoundBackend> SoundSystem<B> {
    pub fn new(enabled: bool, open: impl Fn() -> B + 'static) -> Self {
        Self {
            enabled,
            interacted: false,
            backend: None,
            open: Box::new(open),
        }
    }

    /// Build from the persisted preference
    pub fn load<K: KeyValueStore + ?Sized>(kv: &K, open: impl Fn() -> B + 'static) -> Self {
        Self::new(load_preference(kv), open)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_open(&self) -> bool {
        self.backend.is_some()
    }

    /// Record that the user has interacted; cues are muted until then
    pub fn note_interaction(&mut self) {
        self.interacted = true;
    }

    /// Play a cue if permitted. Returns whether it was played.
    pub fn play(&mut self, cue: SoundCue) -> bool {
        if !self.enabled || !self.interacted {
            return false;
        }
        if self.backend.is_none() {
            debug!("opening sound backend");
            self.backend = Some((self.open)());
        }
        match self.backend.as_mut() {
            Some(backend) => {
                backend.play(cue);
                true
            }
            None => false,
        }
    }

    pub fn set_enabled<K: KeyValueStore + ?Sized>(
        &mut self,
        enabled: bool,
        kv: &mut K,
    ) -> Result<(), StoreError> {
        save_preference(kv, enabled)?;
        self.enabled = enabled;
        if !enabled && self.backend.take().is_some() {
            debug!("sound backend closed");
        }
        Ok(())
    }

    pub fn toggle<K: KeyValueStore + ?Sized>(&mut self, kv: &mut K) -> Result<bool, StoreError> {
        self.set_enabled(!self.enabled, kv)?;
        Ok(self.enabled)
    }
}

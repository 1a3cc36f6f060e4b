//! Beat clock driven by music playback
//!
//! Tracks elapsed time against the current tempo and exposes, per note
//! length (quarter, half, whole), whether an input right now counts as
//! "on beat". Quarter notes are published on a [`QuarterNoteBus`] that other
//! systems subscribe to with an owned [`SubscriptionToken`].
//!
//! Tempo changes are asynchronous: the music fades out, and only once the
//! playback volume reaches zero is the new tempo installed. Playback then
//! restarts and the clock stays paused ("loading") until a short grace period
//! of playback has elapsed, after which all counters resynchronize.

use serde::{Deserialize, Serialize};

use crate::consts::*;

/// A music track and its tempo
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Beat {
    /// Display name of the loop
    pub name: String,
    /// Beats (quarter notes) per minute
    pub bpm: u32,
    /// Quarter notes per bar (lower signature is always 4)
    pub time_signature: u32,
}

impl Beat {
    pub fn new(name: &str, bpm: u32, time_signature: u32) -> Self {
        Self {
            name: name.to_string(),
            bpm,
            time_signature,
        }
    }

    /// Seconds per quarter note
    pub fn quarter_note_length(&self) -> f64 {
        60.0 / self.bpm as f64
    }

    pub fn half_note_length(&self) -> f64 {
        self.quarter_note_length() * 2.0
    }

    pub fn whole_note_length(&self) -> f64 {
        self.quarter_note_length() * self.time_signature as f64
    }
}

/// The three loops the game cycles through between levels
pub fn default_beats() -> Vec<Beat> {
    vec![
        Beat::new("Sunset Loop", 114, 4),
        Beat::new("Jupiter Loop", 120, 4),
        Beat::new("Running In The Night Loop", 133, 4),
    ]
}

/// Note value used for timing checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoteValue {
    Whole,
    Half,
    Quarter,
}

impl NoteValue {
    /// Note class of an object with the given radius
    pub fn for_radius(radius: f32) -> Self {
        if radius > WHOLE_NOTE_RADIUS_THRESHOLD {
            NoteValue::Whole
        } else if radius > HALF_NOTE_RADIUS_THRESHOLD {
            NoteValue::Half
        } else {
            NoteValue::Quarter
        }
    }
}

/// Public state of the clock, copied out once per frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeatSnapshot {
    pub whole_note_active: bool,
    pub half_note_active: bool,
    pub quarter_note_active: bool,

    pub time_since_whole_note: f64,
    pub time_since_half_note: f64,
    pub time_since_quarter_note: f64,

    pub whole_note_progress: f32,
    pub half_note_progress: f32,
    pub quarter_note_progress: f32,

    pub whole_note_length: f64,
    pub half_note_length: f64,
    pub quarter_note_length: f64,

    /// Position in the bar, 1-based
    pub current_quarter_note: u32,

    /// Triangle wave over each half note: 0 at the beat, 1 halfway, 0 again
    pub pulse_multiplier: f32,
}

impl BeatSnapshot {
    /// Resting state for a beat: lengths installed, every window closed
    pub fn for_beat(beat: &Beat) -> Self {
        Self {
            whole_note_active: false,
            half_note_active: false,
            quarter_note_active: false,
            time_since_whole_note: 0.0,
            time_since_half_note: 0.0,
            time_since_quarter_note: 0.0,
            whole_note_progress: 0.0,
            half_note_progress: 0.0,
            quarter_note_progress: 0.0,
            whole_note_length: beat.whole_note_length(),
            half_note_length: beat.half_note_length(),
            quarter_note_length: beat.quarter_note_length(),
            current_quarter_note: 1,
            pulse_multiplier: 0.0,
        }
    }

    /// Whether the window for `note` is currently open
    pub fn is_active(&self, note: NoteValue) -> bool {
        match note {
            NoteValue::Whole => self.whole_note_active,
            NoteValue::Half => self.half_note_active,
            NoteValue::Quarter => self.quarter_note_active,
        }
    }
}

/// Asymmetric timing window: a little more slack just after a beat than
/// just before the next one.
#[inline]
pub fn note_window_active(time_since_note: f64, note_length: f64, accepted_offset: f64) -> bool {
    time_since_note < accepted_offset * WINDOW_AFTER_BEAT_FACTOR
        || time_since_note > note_length - accepted_offset * WINDOW_BEFORE_BEAT_FACTOR
}

/// Triangle pulse over a half note
#[inline]
pub fn pulse_multiplier(half_note_progress: f32) -> f32 {
    if half_note_progress < 0.5 {
        half_note_progress * 2.0
    } else {
        1.0 - (half_note_progress - 0.5) * 2.0
    }
}

// ---------------------------------------------------------------------------
// Quarter-note event bus
// ---------------------------------------------------------------------------

/// A quarter note boundary that just passed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuarterNote {
    /// Position in the bar after advancing, 1-based
    pub index: u32,
}

/// Registration handle returned by [`QuarterNoteBus::subscribe`].
///
/// Not `Clone`: unsubscribing consumes it, so one subscription can only be
/// removed once.
#[derive(Debug, PartialEq, Eq)]
pub struct SubscriptionToken(u64);

impl SubscriptionToken {
    pub fn id(&self) -> u64 {
        self.0
    }
}

#[derive(Debug)]
struct Subscriber {
    id: u64,
    pending: Vec<QuarterNote>,
}

/// Observer list for quarter notes.
///
/// Each subscriber owns an inbox; publishing appends to every inbox and the
/// subscriber drains its own with [`QuarterNoteBus::drain`].
#[derive(Debug, Default)]
pub struct QuarterNoteBus {
    next_id: u64,
    subscribers: Vec<Subscriber>,
}

impl QuarterNoteBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> SubscriptionToken {
        let id = self.next_id;
        self.next_id += 1;
        self.subscribers.push(Subscriber {
            id,
            pending: Vec::new(),
        });
        log::debug!("Quarter note subscriber {} attached", id);
        SubscriptionToken(id)
    }

    /// Remove a subscription. Undelivered notes are dropped.
    pub fn unsubscribe(&mut self, token: SubscriptionToken) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s.id != token.0);
        let removed = self.subscribers.len() != before;
        if removed {
            log::debug!("Quarter note subscriber {} detached", token.0);
        }
        removed
    }

    pub fn publish(&mut self, note: QuarterNote) {
        for subscriber in &mut self.subscribers {
            subscriber.pending.push(note);
        }
    }

    /// Take every note delivered to this subscriber since the last drain
    pub fn drain(&mut self, token: &SubscriptionToken) -> Vec<QuarterNote> {
        self.subscribers
            .iter_mut()
            .find(|s| s.id == token.0)
            .map(|s| std::mem::take(&mut s.pending))
            .unwrap_or_default()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

// ---------------------------------------------------------------------------
// Playback boundary
// ---------------------------------------------------------------------------

/// The music player the clock follows.
///
/// Audio decoding and mixing live outside the simulation; the clock only
/// needs to start/fade tracks and read back position and volume.
pub trait MusicPlayback {
    fn is_playing(&self) -> bool;
    /// Position in the current track (seconds)
    fn position(&self) -> f64;
    /// Current music volume, 0.0 - 1.0
    fn volume(&self) -> f32;
    /// Start `track` from the beginning, fading in over `secs`
    fn fade_in(&mut self, track: usize, secs: f64);
    /// Fade the current track out over `secs`; music stops at zero volume
    fn fade_out(&mut self, secs: f64);
    /// Jump back to the start of the current track
    fn rewind(&mut self);
    /// Called once per simulation tick. Real backends progress on their own.
    fn advance(&mut self, _dt: f64) {}
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Fade {
    from: f32,
    to: f32,
    elapsed: f64,
    duration: f64,
}

/// Deterministic stand-in for an audio backend (headless runs and tests).
///
/// Position advances with simulated time and fades are linear.
#[derive(Debug, Clone, Default)]
pub struct SimulatedPlayback {
    track: Option<usize>,
    position: f64,
    volume: f32,
    fade: Option<Fade>,
}

impl SimulatedPlayback {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track currently playing, if any
    pub fn track(&self) -> Option<usize> {
        self.track
    }
}

impl MusicPlayback for SimulatedPlayback {
    fn is_playing(&self) -> bool {
        self.track.is_some()
    }

    fn position(&self) -> f64 {
        self.position
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn fade_in(&mut self, track: usize, secs: f64) {
        self.track = Some(track);
        self.position = 0.0;
        if secs > 0.0 {
            self.volume = 0.0;
            self.fade = Some(Fade {
                from: 0.0,
                to: 1.0,
                elapsed: 0.0,
                duration: secs,
            });
        } else {
            self.volume = 1.0;
            self.fade = None;
        }
    }

    fn fade_out(&mut self, secs: f64) {
        if self.track.is_none() {
            return;
        }
        if secs > 0.0 {
            self.fade = Some(Fade {
                from: self.volume,
                to: 0.0,
                elapsed: 0.0,
                duration: secs,
            });
        } else {
            self.volume = 0.0;
            self.fade = None;
            self.track = None;
        }
    }

    fn rewind(&mut self) {
        self.position = 0.0;
    }

    fn advance(&mut self, dt: f64) {
        if self.track.is_none() {
            return;
        }
        self.position += dt;

        if let Some(mut fade) = self.fade.take() {
            fade.elapsed += dt;
            let t = (fade.elapsed / fade.duration).min(1.0) as f32;
            self.volume = fade.from + (fade.to - fade.from) * t;
            if t < 1.0 {
                self.fade = Some(fade);
            } else if fade.to <= 0.0 {
                self.volume = 0.0;
                self.track = None;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Musical clock
#[derive(Debug)]
pub struct BeatClock {
    beats: Vec<Beat>,
    /// Index of the beat currently driving the note lengths
    current_beat: usize,
    /// Beat to install once a tempo change has faded out
    pending_beat: usize,
    accepted_offset: f64,
    data: BeatSnapshot,
    load_time: f64,
    loading: bool,
    changing_beat: bool,
    quarter_notes: QuarterNoteBus,
}

impl BeatClock {
    /// Create a clock for a beat table. An empty table falls back to the defaults.
    pub fn new(beats: Vec<Beat>, accepted_offset: f64) -> Self {
        let beats = if beats.is_empty() {
            log::warn!("Empty beat table, using default beats");
            default_beats()
        } else {
            beats
        };
        let data = BeatSnapshot::for_beat(&beats[0]);
        Self {
            beats,
            current_beat: 0,
            pending_beat: 0,
            accepted_offset,
            data,
            load_time: LOAD_GRACE_SECS,
            loading: true,
            changing_beat: false,
            quarter_notes: QuarterNoteBus::new(),
        }
    }

    /// Public fields for rendering and timing checks
    pub fn snapshot(&self) -> BeatSnapshot {
        self.data
    }

    pub fn current_beat(&self) -> &Beat {
        &self.beats[self.current_beat]
    }

    pub fn current_beat_index(&self) -> usize {
        self.current_beat
    }

    pub fn accepted_offset(&self) -> f64 {
        self.accepted_offset
    }

    /// Waiting for playback to settle before counting notes
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// A tempo change is fading out
    pub fn is_changing_beat(&self) -> bool {
        self.changing_beat
    }

    pub fn quarter_notes(&mut self) -> &mut QuarterNoteBus {
        &mut self.quarter_notes
    }

    /// Start the current beat's track and enter the loading grace period
    pub fn start_playing(&mut self, playback: &mut dyn MusicPlayback) {
        playback.fade_in(self.current_beat, self.data.whole_note_length * 2.0);
        self.load_time = LOAD_GRACE_SECS;
        self.loading = true;
    }

    /// Begin a tempo change. `None` cycles to the next beat.
    ///
    /// Returns false (and does nothing) for an out-of-range index.
    pub fn change_beat(&mut self, index: Option<usize>, playback: &mut dyn MusicPlayback) -> bool {
        let next = match index {
            Some(i) if i < self.beats.len() => i,
            Some(_) => return false,
            None => (self.current_beat + 1) % self.beats.len(),
        };
        self.pending_beat = next;
        self.changing_beat = true;
        playback.fade_out(BEAT_CHANGE_FADE_SECS);
        log::info!(
            "Tempo change: {} -> {} ({} bpm)",
            self.beats[self.current_beat].name,
            self.beats[next].name,
            self.beats[next].bpm
        );
        true
    }

    /// Advance by `dt` seconds of real time.
    ///
    /// Returns false while loading or when no music is playing, in which case
    /// the counters, flags and progress values are left untouched.
    pub fn update(&mut self, dt: f64, playback: &mut dyn MusicPlayback) -> bool {
        if self.loading {
            if playback.position() > self.load_time {
                self.loading = false;
                self.data.time_since_quarter_note = -AUDIO_LATENCY_SECS;
                self.data.time_since_half_note = -AUDIO_LATENCY_SECS;
                self.data.time_since_whole_note = -AUDIO_LATENCY_SECS;
                self.data.current_quarter_note = 1;
                playback.rewind();
            }
            return false;
        }

        if self.changing_beat && playback.volume() <= 0.0 {
            self.install_pending_beat();
            self.start_playing(playback);
            return false;
        }

        if !playback.is_playing() {
            return false;
        }

        self.advance(dt);
        true
    }

    fn install_pending_beat(&mut self) {
        self.current_beat = self.pending_beat;
        self.changing_beat = false;
        let beat = &self.beats[self.current_beat];
        self.data.quarter_note_length = beat.quarter_note_length();
        self.data.half_note_length = beat.half_note_length();
        self.data.whole_note_length = beat.whole_note_length();
    }

    fn advance(&mut self, dt: f64) {
        let signature = self.beats[self.current_beat].time_signature.max(1);
        let data = &mut self.data;

        data.time_since_whole_note += dt;
        data.time_since_half_note += dt;
        data.time_since_quarter_note += dt;

        if data.time_since_quarter_note >= data.quarter_note_length {
            data.time_since_quarter_note -= data.quarter_note_length;
            data.current_quarter_note = (data.current_quarter_note % signature) + 1;
            self.quarter_notes.publish(QuarterNote {
                index: data.current_quarter_note,
            });

            if data.current_quarter_note == 1 {
                data.time_since_whole_note -= data.whole_note_length;
                data.time_since_half_note -= data.half_note_length;
            } else if data.current_quarter_note == 3 {
                data.time_since_half_note -= data.half_note_length;
            }
        }

        let offset = self.accepted_offset;
        data.whole_note_active =
            note_window_active(data.time_since_whole_note, data.whole_note_length, offset);
        data.half_note_active =
            note_window_active(data.time_since_half_note, data.half_note_length, offset);
        data.quarter_note_active =
            note_window_active(data.time_since_quarter_note, data.quarter_note_length, offset);

        data.quarter_note_progress =
            (data.time_since_quarter_note / data.quarter_note_length) as f32;
        data.half_note_progress = (data.time_since_half_note / data.half_note_length) as f32;
        data.whole_note_progress = (data.time_since_whole_note / data.whole_note_length) as f32;

        data.pulse_multiplier = pulse_multiplier(data.half_note_progress);
    }
}

use serde::Serialize;

use super::quantize::Quantizer;
use crate::data::model::Sample;

/// Channel of the single-instrument emission and absorption streams, and
/// of the emission voice in the combined stream.
pub const EMISSION_CHANNEL: u8 = 0;
/// Channel of the absorption voice in the combined stream.
pub const ABSORPTION_CHANNEL: u8 = 1;
pub const SOUNDING_VELOCITY: u8 = 100;

// ---------------------------------------------------------------------------
// NoteEvent / EventStream
// ---------------------------------------------------------------------------

/// One timed note. Times and durations are in beats.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NoteEvent {
    pub pitch: u8,
    pub start_time: f64,
    pub duration: f64,
    pub velocity: u8,
    pub channel: u8,
}

impl NoteEvent {
    /// Velocity-0 placeholder keeping two streams aligned in time.
    pub fn silent(start_time: f64, duration: f64, channel: u8) -> Self {
        Self {
            pitch: 0,
            start_time,
            duration,
            velocity: 0,
            channel,
        }
    }

    pub fn is_silent(&self) -> bool {
        self.velocity == 0
    }
}

/// A program bound to a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InstrumentAssignment {
    pub program: u8,
    pub channel: u8,
}

/// Ordered note events plus the tempo and instruments to play them with.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventStream {
    pub tempo: u16,
    pub instruments: Vec<InstrumentAssignment>,
    pub events: Vec<NoteEvent>,
}

impl EventStream {
    pub fn new(tempo: u16, instruments: Vec<InstrumentAssignment>) -> Self {
        Self {
            tempo,
            instruments,
            events: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events that actually make a sound.
    pub fn sounding(&self) -> impl Iterator<Item = &NoteEvent> {
        self.events.iter().filter(|e| !e.is_silent())
    }
}

/// The three time-aligned streams of one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamSet {
    pub emission: EventStream,
    pub absorption: EventStream,
    pub combined: EventStream,
}

// ---------------------------------------------------------------------------
// Sequencer
// ---------------------------------------------------------------------------

/// Playback settings shared by all three streams.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Voicing {
    pub tempo: u16,
    /// Beats per sample.
    pub note_duration: f64,
    pub emission_program: u8,
    pub absorption_program: u8,
}

/// Walk the windowed samples in order and split them into emission and
/// absorption events against `threshold` (the baseline mean).
///
/// Every stream receives exactly one event per sample.
pub fn sequence(
    samples: &[Sample],
    quantizer: &Quantizer,
    threshold: f64,
    voicing: &Voicing,
) -> StreamSet {
    let emission_voice = InstrumentAssignment {
        program: voicing.emission_program,
        channel: EMISSION_CHANNEL,
    };
    let mut emission = EventStream::new(voicing.tempo, vec![emission_voice]);
    let mut absorption = EventStream::new(
        voicing.tempo,
        vec![InstrumentAssignment {
            program: voicing.absorption_program,
            channel: EMISSION_CHANNEL,
        }],
    );
    let mut combined = EventStream::new(
        voicing.tempo,
        vec![
            emission_voice,
            InstrumentAssignment {
                program: voicing.absorption_program,
                channel: ABSORPTION_CHANNEL,
            },
        ],
    );

    let duration = voicing.note_duration;
    for (i, sample) in samples.iter().enumerate() {
        let start_time = i as f64 * duration;
        let pitch = quantizer.quantize(sample.intensity);
        let note = |channel| NoteEvent {
            pitch,
            start_time,
            duration,
            velocity: SOUNDING_VELOCITY,
            channel,
        };

        if sample.intensity >= threshold {
            emission.events.push(note(EMISSION_CHANNEL));
            combined.events.push(note(EMISSION_CHANNEL));
            absorption
                .events
                .push(NoteEvent::silent(start_time, duration, EMISSION_CHANNEL));
        } else {
            absorption.events.push(note(EMISSION_CHANNEL));
            combined.events.push(note(ABSORPTION_CHANNEL));
            emission
                .events
                .push(NoteEvent::silent(start_time, duration, EMISSION_CHANNEL));
        }
    }

    log::debug!(
        "sequenced {} samples: {} emission, {} absorption",
        samples.len(),
        emission.sounding().count(),
        absorption.sounding().count()
    );

    StreamSet {
        emission,
        absorption,
        combined,
    }
}

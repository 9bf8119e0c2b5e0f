//! Standard MIDI File (format 1) serialization of event streams.
//!
//! One track per instrument assignment. Each track opens with a tempo
//! meta-event and a program change at tick 0, followed by the note-on /
//! note-off pairs of the events on that track's channel.

use std::io::Write;
use std::path::Path;

use super::sequencer::{EventStream, NoteEvent};
use crate::error::{Result, SonifyError};

pub const TICKS_PER_BEAT: u16 = 960;
/// Channels are 4-bit in channel-voice messages.
pub const MAX_CHANNEL: u8 = 15;
pub const MAX_PROGRAM: u8 = 127;
/// Largest value a variable-length quantity may carry.
const MAX_VLQ: u64 = 0x0FFF_FFFF;

// ordering of simultaneous events within a track
const ORDER_TEMPO: u8 = 0;
const ORDER_PROGRAM: u8 = 1;
const ORDER_NOTE_OFF: u8 = 2;
const ORDER_NOTE_ON: u8 = 3;

/// Convert a time in beats to ticks.
pub fn beats_to_ticks(beats: f64) -> u64 {
    (beats * TICKS_PER_BEAT as f64).round().max(0.0) as u64
}

/// Reject program numbers above 127 and channels above 15.
pub fn validate_instruments(stream: &EventStream) -> Result<()> {
    for inst in &stream.instruments {
        if inst.program > MAX_PROGRAM || inst.channel > MAX_CHANNEL {
            return Err(SonifyError::InvalidInstrument {
                program: inst.program,
                channel: inst.channel,
            });
        }
    }
    for event in &stream.events {
        if event.channel > MAX_CHANNEL {
            return Err(SonifyError::InvalidInstrument {
                program: 0,
                channel: event.channel,
            });
        }
    }
    Ok(())
}

/// Encode a stream as SMF bytes.
///
/// Events on a channel with no assignment land on the first track.
pub fn encode(stream: &EventStream) -> Result<Vec<u8>> {
    validate_instruments(stream)?;
    if stream.tempo == 0 {
        return Err(SonifyError::InvalidTempo(0));
    }

    let channels: Vec<Option<u8>> = if stream.instruments.is_empty() {
        vec![None]
    } else {
        stream.instruments.iter().map(|i| Some(i.channel)).collect()
    };

    let mut tracks: Vec<TrackBuilder> = channels
        .iter()
        .map(|_| TrackBuilder::new(stream.tempo))
        .collect();

    for (track, inst) in tracks.iter_mut().zip(&stream.instruments) {
        track.program_change(inst.program, inst.channel);
    }

    for event in &stream.events {
        let idx = channels
            .iter()
            .position(|c| *c == Some(event.channel))
            .unwrap_or(0);
        tracks[idx].note(event);
    }

    let tracks: Vec<Vec<u8>> = tracks.into_iter().map(TrackBuilder::finish).collect();
    Ok(assemble(&tracks))
}

/// Encode `stream` and write it to `path` atomically.
pub fn write_container(stream: &EventStream, path: &Path) -> Result<()> {
    let bytes = encode(stream)?;
    write_atomic(&bytes, path)
}

/// Write bytes to a temporary file next to `path`, then rename it over
/// `path`. On failure the temporary file is removed and `path` is untouched.
pub fn write_atomic(bytes: &[u8], path: &Path) -> Result<()> {
    let io_err = |source: std::io::Error| SonifyError::Io {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
    tmp.write_all(bytes).map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;

    log::info!("wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}

// ---------------------------------------------------------------------------
// Track assembly
// ---------------------------------------------------------------------------

struct TrackBuilder {
    events: Vec<(u64, u8, Vec<u8>)>,
}

impl TrackBuilder {
    fn new(tempo: u16) -> Self {
        let usec = 60_000_000u32 / tempo as u32;
        let mut track = TrackBuilder { events: Vec::new() };
        track.events.push((
            0,
            ORDER_TEMPO,
            vec![
                0xFF,
                0x51,
                0x03,
                (usec >> 16) as u8,
                (usec >> 8) as u8,
                usec as u8,
            ],
        ));
        track
    }

    fn program_change(&mut self, program: u8, channel: u8) {
        self.events
            .push((0, ORDER_PROGRAM, vec![0xC0 | (channel & 0x0F), program & 0x7F]));
    }

    fn note(&mut self, event: &NoteEvent) {
        let on = beats_to_ticks(event.start_time);
        let off = on + beats_to_ticks(event.duration);
        let status = event.channel & 0x0F;
        let pitch = event.pitch & 0x7F;
        self.events.push((
            on,
            ORDER_NOTE_ON,
            vec![0x90 | status, pitch, event.velocity & 0x7F],
        ));
        self.events
            .push((off, ORDER_NOTE_OFF, vec![0x80 | status, pitch, 0]));
    }

    fn finish(mut self) -> Vec<u8> {
        // stable: equal (tick, order) keep insertion order
        self.events.sort_by_key(|(tick, order, _)| (*tick, *order));

        let mut data = Vec::new();
        let mut now = 0u64;
        for (tick, _, bytes) in self.events {
            Self::push_delta(&mut data, tick - now);
            data.extend_from_slice(&bytes);
            now = tick;
        }
        Self::push_delta(&mut data, 0);
        data.extend_from_slice(&[0xFF, 0x2F, 0x00]);
        data
    }

    /// Delta time as base-128 digits, most significant first, with the
    /// high bit set on all but the last byte. Clamped to four bytes.
    fn push_delta(out: &mut Vec<u8>, delta: u64) {
        let delta = delta.min(MAX_VLQ);
        let mut shift = 21;
        while shift > 0 && delta >> shift == 0 {
            shift -= 7;
        }
        while shift > 0 {
            out.push(((delta >> shift) & 0x7F) as u8 | 0x80);
            shift -= 7;
        }
        out.push((delta & 0x7F) as u8);
    }
}

/// Header chunk followed by one `MTrk` chunk per track.
fn assemble(tracks: &[Vec<u8>]) -> Vec<u8> {
    let body: usize = tracks.iter().map(|t| t.len() + 8).sum();
    let mut out = Vec::with_capacity(14 + body);
    out.extend_from_slice(b"MThd");
    out.extend_from_slice(&6u32.to_be_bytes());
    for word in [1u16, tracks.len() as u16, TICKS_PER_BEAT] {
        out.extend_from_slice(&word.to_be_bytes());
    }
    for track in tracks {
        out.extend_from_slice(b"MTrk");
        out.extend_from_slice(&(track.len() as u32).to_be_bytes());
        out.extend_from_slice(track);
    }
    out
}

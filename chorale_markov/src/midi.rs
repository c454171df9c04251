// MIDI output from chord sequences.
//
// Writes a Standard MIDI File (format 1): a tempo track, then one track per
// voice. Each voice is laid out on its own timeline: a note slot sounds for
// its duration, a rest slot advances time silently, and a zero-duration slot
// is a sustain that adds nothing (the note before it already covers it).
// Delta times are limited to 28 bits; a slot or gap longer than that is a
// `Render` error rather than a wrapped timestamp.
//
// Uses the `midly` crate for encoding.

use crate::chord::{ChordSequence, Pitch, Voice};
use crate::error::{KgramError, Result};
use midly::{
    Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind,
    num::{u4, u7, u15, u24, u28},
};
use std::path::Path;

/// Ticks per quarter note (one beat).
const TICKS_PER_BEAT: u16 = 480;

const VELOCITY: u8 = 80;

/// Melodic channels; 9 is General MIDI percussion.
const CHANNELS: [u8; 15] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 10, 11, 12, 13, 14, 15];

/// Render `sequence` and write it to `path`.
pub fn write_midi(sequence: &ChordSequence, tempo_bpm: u16, program: u8, path: &Path) -> Result<()> {
    let smf = sequence_to_smf(sequence, tempo_bpm, program)?;
    let mut buf = Vec::new();
    smf.write_std(&mut buf)?;
    std::fs::write(path, &buf)?;
    Ok(())
}

/// Build an in-memory SMF for `sequence`.
pub fn sequence_to_smf(
    sequence: &ChordSequence,
    tempo_bpm: u16,
    program: u8,
) -> Result<Smf<'static>> {
    let mut smf = Smf::new(Header::new(
        Format::Parallel,
        Timing::Metrical(u15::new(TICKS_PER_BEAT)),
    ));

    let tempo_microseconds = (60_000_000 / u32::from(tempo_bpm.max(1))).min(0xFF_FFFF);
    smf.tracks.push(vec![
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(tempo_microseconds))),
        },
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
        },
    ]);

    for voice in 0..sequence.voices() {
        let channel = u4::new(CHANNELS[voice % CHANNELS.len()]);
        let name = Voice::from_index(voice).map_or("Voice", Voice::name);
        let mut track: Track<'static> = vec![
            TrackEvent {
                delta: u28::new(0),
                kind: TrackEventKind::Meta(MetaMessage::TrackName(name.as_bytes())),
            },
            TrackEvent {
                delta: u28::new(0),
                kind: TrackEventKind::Midi {
                    channel,
                    message: MidiMessage::ProgramChange {
                        program: u7::new(program.min(127)),
                    },
                },
            },
        ];

        let mut now: u64 = 0;
        let mut last_event: u64 = 0;
        let slots = sequence.pitches[voice].iter().zip(&sequence.durations[voice]);
        for (&pitch, duration) in slots {
            if duration.is_zero() {
                continue;
            }
            let ticks = duration_ticks(duration.value())?;
            if let Pitch::Note(p) = pitch {
                let key = u7::new(p.clamp(0, 127) as u8);
                track.push(TrackEvent {
                    delta: delta_time(now - last_event)?,
                    kind: TrackEventKind::Midi {
                        channel,
                        message: MidiMessage::NoteOn {
                            key,
                            vel: u7::new(VELOCITY),
                        },
                    },
                });
                track.push(TrackEvent {
                    delta: ticks,
                    kind: TrackEventKind::Midi {
                        channel,
                        message: MidiMessage::NoteOff {
                            key,
                            vel: u7::new(0),
                        },
                    },
                });
                last_event = now + u64::from(ticks.as_int());
            }
            now += u64::from(ticks.as_int());
        }

        track.push(TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
        });
        smf.tracks.push(track);
    }

    Ok(smf)
}

fn duration_ticks(beats: f64) -> Result<u28> {
    let ticks = (beats * f64::from(TICKS_PER_BEAT)).round();
    if ticks > f64::from(u28::max_value().as_int()) {
        return Err(KgramError::Render {
            reason: format!("a {beats}-beat slot exceeds the MIDI delta-time range"),
        });
    }
    Ok(u28::new(ticks as u32))
}

fn delta_time(ticks: u64) -> Result<u28> {
    u32::try_from(ticks)
        .ok()
        .and_then(u28::try_from)
        .ok_or_else(|| KgramError::Render {
            reason: format!("a {ticks}-tick gap exceeds the MIDI delta-time range"),
        })
}

// Corpus ingestion: every K-window of a piece, with wraparound, into the
// engine.
//
// A piece is treated as circular: its first K chords are appended to its
// end before windowing, so a piece of L chords yields exactly L windows and
// the closing chords lead back into the opening as if the piece repeated.
//
// Windows whose chords, or whose successor chord, contain a rest cannot be
// encoded intervallically; they are skipped and counted, not recorded.
//
// Ingestion is all-or-nothing per piece: every window is validated and
// encoded before the first count is written.

use crate::chord::{Chord, ChordSequence};
use crate::codec::{Fingerprint, Successor, SuccessorKey, encode_successor, encode_window};
use crate::engine::KgramEngine;
use crate::error::{KgramError, Result};
use rayon::prelude::*;
use tracing::{debug, info, warn};

/// Outcome of ingesting one piece. `recorded + skipped` is the piece length.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub recorded: usize,
    pub skipped: usize,
}

/// Totals across a training run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrainingReport {
    pub pieces: usize,
    pub recorded: usize,
    pub skipped: usize,
    pub fingerprints: usize,
}

impl TrainingReport {
    fn absorb(&mut self, piece: IngestReport) {
        self.pieces += 1;
        self.recorded += piece.recorded;
        self.skipped += piece.skipped;
    }

    fn combine(mut self, other: TrainingReport) -> TrainingReport {
        self.pieces += other.pieces;
        self.recorded += other.recorded;
        self.skipped += other.skipped;
        self
    }
}

/// Record every circular window of `piece` into `engine`.
pub fn ingest(engine: &mut KgramEngine, piece: &ChordSequence) -> Result<IngestReport> {
    let (pairs, skipped) = encoded_windows(engine.window_len(), engine.voices(), piece)?;
    let report = IngestReport {
        recorded: pairs.len(),
        skipped,
    };
    for (fingerprint, successor) in pairs {
        engine.record_encoded(fingerprint, successor);
    }
    if report.recorded == 0 {
        warn!(skipped, "piece contributed no windows");
    } else {
        debug!(recorded = report.recorded, skipped, "ingested piece");
    }
    Ok(report)
}

/// Ingest `pieces` in order into a fresh engine.
pub fn train(
    window_len: usize,
    voices: usize,
    pieces: &[ChordSequence],
) -> Result<(KgramEngine, TrainingReport)> {
    check_window_len(window_len)?;
    let mut engine = KgramEngine::new(window_len, voices)?;
    let mut report = TrainingReport::default();
    for piece in pieces {
        report.absorb(ingest(&mut engine, piece)?);
    }
    report.fingerprints = engine.table().fingerprint_count();
    log_summary(&report);
    Ok((engine, report))
}

/// Same table as `train`, built one piece per rayon task and merged by
/// summing counts.
pub fn train_parallel(
    window_len: usize,
    voices: usize,
    pieces: &[ChordSequence],
) -> Result<(KgramEngine, TrainingReport)> {
    check_window_len(window_len)?;
    let empty = KgramEngine::new(window_len, voices)?;
    let (engine, mut report) = pieces
        .par_iter()
        .map(|piece| {
            let mut engine = empty.clone();
            let mut report = TrainingReport::default();
            report.absorb(ingest(&mut engine, piece)?);
            Ok::<_, KgramError>((engine, report))
        })
        .try_reduce(
            || (empty.clone(), TrainingReport::default()),
            |(mut engine, report), (other, other_report)| {
                engine.merge(other)?;
                Ok::<_, KgramError>((engine, report.combine(other_report)))
            },
        )?;
    report.fingerprints = engine.table().fingerprint_count();
    log_summary(&report);
    Ok((engine, report))
}

fn log_summary(report: &TrainingReport) {
    info!(
        pieces = report.pieces,
        windows = report.recorded,
        skipped = report.skipped,
        fingerprints = report.fingerprints,
        "training complete"
    );
}

/// Validate `piece` and encode every circular window that can be encoded.
/// Returns the encoded pairs and the number of windows skipped for rests.
fn check_window_len(window_len: usize) -> Result<()> {
    if window_len == 0 {
        return Err(KgramError::malformed("window length must be positive"));
    }
    Ok(())
}

fn encoded_windows(
    window_len: usize,
    voices: usize,
    piece: &ChordSequence,
) -> Result<(Vec<(Fingerprint, SuccessorKey)>, usize)> {
    piece.validate()?;
    if piece.voices() != voices {
        return Err(KgramError::malformed(format!(
            "piece has {} voices, engine expects {voices}",
            piece.voices()
        )));
    }
    let len = piece.len();
    if len < window_len {
        return Err(KgramError::malformed(format!(
            "piece has {len} chords, shorter than the window length {window_len}"
        )));
    }

    let mut chords: Vec<Chord> = piece.chords().collect();
    chords.extend_from_within(..window_len);

    let mut pairs = Vec::with_capacity(len);
    let mut skipped = 0;
    for start in 0..len {
        let window = &chords[start..start + window_len];
        let next = &chords[start + window_len];
        if window.iter().any(Chord::has_rest) {
            skipped += 1;
            continue;
        }
        let Some(successor) = Successor::between(&window[window_len - 1], next) else {
            skipped += 1;
            continue;
        };
        pairs.push((encode_window(window)?, encode_successor(&successor)));
    }
    Ok((pairs, skipped))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chord::{Beats, Pitch};
    use crate::codec::decode_successor;

    fn beats(v: f64) -> Beats {
        Beats::new(v).unwrap()
    }

    fn piece(rows: &[[i32; 4]]) -> ChordSequence {
        let chords: Vec<Chord> = rows.iter().map(|r| Chord::notes(r, beats(1.0))).collect();
        ChordSequence::from_chords(4, &chords).unwrap()
    }

    fn chorale() -> ChordSequence {
        piece(&[
            [67, 62, 59, 43],
            [67, 62, 59, 55],
            [72, 64, 60, 52],
            [71, 62, 55, 55],
            [72, 64, 55, 48],
        ])
    }

    #[test]
    fn wraparound_yields_one_window_per_chord() {
        for k in 1..=5 {
            let mut engine = KgramEngine::new(k, 4).unwrap();
            let report = ingest(&mut engine, &chorale()).unwrap();
            assert_eq!(report, IngestReport { recorded: 5, skipped: 0 }, "K={k}");
            assert_eq!(engine.table().transition_count(), 5);
        }
    }

    #[test]
    fn last_window_wraps_to_opening() {
        let mut engine = KgramEngine::new(2, 4).unwrap();
        ingest(&mut engine, &chorale()).unwrap();
        // Window (chord 4, chord 0) is followed by chord 1.
        let p = chorale();
        let window = [p.chord(4).unwrap(), p.chord(0).unwrap()];
        let fp = encode_window(&window).unwrap();
        let counts = engine.table().successors(&fp).unwrap();
        let (key, &count) = counts.iter().next().unwrap();
        assert_eq!(count, 1);
        assert_eq!(decode_successor(key).deltas, vec![0, 0, 0, 12]);
    }

    #[test]
    fn repeated_shapes_share_a_fingerprint() {
        // Chord 1 is chord 0 transposed, with the same successor motion.
        let p = piece(&[[60, 55, 52, 48], [62, 57, 54, 50], [64, 59, 56, 52]]);
        let mut engine = KgramEngine::new(1, 4).unwrap();
        let report = ingest(&mut engine, &p).unwrap();
        assert_eq!(report.recorded, 3);
        // All three chords share one shape; two successors are +2, one is -4.
        assert_eq!(engine.table().fingerprint_count(), 1);
        assert_eq!(engine.table().transition_count(), 3);
        let (_, counts) = engine.table().iter().next().unwrap();
        let mut sorted: Vec<u32> = counts.values().copied().collect();
        sorted.sort_unstable();
        assert_eq!(sorted, vec![1, 2]);
    }

    #[test]
    fn rest_windows_are_skipped_and_counted() {
        let mut p = chorale();
        p.pitches[1][2] = Pitch::Rest;
        let mut engine = KgramEngine::new(2, 4).unwrap();
        let report = ingest(&mut engine, &p).unwrap();
        // Chord 2 is in windows starting at 1 and 2 and is the successor of
        // the window starting at 0.
        assert_eq!(report, IngestReport { recorded: 2, skipped: 3 });
        assert_eq!(engine.table().transition_count(), 2);
    }

    #[test]
    fn short_piece_rejected_without_mutation() {
        let mut engine = KgramEngine::new(3, 4).unwrap();
        let err = ingest(&mut engine, &piece(&[[60, 55, 52, 48], [62, 57, 54, 50]])).unwrap_err();
        assert!(matches!(err, KgramError::MalformedTrainingData { .. }));
        assert!(engine.table().is_empty());
    }

    #[test]
    fn ragged_voices_rejected_without_mutation() {
        let mut p = chorale();
        p.pitches[3].pop();
        p.durations[3].pop();
        let mut engine = KgramEngine::new(2, 4).unwrap();
        assert!(matches!(
            ingest(&mut engine, &p).unwrap_err(),
            KgramError::MalformedTrainingData { .. }
        ));
        assert!(engine.table().is_empty());
    }

    #[test]
    fn voice_count_mismatch_rejected() {
        let three: Vec<Chord> = (0..3).map(|i| Chord::notes(&[60 + i, 55, 48], beats(1.0))).collect();
        let p = ChordSequence::from_chords(3, &three).unwrap();
        let mut engine = KgramEngine::new(1, 4).unwrap();
        assert!(ingest(&mut engine, &p).is_err());
    }

    #[test]
    fn parallel_training_matches_sequential() {
        let pieces = [
            chorale(),
            piece(&[[60, 55, 52, 48], [62, 57, 54, 50], [64, 59, 50, 48]]),
            piece(&[[67, 62, 59, 55], [69, 64, 61, 57], [71, 67, 62, 55]]),
            chorale(),
        ];
        let (sequential, seq_report) = train(2, 4, &pieces).unwrap();
        let (parallel, par_report) = train_parallel(2, 4, &pieces).unwrap();
        assert_eq!(sequential.table(), parallel.table());
        assert_eq!(seq_report, par_report);
        assert_eq!(seq_report.pieces, 4);
        assert_eq!(seq_report.recorded, 16);
    }

    #[test]
    fn training_propagates_bad_piece() {
        let pieces = [chorale(), piece(&[[60, 55, 52, 48]])];
        assert!(train(2, 4, &pieces).is_err());
        assert!(train_parallel(2, 4, &pieces).is_err());
    }

    #[test]
    fn zero_window_len_is_malformed_training() {
        let pieces = [chorale()];
        for result in [train(0, 4, &pieces), train_parallel(0, 4, &pieces)] {
            assert!(matches!(
                result.unwrap_err(),
                KgramError::MalformedTrainingData { .. }
            ));
        }
    }

    #[test]
    fn out_of_range_pitch_rejected_without_mutation() {
        let mut engine = KgramEngine::new(1, 4).unwrap();
        let mut p = chorale();
        p.pitches[0][1] = Pitch::Note(2_000_000_000);
        p.pitches[0][2] = Pitch::Note(-2_000_000_000);
        assert!(matches!(
            ingest(&mut engine, &p).unwrap_err(),
            KgramError::MalformedTrainingData { .. }
        ));
        assert!(engine.table().is_empty());
    }
}

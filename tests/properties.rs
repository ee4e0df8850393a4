//! Property tests: delivery-independence and event invariants

use std::collections::VecDeque;

use hoopsense::core::{ClassifierOptions, MergeMode, ShotClassifier};
use hoopsense::types::{
    timestamp_micros, BasketType, ClassifierPhase, RawSample, ShotEvent, ThresholdConfig,
};
use proptest::prelude::*;

/// Per-sensor ordered stream; `min_step_ms` of 0 allows ties across sensors
fn stream(min_step_ms: u32) -> impl Strategy<Value = Vec<RawSample>> {
    prop::collection::vec((any::<bool>(), min_step_ms..300u32, 0u8..3), 0..150).prop_map(|steps| {
        let mut ms = 0u32;
        steps
            .into_iter()
            .map(|(is_accel, dt, kind)| {
                ms += dt;
                let t = f64::from(ms) / 1000.0;
                match (is_accel, kind) {
                    (true, 0) => RawSample::accel(t, 6.5),
                    (true, _) => RawSample::accel(t, 1.0),
                    (false, 0) => RawSample::distance(t, 200, 1500.0),
                    (false, 1) => RawSample::distance(t, 800, 100.0),
                    (false, _) => RawSample::distance(t, 0xFFFE, 0.0),
                }
            })
            .collect()
    })
}

/// Split into per-sensor chunks delivered in an arbitrary interleaving, the
/// way packets from two sensors that lag each other arrive.
fn per_sensor_batches(
    samples: &[RawSample],
    accel_size: usize,
    distance_size: usize,
    picks: &[bool],
) -> Vec<Vec<RawSample>> {
    let (accel, distance): (Vec<RawSample>, Vec<RawSample>) = samples
        .iter()
        .copied()
        .partition(|s| matches!(s, RawSample::Accel { .. }));
    let mut accel: VecDeque<Vec<RawSample>> = accel.chunks(accel_size).map(<[RawSample]>::to_vec).collect();
    let mut distance: VecDeque<Vec<RawSample>> =
        distance.chunks(distance_size).map(<[RawSample]>::to_vec).collect();

    let mut batches = Vec::new();
    let mut i = 0;
    while !accel.is_empty() || !distance.is_empty() {
        let next = if picks[i % picks.len()] {
            accel.pop_front().or_else(|| distance.pop_front())
        } else {
            distance.pop_front().or_else(|| accel.pop_front())
        };
        batches.extend(next);
        i += 1;
    }
    batches
}

fn contiguous_batches(samples: &[RawSample], sizes: &[usize]) -> Vec<Vec<RawSample>> {
    let mut batches = Vec::new();
    let mut rest = samples;
    let mut i = 0;
    while !rest.is_empty() {
        let n = sizes[i % sizes.len()].min(rest.len());
        let (head, tail) = rest.split_at(n);
        batches.push(head.to_vec());
        rest = tail;
        i += 1;
    }
    batches
}

fn classifier(merge_mode: MergeMode) -> ShotClassifier {
    let options = ClassifierOptions { merge_mode, ..Default::default() };
    ShotClassifier::with_options(ThresholdConfig::default(), options).unwrap()
}

fn run_batches(batches: &[Vec<RawSample>], c: &mut ShotClassifier) -> Vec<ShotEvent> {
    let mut events = Vec::new();
    for batch in batches {
        events.extend(c.process_batch(batch).unwrap());
    }
    events.extend(c.flush().unwrap());
    events
}

fn run_whole(samples: &[RawSample], mode: MergeMode) -> Vec<ShotEvent> {
    run_batches(&[samples.to_vec()], &mut classifier(mode))
}

fn check_well_formed(events: &[ShotEvent]) -> Result<(), TestCaseError> {
    let max = timestamp_micros(ThresholdConfig::default().max_time_after_impact);
    let mut last_basket = None;
    for event in events {
        match *event {
            ShotEvent::Make { impact_time: Some(impact), basket_time, confidence, .. } => {
                let elapsed = timestamp_micros(basket_time) - timestamp_micros(impact);
                prop_assert!(elapsed >= 0, "basket {} before impact {}", basket_time, impact);
                prop_assert!(elapsed <= max);
                prop_assert_eq!(confidence, 0.95);
            }
            ShotEvent::Make { impact_time: None, basket_type, confidence, .. } => {
                prop_assert_eq!(basket_type, BasketType::Swish);
                prop_assert_eq!(confidence, 0.85);
            }
            ShotEvent::Miss { confidence, .. } => {
                prop_assert_eq!(confidence, 0.85);
            }
        }
        if let Some(basket) = event.basket_time() {
            prop_assert!(last_basket.map_or(true, |prev| basket > prev));
            last_basket = Some(basket);
        }
    }
    Ok(())
}

proptest! {
    #[test]
    fn prop_drain_ignores_batch_boundaries(
        samples in stream(1),
        sizes in prop::collection::vec(1usize..25, 1..8),
    ) {
        let batches = contiguous_batches(&samples, &sizes);
        prop_assert_eq!(
            run_batches(&batches, &mut classifier(MergeMode::Drain)),
            run_whole(&samples, MergeMode::Drain)
        );
    }

    #[test]
    fn prop_watermark_ignores_batch_boundaries(
        samples in stream(0),
        sizes in prop::collection::vec(1usize..25, 1..8),
    ) {
        let batches = contiguous_batches(&samples, &sizes);
        prop_assert_eq!(
            run_batches(&batches, &mut classifier(MergeMode::Watermark)),
            run_whole(&samples, MergeMode::Watermark)
        );
    }

    #[test]
    fn prop_watermark_tolerates_per_sensor_delivery(
        samples in stream(0),
        accel_size in 1usize..25,
        distance_size in 1usize..10,
        picks in prop::collection::vec(any::<bool>(), 1..10),
    ) {
        let batches = per_sensor_batches(&samples, accel_size, distance_size, &picks);
        let mut c = classifier(MergeMode::Watermark);
        prop_assert_eq!(run_batches(&batches, &mut c), run_whole(&samples, MergeMode::Watermark));
        prop_assert_eq!(c.stale_samples(), 0);
    }

    #[test]
    fn prop_drain_per_sensor_delivery_stays_time_ordered(
        samples in stream(0),
        accel_size in 1usize..25,
        distance_size in 1usize..10,
        picks in prop::collection::vec(any::<bool>(), 1..10),
    ) {
        let batches = per_sensor_batches(&samples, accel_size, distance_size, &picks);
        let mut c = classifier(MergeMode::Drain);
        let events = run_batches(&batches, &mut c);

        check_well_formed(&events)?;
        let live = samples
            .iter()
            .filter(|s| !matches!(s, RawSample::Distance { distance_mm: 0xFFFE, .. }))
            .count() as u64;
        prop_assert_eq!(c.samples_processed() + c.stale_samples(), live);
        prop_assert_eq!(c.completed_shots(), events.as_slice());
    }

    #[test]
    fn prop_events_are_well_formed(
        samples in stream(0),
        sizes in prop::collection::vec(1usize..25, 1..8),
        accel_size in 1usize..25,
        distance_size in 1usize..10,
        picks in prop::collection::vec(any::<bool>(), 1..10),
    ) {
        let deliveries = [
            vec![samples.clone()],
            contiguous_batches(&samples, &sizes),
            per_sensor_batches(&samples, accel_size, distance_size, &picks),
        ];
        for mode in [MergeMode::Watermark, MergeMode::Drain] {
            for batches in &deliveries {
                check_well_formed(&run_batches(batches, &mut classifier(mode)))?;
            }
        }
    }

    #[test]
    fn prop_history_never_shrinks(
        samples in stream(1),
        sizes in prop::collection::vec(1usize..25, 1..8),
    ) {
        let mut c = classifier(MergeMode::Drain);
        let mut seen = 0;
        let mut returned = 0;
        for (i, chunk) in samples.chunks(sizes[0]).enumerate() {
            returned += c.process_batch(chunk).unwrap().len();
            let now = c.completed_shots().len();
            prop_assert!(now >= seen);
            prop_assert_ne!(c.phase(), ClassifierPhase::BasketDetected, "chunk {}", i);
            seen = now;
        }
        prop_assert_eq!(seen, returned);
    }
}

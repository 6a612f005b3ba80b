use std::collections::VecDeque;
use std::sync::Arc;

use log::{debug, warn};

use crate::model::{TransportRoute, TransportStop, Way};
use crate::{MISSING_STOP_SEARCH_RADIUS, geometry};

type StopSegment = Vec<TransportStop>;

/// Stitches the fragments of an incomplete route into one route.
///
/// Stop sequences of all fragments are cut at missing-stop placeholders,
/// merged on shared stops and then across gaps, and finally chained by
/// proximity. The geometry of all fragments is pooled. When nothing usable
/// remains the base route is returned unchanged.
pub fn combine_route(base: &TransportRoute, parts: &[Arc<TransportRoute>]) -> TransportRoute {
    let ways: Vec<Way> = parts
        .iter()
        .flat_map(|part| part.forward_ways.iter().cloned())
        .collect();
    let segments = combine_segments_of_same_route(parse_route_parts_to_segments(parts));
    let stops: Vec<TransportStop> = segments.into_iter().flatten().collect();
    if stops.is_empty() {
        warn!(
            "Route {} ({}): fragments carry no usable stop sequence",
            base.id, base.reference
        );
        return base.clone();
    }
    debug!(
        "Route {} combined from {} fragments into {} stops",
        base.id,
        parts.len(),
        stops.len()
    );
    TransportRoute::combined(base, stops, ways)
}

/// Splits each fragment's stop sequence at missing-stop placeholders.
///
/// Placeholders come in pairs around a gap: the first one closes the running
/// segment as its last stop, the second one starts the next segment. Segments
/// of a single stop are dropped.
pub fn parse_route_parts_to_segments(parts: &[Arc<TransportRoute>]) -> Vec<StopSegment> {
    let mut segments = Vec::new();
    for part in parts {
        let mut current: StopSegment = Vec::new();
        for stop in &part.forward_stops {
            current.push(stop.clone());
            if stop.is_missing_stop() && current.len() > 1 {
                segments.push(std::mem::take(&mut current));
            }
        }
        if current.len() > 1 {
            segments.push(current);
        }
    }
    segments
}

/// Merges stop segments of one route and orders the survivors into a chain.
pub fn combine_segments_of_same_route(segments: Vec<StopSegment>) -> Vec<StopSegment> {
    let merged = merge_segments(segments, try_to_merge);
    let merged = merge_segments(merged, try_to_merge_missing_stops);
    order_segments(merged)
}

fn merge_segments(
    segments: Vec<StopSegment>,
    try_merge: fn(&mut StopSegment, &[TransportStop]) -> bool,
) -> Vec<StopSegment> {
    let mut queue: VecDeque<StopSegment> = segments.into();
    let mut result = Vec::with_capacity(queue.len());
    while let Some(mut first) = queue.pop_front() {
        while let Some(pos) = queue.iter().position(|second| try_merge(&mut first, second)) {
            queue.remove(pos);
        }
        result.push(first);
    }
    result
}

/// Merges `second` into `first` around their first shared stop.
///
/// The tail is taken from whichever segment runs further past the shared
/// stop and the head from whichever starts earlier before it; on a tie the
/// side ending (or starting) with a placeholder loses.
fn try_to_merge(first: &mut StopSegment, second: &[TransportStop]) -> bool {
    if first.len() < 2 || second.len() < 2 {
        return false;
    }
    let common = first.iter().enumerate().find_map(|(i, stop)| {
        if stop.id <= 0 || stop.is_missing_stop() {
            return None;
        }
        second.iter().position(|s| s.id == stop.id).map(|j| (i, j))
    });
    let Some((c1, c2)) = common else {
        return false;
    };

    let left_first = first.len() - c1;
    let left_second = second.len() - c2;
    let first_ends_missing = first.last().is_some_and(TransportStop::is_missing_stop);
    if left_first < left_second || (left_first == left_second && first_ends_missing) {
        first.truncate(c1);
        first.extend_from_slice(&second[c2..]);
    }
    let first_starts_missing = first[0].is_missing_stop();
    if c1 < c2 || (c1 == c2 && first_starts_missing) {
        first.splice(0..=c1, second[..=c2].iter().cloned());
    }
    true
}

/// Closes a data gap: a placeholder ending one segment lies within
/// [`MISSING_STOP_SEARCH_RADIUS`] of a placeholder starting the other.
fn try_to_merge_missing_stops(first: &mut StopSegment, second: &[TransportStop]) -> bool {
    let (Some(first_start), Some(first_end)) = (first.first(), first.last()) else {
        return false;
    };
    let (Some(second_start), Some(second_end)) = (second.first(), second.last()) else {
        return false;
    };
    if first_start.is_missing_stop()
        && second_end.is_missing_stop()
        && first_start.distance_to(second_end) < MISSING_STOP_SEARCH_RADIUS
    {
        first.splice(0..1, second[..second.len() - 1].iter().cloned());
        return true;
    }
    if first_end.is_missing_stop()
        && second_start.is_missing_stop()
        && first_end.distance_to(second_start) < MISSING_STOP_SEARCH_RADIUS
    {
        first.pop();
        first.extend_from_slice(&second[1..]);
        return true;
    }
    false
}

fn order_segments(mut segments: Vec<StopSegment>) -> Vec<StopSegment> {
    let starts_real = |s: &StopSegment| s.first().is_some_and(|st| !st.is_missing_stop());
    let ends_real = |s: &StopSegment| s.last().is_some_and(|st| !st.is_missing_stop());

    if let Some(anchor) = segments.iter().rposition(starts_real) {
        let mut chain = vec![segments.remove(anchor)];
        while let Some(tail) = chain.last().and_then(|s| s.last()) {
            let (lat, lon) = (tail.lat(), tail.lon());
            let Some(next) = take_closest(&mut segments, lat, lon, |s| s.first()) else {
                break;
            };
            chain.push(next);
        }
        chain
    } else if let Some(anchor) = segments.iter().rposition(ends_real) {
        let mut chain = VecDeque::from([segments.remove(anchor)]);
        while let Some(head) = chain.front().and_then(|s| s.first()) {
            let (lat, lon) = (head.lat(), head.lon());
            let Some(prev) = take_closest(&mut segments, lat, lon, |s| s.last()) else {
                break;
            };
            chain.push_front(prev);
        }
        chain.into()
    } else {
        if segments.len() > 1 {
            warn!(
                "{} route segments have no real stop at either end, keeping their order",
                segments.len()
            );
        }
        segments
    }
}

/// Removes the segment whose `end` stop is closest to `(lat, lon)`.
fn take_closest(
    segments: &mut Vec<StopSegment>,
    lat: f64,
    lon: f64,
    end: fn(&StopSegment) -> Option<&TransportStop>,
) -> Option<StopSegment> {
    let closest = segments
        .iter()
        .enumerate()
        .filter_map(|(i, s)| {
            end(s).map(|st| (i, geometry::distance(lat, lon, st.lat(), st.lon())))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i)?;
    Some(segments.remove(closest))
}

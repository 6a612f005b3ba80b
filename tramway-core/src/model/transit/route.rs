use hashbrown::HashMap;

use super::stop::TransportStop;
use super::types::{Node, TransportSchedule, Way};
use crate::{RouteId, SAME_STOP, geometry};

/// A public transport route: an ordered list of stops ridden in one direction,
/// its geometry and an optional average schedule.
#[derive(Debug, Clone)]
pub struct TransportRoute {
    pub id: RouteId,
    pub name: String,
    pub en_name: String,
    pub names: HashMap<String, String>,
    pub reference: String,
    pub operator: String,
    pub route_type: String,
    pub color: Option<String>,
    /// Stored length in meters, computed from the stops when absent
    pub dist: Option<u32>,
    pub forward_stops: Vec<TransportStop>,
    pub forward_ways: Vec<Way>,
    pub schedule: Option<TransportSchedule>,
    /// Only a fragment of the stop sequence is present in this file
    pub incomplete: bool,
}

impl TransportRoute {
    pub fn new(id: RouteId, route_type: impl Into<String>) -> Self {
        Self {
            id,
            name: String::new(),
            en_name: String::new(),
            names: HashMap::new(),
            reference: String::new(),
            operator: String::new(),
            route_type: route_type.into(),
            color: None,
            dist: None,
            forward_stops: Vec::new(),
            forward_ways: Vec::new(),
            schedule: None,
            incomplete: false,
        }
    }

    /// Route built from the fragments of `base`, carrying its metadata.
    pub fn combined(base: &TransportRoute, forward_stops: Vec<TransportStop>, forward_ways: Vec<Way>) -> Self {
        Self {
            forward_stops,
            forward_ways,
            incomplete: false,
            ..base.clone()
        }
    }

    pub fn stop(&self, index: usize) -> Option<&TransportStop> {
        self.forward_stops.get(index)
    }

    pub fn stops_len(&self) -> usize {
        self.forward_stops.len()
    }

    pub fn is_incomplete(&self) -> bool {
        self.incomplete
    }

    /// Sum of distances between consecutive stops in meters.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn avg_both_distance(&self) -> u32 {
        self.forward_stops
            .windows(2)
            .map(|pair| pair[0].distance_to(&pair[1]) as u32)
            .sum()
    }

    pub fn dist(&self) -> u32 {
        self.dist.unwrap_or_else(|| self.avg_both_distance())
    }

    /// Ref without its `:suffix`, shortened with an ellipsis to 5 (small) or 8 characters.
    pub fn adjusted_route_ref(&self, small: bool) -> String {
        let mut adjusted = self.reference.clone();
        if let Some(pos) = adjusted.rfind(':') {
            adjusted.truncate(pos);
        }
        let max_len = if small { 5 } else { 8 };
        if adjusted.chars().count() > max_len {
            adjusted = adjusted.chars().take(max_len - 1).collect::<String>() + "…";
        }
        adjusted
    }

    /// Merges the geometry fragments in place, see [`merge_ways`].
    pub fn merge_forward_ways(&mut self) {
        let ways = std::mem::take(&mut self.forward_ways);
        self.forward_ways = merge_ways(ways, &self.forward_stops);
    }

    /// Merged copy of the geometry, leaving the route untouched.
    pub fn merged_forward_ways(&self) -> Vec<Way> {
        merge_ways(self.forward_ways.clone(), &self.forward_stops)
    }

    pub fn content_eq(&self, other: &TransportRoute) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        self.id == other.id
            && self.name == other.name
            && self.en_name == other.en_name
            && self.names == other.names
            && self.reference == other.reference
            && self.operator == other.operator
            && self.route_type == other.route_type
            && self.color == other.color
            && self.dist() == other.dist()
            && self.forward_stops.len() == other.forward_stops.len()
            && self.forward_ways == other.forward_ways
            && self
                .forward_stops
                .iter()
                .zip(&other.forward_stops)
                .all(|(a, b)| a.content_eq(b))
    }
}

fn node_distance(a: Node, b: Node) -> f64 {
    geometry::distance(a.y, a.x, b.y, b.x)
}

/// Best way to attach to `first`: `(index, reverse_first, reverse_second)`.
fn closest_attachment(first: &Way, candidates: &[Way]) -> Option<(usize, bool, bool)> {
    let (first_start, first_end) = (first.first_node()?, first.last_node()?);
    let mut best = None;
    let mut min_dist = SAME_STOP;
    for (i, way) in candidates.iter().enumerate() {
        let (Some(start), Some(end)) = (way.first_node(), way.last_node()) else {
            continue;
        };
        let options = [
            (node_distance(first_end, start), false, false),
            (node_distance(first_end, end), false, true),
            (node_distance(first_start, start), true, false),
            (node_distance(first_start, end), true, true),
        ];
        for (d, reverse_first, reverse_second) in options {
            if d < min_dist {
                min_dist = d;
                best = Some((i, reverse_first, reverse_second));
            }
        }
        if min_dist == 0.0 {
            break;
        }
    }
    best
}

/// Combines route geometry fragments into maximal chains and orders them along the stops.
///
/// Way ends closer than [`SAME_STOP`] are spliced, trying both orientations of
/// both ways, until no splice is left. Each remaining way is then tagged with
/// the index of the stop nearest to each of its ends, reversed when it runs
/// against the stop order and sorted by the smaller of the two indexes.
pub fn merge_ways(mut ways: Vec<Way>, stops: &[TransportStop]) -> Vec<Way> {
    let mut changed = true;
    while changed && !ways.is_empty() {
        changed = false;
        let mut k = 0;
        while k < ways.len() {
            let (head, tail) = ways.split_at(k + 1);
            let first = &head[k];
            match closest_attachment(first, tail) {
                Some((offset, reverse_first, reverse_second)) => {
                    let mut second = ways.remove(k + 1 + offset);
                    let first = &mut ways[k];
                    if reverse_first {
                        first.reverse_nodes();
                    }
                    if reverse_second {
                        second.reverse_nodes();
                    }
                    first.nodes.extend(second.nodes.into_iter().skip(1));
                    changed = true;
                }
                None => k += 1,
            }
        }
    }

    if stops.is_empty() {
        return ways;
    }
    let nearest_stop = |node: Node| {
        stops
            .iter()
            .enumerate()
            .map(|(i, st)| (i, geometry::distance(st.lat(), st.lon(), node.y, node.x)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map_or(0, |(i, _)| i)
    };
    let mut ordered: Vec<(usize, Way)> = ways
        .into_iter()
        .map(|mut way| {
            let (Some(first), Some(last)) = (way.first_node(), way.last_node()) else {
                return (0, way);
            };
            let (first_ind, last_ind) = (nearest_stop(first), nearest_stop(last));
            if first_ind > last_ind {
                way.reverse_nodes();
            }
            (first_ind.min(last_ind), way)
        })
        .collect();
    ordered.sort_by_key(|(ind, _)| *ind);
    ordered.into_iter().map(|(_, way)| way).collect()
}

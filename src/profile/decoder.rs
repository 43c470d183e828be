//! Flamebearer decoding
//!
//! Turns the backend's leveled call-tree encoding into a flat list of functions ranked by
//! self samples. Every group `(offset, total, self, nameIndex)` is added into a per-name
//! accumulator, so a function that shows up at several depths (recursion, or reached through
//! different callers) is reported once with the sum of all its positions.

use rustc_hash::FxHashMap;
use tracing::debug;

use super::structs::{round2, Flamebearer, FunctionSample, RenderResponse};

/// Width of one node group inside a level
const GROUP_WIDTH: usize = 4;

/// Decode a render response; a missing flamebearer decodes to nothing.
pub fn decode_render(response: &RenderResponse, limit: usize) -> Vec<FunctionSample> {
    match &response.flamebearer {
        Some(flamebearer) => decode(flamebearer, limit),
        None => Vec::new(),
    }
}

/// Decode a flamebearer into at most `limit` functions, hottest first.
///
/// Returns an empty list when there is nothing to decode (no ticks, no levels, no names).
pub fn decode(flamebearer: &Flamebearer, limit: usize) -> Vec<FunctionSample> {
    let num_ticks = flamebearer.num_ticks;
    if num_ticks == 0 || flamebearer.levels.is_empty() || flamebearer.names.is_empty() {
        return Vec::new();
    }

    // name index -> (self, total)
    let mut totals: FxHashMap<usize, (u64, u64)> = FxHashMap::default();
    for level in &flamebearer.levels {
        for group in level.chunks_exact(GROUP_WIDTH) {
            let (total, self_samples, name_index) = (group[1], group[2], group[3] as usize);
            let entry = totals.entry(name_index).or_insert((0, 0));
            entry.0 = entry.0.saturating_add(self_samples);
            entry.1 = entry.1.saturating_add(total);
        }
    }

    let mut ranked: Vec<(&str, u64, u64)> = totals
        .into_iter()
        .filter(|(_, (self_sum, _))| *self_sum > 0)
        .filter_map(|(index, (self_sum, total_sum))| match flamebearer.names.get(index) {
            Some(name) => Some((name.as_str(), self_sum, total_sum)),
            None => {
                debug!(name_index = index, names = flamebearer.names.len(), "Skipping group with out-of-range name index");
                None
            }
        })
        .collect();

    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked.truncate(limit);

    ranked
        .into_iter()
        .map(|(name, self_sum, total_sum)| FunctionSample {
            name: name.to_string(),
            self_samples: self_sum,
            total_samples: total_sum,
            total_ticks: num_ticks,
            self_percent: round2(self_sum as f64 / num_ticks as f64 * 100.0),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flamebearer(names: &[&str], levels: Vec<Vec<u64>>, num_ticks: u64) -> Flamebearer {
        Flamebearer {
            names: names.iter().map(|s| s.to_string()).collect(),
            levels,
            num_ticks,
        }
    }

    #[test]
    fn test_recursive_positions_are_summed() {
        // "parse" appears at depth 1 (self 10) and depth 2 (self 15)
        let fb = flamebearer(
            &["total", "parse", "main"],
            vec![
                vec![0, 100, 0, 0],
                vec![0, 40, 10, 1, 0, 60, 45, 2],
                vec![0, 15, 15, 1],
            ],
            100,
        );

        let functions = decode(&fb, 10);
        let parse = functions.iter().find(|f| f.name == "parse").unwrap();
        assert_eq!(parse.self_samples, 25);
        assert_eq!(parse.total_samples, 55);
        assert_eq!(parse.total_ticks, 100);
    }

    #[test]
    fn test_self_percent_is_rounded_ratio() {
        let fb = flamebearer(&["total", "hot"], vec![vec![0, 200, 0, 0], vec![0, 50, 50, 1]], 200);
        let functions = decode(&fb, 10);
        assert_eq!(functions.len(), 1);
        assert_eq!(functions[0].self_percent, 25.0);

        let fb = flamebearer(&["total", "third"], vec![vec![0, 3, 0, 0], vec![0, 1, 1, 1]], 3);
        assert_eq!(decode(&fb, 10)[0].self_percent, 33.33);
    }

    #[test]
    fn test_pass_through_functions_are_dropped() {
        let fb = flamebearer(
            &["total", "dispatch", "work"],
            vec![vec![0, 100, 0, 0], vec![0, 100, 0, 1], vec![0, 100, 100, 2]],
            100,
        );
        let functions = decode(&fb, 10);
        assert_eq!(functions.len(), 1);
        assert_eq!(functions[0].name, "work");
    }

    #[test]
    fn test_ranked_by_self_and_limited() {
        let fb = flamebearer(
            &["total", "a", "b", "c"],
            vec![vec![0, 100, 0, 0], vec![0, 20, 20, 1, 20, 50, 50, 2, 70, 30, 30, 3]],
            100,
        );
        let functions = decode(&fb, 2);
        let names: Vec<&str> = functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["b", "c"]);
    }

    #[test]
    fn test_empty_inputs_decode_to_nothing() {
        let zero_ticks = flamebearer(&["total", "a"], vec![vec![0, 10, 10, 1]], 0);
        assert!(decode(&zero_ticks, 10).is_empty());

        let no_levels = flamebearer(&["total"], vec![], 100);
        assert!(decode(&no_levels, 10).is_empty());

        let no_names = flamebearer(&[], vec![vec![0, 10, 10, 0]], 10);
        assert!(decode(&no_names, 10).is_empty());

        assert!(decode_render(&RenderResponse::default(), 10).is_empty());
    }

    #[test]
    fn test_trailing_partial_group_and_bad_index_ignored() {
        let fb = flamebearer(
            &["total", "a"],
            vec![vec![0, 10, 0, 0], vec![0, 10, 10, 1, 5, 5, 5, 9, 1, 2]],
            10,
        );
        let functions = decode(&fb, 10);
        assert_eq!(functions.len(), 1);
        assert_eq!(functions[0].name, "a");
        assert_eq!(functions[0].self_samples, 10);
    }

    #[test]
    fn test_level_order_does_not_matter() {
        let levels = vec![vec![0, 10, 4, 1], vec![0, 6, 6, 2], vec![0, 3, 3, 1]];
        let mut reversed = levels.clone();
        reversed.reverse();

        let a = decode(&flamebearer(&["total", "x", "y"], levels, 13), 10);
        let b = decode(&flamebearer(&["total", "x", "y"], reversed, 13), 10);
        assert_eq!(a, b);
    }

    #[test]
    fn test_huge_counts_saturate() {
        let fb = flamebearer(
            &["total", "hot"],
            vec![vec![0, u64::MAX, 0, 0], vec![0, u64::MAX, u64::MAX, 1], vec![0, u64::MAX, u64::MAX, 1]],
            u64::MAX,
        );
        let functions = decode(&fb, 10);
        assert_eq!(functions.len(), 1);
        assert_eq!(functions[0].self_samples, u64::MAX);
        assert_eq!(functions[0].total_samples, u64::MAX);
        assert_eq!(functions[0].self_percent, 100.0);
    }
}

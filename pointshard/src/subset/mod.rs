//! Spatial shard model for distributed index construction.
//!
//! A [`Subset`] identifies one shard among `of` total and owns the portion of
//! the indexing domain assigned to it: recursively quartering the full domain
//! until there are exactly as many leaf volumes as shards, then taking the
//! leaf at position `id`. From that it derives, per hierarchy depth, the
//! [`Span`]s of linear node addresses the shard is responsible for building,
//! so independent build processes can each construct their slice of the index
//! without coordination.
//!
//! Depths shallower than the first split depth are common to every shard and
//! produce no shard-specific spans; the caller builds those levels exactly
//! once.

mod span;

pub use span::Span;

use crate::geom::Bounds;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Errors for shard construction and span arithmetic.
///
/// All of these indicate programmer or configuration mistakes, not transient
/// conditions; they are surfaced immediately rather than recorded.
#[derive(Debug, Error)]
pub enum SubsetError {
    /// Shard count must be a power of 4 (one shard per leaf of a balanced
    /// quartering).
    #[error("shard count must be a power of 4, got {0}")]
    ShardCountNotPowerOfFour(u64),

    /// Shard id must be less than the shard count.
    #[error("shard id {id} out of range for {of} shards")]
    ShardIdOutOfRange { id: u64, of: u64 },

    /// Two spans can only merge when the first ends exactly where the second
    /// begins.
    #[error("cannot merge spans [{a_begin}, {a_end}) and [{b_begin}, {b_end})")]
    UnmergeableSpans {
        a_begin: u64,
        a_end: u64,
        b_begin: u64,
        b_end: u64,
    },

    /// The requested depth range ends before this shard has any spans.
    #[error("depth range must extend past the first split depth {minimum}, got {requested}")]
    InvalidDepthRange { requested: u32, minimum: u32 },
}

/// One shard of the spatial indexing domain.
///
/// Constructed once from the full-domain bounds and `(id, of)`, or restored
/// from its serialized record; immutable thereafter.
#[derive(Debug, Clone, PartialEq)]
pub struct Subset {
    id: u64,
    of: u64,
    domain: Bounds,
    sub: Bounds,
    leaves: Vec<Bounds>,
    minimum_null_depth: u32,
}

/// Chooses the depth at which chunked storage should begin for a shard.
///
/// The exact selection given a per-chunk point budget depends on index-depth
/// planning outside this core, so the policy is pluggable.
pub trait BaseDepthPolicy {
    fn base_depth(&self, subset: &Subset, points_per_chunk: u64) -> u32;
}

/// Default policy: chunked storage starts at the first split depth.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDepthPolicy;

impl BaseDepthPolicy for NullDepthPolicy {
    fn base_depth(&self, subset: &Subset, _points_per_chunk: u64) -> u32 {
        subset.minimum_null_depth()
    }
}

impl Subset {
    /// Create shard `id` of `of` over the given full-domain bounds.
    ///
    /// `of` must be a power of 4 and `id` must be less than `of`.
    pub fn new(domain: Bounds, id: u64, of: u64) -> Result<Self, SubsetError> {
        if !is_power_of_four(of) {
            return Err(SubsetError::ShardCountNotPowerOfFour(of));
        }
        if id >= of {
            return Err(SubsetError::ShardIdOutOfRange { id, of });
        }

        let (leaves, minimum_null_depth) = split(&domain, of);
        let sub = leaves[id as usize];

        Ok(Self {
            id,
            of,
            domain,
            sub,
            leaves,
            minimum_null_depth,
        })
    }

    /// Shard identifier, `0 <= id < of`.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Total shard count.
    pub fn of(&self) -> u64 {
        self.of
    }

    /// The full indexing domain shared by every shard.
    pub fn domain(&self) -> &Bounds {
        &self.domain
    }

    /// The portion of the domain assigned to this shard.
    pub fn bounds(&self) -> &Bounds {
        &self.sub
    }

    /// All `of` leaf volumes of the quartering, in linear-address order.
    pub fn leaves(&self) -> &[Bounds] {
        &self.leaves
    }

    /// The depth at which quartering began producing distinct leaves.
    ///
    /// Shallower depths are common to every shard.
    pub fn minimum_null_depth(&self) -> u32 {
        self.minimum_null_depth
    }

    /// Whether this is the no-split pass-through case (`of == 1`), which owns
    /// the entire domain and every node address at every depth.
    pub fn primary(&self) -> bool {
        self.of == 1
    }

    /// Suffix for per-shard artifact names, e.g. `"-3"`.
    pub fn postfix(&self) -> String {
        format!("-{}", self.id)
    }

    /// Depth at which chunked storage should begin, under the default policy.
    pub fn minimum_base_depth(&self, points_per_chunk: u64) -> u32 {
        self.minimum_base_depth_with(points_per_chunk, &NullDepthPolicy)
    }

    /// Depth at which chunked storage should begin, under a caller policy.
    ///
    /// The result never falls below [`minimum_null_depth`]: shallower levels
    /// have no shard-specific addressing to chunk.
    ///
    /// [`minimum_null_depth`]: Subset::minimum_null_depth
    pub fn minimum_base_depth_with(
        &self,
        points_per_chunk: u64,
        policy: &dyn BaseDepthPolicy,
    ) -> u32 {
        policy
            .base_depth(self, points_per_chunk)
            .max(self.minimum_null_depth)
    }

    /// Compute, for every depth in `[0, depth_end)`, the linear node-address
    /// spans belonging to this shard.
    ///
    /// Lists are sorted by span begin, pairwise non-overlapping, and merged:
    /// adjacent runs of sibling addresses collapse into single contiguous
    /// ranges. Depths shallower than [`minimum_null_depth`] yield empty
    /// lists; those levels belong to every shard equally and are built once
    /// by the caller, not per shard.
    ///
    /// [`minimum_null_depth`]: Subset::minimum_null_depth
    pub fn calc_spans(&self, depth_end: u32) -> Result<Vec<Vec<Span>>, SubsetError> {
        if depth_end <= self.minimum_null_depth {
            return Err(SubsetError::InvalidDepthRange {
                requested: depth_end,
                minimum: self.minimum_null_depth,
            });
        }

        // Walk the quartering from the root, mapping this shard's sub-volume
        // to its address interval at the deepest requested depth.
        let target = depth_end - 1;
        let mut deepest = Vec::new();
        self.accumulate(&self.domain, 0, 0, target, &mut deepest);
        let deepest = merge_adjacent(deepest)?;

        // Contract depth by depth back up to the first split depth, merging
        // after each contraction.
        let mut by_depth = vec![Vec::new(); depth_end as usize];
        let mut current = deepest;
        let mut depth = target;
        loop {
            by_depth[depth as usize] = current.clone();
            if depth == self.minimum_null_depth {
                break;
            }
            current = merge_adjacent(current.into_iter().map(Span::contract).collect())?;
            depth -= 1;
        }

        Ok(by_depth)
    }

    /// Depth-first descent of the quartering tree in address order.
    ///
    /// When the descent reaches this shard's own sub-volume, the node's
    /// entire subtree maps to one contiguous interval at the target depth.
    fn accumulate(
        &self,
        bounds: &Bounds,
        address: u64,
        depth: u32,
        target: u32,
        out: &mut Vec<Span>,
    ) {
        if depth == self.minimum_null_depth {
            if *bounds == self.sub {
                let shift = 2 * (target - depth);
                out.push(Span::new(address << shift, (address + 1) << shift));
            }
            return;
        }

        for (digit, child) in bounds.quarter().iter().enumerate() {
            self.accumulate(child, address * 4 + digit as u64, depth + 1, target, out);
        }
    }
}

/// Quarter the domain level by level until the leaf count reaches `of`.
///
/// Level-order expansion keeps the leaves in linear-address order, so the
/// leaf at position `id` has address `id` at the returned depth.
fn split(domain: &Bounds, of: u64) -> (Vec<Bounds>, u32) {
    let mut leaves = vec![*domain];
    let mut depth = 0;
    while (leaves.len() as u64) < of {
        leaves = leaves.iter().flat_map(|b| b.quarter()).collect();
        depth += 1;
    }
    (leaves, depth)
}

/// Merge adjacent spans in an address-ordered list, dropping empties.
fn merge_adjacent(spans: Vec<Span>) -> Result<Vec<Span>, SubsetError> {
    let mut out: Vec<Span> = Vec::new();
    for span in spans {
        if span.is_empty() {
            continue;
        }
        match out.last_mut() {
            Some(last) if last.end() == span.begin() => last.merge(&span)?,
            _ => out.push(span),
        }
    }
    Ok(out)
}

fn is_power_of_four(n: u64) -> bool {
    n.is_power_of_two() && n.trailing_zeros() % 2 == 0
}

// The serialized record is `{id, of, bounds}` with the FULL domain bounds;
// the quartering is recomputed on restore, never persisted.

#[derive(Serialize, Deserialize)]
struct SubsetRecord {
    id: u64,
    of: u64,
    bounds: Bounds,
}

impl Serialize for Subset {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        SubsetRecord {
            id: self.id,
            of: self.of,
            bounds: self.domain,
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Subset {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let record = SubsetRecord::deserialize(deserializer)?;
        Subset::new(record.bounds, record.id, record.of).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Point;

    fn domain() -> Bounds {
        Bounds::new(0.0, 0.0, 0.0, 64.0, 64.0, 64.0)
    }

    #[test]
    fn test_rejects_non_power_of_four_counts() {
        for of in [0, 2, 3, 8, 12, 32] {
            let err = Subset::new(domain(), 0, of).unwrap_err();
            assert!(
                matches!(err, SubsetError::ShardCountNotPowerOfFour(n) if n == of),
                "of={} should be rejected",
                of
            );
        }
    }

    #[test]
    fn test_rejects_out_of_range_id() {
        let err = Subset::new(domain(), 4, 4).unwrap_err();
        assert!(matches!(
            err,
            SubsetError::ShardIdOutOfRange { id: 4, of: 4 }
        ));
    }

    #[test]
    fn test_leaf_count_matches_shard_count() {
        for of in [1u64, 4, 16, 64] {
            let subset = Subset::new(domain(), 0, of).unwrap();
            assert_eq!(subset.leaves().len() as u64, of);
        }
    }

    #[test]
    fn test_sub_volume_is_own_leaf() {
        for id in 0..16 {
            let subset = Subset::new(domain(), id, 16).unwrap();
            assert_eq!(*subset.bounds(), subset.leaves()[id as usize]);
        }
    }

    #[test]
    fn test_leaves_are_disjoint_and_cover_domain() {
        let subset = Subset::new(domain(), 0, 16).unwrap();
        let leaves = subset.leaves();

        // Interior sample points land in exactly one leaf each.
        for i in 0..16 {
            for j in 0..16 {
                let p = Point::new(i as f64 * 4.0 + 2.0, j as f64 * 4.0 + 2.0, 32.0);
                let hits = leaves.iter().filter(|l| l.contains(&p)).count();
                assert_eq!(hits, 1, "point {} should be in exactly one leaf", p);
            }
        }

        // Leaves tile the full XY extent at equal size, full Z height.
        for leaf in leaves {
            assert_eq!(leaf.max().x - leaf.min().x, 16.0);
            assert_eq!(leaf.max().y - leaf.min().y, 16.0);
            assert_eq!(leaf.min().z, 0.0);
            assert_eq!(leaf.max().z, 64.0);
        }
    }

    #[test]
    fn test_minimum_null_depth_is_log4_of_count() {
        assert_eq!(Subset::new(domain(), 0, 1).unwrap().minimum_null_depth(), 0);
        assert_eq!(Subset::new(domain(), 0, 4).unwrap().minimum_null_depth(), 1);
        assert_eq!(
            Subset::new(domain(), 0, 16).unwrap().minimum_null_depth(),
            2
        );
        assert_eq!(
            Subset::new(domain(), 0, 64).unwrap().minimum_null_depth(),
            3
        );
    }

    #[test]
    fn test_primary_is_the_no_split_case() {
        assert!(Subset::new(domain(), 0, 1).unwrap().primary());
        assert!(!Subset::new(domain(), 0, 4).unwrap().primary());
    }

    #[test]
    fn test_postfix() {
        assert_eq!(Subset::new(domain(), 3, 4).unwrap().postfix(), "-3");
    }

    #[test]
    fn test_primary_spans_cover_full_address_range() {
        let subset = Subset::new(domain(), 0, 1).unwrap();
        let spans = subset.calc_spans(6).unwrap();

        for depth in 0..6u32 {
            let list = &spans[depth as usize];
            assert_eq!(list.len(), 1, "depth {} should hold one span", depth);
            assert_eq!(list[0], Span::new(0, 4u64.pow(depth)));
        }
    }

    #[test]
    fn test_shard_spans_are_contiguous_blocks() {
        // Shard 3 of 4 splits at depth 1, so at depth d it owns the last
        // quarter of the address space.
        let subset = Subset::new(domain(), 3, 4).unwrap();
        let spans = subset.calc_spans(4).unwrap();

        assert!(spans[0].is_empty(), "depth 0 is shared by every shard");
        assert_eq!(spans[1], vec![Span::new(3, 4)]);
        assert_eq!(spans[2], vec![Span::new(12, 16)]);
        assert_eq!(spans[3], vec![Span::new(48, 64)]);
    }

    #[test]
    fn test_span_counts_are_an_even_split() {
        let of = 16u64;
        for id in 0..of {
            let subset = Subset::new(domain(), id, of).unwrap();
            let spans = subset.calc_spans(5).unwrap();

            for depth in subset.minimum_null_depth()..5 {
                let total: u64 = spans[depth as usize].iter().map(Span::count).sum();
                assert_eq!(
                    total,
                    4u64.pow(depth) / of,
                    "shard {} at depth {}",
                    id,
                    depth
                );
            }
        }
    }

    #[test]
    fn test_spans_are_sorted_and_disjoint() {
        for id in 0..16 {
            let subset = Subset::new(domain(), id, 16).unwrap();
            let spans = subset.calc_spans(6).unwrap();
            for list in &spans {
                for pair in list.windows(2) {
                    assert!(
                        pair[0].end() < pair[1].begin(),
                        "merged spans must be sorted with gaps between them"
                    );
                }
            }
        }
    }

    #[test]
    fn test_sibling_shards_partition_each_depth() {
        // Across all shards, spans at a depth cover [0, 4^depth) exactly once.
        let of = 4u64;
        let depth = 3usize;
        let mut covered = vec![0u32; 4usize.pow(depth as u32)];

        for id in 0..of {
            let subset = Subset::new(domain(), id, of).unwrap();
            let spans = subset.calc_spans(depth as u32 + 1).unwrap();
            for span in &spans[depth] {
                for address in span.begin()..span.end() {
                    covered[address as usize] += 1;
                }
            }
        }

        assert!(
            covered.iter().all(|&c| c == 1),
            "every address must belong to exactly one shard"
        );
    }

    #[test]
    fn test_calc_spans_rejects_shallow_depth_range() {
        let subset = Subset::new(domain(), 0, 16).unwrap();
        let err = subset.calc_spans(2).unwrap_err();
        assert!(matches!(
            err,
            SubsetError::InvalidDepthRange {
                requested: 2,
                minimum: 2
            }
        ));
    }

    #[test]
    fn test_minimum_base_depth_defaults_to_null_depth() {
        let subset = Subset::new(domain(), 0, 16).unwrap();
        assert_eq!(subset.minimum_base_depth(65536), 2);
    }

    #[test]
    fn test_minimum_base_depth_with_policy_never_goes_shallower() {
        struct Shallow;
        impl BaseDepthPolicy for Shallow {
            fn base_depth(&self, _subset: &Subset, _points_per_chunk: u64) -> u32 {
                0
            }
        }
        struct Deep;
        impl BaseDepthPolicy for Deep {
            fn base_depth(&self, _subset: &Subset, _points_per_chunk: u64) -> u32 {
                7
            }
        }

        let subset = Subset::new(domain(), 0, 16).unwrap();
        assert_eq!(subset.minimum_base_depth_with(1024, &Shallow), 2);
        assert_eq!(subset.minimum_base_depth_with(1024, &Deep), 7);
    }

    #[test]
    fn test_serde_record_round_trip() {
        let subset = Subset::new(domain(), 5, 16).unwrap();
        let json = serde_json::to_string(&subset).unwrap();

        let restored: Subset = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, subset);
        assert_eq!(restored.minimum_null_depth(), 2);
        assert_eq!(restored.leaves().len(), 16);
    }

    #[test]
    fn test_serde_rejects_bad_record() {
        let result: Result<Subset, _> =
            serde_json::from_str(r#"{"id": 0, "of": 3, "bounds": [0,0,0,1,1,1]}"#);
        assert!(result.is_err());
    }
}

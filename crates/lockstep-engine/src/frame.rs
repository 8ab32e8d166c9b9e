//! Frame graph & frame eval (§4.12): bounded rootward pose composition.

use crate::error::{EngineError, EngineResult};
use crate::registry::SortedRegistry;
use lockstep_core::fixed::{compose, tick_clamp_to_i64, Pose, Q48_16, RoundMode};
use lockstep_core::ids::{FrameId, TickIndex};

/// Maximum parent-chain depth a frame eval will walk before declaring the
/// graph malformed (§3).
pub const FRAME_MAX_DEPTH: usize = 16;

/// `{ id, parent_id (WORLD for roots), base_pose, vel_pos_per_tick,
/// vel_incline_per_tick, vel_roll_per_tick }` (§3). `id == WORLD` is
/// reserved and never stored as a node.
#[derive(Debug, Clone, Copy)]
pub struct FrameNode {
    pub id: FrameId,
    pub parent_id: FrameId,
    pub base_pose: Pose,
    pub vel_pos_per_tick: lockstep_core::fixed::Vec3Q,
    pub vel_incline_per_tick: Q48_16,
    pub vel_roll_per_tick: Q48_16,
}

pub type FrameGraph = SortedRegistry<u64, FrameNode>;

pub fn register_frame(graph: &mut FrameGraph, node: FrameNode) -> EngineResult<()> {
    graph.add(node.id.get(), node)
}

fn local_pose_at(node: &FrameNode, tick: TickIndex, round: RoundMode) -> EngineResult<Pose> {
    let t = Q48_16::from_int(tick_clamp_to_i64(tick.get())).map_err(EngineError::from)?;
    let pos_delta = node.vel_pos_per_tick.checked_scale(t, round).map_err(EngineError::from)?;
    let pos = node.base_pose.pos.checked_add(pos_delta).map_err(EngineError::from)?;
    let incline_delta = node
        .vel_incline_per_tick
        .checked_mul(t, round)
        .map_err(EngineError::from)?;
    let incline = node.base_pose.incline.checked_add(incline_delta).map_err(EngineError::from)?;
    let roll_delta = node.vel_roll_per_tick.checked_mul(t, round).map_err(EngineError::from)?;
    let roll = node.base_pose.roll.checked_add(roll_delta).map_err(EngineError::from)?;
    Ok(Pose {
        pos,
        rot: node.base_pose.rot,
        incline,
        roll,
    })
}

/// Walk `id`'s parent chain up to WORLD, compose rootward, and return the
/// resulting pose. `id == WORLD` returns identity directly. Fails with
/// `InvalidFrame` if the chain doesn't terminate at WORLD within
/// [`FRAME_MAX_DEPTH`].
pub fn eval(graph: &FrameGraph, id: FrameId, tick: TickIndex, round: RoundMode) -> EngineResult<Pose> {
    if id.is_world() {
        return Ok(Pose::IDENTITY);
    }

    let mut chain: Vec<Pose> = Vec::with_capacity(FRAME_MAX_DEPTH);
    let mut current = id;
    loop {
        if chain.len() >= FRAME_MAX_DEPTH {
            return Err(EngineError::InvalidFrame);
        }
        let node = graph.find(current.get()).ok_or(EngineError::InvalidFrame)?;
        chain.push(local_pose_at(node, tick, round)?);
        if node.parent_id.is_world() {
            break;
        }
        current = node.parent_id;
    }

    let mut accum = Pose::IDENTITY;
    for local in chain.into_iter().rev() {
        accum = compose(accum, local, round).map_err(EngineError::from)?;
    }
    Ok(accum)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lockstep_core::fixed::Vec3Q;

    fn node(id: u64, parent: u64, vel_x: i64) -> FrameNode {
        FrameNode {
            id: FrameId::new(id),
            parent_id: FrameId::new(parent),
            base_pose: Pose::IDENTITY,
            vel_pos_per_tick: Vec3Q {
                x: Q48_16::from_int(vel_x).unwrap(),
                y: Q48_16::ZERO,
                z: Q48_16::ZERO,
            },
            vel_incline_per_tick: Q48_16::ZERO,
            vel_roll_per_tick: Q48_16::ZERO,
        }
    }

    #[test]
    fn world_evaluates_to_identity() {
        let graph = FrameGraph::reserve(4);
        let pose = eval(&graph, FrameId::WORLD, TickIndex::ZERO, RoundMode::Trunc).unwrap();
        assert_eq!(pose, Pose::IDENTITY);
    }

    #[test]
    fn single_root_frame_moves_by_velocity_times_tick() {
        let mut graph = FrameGraph::reserve(4);
        register_frame(&mut graph, node(1, 0, 1)).unwrap();
        let pose = eval(&graph, FrameId::new(1), TickIndex::new(3), RoundMode::Trunc).unwrap();
        assert_eq!(pose.pos.x, Q48_16::from_int(3).unwrap());
    }

    #[test]
    fn chain_composes_velocities_additively() {
        let mut graph = FrameGraph::reserve(4);
        register_frame(&mut graph, node(1, 0, 1)).unwrap();
        register_frame(&mut graph, node(2, 1, 2)).unwrap();
        let pose = eval(&graph, FrameId::new(2), TickIndex::new(1), RoundMode::Trunc).unwrap();
        assert_eq!(pose.pos.x, Q48_16::from_int(3).unwrap());
    }

    #[test]
    fn chain_exceeding_max_depth_is_invalid() {
        let mut graph = FrameGraph::reserve(FRAME_MAX_DEPTH + 2);
        for i in 1..=(FRAME_MAX_DEPTH as u64 + 1) {
            register_frame(&mut graph, node(i, i - 1, 0)).unwrap();
        }
        let deepest = FrameId::new(FRAME_MAX_DEPTH as u64 + 1);
        assert!(matches!(
            eval(&graph, deepest, TickIndex::ZERO, RoundMode::Trunc),
            Err(EngineError::InvalidFrame)
        ));
    }

    #[test]
    fn eval_is_deterministic_across_repeated_calls() {
        let mut graph = FrameGraph::reserve(4);
        register_frame(&mut graph, node(1, 0, 5)).unwrap();
        let a = eval(&graph, FrameId::new(1), TickIndex::new(7), RoundMode::Near).unwrap();
        let b = eval(&graph, FrameId::new(1), TickIndex::new(7), RoundMode::Near).unwrap();
        assert_eq!(a, b);
    }
}

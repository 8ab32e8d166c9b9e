//! MIND phase: mind registry and dispatch, emitting intents (§4.9 step 2).

use crate::act::{IntentBuffer, IntentHeader};
use crate::registry::SortedRegistry;
use crate::sense::ObservationBuffer;
use lockstep_core::budget::{Budget, BudgetScope, UNLIMITED};
use lockstep_core::ids::{AgentId, TickIndex, TypeId64};

/// Opaque per-agent scratch state a mind may read and write across ticks.
/// The kernel never inspects it.
pub trait MindState {
    fn as_bytes(&self) -> &[u8];
    fn as_bytes_mut(&mut self) -> &mut [u8];
}

/// Context passed to `emit_intent_cb`: the callback stamps `tick` and
/// `src_entity` itself (protecting against buggy minds), so a mind only
/// supplies the rest of the header plus payload.
pub struct EmitIntentCtx<'a> {
    pub tick: TickIndex,
    pub agent_id: AgentId,
    seq: &'a mut u32,
}

impl<'a> EmitIntentCtx<'a> {
    pub fn emit(
        &mut self,
        buffer: &mut IntentBuffer,
        type_id: TypeId64,
        schema_id: u64,
        schema_ver: u32,
        dst_entity: lockstep_core::ids::EntityId,
        payload: &[u8],
    ) -> crate::buffer::PushOutcome {
        let seq = *self.seq;
        *self.seq = self.seq.wrapping_add(1);
        let header = IntentHeader {
            tick: self.tick,
            src_entity: lockstep_core::ids::EntityId::new(self.agent_id.get()),
            type_id,
            seq,
            schema_id,
            schema_ver,
            dst_entity,
            domain_id: lockstep_core::ids::DomainId::ZERO,
            chunk_id: lockstep_core::ids::ChunkId::ZERO,
            payload_len: payload.len() as u32,
        };
        buffer.push(header, payload)
    }
}

/// `{ step, estimate_cost, stride }` (§4.6). `step` receives the
/// canonicalized observation buffer for this agent and must emit intents
/// only through `ctx`.
pub trait Mind {
    fn step(
        &self,
        agent_id: AgentId,
        observations: &ObservationBuffer,
        state: &mut dyn MindState,
        intents: &mut IntentBuffer,
        ctx: &mut EmitIntentCtx,
    ) -> Result<(), ()>;

    fn estimate_cost(&self) -> u32 {
        1
    }

    fn stride(&self) -> u64 {
        1
    }
}

pub type MindRegistry = SortedRegistry<u64, Box<dyn Mind>>;

pub(crate) fn fires(stride: u64, tick: TickIndex, agent_id: AgentId) -> bool {
    stride == 0 || tick.get() % stride == agent_id.get() % stride
}

/// Looks up `mind_id`'s handler; pays or defers its cost exactly as Sense
/// does. Returns `true` if the mind ran, `false` if deferred (no entry) or
/// absent.
pub fn run_mind_for_agent(
    registry: &MindRegistry,
    mind_id: u64,
    agent_id: AgentId,
    tick: TickIndex,
    scope: BudgetScope,
    budget: &mut Budget,
    observations: &ObservationBuffer,
    state: &mut dyn MindState,
    intents: &mut IntentBuffer,
    seq: &mut u32,
) -> bool {
    let Some(mind) = registry.find(mind_id) else {
        return false;
    };
    if !fires(mind.stride(), tick, agent_id) {
        return false;
    }
    if !budget.try_consume(scope, mind.estimate_cost()) {
        return false;
    }
    let mut ctx = EmitIntentCtx { tick, agent_id, seq };
    let _ = mind.step(agent_id, observations, state, intents, &mut ctx);
    true
}

/// Retries a mind deferred by a budget refusal in an earlier tick. The
/// stride gate already passed when it was first deferred, so this skips
/// straight to paying `estimate_cost` and stepping; returns `false` only on
/// a missing registry entry or a further budget refusal (stop draining and
/// leave this item queued).
pub fn retry_mind_for_agent(
    registry: &MindRegistry,
    mind_id: u64,
    agent_id: AgentId,
    tick: TickIndex,
    scope: BudgetScope,
    budget: &mut Budget,
    observations: &ObservationBuffer,
    state: &mut dyn MindState,
    intents: &mut IntentBuffer,
    seq: &mut u32,
) -> bool {
    let Some(mind) = registry.find(mind_id) else {
        return false;
    };
    if !budget.try_consume(scope, mind.estimate_cost()) {
        return false;
    }
    let mut ctx = EmitIntentCtx { tick, agent_id, seq };
    let _ = mind.step(agent_id, observations, state, intents, &mut ctx);
    true
}

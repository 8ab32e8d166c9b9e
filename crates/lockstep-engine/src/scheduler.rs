//! The phase scheduler (§4.8): the axis of determinism. Owns every
//! per-tick buffer and registry and drives the fixed eight-phase loop.

use crate::act::{dispatch_to_deltas, ActionRegistry, IntentBuffer};
use crate::commit::{commit_apply, packet_hash, CommitStats, DeltaRegistry};
use crate::delta::DeltaBuffer;
use crate::domain::{run_domain_phase, DomainRegistry};
use crate::mind::{fires as mind_fires, retry_mind_for_agent, run_mind_for_agent, MindRegistry, MindState};
use crate::propagator::{run_solve, PropagatorRegistry};
use crate::registry::SortedRegistry;
use crate::sense::{run_sense_for_agent, ObservationBuffer, SensorRegistry};
use lockstep_core::budget::{Budget, BudgetScope};
use lockstep_core::ids::{AgentId, ChunkId, ComponentId, DomainId, EntityId, Seq, TickIndex, TypeId64};
use lockstep_core::order::{Phase, OrderingKey, PHASE_COUNT, PHASE_ORDER};
use lockstep_core::queue::{PushOutcome as QueuePushOutcome, WorkItem, WorkQueue};
use lockstep_journal::replay::{HashCtx, ReplayCtx};

/// The work a deferred, budget-gated phase-queue item performs once
/// approved: read-only world access plus the ability to emit deltas.
pub type PhaseWork<W> = Box<dyn FnMut(&W, &mut DeltaBuffer, TickIndex)>;

/// A handler registered against one phase, run unconditionally every tick
/// that phase executes (distinct from the budget-gated carryover queue).
pub type PhaseHandlerFn<W> = Box<dyn FnMut(&W, TickIndex, &mut DeltaBuffer, &mut WorkQueue<PhaseWork<W>>)>;

struct PhaseHandlerEntry<W> {
    priority_key: u64,
    insert_index: u64,
    f: PhaseHandlerFn<W>,
}

/// Per-agent wiring: which mind handles this agent, and its opaque scratch
/// state.
pub struct AgentSlot {
    pub agent_id: AgentId,
    pub mind_id: u64,
    pub domain_id: DomainId,
    pub chunk_id: ChunkId,
}

/// A sensor deferred by a budget refusal, carried into the next tick's
/// SENSE phase ahead of that tick's own agents (§4.9 step 1).
#[derive(Debug, Clone, Copy)]
struct SenseCarry {
    agent_id: AgentId,
    sensor_id: u64,
}

/// A mind deferred by a budget refusal, carried into the next tick's MIND
/// phase. Its stride already fired when it was first deferred, so the
/// retry skips straight to the budget check.
#[derive(Debug, Clone, Copy)]
struct MindCarry {
    agent_id: AgentId,
    mind_id: u64,
}

fn sense_carry_key(slot: &AgentSlot, sensor_id: u64) -> OrderingKey {
    OrderingKey::make(
        Phase::Sense,
        slot.domain_id,
        slot.chunk_id,
        EntityId::new(slot.agent_id.get()),
        ComponentId::new(sensor_id),
        TypeId64::ZERO,
        Seq::ZERO,
    )
}

fn mind_carry_key(slot: &AgentSlot) -> OrderingKey {
    OrderingKey::make(
        Phase::Mind,
        slot.domain_id,
        slot.chunk_id,
        EntityId::new(slot.agent_id.get()),
        ComponentId::new(slot.mind_id),
        TypeId64::ZERO,
        Seq::ZERO,
    )
}

/// Owns every piece of per-tick state named in §4.8 plus the registries
/// the sense→mind→act/solve/commit pipeline dispatches through. `W` is the
/// caller's opaque world type; only [`commit::DeltaHandler::apply`] may
/// mutate it.
pub struct Scheduler<W> {
    tick: TickIndex,
    current_phase: Phase,

    budget: Budget,
    per_phase_budget_limit: [u32; PHASE_COUNT],
    domain_default: u32,
    chunk_default: u32,

    phase_queues: Vec<WorkQueue<PhaseWork<W>>>,
    phase_handlers: Vec<Vec<PhaseHandlerEntry<W>>>,
    next_handler_insert_index: u64,
    sense_carryover: WorkQueue<SenseCarry>,
    mind_carryover: WorkQueue<MindCarry>,

    agents: Vec<AgentSlot>,
    mind_states: SortedRegistry<u64, Box<dyn MindState>>,
    sensors: SensorRegistry,
    minds: MindRegistry,
    actions: ActionRegistry<W>,
    propagators: PropagatorRegistry,
    domains: DomainRegistry,

    observation_buffer: ObservationBuffer,
    intent_buffer: IntentBuffer,
    delta_registry: DeltaRegistry<W>,
    delta_buffer: DeltaBuffer,

    hash_ctx: HashCtx,
    replay_ctx: ReplayCtx,

    last_commit_stats: CommitStats,
}

/// Caller-supplied capacities for every bounded buffer/registry, passed to
/// `reserve` once at setup (§3: "all arenas are caller-sized at reserve").
pub struct SchedulerCapacities {
    pub phase_queue_items: usize,
    pub agents: usize,
    pub sensors: usize,
    pub minds: usize,
    pub actions: usize,
    pub delta_handlers: usize,
    pub propagators: usize,
    pub domains: usize,
    pub observation_records: usize,
    pub observation_bytes: usize,
    pub intent_records: usize,
    pub intent_bytes: usize,
    pub delta_records: usize,
    pub delta_bytes: usize,
    pub domain_cap: usize,
    pub chunk_cap: usize,
}

impl<W> Scheduler<W> {
    pub fn reserve(cap: SchedulerCapacities) -> Self {
        Scheduler {
            tick: TickIndex::ZERO,
            current_phase: Phase::Input,
            budget: Budget::reserve(cap.domain_cap, cap.chunk_cap),
            per_phase_budget_limit: [lockstep_core::budget::UNLIMITED; PHASE_COUNT],
            domain_default: lockstep_core::budget::UNLIMITED,
            chunk_default: lockstep_core::budget::UNLIMITED,
            phase_queues: (0..PHASE_COUNT)
                .map(|_| WorkQueue::reserve(cap.phase_queue_items))
                .collect(),
            phase_handlers: (0..PHASE_COUNT).map(|_| Vec::new()).collect(),
            next_handler_insert_index: 0,
            sense_carryover: WorkQueue::reserve(cap.phase_queue_items),
            mind_carryover: WorkQueue::reserve(cap.phase_queue_items),
            agents: Vec::with_capacity(cap.agents),
            mind_states: SortedRegistry::reserve(cap.agents),
            sensors: SortedRegistry::reserve(cap.sensors),
            minds: SortedRegistry::reserve(cap.minds),
            actions: SortedRegistry::reserve(cap.actions),
            propagators: SortedRegistry::reserve(cap.propagators),
            domains: SortedRegistry::reserve(cap.domains),
            observation_buffer: ObservationBuffer::reserve(cap.observation_records, cap.observation_bytes),
            intent_buffer: IntentBuffer::reserve(cap.intent_records, cap.intent_bytes),
            delta_registry: SortedRegistry::reserve(cap.delta_handlers),
            delta_buffer: DeltaBuffer::reserve(cap.delta_records, cap.delta_bytes),
            hash_ctx: HashCtx::new(),
            replay_ctx: ReplayCtx::new(),
            last_commit_stats: CommitStats::default(),
        }
    }

    pub fn set_limits(&mut self, per_phase_budget_limit: [u32; PHASE_COUNT], domain_default: u32, chunk_default: u32) {
        self.per_phase_budget_limit = per_phase_budget_limit;
        self.domain_default = domain_default;
        self.chunk_default = chunk_default;
    }

    pub fn set_domain_limit(&mut self, id: DomainId, limit: u32) {
        self.budget.set_domain_limit(id, limit);
    }

    pub fn set_chunk_limit(&mut self, id: ChunkId, limit: u32) {
        self.budget.set_chunk_limit(id, limit);
    }

    pub fn register_agent(&mut self, slot: AgentSlot, state: Box<dyn MindState>) {
        let _ = self.mind_states.add(slot.agent_id.get(), state);
        self.agents.push(slot);
        self.agents.sort_by_key(|s| s.agent_id.get());
    }

    pub fn register_sensor(&mut self, sensor_id: u64, sensor: Box<dyn crate::sense::Sensor>) -> crate::error::EngineResult<()> {
        self.sensors.add(sensor_id, sensor)
    }

    pub fn register_mind(&mut self, mind_id: u64, mind: Box<dyn crate::mind::Mind>) -> crate::error::EngineResult<()> {
        self.minds.add(mind_id, mind)
    }

    pub fn register_action(&mut self, type_id: u64, action: Box<dyn crate::act::Action<W>>) -> crate::error::EngineResult<()> {
        self.actions.add(type_id, action)
    }

    pub fn register_delta_handler(
        &mut self,
        type_id: u64,
        handler: Box<dyn crate::commit::DeltaHandler<W>>,
    ) -> crate::error::EngineResult<()> {
        self.delta_registry.add(type_id, handler)
    }

    pub fn register_propagator(&mut self, key: (u64, u64), propagator: Box<dyn crate::propagator::Propagator>) -> crate::error::EngineResult<()> {
        self.propagators.add(key, propagator)
    }

    pub fn register_domain(&mut self, domain_id: u64, domain: Box<dyn crate::domain::Domain>) -> crate::error::EngineResult<()> {
        self.domains.add(domain_id, domain)
    }

    /// Registers a phase handler, sorted by `(priority_key, insert_index)`
    /// — registration order among equal priorities is preserved (§4.8).
    pub fn register_phase_handler(&mut self, phase: Phase, priority_key: u64, f: PhaseHandlerFn<W>) {
        let insert_index = self.next_handler_insert_index;
        self.next_handler_insert_index = self.next_handler_insert_index.wrapping_add(1);
        let entries = &mut self.phase_handlers[phase.index()];
        let pos = entries
            .binary_search_by_key(&(priority_key, insert_index), |e| (e.priority_key, e.insert_index))
            .unwrap_or_else(|p| p);
        entries.insert(
            pos,
            PhaseHandlerEntry {
                priority_key,
                insert_index,
                f,
            },
        );
    }

    /// Requires `item.key.phase == phase as u16`; refuses silently (no
    /// counter) on mismatch, refuses with a counter increment on queue
    /// overflow (§4.8).
    pub fn enqueue_work(&mut self, phase: Phase, item: WorkItem<PhaseWork<W>>) -> QueuePushOutcome {
        if item.key.phase != phase.as_u16() {
            return QueuePushOutcome::Refused;
        }
        self.phase_queues[phase.index()].push(item)
    }

    pub fn current_phase(&self) -> Phase {
        self.current_phase
    }

    pub fn tick_index(&self) -> TickIndex {
        self.tick
    }

    pub fn last_commit_stats(&self) -> CommitStats {
        self.last_commit_stats
    }

    pub fn hash_snapshot(&self) -> lockstep_journal::replay::StateHash {
        self.hash_ctx.snapshot()
    }

    pub fn replay_log(&self) -> &lockstep_journal::replay::ReplayLog {
        self.replay_ctx.log()
    }

    fn scope_of(key: &OrderingKey) -> BudgetScope {
        BudgetScope::domain_chunk(key.domain_id, key.chunk_id)
    }

    /// Repeatedly peeks the queue's least item; stops immediately on the
    /// first budget refusal, leaving it (and everything after it) as
    /// carryover for the next tick — "deterministic deferral: do not
    /// skip" (§4.8).
    fn process_phase_work(&mut self, world: &W, phase: Phase) {
        loop {
            let Some(item) = self.phase_queues[phase.index()].peek_next() else {
                break;
            };
            let scope = Self::scope_of(&item.key);
            let cost = item.cost_units;
            if !self.budget.try_consume(scope, cost) {
                break;
            }
            let mut item = self.phase_queues[phase.index()].pop_next().expect("peeked item must be present");
            (item.payload)(world, &mut self.delta_buffer, self.tick);
        }
    }

    /// Drains sensors deferred by an earlier tick's budget refusal, in
    /// their original carryover order, before this tick's own agents are
    /// sampled. Stops at the first renewed refusal, same "do not skip"
    /// discipline as [`process_phase_work`](Self::process_phase_work).
    fn drain_sense_carryover(&mut self, tick: TickIndex) {
        loop {
            let Some(item) = self.sense_carryover.peek_next() else {
                break;
            };
            let scope = Self::scope_of(&item.key);
            let SenseCarry { agent_id, sensor_id } = item.payload;
            let Some(sensor) = self.sensors.find(sensor_id) else {
                self.sense_carryover.pop_next();
                continue;
            };
            if !self.budget.try_consume(scope, sensor.estimate_cost()) {
                break;
            }
            self.sense_carryover.pop_next();
            let mut seq = 0u32;
            let _ = sensor.sample(agent_id, tick, &mut seq, &mut self.observation_buffer);
        }
    }

    /// Drains minds deferred by an earlier tick's budget refusal. The
    /// stride gate already fired when each item was first deferred, so
    /// only the registry entry and the budget are re-checked.
    fn drain_mind_carryover(&mut self, tick: TickIndex) {
        loop {
            let Some(item) = self.mind_carryover.peek_next() else {
                break;
            };
            let scope = Self::scope_of(&item.key);
            let MindCarry { agent_id, mind_id } = item.payload;
            if self.minds.find(mind_id).is_none() {
                self.mind_carryover.pop_next();
                continue;
            }
            let Some(state) = self.mind_states.find_mut(agent_id.get()) else {
                self.mind_carryover.pop_next();
                continue;
            };
            let mut seq = 0u32;
            let ran = retry_mind_for_agent(
                &self.minds,
                mind_id,
                agent_id,
                tick,
                scope,
                &mut self.budget,
                &self.observation_buffer,
                state.as_mut(),
                &mut self.intent_buffer,
                &mut seq,
            );
            if !ran {
                break;
            }
            self.mind_carryover.pop_next();
        }
    }

    /// SENSE phase (§4.9 step 1): drains carryover, then samples every
    /// agent's sensors under SENSE's own budget limit, enqueuing any newly
    /// deferred sensor ids as carryover for the next tick.
    fn run_sense_phase(&mut self, tick: TickIndex) {
        self.observation_buffer.begin_tick(tick);
        self.drain_sense_carryover(tick);
        for slot in &self.agents {
            let scope = BudgetScope::domain_chunk(slot.domain_id, slot.chunk_id);
            let mut seq = 0u32;
            let deferred = run_sense_for_agent(
                &self.sensors,
                slot.agent_id,
                tick,
                scope,
                &mut self.budget,
                &mut seq,
                &mut self.observation_buffer,
            );
            for sensor_id in deferred {
                let key = sense_carry_key(slot, sensor_id);
                let _ = self.sense_carryover.push(WorkItem {
                    key,
                    cost_units: 0,
                    payload: SenseCarry { agent_id: slot.agent_id, sensor_id },
                });
            }
        }
        self.observation_buffer.canonize();
    }

    /// MIND phase (§4.9 step 2): drains carryover, then steps every
    /// agent's mind under MIND's own budget limit, enqueuing any newly
    /// deferred agent as carryover for the next tick. Missing registry
    /// entries and off-stride minds are skipped, never deferred.
    fn run_mind_phase(&mut self, tick: TickIndex) {
        self.intent_buffer.begin_tick(tick);
        self.drain_mind_carryover(tick);
        for slot in &self.agents {
            let Some(mind) = self.minds.find(slot.mind_id) else {
                continue;
            };
            if !mind_fires(mind.stride(), tick, slot.agent_id) {
                continue;
            }
            let scope = BudgetScope::domain_chunk(slot.domain_id, slot.chunk_id);
            let Some(state) = self.mind_states.find_mut(slot.agent_id.get()) else {
                continue;
            };
            let mut seq = 0u32;
            let ran = run_mind_for_agent(
                &self.minds,
                slot.mind_id,
                slot.agent_id,
                tick,
                scope,
                &mut self.budget,
                &self.observation_buffer,
                state.as_mut(),
                &mut self.intent_buffer,
                &mut seq,
            );
            if !ran {
                let key = mind_carry_key(slot);
                let _ = self.mind_carryover.push(WorkItem {
                    key,
                    cost_units: 0,
                    payload: MindCarry { agent_id: slot.agent_id, mind_id: slot.mind_id },
                });
            }
        }
        self.intent_buffer.canonize();
    }

    /// ACTION phase: dispatch is unconditional — actions carry no budget
    /// gate of their own (§4.9 step 3).
    fn run_action_phase(&mut self, world: &W) {
        dispatch_to_deltas(&self.actions, world, &self.intent_buffer, &mut self.delta_buffer);
    }

    /// Runs one tick's full eight-phase pipeline (§4.8). `world` is
    /// read-only everywhere except inside `commit_apply`.
    pub fn tick(&mut self, world: &mut W, tick_index: TickIndex) -> CommitStats {
        self.tick = tick_index;
        self.delta_buffer.begin_tick(tick_index);
        self.hash_ctx.begin_tick();
        self.replay_ctx.begin_tick(tick_index);

        for &phase in PHASE_ORDER.iter() {
            self.current_phase = phase;
            self.budget
                .set_limits(self.per_phase_budget_limit[phase.index()], self.domain_default, self.chunk_default);
            self.budget.begin_tick(tick_index);
            self.hash_ctx.phase_begin(phase);
            self.replay_ctx.phase_begin(phase);
            tracing::debug!(tick = tick_index.get(), phase = phase.name(), "phase begin");

            let world_ref: &W = world;
            self.run_registered_phase_handlers(world_ref, phase);

            match phase {
                Phase::Sense => self.run_sense_phase(tick_index),
                Phase::Mind => self.run_mind_phase(tick_index),
                Phase::Action => self.run_action_phase(world_ref),
                Phase::Topology | Phase::Solve => {
                    run_domain_phase(&mut self.domains, phase, &mut self.budget);
                    if phase == Phase::Solve {
                        run_solve(&mut self.propagators, tick_index, &mut self.budget);
                    }
                }
                _ => {}
            }

            self.process_phase_work(world_ref, phase);

            if phase == Phase::Commit {
                let stats = commit_apply(world, &self.delta_registry, &mut self.delta_buffer);
                self.last_commit_stats = stats;
                let arena = self.delta_buffer.arena().to_vec();
                for record in self.delta_buffer.records() {
                    let key = record.header.key;
                    let hash = packet_hash(key.type_id, record.payload(&arena));
                    self.hash_ctx.record_committed_delta(&key, hash);
                    self.replay_ctx.record_committed_delta(&key, hash);
                }
            }

            self.hash_ctx.phase_end(phase);
            self.replay_ctx.phase_end(phase);
            tracing::debug!(tick = tick_index.get(), phase = phase.name(), "phase end");
        }

        self.replay_ctx.end_tick();
        self.last_commit_stats
    }

    /// Takes the phase's handler list out of `self` for the duration of
    /// the run so each handler's `&mut DeltaBuffer`/`&mut WorkQueue` args
    /// can be borrowed without conflicting with the (otherwise untouched)
    /// `phase_handlers` field, then puts it back.
    fn run_registered_phase_handlers(&mut self, world: &W, phase: Phase) {
        let mut entries = std::mem::take(&mut self.phase_handlers[phase.index()]);
        for entry in &mut entries {
            (entry.f)(world, self.tick, &mut self.delta_buffer, &mut self.phase_queues[phase.index()]);
        }
        self.phase_handlers[phase.index()] = entries;
    }
}

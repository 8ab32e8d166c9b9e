//! Scheduler tick throughput benchmark.
//!
//! Measures the full eight-phase `Scheduler::tick` loop end to end (sense,
//! mind, act, commit all wired up) at a few agent-count scales, plus an
//! isolated `commit_apply` baseline so the sense/mind/act overhead can be
//! read off by subtraction.
//!
//! Run with: `cargo bench --bench scheduler_benchmarks`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use lockstep_core::budget::UNLIMITED;
use lockstep_core::ids::{AgentId, ChunkId, ComponentId, DomainId, EntityId, TickIndex, TypeId64};
use lockstep_core::order::{Phase, PHASE_COUNT};
use lockstep_engine::act::{Action, IntentHeader};
use lockstep_engine::commit::{commit_apply, CommitStats, DeltaHandler, DeltaRegistry};
use lockstep_engine::delta::DeltaBuffer;
use lockstep_engine::mind::{EmitIntentCtx, Mind, MindState};
use lockstep_engine::scheduler::{AgentSlot, Scheduler, SchedulerCapacities};
use lockstep_engine::sense::{ObservationBuffer, Sensor};
use lockstep_core::order::OrderingKey;
use lockstep_core::ids::Seq;

#[derive(Default)]
struct CounterWorld;

struct ScratchState(Vec<u8>);
impl MindState for ScratchState {
    fn as_bytes(&self) -> &[u8] {
        &self.0
    }
    fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }
}

struct PositionSensor;
impl Sensor for PositionSensor {
    fn sample(
        &self,
        _agent_id: AgentId,
        tick: TickIndex,
        seq: &mut u32,
        out: &mut ObservationBuffer,
    ) -> Result<(), ()> {
        let header = lockstep_engine::sense::ObservationHeader {
            tick,
            agent_id: AgentId::ZERO,
            sensor_id: 1,
            seq: *seq,
            payload_len: 8,
        };
        *seq += 1;
        out.push(header, &0u64.to_le_bytes());
        Ok(())
    }
}

struct MoveMind;
impl Mind for MoveMind {
    fn step(
        &self,
        _agent_id: AgentId,
        _observations: &ObservationBuffer,
        _state: &mut dyn MindState,
        intents: &mut lockstep_engine::act::IntentBuffer,
        ctx: &mut EmitIntentCtx,
    ) -> Result<(), ()> {
        ctx.emit(intents, TypeId64::new(1), 0, 0, EntityId::ZERO, &1i64.to_le_bytes());
        Ok(())
    }
}

struct MoveAction;
impl Action<CounterWorld> for MoveAction {
    fn apply(
        &self,
        _world: &CounterWorld,
        _intent: &IntentHeader,
        payload: &[u8],
        emit_delta: &mut dyn FnMut(Phase, ChunkId, DomainId, ComponentId, &[u8]),
    ) {
        emit_delta(Phase::Commit, ChunkId::ZERO, DomainId::ZERO, ComponentId::ZERO, payload);
    }
}

struct MoveDeltaHandler;
impl DeltaHandler<CounterWorld> for MoveDeltaHandler {
    fn apply(&self, _world: &mut CounterWorld, _key: &OrderingKey, _payload: &[u8]) {}
}

fn build_scheduler(agent_count: usize) -> Scheduler<CounterWorld> {
    let mut scheduler: Scheduler<CounterWorld> = Scheduler::reserve(SchedulerCapacities {
        phase_queue_items: 16,
        agents: agent_count,
        sensors: 4,
        minds: 4,
        actions: 4,
        delta_handlers: 4,
        propagators: 4,
        domains: 4,
        observation_records: agent_count + 16,
        observation_bytes: (agent_count + 16) * 16,
        intent_records: agent_count + 16,
        intent_bytes: (agent_count + 16) * 16,
        delta_records: agent_count + 16,
        delta_bytes: (agent_count + 16) * 16,
        domain_cap: 4,
        chunk_cap: 4,
    });
    scheduler.set_limits([UNLIMITED; PHASE_COUNT], UNLIMITED, UNLIMITED);
    scheduler.register_sensor(1, Box::new(PositionSensor)).unwrap();
    scheduler.register_mind(1, Box::new(MoveMind)).unwrap();
    scheduler.register_action(1, Box::new(MoveAction)).unwrap();
    scheduler.register_delta_handler(1, Box::new(MoveDeltaHandler)).unwrap();
    for i in 0..agent_count {
        scheduler.register_agent(
            AgentSlot {
                agent_id: AgentId::new(i as u64),
                mind_id: 1,
                domain_id: DomainId::ZERO,
                chunk_id: ChunkId::ZERO,
            },
            Box::new(ScratchState(Vec::new())),
        );
    }
    scheduler
}

fn bench_full_tick_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("scheduler_tick_scaling");
    for &agent_count in &[10usize, 100, 500] {
        let mut scheduler = build_scheduler(agent_count);
        let mut world = CounterWorld;
        let mut tick = 0u64;

        group.bench_with_input(
            BenchmarkId::from_parameter(agent_count),
            &agent_count,
            |b, _| {
                b.iter(|| {
                    tick += 1;
                    let stats: CommitStats = scheduler.tick(&mut world, TickIndex::new(tick));
                    black_box(stats);
                });
            },
        );
    }
    group.finish();
}

fn bench_commit_apply_only(c: &mut Criterion) {
    let mut registry: DeltaRegistry<CounterWorld> = DeltaRegistry::reserve(4);
    registry.add(1, Box::new(MoveDeltaHandler)).unwrap();

    c.bench_function("commit_apply_100_deltas", |b| {
        b.iter(|| {
            let mut buf = DeltaBuffer::reserve(128, 2048);
            buf.begin_tick(TickIndex::ZERO);
            for i in 0..100u64 {
                let key = OrderingKey::make(
                    Phase::Commit,
                    DomainId::ZERO,
                    ChunkId::ZERO,
                    EntityId::new(i),
                    ComponentId::ZERO,
                    TypeId64::new(1),
                    Seq(i as u32),
                );
                buf.push(key, TickIndex::ZERO, &i.to_le_bytes());
            }
            let mut world = CounterWorld;
            let stats = commit_apply(&mut world, &registry, &mut buf);
            black_box(stats);
        });
    });
}

criterion_group!(benches, bench_full_tick_scaling, bench_commit_apply_only);
criterion_main!(benches);

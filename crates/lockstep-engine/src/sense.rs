//! SENSE phase: the observation buffer and sensor registry/dispatch (§4.5,
//! §4.9 step 1).

use crate::buffer::{PushOutcome, Record, RecordBuffer, RecordHeader};
use crate::registry::SortedRegistry;
use lockstep_core::budget::{Budget, BudgetScope};
use lockstep_core::ids::{AgentId, TickIndex};

/// Observation header: `sensor_id` plus `agent_id` identify a reading;
/// `seq` is assigned by the sensor at sample time. The observation
/// comparator is otherwise left open, so this orders by `(agent_id,
/// sensor_id, seq)` — the order sensors are iterated and
/// results consumed by minds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObservationHeader {
    pub tick: TickIndex,
    pub agent_id: AgentId,
    pub sensor_id: u64,
    pub seq: u32,
    pub payload_len: u32,
}

impl RecordHeader for ObservationHeader {
    fn tick(&self) -> TickIndex {
        self.tick
    }
    fn payload_len(&self) -> u32 {
        self.payload_len
    }
}

pub type ObservationRecord = Record<ObservationHeader>;

pub struct ObservationBuffer {
    inner: RecordBuffer<ObservationHeader>,
}

impl ObservationBuffer {
    pub fn reserve(capacity_records: usize, capacity_bytes: usize) -> Self {
        ObservationBuffer {
            inner: RecordBuffer::reserve(capacity_records, capacity_bytes),
        }
    }

    pub fn begin_tick(&mut self, tick: TickIndex) {
        self.inner.begin_tick(tick);
    }

    pub fn push(&mut self, header: ObservationHeader, payload: &[u8]) -> PushOutcome {
        self.inner.push(header, payload)
    }

    pub fn canonize(&mut self) {
        self.inner.sort_by(|a, b| {
            (a.header.agent_id, a.header.sensor_id, a.header.seq)
                .cmp(&(b.header.agent_id, b.header.sensor_id, b.header.seq))
        });
    }

    pub fn records(&self) -> &[ObservationRecord] {
        self.inner.records()
    }

    pub fn arena(&self) -> &[u8] {
        self.inner.arena()
    }

    pub fn for_agent(&self, agent_id: AgentId) -> impl Iterator<Item = &ObservationRecord> {
        self.inner
            .records()
            .iter()
            .filter(move |r| r.header.agent_id == agent_id)
    }
}

/// `{ sample, estimate_cost, stride }` (§4.6). `sample` writes observations
/// for one agent into `out` and returns `Ok` or `Err` (a sensor failure
/// does not halt the tick, it simply yields no observation).
pub trait Sensor {
    fn sample(
        &self,
        agent_id: AgentId,
        tick: TickIndex,
        seq: &mut u32,
        out: &mut ObservationBuffer,
    ) -> Result<(), ()>;

    fn estimate_cost(&self) -> u32 {
        1
    }

    /// Fires only when `tick % stride == agent_id % stride` (§4.6).
    fn stride(&self) -> u64 {
        1
    }
}

pub type SensorRegistry = SortedRegistry<u64, Box<dyn Sensor>>;

fn fires(stride: u64, tick: TickIndex, agent_id: AgentId) -> bool {
    stride == 0 || tick.get() % stride == agent_id.get() % stride
}

/// Ascending `sensor_id` iteration for one agent. On the first budget
/// refusal, this sensor *and every later sensor that would have fired* are
/// recorded as carryover (their ids, in registry order) rather than
/// sampled — per the "deterministic deferral: do not skip" rule (§4.9).
/// Returns the sensor ids deferred this call, empty if all fired.
pub fn run_sense_for_agent(
    registry: &SensorRegistry,
    agent_id: AgentId,
    tick: TickIndex,
    scope: BudgetScope,
    budget: &mut Budget,
    seq: &mut u32,
    out: &mut ObservationBuffer,
) -> Vec<u64> {
    let mut deferred = Vec::new();
    let mut deferring = false;
    for (sensor_id, sensor) in registry.iter() {
        if !fires(sensor.stride(), tick, agent_id) {
            continue;
        }
        if deferring {
            deferred.push(*sensor_id);
            continue;
        }
        let cost = sensor.estimate_cost();
        if budget.try_consume(scope, cost) {
            let _ = sensor.sample(agent_id, tick, seq, out);
        } else {
            deferring = true;
            deferred.push(*sensor_id);
        }
    }
    deferred
}

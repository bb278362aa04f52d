use hbm_axi::{AxiDefaults, BurstType, DataWord, Resp};
use hbm_engine::{
    ChannelStatus, EngineState,
    csr::{ChannelReg, CsrTarget, SharedReg},
};
use hbm_sim::{
    Simulator,
    configuration::{BackPressure, MemoryConfig, RuntimeConfig},
    errors::SimError,
    logging::discard,
};
use proptest::prelude::*;

const PATTERN: u32 = 0x1000;

fn simulator(channels: usize, memory: MemoryConfig) -> Simulator {
    Simulator::new(
        channels,
        AxiDefaults::default(),
        memory,
        RuntimeConfig::default(),
        &discard(),
    )
    .unwrap()
}

fn reg(channel: usize, reg: ChannelReg) -> u32 {
    CsrTarget::Channel(channel, reg).address()
}

/// Loads a burst configuration through the register interface.
fn configure(sim: &mut Simulator, channel: usize, mode: u32, burst_len: u32) {
    sim.csr_write(reg(channel, ChannelReg::Mode), mode).unwrap();
    sim.csr_write(reg(channel, ChannelReg::Address), 0x40).unwrap();
    sim.csr_write(reg(channel, ChannelReg::BurstLen), burst_len)
        .unwrap();
    sim.csr_write(reg(channel, ChannelReg::LastBurstLen), 0)
        .unwrap();
    sim.csr_write(reg(channel, ChannelReg::BurstQuantity), 2)
        .unwrap();
}

/// Starts, lets every enabled engine leave `Idle`, then clears `start` so
/// that exactly one sequence runs.
fn begin_one_sequence(sim: &mut Simulator) {
    sim.csr_write(SharedReg::DataPattern.offset(), PATTERN).unwrap();
    sim.csr_write(SharedReg::Start.offset(), 1).unwrap();
    sim.tick();
    sim.csr_write(SharedReg::Start.offset(), 0).unwrap();
}

fn one_sequence(sim: &mut Simulator) {
    begin_one_sequence(sim);
    sim.run_until(Simulator::all_done, 10_000).unwrap();
}

/// Runs channel 0 until it is back in `issue` with `burst_counter` at
/// `bursts`, then returns the AXI `len` of the address it drives.
fn len_of_burst(sim: &mut Simulator, issue: EngineState, bursts: u32) -> u16 {
    sim.run_until(
        |sim| {
            let engine = sim.engine(0).unwrap();
            engine.state() == issue && engine.burst_counter() == bursts
        },
        1_000,
    )
    .unwrap();
    let master = sim.engine(0).unwrap().drive(sim.shared());
    master.aw.or(master.ar).unwrap().len
}

/// Keeps `start` high with no pause configured and records the status and
/// `burst_counter` on the tick before each of `sequences` restarts. Checks
/// that every restart lands in `issue` with all counters cleared.
fn restarts(
    sim: &mut Simulator,
    issue: EngineState,
    sequences: usize,
) -> Vec<(ChannelStatus, u32)> {
    sim.csr_write(SharedReg::DataPattern.offset(), PATTERN).unwrap();
    sim.start();
    sim.tick();
    assert_eq!(sim.engine(0).unwrap().state(), issue);

    let mut before_restart = Vec::new();
    while before_restart.len() < sequences {
        assert!(sim.cycle() < 1_000, "engine never restarted");
        let engine = sim.engine(0).unwrap();
        let before = (*engine.status(), engine.burst_counter());
        sim.tick();

        let engine = sim.engine(0).unwrap();
        if before.0.state == issue || engine.state() != issue {
            continue;
        }
        assert_eq!(engine.status().ticks, 0);
        assert_eq!(engine.status().total_reads, 0);
        assert_eq!(engine.status().total_writes, 0);
        assert_eq!(engine.beat_counter(), 0);
        assert_eq!(engine.burst_counter(), 0);
        assert_eq!(engine.delay_counter(), 0);
        before_restart.push(before);
    }
    before_restart
}

fn write_then_stop(memory: MemoryConfig) -> Simulator {
    let mut sim = simulator(1, memory);
    sim.csr_write(SharedReg::ChannelMask.offset(), 1).unwrap();
    configure(&mut sim, 0, 0, 4);
    one_sequence(&mut sim);
    sim
}

#[test]
fn write_two_bursts_then_stop() {
    let sim = write_then_stop(MemoryConfig::default());
    let engine = sim.engine(0).unwrap();

    assert_eq!(engine.status().total_writes, 8);
    assert_eq!(engine.status().total_reads, 0);
    assert_eq!(engine.burst_counter(), 2);
    assert_eq!(engine.state(), EngineState::Idle);
    // issue, three more beats and the response, twice
    assert_eq!(engine.status().ticks, 10);
    assert_eq!(sim.csr_read(reg(0, ChannelReg::Done)).unwrap(), 1);
    assert_eq!(sim.csr_read(reg(0, ChannelReg::TotalWrites)).unwrap(), 8);
    assert_eq!(sim.csr_read(reg(0, ChannelReg::WriteResp)).unwrap(), 0);
}

#[test]
fn read_back_reports_last_beat() {
    let mut sim = write_then_stop(MemoryConfig::default());
    configure(&mut sim, 0, 1, 4);
    one_sequence(&mut sim);

    let status = *sim.engine(0).unwrap().status();
    assert_eq!(status.total_reads, 8);
    assert_eq!(status.total_writes, 0);
    assert_eq!(status.read_data.lane(0), PATTERN + 3);
    assert_eq!(status.read_resp, Resp::Okay);
    assert_eq!(
        sim.csr_read(reg(0, ChannelReg::ReadData0)).unwrap(),
        PATTERN + 3
    );
    assert_eq!(sim.csr_read(reg(0, ChannelReg::ReadData7)).unwrap(), PATTERN);
}

#[test]
fn written_words_carry_the_pattern() {
    let sim = write_then_stop(MemoryConfig::default());
    let memory = sim.memory(0).unwrap();
    let base = 0x40 << 5;
    for beat in 0..4u32 {
        let word = memory.peek(base + u64::from(beat) * 32);
        assert_eq!(word.lane(0), PATTERN + beat);
        assert!(word.lanes()[1..].iter().all(|lane| *lane == PATTERN));
    }
    assert_eq!(memory.words_stored(), 4);
}

#[test]
fn pause_then_resume_with_cleared_counters() {
    let mut sim = simulator(1, MemoryConfig::default());
    sim.csr_write(SharedReg::ChannelMask.offset(), 1).unwrap();
    configure(&mut sim, 0, 0, 4);
    sim.csr_write(reg(0, ChannelReg::DelayBound), 10).unwrap();
    sim.start();

    sim.run_until(
        |sim| sim.engine(0).unwrap().state() == EngineState::WritePause,
        1_000,
    )
    .unwrap();
    let paused = *sim.engine(0).unwrap().status();
    assert_eq!(paused.total_writes, 8);

    for _ in 0..9 {
        sim.tick();
        assert_eq!(*sim.engine(0).unwrap().status(), paused);
    }
    sim.tick();

    let engine = sim.engine(0).unwrap();
    assert_eq!(engine.state(), EngineState::WriteIssue);
    assert_eq!(engine.status().ticks, 0);
    assert_eq!(engine.status().total_writes, 0);
}

#[test]
fn masked_channel_never_leaves_idle() {
    let mut sim = simulator(2, MemoryConfig::default());
    sim.csr_write(SharedReg::ChannelMask.offset(), 0b01).unwrap();
    configure(&mut sim, 0, 0, 4);
    configure(&mut sim, 1, 0, 4);
    sim.start();

    for _ in 0..500 {
        sim.tick();
        assert_eq!(sim.engine(1).unwrap().state(), EngineState::Idle);
    }
    assert_ne!(sim.engine(0).unwrap().status().total_writes, 0);
    assert_eq!(sim.engine(1).unwrap().status().ticks, 0);
}

#[test]
fn unresponsive_memory_stalls_the_engine() {
    let mut sim =
        simulator(1, MemoryConfig::builder().unresponsive(true).build());
    sim.csr_write(SharedReg::ChannelMask.offset(), 1).unwrap();
    configure(&mut sim, 0, 0, 4);
    sim.start();
    sim.run(100);

    let engine = sim.engine(0).unwrap();
    assert_eq!(engine.state(), EngineState::WriteIssue);
    assert_eq!(engine.status().ticks, 99);
    assert_eq!(engine.status().total_writes, 0);
    assert_eq!(sim.stalled(50), vec![0]);

    let err = sim.drain(100).unwrap_err();
    assert!(matches!(
        err.inner(),
        SimError::Timeout { states, .. } if states == &[EngineState::WriteIssue]
    ));
}

#[test]
fn force_pause_aligns_channels() {
    let mut sim = simulator(2, MemoryConfig::default());
    sim.csr_write(SharedReg::ChannelMask.offset(), 0b11).unwrap();
    sim.csr_write(SharedReg::ForcePause.offset(), 1).unwrap();
    configure(&mut sim, 0, 0, 2);
    configure(&mut sim, 1, 0, 8);
    sim.start();

    sim.run_until(
        |sim| sim.engines().all(|engine| engine.state().is_pause()),
        1_000,
    )
    .unwrap();
    // held for as long as the host wants
    sim.run(50);
    assert!(sim.engines().all(|engine| engine.state().is_pause()));

    sim.csr_write(SharedReg::ForcePause.offset(), 0).unwrap();
    sim.tick();
    assert_eq!(sim.states(), vec![EngineState::WriteIssue; 2]);
}

#[test]
fn back_pressure_slows_but_does_not_lose_beats() {
    let free = write_then_stop(MemoryConfig::default());
    let throttled = write_then_stop(
        MemoryConfig::builder()
            .back_pressure(BackPressure::builder().period(3).stall(2).build())
            .write_latency(4)
            .build(),
    );

    let free = free.engine(0).unwrap().status();
    let throttled = throttled.engine(0).unwrap().status();
    assert_eq!(throttled.total_writes, free.total_writes);
    assert!(throttled.ticks > free.ticks);
}

#[test]
fn writes_past_capacity_report_decode_error() {
    let sim = write_then_stop(MemoryConfig::builder().capacity(0x800).build());
    assert_eq!(
        sim.csr_read(reg(0, ChannelReg::WriteResp)).unwrap(),
        Resp::DecErr.bits()
    );
    assert_eq!(sim.memory(0).unwrap().words_stored(), 0);
    assert!(sim.report().channels[0].error_response);
}

#[test]
fn fixed_bursts_rewrite_one_word() {
    let mut sim = Simulator::new(
        1,
        AxiDefaults::default().with_burst(BurstType::Fixed),
        MemoryConfig::default(),
        RuntimeConfig::default(),
        &discard(),
    )
    .unwrap();
    sim.csr_write(SharedReg::ChannelMask.offset(), 1).unwrap();
    configure(&mut sim, 0, 0, 4);
    one_sequence(&mut sim);

    let memory = sim.memory(0).unwrap();
    assert_eq!(memory.words_stored(), 1);
    assert_eq!(memory.peek(0x40 << 5).lane(0), PATTERN + 3);
}

#[test]
fn report_counts_enabled_channels() {
    let sim = write_then_stop(MemoryConfig::default());
    let report = sim.report();
    assert_eq!(report.channels.len(), 1);
    assert_eq!(report.total_bytes, 8 * 32);
    assert!(report.aggregate_gbps > 0.0);
    assert!(!report.channels[0].error_response);
    let json = report.to_json().unwrap();
    assert!(json.contains("\"total_writes\": 8"));
}

#[test]
fn held_start_restarts_writes_with_cleared_counters() {
    let mut sim = simulator(1, MemoryConfig::default());
    sim.csr_write(SharedReg::ChannelMask.offset(), 1).unwrap();
    configure(&mut sim, 0, 0, 2);
    sim.csr_write(reg(0, ChannelReg::BurstQuantity), 1).unwrap();

    for (status, bursts) in restarts(&mut sim, EngineState::WriteIssue, 3) {
        assert_eq!(status.state, EngineState::WriteLast);
        assert_eq!(status.ticks, 2);
        assert_eq!(status.total_writes, 2);
        assert_eq!(bursts, 1);
    }
}

#[test]
fn held_start_restarts_reads_with_cleared_counters() {
    let mut sim = simulator(1, MemoryConfig::default());
    sim.csr_write(SharedReg::ChannelMask.offset(), 1).unwrap();
    configure(&mut sim, 0, 1, 2);
    sim.csr_write(reg(0, ChannelReg::BurstQuantity), 1).unwrap();
    let first = DataWord::from_lanes([0xa0; 8]);
    let second = DataWord::from_lanes([0xb1; 8]);
    let memory = sim.memory_mut(0).unwrap();
    memory.poke(0x40 << 5, first);
    memory.poke((0x40 << 5) + 32, second);

    for (status, bursts) in restarts(&mut sim, EngineState::ReadIssue, 3) {
        // the restart happens on the edge that accepts the last beat
        assert_eq!(status.state, EngineState::ReadBeat);
        assert_eq!(status.ticks, 2);
        assert_eq!(status.total_reads, 1);
        assert_eq!(status.read_data, first);
        assert_eq!(bursts, 0);
    }
    assert_eq!(sim.engine(0).unwrap().status().read_data, second);
}

#[test]
fn last_burst_len_shortens_the_final_burst() {
    let mut sim = simulator(1, MemoryConfig::default());
    sim.csr_write(SharedReg::ChannelMask.offset(), 1).unwrap();

    let modes = [(0, EngineState::WriteIssue), (1, EngineState::ReadIssue)];
    for (mode, issue) in modes {
        configure(&mut sim, 0, mode, 4);
        sim.csr_write(reg(0, ChannelReg::LastBurstLen), 2).unwrap();
        sim.csr_write(reg(0, ChannelReg::BurstQuantity), 3).unwrap();
        begin_one_sequence(&mut sim);

        assert_eq!(len_of_burst(&mut sim, issue, 0), 3);
        assert_eq!(len_of_burst(&mut sim, issue, 1), 3);
        assert_eq!(len_of_burst(&mut sim, issue, 2), 1);
        sim.run_until(Simulator::all_done, 1_000).unwrap();
        let engine = sim.engine(0).unwrap();
        assert_eq!(engine.status().total_beats(), 10);
        assert_eq!(engine.burst_counter(), 3);
    }

    let status = sim.engine(0).unwrap().status();
    assert_eq!(status.total_reads, 10);
    // the short burst ends on the second word
    assert_eq!(status.read_data.lane(0), PATTERN + 1);
    assert_eq!(sim.memory(0).unwrap().words_stored(), 4);
}

#[test]
fn zero_quantity_runs_one_burst() {
    let mut sim = simulator(1, MemoryConfig::default());
    sim.csr_write(SharedReg::ChannelMask.offset(), 1).unwrap();

    configure(&mut sim, 0, 0, 4);
    sim.csr_write(reg(0, ChannelReg::BurstQuantity), 0).unwrap();
    one_sequence(&mut sim);
    let engine = sim.engine(0).unwrap();
    assert_eq!(engine.status().total_writes, 4);
    assert_eq!(engine.burst_counter(), 1);

    configure(&mut sim, 0, 1, 4);
    sim.csr_write(reg(0, ChannelReg::BurstQuantity), 0).unwrap();
    one_sequence(&mut sim);
    let engine = sim.engine(0).unwrap();
    assert_eq!(engine.status().total_reads, 4);
    assert_eq!(engine.burst_counter(), 1);
}

proptest! {
    #[test]
    fn one_sequence_moves_every_beat(
        burst_len in 1u32..16,
        quantity in 1u32..4,
        read_latency in 0u32..8,
        write_latency in 0u32..8,
        period in 0u32..6,
        stall in 0u32..3,
    ) {
        let memory = MemoryConfig::builder()
            .read_latency(read_latency)
            .write_latency(write_latency)
            .back_pressure(
                BackPressure::builder()
                    .period(period)
                    .stall(stall.min(period.saturating_sub(1)))
                    .build(),
            )
            .build();

        let mut sim = simulator(1, memory);
        sim.csr_write(SharedReg::ChannelMask.offset(), 1).unwrap();
        configure(&mut sim, 0, 0, burst_len);
        sim.csr_write(reg(0, ChannelReg::BurstQuantity), quantity).unwrap();
        one_sequence(&mut sim);
        let writes = sim.engine(0).unwrap().status().total_writes;
        prop_assert_eq!(writes, burst_len * quantity);

        configure(&mut sim, 0, 1, burst_len);
        sim.csr_write(reg(0, ChannelReg::BurstQuantity), quantity).unwrap();
        one_sequence(&mut sim);
        let status = *sim.engine(0).unwrap().status();
        prop_assert_eq!(status.total_reads, burst_len * quantity);
        prop_assert_eq!(status.read_data.lane(0), PATTERN + burst_len - 1);
    }
}

//! hbm-bist: drive the per-channel burst engines of an HBM stack against a
//! memory model and report the bandwidth they reach.

mod cmdline;

use std::io::Write;

use cmdline::{Command, Format, Opts};
use hbm_engine::{ChannelConfig, MAX_CHANNELS, SharedConfig, csr};
use hbm_sim::{
    TestPlan,
    configuration::{MemoryConfig, RuntimeConfig},
    errors::SimResult,
    logging::{self, info},
};

/// Upper bound on the ticks spent waiting for engines to reach a checkpoint
/// after the run is stopped.
const DRAIN_CYCLES: u64 = 1_000_000;

fn plan_from_opts(opts: &Opts) -> TestPlan {
    let channels = opts.channels.clamp(1, MAX_CHANNELS);
    let all = u32::MAX >> (MAX_CHANNELS - channels);

    TestPlan::builder()
        .channels(opts.channels)
        .burst(opts.burst)
        .single(opts.single)
        .bank_offset(opts.bank_offset)
        .shared(
            SharedConfig::builder()
                .channel_mask(opts.mask.unwrap_or(all))
                .data_pattern(opts.data_pattern)
                .build(),
        )
        .channel(
            ChannelConfig::builder()
                .mode(opts.mode)
                .address(opts.address)
                .burst_len(opts.burst_len)
                .last_burst_len(opts.last_burst_len)
                .burst_quantity(opts.burst_quantity)
                .delay_bound(opts.delay_bound)
                .build(),
        )
        .memory(
            MemoryConfig::builder()
                .read_latency(opts.read_latency)
                .write_latency(opts.write_latency)
                .build(),
        )
        .cycles(opts.cycles)
        .build()
}

fn run(opts: &Opts) -> SimResult<()> {
    let config = RuntimeConfig::builder()
        .quiet(opts.quiet)
        .debug_logging(opts.debug_logging)
        .clock_mhz(opts.clock_mhz)
        .build();
    let logger = logging::initialize_logger(config.get_logging_config());

    let plan = match &opts.plan {
        Some(path) => TestPlan::from_file(path)?,
        None => plan_from_opts(opts),
    };

    let mut sim = plan.build(config, &logger)?;
    sim.start();
    sim.run(plan.cycles);
    sim.drain(DRAIN_CYCLES)?;

    let report = sim.report();
    info!(logger, "run complete";
        "cycles" => sim.cycle(),
        "gbps" => report.aggregate_gbps);

    let mut out = opts.output.get_write()?;
    match opts.format {
        Format::Text => writeln!(out, "{report}")?,
        Format::Json => writeln!(out, "{}", report.to_json()?)?,
    }
    out.flush()?;
    Ok(())
}

fn csr_map(opts: &Opts) -> SimResult<()> {
    let channels = match &opts.plan {
        Some(path) => TestPlan::from_file(path)?.channels,
        None => opts.channels,
    };
    let map = csr::register_map(channels.min(MAX_CHANNELS));
    let mut out = opts.output.get_write()?;
    writeln!(out, "{}", serde_json::to_string_pretty(&map)?)?;
    out.flush()?;
    Ok(())
}

fn main() -> SimResult<()> {
    let opts: Opts = argh::from_env();

    match opts.command {
        Some(Command::CsrMap(_)) => csr_map(&opts),
        Some(Command::Run(_)) | None => run(&opts),
    }
}

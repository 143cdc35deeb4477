use basalt_chan::wire::{ChannelInfo, DEFAULT_SLOT_SIZE};
use basalt_chan::{ArgTable, ControlPlane, FileBlockAllocator, Limits, Session};
use basalt_config::ChanConfig;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

fn main() {
    let config = match std::env::args().nth(1) {
        Some(path) => ChanConfig::load(path).expect("failed to load config"),
        None => ChanConfig::default(),
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let limits = Limits {
        max_channels: config.max_channels,
        max_capacity: config.max_capacity,
    };
    let plane = ControlPlane::new(limits, Box::new(FileBlockAllocator::new(&config.shm_dir)));

    let table = ArgTable::new(&[DEFAULT_SLOT_SIZE]).expect("default arg table");
    let request = ChannelInfo {
        id: -1,
        sq_info: table.to_raw(),
        cq_info: table.to_raw(),
        ..ChannelInfo::default()
    };

    let info = plane.create_or_bind(&request).expect("failed to create channel");
    let id = info.id as u32;

    let mut session = Session::new();
    session.bind(&plane, id).expect("failed to bind channel");

    tracing::info!(
        id,
        capacity = info.cache_cnt,
        mmap_sz = info.mmap_sz,
        cq_offset = info.cq_offset,
        shm_dir = %config.shm_dir,
        "BASALTD: channel ready, loopback pump running"
    );

    let mut seq: u64 = 0;
    let mut count: u64 = 0;
    let mut last = Instant::now();

    loop {
        plane
            .enqueue_text(Some(id), &format!("msg {seq}\n"))
            .expect("submit failed");
        let echoed = plane.dequeue_text(Some(id)).expect("drain failed");
        debug_assert_eq!(echoed, format!("msg {seq}"));

        seq += 1;
        count += 1;

        if last.elapsed() >= Duration::from_secs(1) {
            tracing::info!("BASALTD: pump rate ~ {} msg/s", count);
            count = 0;
            last = Instant::now();
        }

        std::hint::spin_loop();
    }
}

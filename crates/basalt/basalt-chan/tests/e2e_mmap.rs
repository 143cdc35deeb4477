//! Two-process end-to-end test of the channel mapping contract.
//!
//! The orchestrating test process plays the control plane: it creates a
//! channel, fills the submit queue, and hands the block path plus the
//! mapping descriptor to a child process through the environment. The child
//! plays the servicing side of the mapping in its own address space: it
//! maps the block, rebuilds the ring views from the descriptor, drains
//! every submission, and answers each one on the completion queue. The
//! parent then verifies the completions.
//!
//! The same test executable is re-invoked for the child role, selected by
//! an environment variable, the usual self-spawning pattern for
//! multi-process tests.

use basalt_chan::wire::{ChannelInfo, DEFAULT_SLOT_SIZE};
use basalt_chan::{ArgTable, ChannelView, ControlPlane, FileBlockAllocator, Limits};
use std::env;
use std::io::Write;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

/// Writes to stderr with immediate flush to bypass test output capture.
macro_rules! log {
    ($($arg:tt)*) => {{
        let _ = writeln!(std::io::stderr(), $($arg)*);
        let _ = std::io::stderr().flush();
    }};
}

const ENV_ROLE: &str = "BASALT_E2E_ROLE";
const ENV_PATH: &str = "BASALT_E2E_PATH";
const ENV_CAPACITY: &str = "BASALT_E2E_CAPACITY";
const ENV_CQ_OFFSET: &str = "BASALT_E2E_CQ_OFFSET";
const ENV_MMAP_SZ: &str = "BASALT_E2E_MMAP_SZ";

const ROLE_CLIENT: &str = "client";

/// Submissions per run; must stay below capacity - 1 so the parent can
/// fill the SQ before the client starts draining.
const MESSAGE_COUNT: u32 = 48;
const CAPACITY: u32 = 64;

fn descriptor(capacity: u32, cq_offset: u32, mmap_sz: u32) -> ChannelInfo {
    let table = ArgTable::new(&[DEFAULT_SLOT_SIZE]).unwrap();
    ChannelInfo {
        id: 0,
        sq_info: table.to_raw(),
        cq_info: table.to_raw(),
        cache_cnt: capacity,
        mmap_sz,
        cq_offset,
        usr_cnt: 1,
    }
}

/// Child process: map the block, echo every submission onto the CQ.
fn run_client() {
    let path = env::var(ENV_PATH).expect("block path not set");
    let capacity: u32 = env::var(ENV_CAPACITY).unwrap().parse().unwrap();
    let cq_offset: u32 = env::var(ENV_CQ_OFFSET).unwrap().parse().unwrap();
    let mmap_sz: u32 = env::var(ENV_MMAP_SZ).unwrap().parse().unwrap();

    log!("[CLIENT] mapping {path} ({mmap_sz} bytes, cq at {cq_offset})");
    let info = descriptor(capacity, cq_offset, mmap_sz);
    let view = ChannelView::map(path.as_ref(), &info).expect("client failed to map block");

    let deadline = Instant::now() + Duration::from_secs(10);
    let mut echoed = 0u32;

    while echoed < MESSAGE_COUNT {
        match view.sq().dequeue_text() {
            Ok(msg) => {
                view.cq()
                    .enqueue_text(&format!("ack {msg}"))
                    .expect("client CQ enqueue failed");
                echoed += 1;
            }
            Err(_) if Instant::now() < deadline => std::hint::spin_loop(),
            Err(e) => panic!("[CLIENT] gave up waiting for submissions: {e}"),
        }
    }

    log!("[CLIENT] echoed {echoed} submissions");
}

#[test]
fn e2e_two_process_channel_echo() {
    if let Ok(role) = env::var(ENV_ROLE) {
        match role.as_str() {
            ROLE_CLIENT => run_client(),
            other => panic!("unknown role: {other}"),
        }
        return;
    }

    let dir = std::env::temp_dir().join(format!("basalt-e2e-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();

    let plane = ControlPlane::new(
        Limits::default(),
        Box::new(FileBlockAllocator::new(&dir)),
    );

    let table = ArgTable::new(&[DEFAULT_SLOT_SIZE]).unwrap();
    let request = ChannelInfo {
        id: -1,
        sq_info: table.to_raw(),
        cq_info: table.to_raw(),
        cache_cnt: CAPACITY,
        ..ChannelInfo::default()
    };
    let info = plane.create_or_bind(&request).unwrap();
    let id = info.id as u32;
    let grant = plane.map(id, info.mmap_sz as usize).unwrap();
    let block_path = grant.path.expect("file-backed block has a path");

    log!("");
    log!("E2E Two-Process Channel Echo Test");
    log!("block: {}, capacity: {}, mmap_sz: {}", block_path.display(), CAPACITY, info.mmap_sz);

    // Fill the SQ before the client attaches; capacity leaves room.
    for i in 0..MESSAGE_COUNT {
        plane.enqueue_text(Some(id), &format!("msg {i}\n")).unwrap();
    }

    let exe = env::current_exe().expect("test executable path");
    let status = Command::new(&exe)
        .arg("--exact")
        .arg("e2e_two_process_channel_echo")
        .env(ENV_ROLE, ROLE_CLIENT)
        .env(ENV_PATH, &block_path)
        .env(ENV_CAPACITY, CAPACITY.to_string())
        .env(ENV_CQ_OFFSET, info.cq_offset.to_string())
        .env(ENV_MMAP_SZ, info.mmap_sz.to_string())
        .stderr(Stdio::inherit())
        .spawn()
        .expect("failed to spawn client")
        .wait()
        .expect("failed to wait for client");
    assert!(status.success(), "client failed: {status}");

    // Every submission came back as a completion, in order.
    let chan = plane.registry().get(id).unwrap();
    for i in 0..MESSAGE_COUNT {
        assert_eq!(chan.cq().dequeue_text().unwrap(), format!("ack msg {i}"));
    }
    assert!(chan.cq().is_empty());
    assert!(chan.sq().is_empty());

    log!("[ORCHESTRATOR] {MESSAGE_COUNT} submissions echoed and verified");
}

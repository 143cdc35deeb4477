//! Control-plane surface tests: descriptors, legacy layout queries,
//! session lifecycle, and the in-process mapped view.

use basalt_chan::wire::{ChannelInfo, DEFAULT_CAPACITY, DEFAULT_SLOT_SIZE, HEADER_BYTES};
use basalt_chan::{
    ArgTable, ChanError, ChannelView, ControlPlane, FileBlockAllocator, Limits, Session,
};

fn plane(tag: &str, limits: Limits) -> ControlPlane {
    let dir = std::env::temp_dir().join(format!("basalt-ctl-{tag}-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    ControlPlane::new(limits, Box::new(FileBlockAllocator::new(dir)))
}

fn request(capacity: u32) -> ChannelInfo {
    let table = ArgTable::new(&[DEFAULT_SLOT_SIZE]).unwrap();
    ChannelInfo {
        id: -1,
        sq_info: table.to_raw(),
        cq_info: table.to_raw(),
        cache_cnt: capacity,
        ..ChannelInfo::default()
    }
}

#[test]
fn query_layout_tracks_default_channel() {
    let plane = plane("layout", Limits::default());
    assert_eq!(plane.query_layout(), Err(ChanError::NotInitialized));

    let info = plane.create_or_bind(&request(32)).unwrap();
    let legacy = plane.query_layout().unwrap();
    assert_eq!(legacy.sq_offset, 0);
    assert_eq!(legacy.cq_offset, info.cq_offset as i32);
    assert_eq!(legacy.memblk_size, info.mmap_sz as i32);

    // The descriptor matches the documented arithmetic for one 256-byte
    // field at 32 slots.
    assert_eq!(info.cq_offset as usize, HEADER_BYTES + 32 * 256);
    assert_eq!(info.mmap_sz % 4096, 0);

    // Destroying the default channel resets the legacy query.
    let mut session = Session::new();
    session.bind(&plane, info.id as u32).unwrap();
    session.release(&plane).unwrap();
    assert_eq!(plane.query_layout(), Err(ChanError::NotInitialized));
}

#[test]
fn capacity_is_clamped_and_reported() {
    let plane = plane(
        "clamp",
        Limits {
            max_capacity: 64,
            ..Limits::default()
        },
    );

    let info = plane.create_or_bind(&request(5000)).unwrap();
    assert_eq!(info.cache_cnt, 64);

    // Zero selects the default capacity.
    let info = plane.create_or_bind(&request(0)).unwrap();
    assert_eq!(info.cache_cnt, DEFAULT_CAPACITY);
}

#[test]
fn map_grant_enforces_block_size() {
    let plane = plane("map", Limits::default());
    let info = plane.create_or_bind(&request(8)).unwrap();
    let id = info.id as u32;

    let grant = plane.map(id, info.mmap_sz as usize).unwrap();
    assert!(grant.path.is_some());
    assert_eq!(grant.info.mmap_sz, info.mmap_sz);

    let err = plane.map(id, info.mmap_sz as usize + 1).unwrap_err();
    assert_eq!(
        err,
        ChanError::MappingTooLarge {
            requested: info.mmap_sz as usize + 1,
            block: info.mmap_sz as usize,
        }
    );
}

#[test]
fn sessions_share_a_channel_until_the_last_release() {
    let plane = plane("sessions", Limits::default());
    let info = plane.create_or_bind(&request(8)).unwrap();
    let id = info.id as u32;

    let mut first = Session::new();
    let mut second = Session::new();
    first.bind(&plane, id).unwrap();
    second.bind(&plane, id).unwrap();

    // Binding to an existing id through create-or-bind returns the same
    // descriptor with the live reference count.
    let mut again = request(8);
    again.id = id as i32;
    let bound = plane.create_or_bind(&again).unwrap();
    assert_eq!(bound.id, id as i32);
    assert_eq!(bound.usr_cnt, 2);
    assert_eq!(plane.registry().len(), 1);

    first.release(&plane).unwrap();
    assert!(plane.registry().get(id).is_ok());

    second.release(&plane).unwrap();
    assert_eq!(
        plane.registry().get(id).unwrap_err(),
        ChanError::InvalidChannel(id)
    );

    // Released sessions are idempotent.
    second.release(&plane).unwrap();

    // The freed id is reused by the next anonymous create.
    let reused = plane.create_or_bind(&request(8)).unwrap();
    assert_eq!(reused.id, id as i32);
}

#[test]
fn data_plane_round_trip_on_default_channel() {
    let plane = plane("data", Limits::default());
    plane.create_or_bind(&request(8)).unwrap();

    plane.enqueue_text(None, "hello\n").unwrap();
    assert_eq!(plane.dequeue_text(None).unwrap(), "hello");
    assert_eq!(plane.dequeue_text(None), Err(ChanError::QueueEmpty));

    assert_eq!(
        plane.enqueue_text(Some(12), "nope"),
        Err(ChanError::InvalidChannel(12))
    );
}

#[test]
fn mapped_view_shares_the_rings() {
    let plane = plane("view", Limits::default());
    let info = plane.create_or_bind(&request(16)).unwrap();
    let id = info.id as u32;

    let grant = plane.map(id, info.mmap_sz as usize).unwrap();
    let view = ChannelView::map(grant.path.as_deref().unwrap(), &grant.info).unwrap();

    // Client submits through its own mapping; the control plane sees it.
    view.sq().enqueue_text("ping\n").unwrap();
    assert_eq!(plane.dequeue_text(Some(id)).unwrap(), "ping");

    // Completion flows the other way.
    let chan = plane.registry().get(id).unwrap();
    chan.cq().enqueue_text("pong").unwrap();
    assert_eq!(view.cq().dequeue_text().unwrap(), "pong");
    assert_eq!(view.cq().dequeue_text(), Err(ChanError::QueueEmpty));
}

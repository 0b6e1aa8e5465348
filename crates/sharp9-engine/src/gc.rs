//! Deferred deallocation for audio buffers
//!
//! Track buffers are shared between the loader, the audio callback, and the
//! peak worker via `basedrop::Shared`. Dropping the last reference on the
//! audio thread must not call into the allocator, so actual frees are
//! deferred to a dedicated collector thread: dropping a `Shared` anywhere
//! only enqueues a pointer.

use std::sync::mpsc;
use std::sync::OnceLock;
use std::thread;
use std::time::Duration;

use basedrop::{Collector, Handle};

static GC_HANDLE: OnceLock<Handle> = OnceLock::new();

/// Get the global handle for creating `Shared<T>` allocations
///
/// The first call spawns the collector thread; the handle itself is cheap to
/// clone.
pub fn gc_handle() -> Handle {
    GC_HANDLE.get_or_init(start_collector).clone()
}

fn start_collector() -> Handle {
    let (tx, rx) = mpsc::channel();

    thread::Builder::new()
        .name("audio-gc".to_string())
        .spawn(move || {
            // Collector is !Sync, so it lives on this thread only
            let mut collector = Collector::new();
            tx.send(collector.handle()).expect("send GC handle");

            log::debug!("audio GC thread started");
            loop {
                collector.collect();
                thread::sleep(Duration::from_millis(100));
            }
        })
        .expect("spawn audio GC thread");

    rx.recv().expect("receive GC handle")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StereoBuffer;
    use basedrop::Shared;

    #[test]
    fn test_shared_allocation_and_clone() {
        let buf = Shared::new(&gc_handle(), StereoBuffer::silence(16));
        let clone = buf.clone();
        assert_eq!(clone.len(), 16);
        drop(buf);
        assert_eq!(clone.len(), 16);
    }
}

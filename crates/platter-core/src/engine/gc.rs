//! Deferred deallocation for buffers shared with the render thread
//!
//! Audio buffers cross into the render thread as `basedrop::Shared`. When
//! the renderer drops the last reference (a new buffer replaced it, or the
//! deck was cleared) the pointer is only queued; the memory is released by a
//! collector thread that owns the `basedrop::Collector`.
//!
//! ```ignore
//! let shared = Shared::new(&gc_handle(), buffer);
//! sender.send(RenderCommand::SetBuffer(shared));
//! ```

use basedrop::{Collector, Handle, Shared};
use std::sync::mpsc;
use std::sync::OnceLock;
use std::thread;
use std::time::Duration;

use crate::types::AudioBuffer;

/// How often the collector thread frees queued drops
const COLLECT_INTERVAL: Duration = Duration::from_millis(50);

static GC_HANDLE: OnceLock<Handle> = OnceLock::new();

fn collector_loop(handle_tx: mpsc::SyncSender<Handle>) {
    // Collector is !Sync, so it lives and dies on this thread
    let mut collector = Collector::new();
    if handle_tx.send(collector.handle()).is_err() {
        return;
    }
    log::info!("Buffer collector thread started");

    loop {
        collector.collect();
        thread::sleep(COLLECT_INTERVAL);
    }
}

fn spawn_collector() -> Handle {
    let (handle_tx, handle_rx) = mpsc::sync_channel(1);
    thread::Builder::new()
        .name("platter-gc".to_string())
        .spawn(move || collector_loop(handle_tx))
        .expect("failed to spawn buffer collector thread");
    handle_rx
        .recv()
        .expect("buffer collector thread exited before handing out its handle")
}

/// Handle to the process-wide collector, starting it on first use
pub fn gc_handle() -> Handle {
    GC_HANDLE.get_or_init(spawn_collector).clone()
}

/// Wrap a buffer for publication to the render thread
pub fn share_buffer(buffer: AudioBuffer) -> Shared<AudioBuffer> {
    Shared::new(&gc_handle(), buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_buffer_drop_is_deferred_safely() {
        let buffer = AudioBuffer::mono(vec![0.0; 4800], 48000).unwrap();
        let shared = share_buffer(buffer);
        let clone = shared.clone();
        assert_eq!(clone.frames(), 4800);
        drop(shared);
        // Still readable through the remaining reference
        assert_eq!(clone.sample_rate(), 48000);
        drop(clone);
    }
}

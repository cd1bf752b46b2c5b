//! Property-based invariant tests for streamed texture loading.
//!
//! 1. For any arrival order of a texture's chunks, the ready notification
//!    fires exactly once, on the tick that uploads the last chunk.
//! 2. The pump drains exactly one job per tick until the queue is empty.
//! 3. Chunk fetch count is `ceil(width * height / chunk_size)`.
//! 4. Handle tables hand out strictly increasing indices that resolve back.
//! 5. `write_string` never writes partially.

use proptest::prelude::*;
use yorstory_bridge::memory::{read_string, write_string};
use yorstory_bridge::testing::{TestImage, VecMemory, test_bridge};
use yorstory_bridge::texture::ImageRequest;
use yorstory_bridge::{GuestMemory, HandleKind, HandleTable, HostEffect, TextureMetadata};

// ── Helpers ───────────────────────────────────────────────────────────

fn image_fetches(effects: Vec<HostEffect>) -> Vec<ImageRequest> {
    effects
        .into_iter()
        .filter_map(|e| match e {
            HostEffect::FetchImage(req) => Some(req),
            _ => None,
        })
        .collect()
}

/// Texture shape where the chunk size is a whole number of rows.
fn arb_chunked_shape() -> impl Strategy<Value = (u32, u32, u32)> {
    (1u32..=64, 1u32..=48, 1u32..=8).prop_map(|(width, height, rows)| (width, height, width * rows))
}

/// A chunked shape plus a random arrival order of its chunks.
fn arb_arrivals() -> impl Strategy<Value = ((u32, u32, u32), Vec<u32>)> {
    arb_chunked_shape().prop_flat_map(|(width, height, chunk_size)| {
        let count = (width * height).div_ceil(chunk_size);
        let order: Vec<u32> = (0..count).collect();
        (Just((width, height, chunk_size)), Just(order).prop_shuffle())
    })
}

// ═════════════════════════════════════════════════════════════════════════
// 1 + 2. Exactly-once completion, one job per tick
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn chunk_completion_fires_once_after_last(
        ((width, height, chunk_size), order) in arb_arrivals()
    ) {
        let mut bridge = test_bridge();
        let texture = bridge.create_and_load_texture("t.png", 0, 0).unwrap();
        bridge
            .texture_metadata_loaded(texture, TextureMetadata { width, height, chunk_size })
            .unwrap();
        let fetches = image_fetches(bridge.take_effects());
        prop_assert_eq!(fetches.len(), order.len());

        let rows = chunk_size / width;
        let mut notifications = Vec::new();
        for (arrived, index) in order.iter().enumerate() {
            let chunk_rows = rows.min(height - rows * index);
            let queued = bridge
                .texture_image_loaded(texture, Some(*index), TestImage::new(width, chunk_rows), width, chunk_rows)
                .unwrap();
            prop_assert!(queued.is_none());

            let before = bridge.queued_texture_jobs();
            prop_assert_eq!(before, 1);
            if let Some(ready) = bridge.pump_texture_job().unwrap() {
                notifications.push((arrived, ready));
            }
            prop_assert_eq!(bridge.queued_texture_jobs(), before - 1);
        }

        prop_assert_eq!(notifications.len(), 1);
        let (arrived, ready) = notifications[0];
        prop_assert_eq!(arrived, order.len() - 1);
        prop_assert_eq!((ready.texture, ready.width, ready.height), (texture, width, height));
    }

    #[test]
    fn pump_drains_one_per_tick_when_all_arrive_first(
        ((width, height, chunk_size), order) in arb_arrivals()
    ) {
        let mut bridge = test_bridge();
        let texture = bridge.create_and_load_texture("t.png", 0, 0).unwrap();
        bridge
            .texture_metadata_loaded(texture, TextureMetadata { width, height, chunk_size })
            .unwrap();
        for index in &order {
            bridge
                .texture_image_loaded(texture, Some(*index), TestImage::new(width, 1), width, 1)
                .unwrap();
        }

        let mut ready_ticks = Vec::new();
        for tick in 0..order.len() {
            prop_assert_eq!(bridge.queued_texture_jobs(), order.len() - tick);
            if bridge.pump_texture_job().unwrap().is_some() {
                ready_ticks.push(tick);
            }
        }
        prop_assert_eq!(bridge.queued_texture_jobs(), 0);
        prop_assert_eq!(ready_ticks, vec![order.len() - 1]);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Chunk fetch count
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn chunk_fetch_count_rounds_up((width, height, chunk_size) in arb_chunked_shape()) {
        let mut bridge = test_bridge();
        let texture = bridge.create_and_load_texture("t.png", 0, 0).unwrap();
        bridge
            .texture_metadata_loaded(texture, TextureMetadata { width, height, chunk_size })
            .unwrap();
        let fetches = image_fetches(bridge.take_effects());
        let expected = (u64::from(width) * u64::from(height)).div_ceil(u64::from(chunk_size));
        prop_assert_eq!(fetches.len() as u64, expected);
        for (i, req) in fetches.iter().enumerate() {
            prop_assert_eq!(req.chunk, Some(i as u32));
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Handle tables
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn handles_increase_and_resolve(items in prop::collection::vec(any::<u64>(), 0..64)) {
        let mut table = HandleTable::new(HandleKind::Buffer);
        let handles: Vec<u32> = items.iter().map(|v| table.allocate(*v).unwrap()).collect();
        for pair in handles.windows(2) {
            prop_assert!(pair[0] < pair[1]);
        }
        for (handle, item) in handles.iter().zip(&items) {
            prop_assert_eq!(table.resolve(*handle).unwrap(), item);
        }
        prop_assert!(table.resolve(items.len() as u32).is_err());
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. write_string is all-or-nothing
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn write_string_never_partial(text in ".{0,24}", max_len in 0u32..48) {
        let mem = VecMemory::new(64);
        mem.write_bytes(0, &[0xAB; 64]).unwrap();
        let written = write_string(&mem, 0, max_len, &text).unwrap();
        let encoded = text.len() as u32;
        if encoded <= max_len {
            prop_assert_eq!(written, encoded);
            prop_assert_eq!(read_string(&mem, 0, written).unwrap(), text);
        } else {
            prop_assert_eq!(written, 0);
            prop_assert_eq!(mem.read_bytes(0, 64).unwrap(), vec![0xAB; 64]);
        }
    }
}

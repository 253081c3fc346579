//! Sync bridge properties against a recording device: capacity always covers
//! the column, unchanged columns cost nothing, and every replaced buffer is
//! released exactly once.

use proptest::prelude::*;

use prism_core::{FieldType, LayoutRules, Schema, TypedColumn};
use prism_rendering::testing::RecordingDevice;
use prism_rendering::{BridgeConfig, BufferSlot, BufferUsage, GpuBridge, SyncOutcome};

#[derive(Clone, Debug)]
enum Op {
    Push(usize),
    Remove,
    Sync,
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1usize..40).prop_map(Op::Push),
        Just(Op::Remove),
        Just(Op::Sync),
    ]
}

fn column() -> TypedColumn {
    let schema = Schema::value("vec3", LayoutRules::Packed, FieldType::vec3f()).unwrap();
    TypedColumn::new(schema)
}

proptest! {
    #[test]
    fn capacity_covers_column_and_releases_are_exact(
        ops in prop::collection::vec(arb_op(), 1..60),
        min_buffer_size in prop_oneof![Just(4u64), Just(64), Just(256)],
        growth_factor in 2u64..4,
    ) {
        let device = RecordingDevice::new();
        let bridge = GpuBridge::new(BridgeConfig { growth_factor, min_buffer_size });
        let mut column = column();
        let mut slot = BufferSlot::new("positions", BufferUsage::VERTEX);
        let mut replaced = 0u64;

        for op in ops {
            match op {
                Op::Push(n) => {
                    for i in 0..n {
                        #[allow(clippy::cast_precision_loss)]
                        let f = i as f32;
                        column.push_pod(&[f, f, f]).unwrap();
                    }
                }
                Op::Remove => {
                    if !column.is_empty() {
                        column.swap_remove(0).unwrap();
                    }
                }
                Op::Sync => {
                    let outcome = bridge.sync_column(&device, &column, &mut slot).unwrap();
                    if let SyncOutcome::Reallocated { released: Some(_), .. } = outcome {
                        replaced += 1;
                    }
                    prop_assert_eq!(slot.len(), column.bytes().len() as u64);
                    if let Some(buffer) = slot.buffer() {
                        prop_assert!(buffer.capacity >= slot.len());
                        prop_assert_eq!(buffer.capacity % 4, 0);
                        prop_assert_eq!(device.capacity(buffer.handle), Some(buffer.capacity));
                    }
                }
            }
        }

        let stats = device.stats();
        prop_assert_eq!(stats.destroyed, replaced);
        prop_assert_eq!(stats.invalid_destroys, 0);
        prop_assert!(device.live_buffers() <= 1);

        slot.release(&device);
        prop_assert_eq!(device.live_buffers(), 0);
        prop_assert_eq!(device.stats().destroyed, device.stats().created);
    }

    #[test]
    fn second_sync_is_free(rows in 0usize..200) {
        let device = RecordingDevice::new();
        let bridge = GpuBridge::default();
        let mut column = column();
        for _ in 0..rows {
            column.push_pod(&[1.0f32, 2.0, 3.0]).unwrap();
        }
        let mut slot = BufferSlot::new("positions", BufferUsage::VERTEX);

        bridge.sync_column(&device, &column, &mut slot).unwrap();
        let handle = slot.buffer().map(|b| b.handle);
        let before = device.stats();

        prop_assert_eq!(bridge.sync_column(&device, &column, &mut slot).unwrap(), SyncOutcome::Unchanged);
        prop_assert_eq!(device.stats(), before);
        prop_assert_eq!(slot.buffer().map(|b| b.handle), handle);
        prop_assert!(before.writes <= 1);
    }
}

#[test]
fn growth_past_capacity_reallocates() {
    let device = RecordingDevice::new();
    let bridge = GpuBridge::new(BridgeConfig {
        growth_factor: 2,
        min_buffer_size: 24,
    });
    let mut column = column();
    let mut slot = BufferSlot::new("positions", BufferUsage::VERTEX);

    column.push_pod(&[0.0f32; 3]).unwrap();
    bridge.sync_column(&device, &column, &mut slot).unwrap();
    let first = slot.buffer().unwrap();
    assert_eq!(first.capacity, 24);

    column.push_pod(&[0.0f32; 3]).unwrap();
    assert_eq!(
        bridge.sync_column(&device, &column, &mut slot).unwrap(),
        SyncOutcome::Uploaded { bytes: 24 }
    );

    column.push_pod(&[0.0f32; 3]).unwrap();
    let outcome = bridge.sync_column(&device, &column, &mut slot).unwrap();
    assert_eq!(
        outcome,
        SyncOutcome::Reallocated {
            bytes: 36,
            released: Some(first.handle)
        }
    );
    assert_eq!(slot.buffer().unwrap().capacity, 48);
    assert_eq!(device.stats().destroyed, 1);
}

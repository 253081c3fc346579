//! # Bridge Benchmark
//!
//! Column sync and voxel meshing against the recording device.
//!
//! Run with: `cargo bench --package prism_rendering`

#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use prism_core::{FieldType, LayoutRules, Schema, TypedColumn};
use prism_rendering::testing::RecordingDevice;
use prism_rendering::{rgba_volume_to_vertex_data, BufferSlot, BufferUsage, GpuBridge, Rgba, Volume};

const SIZES: [usize; 3] = [1_000, 10_000, 100_000];

fn filled_column(rows: usize) -> TypedColumn {
    let schema = Schema::value("vec4", LayoutRules::Packed, FieldType::vec4f()).unwrap();
    let mut column = TypedColumn::with_capacity(schema, rows, 2);
    for _ in 0..rows {
        column.push_pod(&[0.5f32, 0.5, 0.5, 1.0]).unwrap();
    }
    column
}

fn bench_sync_dirty(c: &mut Criterion) {
    let device = RecordingDevice::new();
    let bridge = GpuBridge::default();
    let mut group = c.benchmark_group("sync_dirty_column");
    for rows in SIZES {
        let mut column = filled_column(rows);
        let mut slot = BufferSlot::new("bench", BufferUsage::VERTEX);
        group.bench_with_input(BenchmarkId::from_parameter(rows), &rows, |b, _| {
            b.iter(|| {
                column.set_pod(0, &[1.0f32, 0.0, 0.0, 1.0]).unwrap();
                bridge.sync_column(&device, black_box(&column), &mut slot).unwrap()
            });
        });
        slot.release(&device);
    }
    group.finish();
}

fn bench_sync_unchanged(c: &mut Criterion) {
    let device = RecordingDevice::new();
    let bridge = GpuBridge::default();
    let column = filled_column(100_000);
    let mut slot = BufferSlot::new("bench", BufferUsage::VERTEX);
    bridge.sync_column(&device, &column, &mut slot).unwrap();

    c.bench_function("sync_unchanged_column", |b| {
        b.iter(|| bridge.sync_column(&device, black_box(&column), &mut slot).unwrap());
    });
    slot.release(&device);
}

fn bench_voxel_mesh(c: &mut Criterion) {
    let mut group = c.benchmark_group("voxel_mesh");
    for edge in [8u32, 16, 32] {
        let mut volume = Volume::new([edge; 3], Rgba::new(200, 100, 50, 255));
        // checkerboard holes expose inner faces
        for z in (0..edge).step_by(2) {
            for y in (0..edge).step_by(2) {
                for x in (0..edge).step_by(2) {
                    volume.set(x, y, z, Rgba::TRANSPARENT);
                }
            }
        }
        group.bench_with_input(BenchmarkId::from_parameter(edge), &volume, |b, volume| {
            b.iter(|| rgba_volume_to_vertex_data(black_box(volume)).unwrap().len());
        });
    }
    group.finish();
}

criterion_group!(benches, bench_sync_dirty, bench_sync_unchanged, bench_voxel_mesh);
criterion_main!(benches);

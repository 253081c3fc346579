//! Mirrors every particle table's `position` and `color` columns.

use std::collections::HashMap;

use tracing::trace;

use prism_core::{FrameContext, Store, System, SystemError, TableId};

use crate::bridge::{BufferSlot, GpuBridge};
use crate::components::{COLOR, POSITION};
use crate::device::{BufferUsage, GpuDevice};
use crate::resources::{ParticleBuffers, ParticleTableBuffers};

use super::DeviceBinding;

struct TableSlots {
    position: BufferSlot,
    color: BufferSlot,
}

impl TableSlots {
    fn new() -> Self {
        Self {
            position: BufferSlot::new("particle positions", BufferUsage::VERTEX),
            color: BufferSlot::new("particle colors", BufferUsage::VERTEX),
        }
    }

    fn release(&mut self, device: &dyn GpuDevice) {
        self.position.release(device);
        self.color.release(device);
    }
}

/// Update-phase system publishing [`ParticleBuffers`].
pub struct ParticleBufferSystem {
    bridge: GpuBridge,
    slots: HashMap<TableId, TableSlots>,
    binding: DeviceBinding,
}

impl ParticleBufferSystem {
    /// Creates the system.
    #[must_use]
    pub fn new(bridge: GpuBridge) -> Self {
        Self {
            bridge,
            slots: HashMap::new(),
            binding: DeviceBinding::default(),
        }
    }

    fn release_all(slots: &mut HashMap<TableId, TableSlots>, device: &dyn GpuDevice) {
        for slot in slots.values_mut() {
            slot.release(device);
        }
        slots.clear();
    }
}

impl System for ParticleBufferSystem {
    fn name(&self) -> &str {
        "particle_buffer_system"
    }

    fn run(&mut self, ctx: &mut FrameContext<'_>) -> Result<(), SystemError> {
        ctx.store.resources_mut().remove::<ParticleBuffers>();
        let slots = &mut self.slots;
        let Some(device) = self.binding.resolve(ctx.store, |old| Self::release_all(slots, old)) else {
            return Ok(());
        };

        let store: &Store = ctx.store;
        let mut published = Vec::new();
        let mut first_error = None;
        for table in store.query_archetypes(&[POSITION, COLOR]) {
            let (Some(positions), Some(colors)) = (table.typed_column(POSITION), table.typed_column(COLOR)) else {
                continue;
            };
            let slots = self.slots.entry(table.id()).or_insert_with(TableSlots::new);
            let synced = self
                .bridge
                .sync_column(device.as_ref(), positions, &mut slots.position)
                .and_then(|_| self.bridge.sync_column(device.as_ref(), colors, &mut slots.color));
            if let Err(e) = synced {
                first_error.get_or_insert(e);
                continue;
            }
            if let (Some(position), Some(color)) = (slots.position.buffer(), slots.color.buffer()) {
                if !table.is_empty() {
                    published.push(ParticleTableBuffers {
                        table: table.id(),
                        position,
                        color,
                        count: u32::try_from(table.len()).unwrap_or(u32::MAX),
                    });
                }
            }
        }
        trace!(tables = published.len(), "particle buffers synced");
        ctx.store.resources_mut().insert(ParticleBuffers(published));

        first_error.map_or(Ok(()), |e| Err(e.into()))
    }

    fn dispose(&mut self, store: &mut Store) {
        if let Some(device) = self.binding.take() {
            Self::release_all(&mut self.slots, device.as_ref());
        }
        store.resources_mut().remove::<ParticleBuffers>();
    }
}

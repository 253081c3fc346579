//! # PRISM Rendering
//!
//! GPU side of PRISM:
//! - [`GpuDevice`]: the seam every buffer allocation goes through
//! - [`GpuBridge`]: mirrors typed columns into device buffers, grow-or-reuse
//! - [`DerivedBuffers`]: per-entity buffers gated by [`ChangeToken`]s
//! - Graphics archetypes, transactions and the per-frame systems, assembled
//!   by [`GraphicsService`]
//!
//! ## Architecture Rules
//!
//! 1. **One owner per buffer** - the system that created a buffer releases it
//! 2. **No device, no calls** - every system skips while no device is installed
//! 3. **Roll back, never half-install** - a failed allocation leaves no handle
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use prism_rendering::testing::RecordingDevice;
//! use prism_rendering::transactions::{create_axis, insert_viewport, set_active_viewport, set_device};
//! use prism_rendering::{Camera, GraphicsService, RenderingConfig};
//!
//! let device = Arc::new(RecordingDevice::new());
//! let mut service = GraphicsService::new(&RenderingConfig::default()).unwrap();
//! let archetypes = *service.archetypes();
//!
//! let store = service.store_mut();
//! create_axis(store, &archetypes).unwrap();
//! let viewport = insert_viewport(store, &archetypes, &Camera::default(), [0.0, 0.0, 0.0, 1.0]).unwrap();
//! set_active_viewport(store, Some(viewport));
//! set_device(store, Some(device.clone()));
//!
//! assert!(service.run_frame().is_clean());
//! service.shutdown();
//! assert_eq!(device.live_buffers(), 0);
//! ```
//!
//! [`ChangeToken`]: prism_core::ChangeToken

#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]
#![allow(clippy::module_name_repetitions)]

pub mod bridge;
pub mod cache;
pub mod camera;
pub mod components;
pub mod config;
pub mod data;
pub mod device;
pub mod error;
pub mod resources;
pub mod service;
pub mod systems;
pub mod testing;
pub mod transactions;
pub mod vertices;
pub mod wgpu_device;

pub use bridge::{BufferSlot, GpuBridge, SyncOutcome};
pub use cache::{CachedBuffer, DerivedBuffers, Refresh};
pub use camera::{Camera, SceneUniforms};
pub use components::{register_graphics, GraphicsArchetypes};
pub use config::{BridgeConfig, LightingConfig, RenderingConfig};
pub use data::{Rgba, Volume};
pub use device::{BufferDesc, BufferHandle, BufferUsage, GpuBuffer, GpuDevice};
pub use error::{GpuError, GpuResult, RenderError, RenderResult};
pub use service::GraphicsService;
pub use vertices::{rgba_volume_to_vertex_data, PositionColorNormalVertex};
pub use wgpu_device::WgpuDevice;

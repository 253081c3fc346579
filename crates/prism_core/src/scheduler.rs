//! # System Scheduler
//!
//! Runs registered systems once per frame:
//!
//! ```text
//! frame n:  update[s0, s1] -> pre-render[s2] -> render[s3, s4]
//! ```
//!
//! - Phases run strictly in configured order
//! - Within a phase, systems run in registration order
//! - One system runs to completion before the next starts
//!
//! A system that returns an error is logged and recorded in the
//! [`FrameReport`]; the frame continues with the next system. There is no
//! in-frame retry: the next frame runs the system again.
//!
//! `dispose` is called exactly once per system, when it is unregistered or
//! when the scheduler shuts down. A disposed system is dropped and never run
//! again.

use crate::config::SchedulerConfig;
use crate::ecs::Store;
use crate::error::{SchedulerError, SchedulerResult, SystemError};

/// Per-frame context handed to every system.
pub struct FrameContext<'a> {
    /// The store, including its resource registry.
    pub store: &'a mut Store,
    /// Frame number, starting at 0.
    pub frame: u64,
    /// Name of the running phase.
    pub phase: &'a str,
}

/// A named unit of per-frame work.
pub trait System: Send {
    /// Unique system name.
    fn name(&self) -> &str;

    /// Runs the system for one frame.
    ///
    /// # Errors
    ///
    /// Any failure; the scheduler logs it and continues the frame.
    fn run(&mut self, ctx: &mut FrameContext<'_>) -> Result<(), SystemError>;

    /// Releases resources the system retained. Called exactly once.
    fn dispose(&mut self, _store: &mut Store) {}
}

type RunFn = Box<dyn FnMut(&mut FrameContext<'_>) -> Result<(), SystemError> + Send>;
type DisposeFn = Box<dyn FnMut(&mut Store) + Send>;

/// A [`System`] backed by closures.
pub struct FnSystem {
    name: String,
    run: RunFn,
    dispose: Option<DisposeFn>,
}

impl FnSystem {
    /// Creates a closure-backed system.
    pub fn new<F>(name: impl Into<String>, run: F) -> Self
    where
        F: FnMut(&mut FrameContext<'_>) -> Result<(), SystemError> + Send + 'static,
    {
        Self {
            name: name.into(),
            run: Box::new(run),
            dispose: None,
        }
    }

    /// Attaches teardown logic.
    #[must_use]
    pub fn with_dispose<D>(mut self, dispose: D) -> Self
    where
        D: FnMut(&mut Store) + Send + 'static,
    {
        self.dispose = Some(Box::new(dispose));
        self
    }
}

impl System for FnSystem {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&mut self, ctx: &mut FrameContext<'_>) -> Result<(), SystemError> {
        (self.run)(ctx)
    }

    fn dispose(&mut self, store: &mut Store) {
        if let Some(dispose) = self.dispose.as_mut() {
            dispose(store);
        }
    }
}

/// A system run that returned an error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SystemFailure {
    /// Phase the system ran in.
    pub phase: String,
    /// System name.
    pub system: String,
    /// Rendered error.
    pub message: String,
}

/// Outcome of one [`Scheduler::run_frame`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameReport {
    /// Frame number.
    pub frame: u64,
    /// Systems invoked, including failed ones.
    pub systems_run: usize,
    /// Failed runs in execution order.
    pub failures: Vec<SystemFailure>,
}

impl FrameReport {
    /// Checks if every system succeeded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

struct Phase {
    name: String,
    systems: Vec<Box<dyn System>>,
}

/// Phase-ordered system runner.
pub struct Scheduler {
    phases: Vec<Phase>,
    /// System names in registration order, across phases.
    order: Vec<String>,
    frame: u64,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::from_phases(&SchedulerConfig::default().phases)
    }
}

impl Scheduler {
    /// Creates a scheduler with the configured phases and no systems.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::DuplicatePhase`] if a phase is listed twice.
    pub fn new(config: &SchedulerConfig) -> SchedulerResult<Self> {
        for (i, phase) in config.phases.iter().enumerate() {
            if config.phases[..i].contains(phase) {
                return Err(SchedulerError::DuplicatePhase(phase.clone()));
            }
        }
        Ok(Self::from_phases(&config.phases))
    }

    fn from_phases(phases: &[String]) -> Self {
        Self {
            phases: phases
                .iter()
                .map(|name| Phase {
                    name: name.clone(),
                    systems: Vec::new(),
                })
                .collect(),
            order: Vec::new(),
            frame: 0,
        }
    }

    /// Phase names in execution order.
    pub fn phases(&self) -> impl Iterator<Item = &str> {
        self.phases.iter().map(|p| p.name.as_str())
    }

    /// System names of one phase in execution order.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::UnknownPhase`].
    pub fn systems(&self, phase: &str) -> SchedulerResult<Vec<&str>> {
        self.phases
            .iter()
            .find(|p| p.name == phase)
            .map(|p| p.systems.iter().map(|s| s.name()).collect())
            .ok_or_else(|| SchedulerError::UnknownPhase(phase.to_owned()))
    }

    /// Number of registered systems.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Checks if no system is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Number of the next frame to run.
    #[must_use]
    pub const fn frame(&self) -> u64 {
        self.frame
    }

    /// Appends a system to a phase.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::UnknownPhase`] or
    /// [`SchedulerError::DuplicateSystem`].
    pub fn register(&mut self, phase: &str, system: impl System + 'static) -> SchedulerResult<()> {
        let name = system.name().to_owned();
        if self.order.contains(&name) {
            return Err(SchedulerError::DuplicateSystem(name));
        }
        let slot = self
            .phases
            .iter_mut()
            .find(|p| p.name == phase)
            .ok_or_else(|| SchedulerError::UnknownPhase(phase.to_owned()))?;
        slot.systems.push(Box::new(system));
        tracing::debug!(system = %name, phase, "registered system");
        self.order.push(name);
        Ok(())
    }

    /// Removes a system, disposing it first.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::UnknownSystem`].
    pub fn unregister(&mut self, name: &str, store: &mut Store) -> SchedulerResult<()> {
        let mut system = self
            .take(name)
            .ok_or_else(|| SchedulerError::UnknownSystem(name.to_owned()))?;
        system.dispose(store);
        tracing::debug!(system = name, "disposed system");
        Ok(())
    }

    fn take(&mut self, name: &str) -> Option<Box<dyn System>> {
        let position = self.order.iter().position(|n| n == name)?;
        self.order.remove(position);
        self.phases.iter_mut().find_map(|phase| {
            let i = phase.systems.iter().position(|s| s.name() == name)?;
            Some(phase.systems.remove(i))
        })
    }

    /// Runs every system once, phase by phase.
    pub fn run_frame(&mut self, store: &mut Store) -> FrameReport {
        let mut report = FrameReport {
            frame: self.frame,
            ..FrameReport::default()
        };
        for phase in &mut self.phases {
            for system in &mut phase.systems {
                let mut ctx = FrameContext {
                    store: &mut *store,
                    frame: self.frame,
                    phase: &phase.name,
                };
                report.systems_run += 1;
                if let Err(error) = system.run(&mut ctx) {
                    tracing::error!(
                        system = system.name(),
                        phase = %phase.name,
                        frame = self.frame,
                        %error,
                        "system failed"
                    );
                    report.failures.push(SystemFailure {
                        phase: phase.name.clone(),
                        system: system.name().to_owned(),
                        message: error.to_string(),
                    });
                }
            }
        }
        self.frame += 1;
        report
    }

    /// Disposes every system in reverse registration order and removes them.
    pub fn shutdown(&mut self, store: &mut Store) {
        while let Some(name) = self.order.last().cloned() {
            if let Some(mut system) = self.take(&name) {
                system.dispose(store);
                tracing::debug!(system = %name, "disposed system");
            }
        }
        tracing::info!(frames = self.frame, "scheduler shut down");
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if !self.order.is_empty() {
            tracing::warn!(
                systems = self.order.len(),
                "scheduler dropped without shutdown; systems were not disposed"
            );
        }
    }
}

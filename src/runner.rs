//! Dedicated simulation thread and its cross-thread control surface.
//!
//! One thread owns the `SimWorld` and runs the fixed-timestep loop at the
//! configured frame rate. Two boundaries cross threads:
//!
//! - Commands (spawn, despawn, input, pause, clear, stop) travel over an
//!   unbounded multi-producer `std::sync::mpsc` channel and are drained
//!   once per frame, so sends never block and entities requested from
//!   other threads appear at the next frame start.
//! - One `Arc<Snapshot>` per frame is published behind an `RwLock` held
//!   only for the pointer swap; readers clone the `Arc` and can never
//!   observe a partially mutated list. Publishing continues while paused.
//!
//! Snapshot entity buffers are recycled through a [`Pool`]: when the
//! previous frame's `Arc` has no outside readers left, its buffer goes
//! back to the free list instead of the allocator.

use crate::api::{EntityId, SimWorld, SpawnRequest};
use crate::error::SimError;
use crate::pool::Pool;
use crate::world::{EntitySnapshot, Snapshot};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, RwLock};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Loop pacing configuration.
#[derive(Debug, Clone, Copy)]
pub struct LoopConfig {
    /// Target frames per second for the outer loop.
    pub frame_rate: f32,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self { frame_rate: 60.0 }
    }
}

enum SimCommand {
    Spawn(SpawnRequest),
    Despawn(EntityId),
    SetPlayerInput(f32, f32),
    Pause,
    Resume,
    Clear,
    Stop,
}

struct Shared {
    snapshot: RwLock<Arc<Snapshot>>,
    running: AtomicBool,
}

/// Cloneable cross-thread handle to a running game loop. Any number of
/// producers (input, UI) may hold one.
#[derive(Clone)]
pub struct SimHandle {
    tx: Sender<SimCommand>,
    shared: Arc<Shared>,
}

impl SimHandle {
    fn send(&self, command: SimCommand) -> Result<(), SimError> {
        self.tx.send(command).map_err(|_| {
            log::warn!("command dropped: simulation loop is gone");
            SimError::LoopStopped
        })
    }

    /// Request an entity insertion; visible at the next frame start.
    pub fn spawn(&self, request: SpawnRequest) -> Result<(), SimError> {
        self.send(SimCommand::Spawn(request))
    }

    /// Request an entity removal; the flag flips at the next frame start
    /// and the body is swept at that frame's end.
    pub fn despawn(&self, id: EntityId) -> Result<(), SimError> {
        self.send(SimCommand::Despawn(id))
    }

    pub fn set_player_input(&self, mx: f32, my: f32) -> Result<(), SimError> {
        self.send(SimCommand::SetPlayerInput(mx, my))
    }

    pub fn pause(&self) -> Result<(), SimError> {
        self.send(SimCommand::Pause)
    }

    pub fn resume(&self) -> Result<(), SimError> {
        self.send(SimCommand::Resume)
    }

    pub fn clear(&self) -> Result<(), SimError> {
        self.send(SimCommand::Clear)
    }

    /// The most recently published snapshot. Always complete; never a
    /// partially mutated view.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        match self.shared.snapshot.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }
}

/// A running simulation loop on its own thread.
pub struct GameLoop {
    handle: SimHandle,
    join: Option<JoinHandle<()>>,
}

impl GameLoop {
    /// Take ownership of a configured `SimWorld` (listeners attached,
    /// initial entities staged) and drive it on a dedicated thread.
    pub fn spawn(sim: SimWorld, config: LoopConfig) -> Self {
        let (tx, rx) = mpsc::channel();
        let shared = Arc::new(Shared {
            snapshot: RwLock::new(Arc::new(Snapshot::default())),
            running: AtomicBool::new(true),
        });

        let thread_shared = Arc::clone(&shared);
        let join = std::thread::Builder::new()
            .name("horde-sim".into())
            .spawn(move || run_loop(sim, rx, thread_shared, config))
            .expect("failed to spawn simulation thread");

        log::info!("simulation loop started at {} Hz", config.frame_rate);
        Self {
            handle: SimHandle { tx, shared },
            join: Some(join),
        }
    }

    pub fn handle(&self) -> SimHandle {
        self.handle.clone()
    }

    /// Stop the loop and join the thread.
    pub fn stop(mut self) -> Result<(), SimError> {
        self.handle.send(SimCommand::Stop)?;
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
        log::info!("simulation loop stopped");
        Ok(())
    }
}

impl Drop for GameLoop {
    fn drop(&mut self) {
        // Best effort: a dropped loop should not leave the thread spinning.
        // After an explicit `stop` the join handle is gone and there is
        // nothing left to do.
        if let Some(join) = self.join.take() {
            let _ = self.handle.tx.send(SimCommand::Stop);
            let _ = join.join();
        }
    }
}

fn run_loop(mut sim: SimWorld, rx: Receiver<SimCommand>, shared: Arc<Shared>, config: LoopConfig) {
    let frame_budget = Duration::from_secs_f32(1.0 / config.frame_rate.max(1.0));
    let buffers: Pool<Vec<EntitySnapshot>> = Pool::with_capacity(2, Vec::new, Vec::clear);
    let mut last = Instant::now();

    'frames: loop {
        let frame_start = Instant::now();
        let dt = frame_start.duration_since(last).as_secs_f32();
        last = frame_start;

        // Drain every command queued since the previous frame.
        while let Ok(command) = rx.try_recv() {
            match command {
                SimCommand::Spawn(request) => sim.queue_spawn(request),
                SimCommand::Despawn(id) => sim.queue_despawn(id),
                SimCommand::SetPlayerInput(mx, my) => sim.set_player_input(mx, my),
                SimCommand::Pause => sim.pause(),
                SimCommand::Resume => sim.resume(),
                SimCommand::Clear => sim.clear(),
                SimCommand::Stop => break 'frames,
            }
        }

        sim.step(dt);

        // Publish this frame's snapshot; the lock is held only for the
        // pointer swap.
        let snapshot = Arc::new(sim.snapshot_into(buffers.acquire()));
        let previous = match shared.snapshot.write() {
            Ok(mut guard) => std::mem::replace(&mut *guard, snapshot),
            Err(poisoned) => std::mem::replace(&mut *poisoned.into_inner(), snapshot),
        };
        // If no reader still holds the previous frame, recycle its buffer.
        if let Ok(old) = Arc::try_unwrap(previous) {
            buffers.release(old.entities);
        }

        // Sleep away the remaining frame budget.
        let work = frame_start.elapsed();
        if work < frame_budget {
            std::thread::sleep(frame_budget - work);
        }
    }

    shared.running.store(false, Ordering::Release);
}

//! Deferred command buffer for structural world changes.
//!
//! Systems running in parallel cannot restructure the world directly:
//! spawning, despawning, attaching components, or swapping resources all
//! mutate state that other in-flight systems may be reading. Instead, systems
//! record [`Command`]s into a shared lock-free buffer; the stage runner
//! flushes the buffer once the stage has drained, so effects become visible
//! to later stages and never to the stage that issued them.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                        Stage pass                          │
//! ├────────────────────────────────────────────────────────────┤
//! │  system A ──push──┐                                        │
//! │  system B ──push──┼──► CommandBuffer ──flush──► World      │
//! │  system C ──push──┘         ▲                              │
//! │                             │                              │
//! │                      (end of stage)                        │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Thread Safety
//!
//! [`CommandBuffer::push`] is lock-free and safe from any worker;
//! [`CommandBuffer::flush`] runs on the driver thread with `&mut World`.

use std::any::TypeId as StdTypeId;

use crossbeam::queue::SegQueue;

use crate::ecs::{entity, world};

/// A deferred write onto an entity, type-erased over the bundle it installs.
pub type EntityWrite = Box<dyn FnOnce(&mut world::World, entity::Entity) + Send>;

/// A deferred write onto the world itself.
pub type WorldWrite = Box<dyn FnOnce(&mut world::World) + Send>;

/// A deferred structural operation.
///
/// Commands apply in FIFO order at flush time. An entity spawned and then
/// despawned within one stage exists only between those two applications.
pub enum Command {
    /// Establish a pre-allocated entity with its initial components.
    ///
    /// The handle was reserved when the command was recorded, so systems can
    /// reference the entity before it exists in storage.
    Spawn {
        entity: entity::Entity,
        write: EntityWrite,
    },

    /// Remove an entity and all of its components.
    Despawn { entity: entity::Entity },

    /// Attach components to an existing entity, replacing duplicates.
    Insert {
        entity: entity::Entity,
        write: EntityWrite,
    },

    /// Detach components from an existing entity by type.
    ///
    /// Types the entity does not carry are silently ignored.
    Remove {
        entity: entity::Entity,
        tokens: Vec<world::TypeToken>,
    },

    /// Insert or replace a resource.
    InsertResource { write: WorldWrite },

    /// Remove a resource by type identity.
    RemoveResource { type_id: StdTypeId },
}

/// Lock-free buffer of deferred commands.
#[derive(Default)]
pub struct CommandBuffer {
    commands: SegQueue<Command>,
}

impl CommandBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self {
            commands: SegQueue::new(),
        }
    }

    /// Record a command. Lock-free, callable from any worker.
    pub fn push(&self, command: Command) {
        self.commands.push(command);
    }

    /// Returns `true` if no commands are queued.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Apply all queued commands to the world in FIFO order.
    ///
    /// Called by the stage runner at end of stage; stale entity handles make
    /// the affected command a no-op.
    pub fn flush(&self, world: &mut world::World) {
        while let Some(command) = self.commands.pop() {
            match command {
                Command::Spawn { entity, write } => write(world, entity),
                Command::Despawn { entity } => world.despawn(entity),
                Command::Insert { entity, write } => write(world, entity),
                Command::Remove { entity, tokens } => world.remove_tokens(entity, &tokens),
                Command::InsertResource { write } => write(world),
                Command::RemoveResource { type_id } => world.remove_resource_erased(type_id),
            }
        }
    }
}

//! The `Commands` system parameter for deferred structural changes.

use crate::ecs::{
    component::Bundle,
    entity,
    resource::Resource,
    system::{
        command::{Command, CommandBuffer},
        param::Parameter,
    },
    world,
};

/// Record deferred structural world changes from a system.
///
/// Commands cover everything a system may not do directly while others run:
/// spawning and despawning entities, attaching and detaching components, and
/// inserting or removing resources. Recorded commands apply in FIFO order
/// when the stage flushes, so their effects are visible to later stages and
/// never to the stage that issued them.
///
/// # Entity handles
///
/// [`spawn`](Self::spawn) allocates the entity handle immediately, so it can
/// be referenced by follow-up commands within the same system even though
/// the entity reaches storage only at flush:
///
/// ```rust,ignore
/// fn setup(commands: Commands) {
///     let parent = commands.spawn(Body::default());
///     commands.insert(parent, Turret::default());
/// }
/// ```
pub struct Commands<'w> {
    buffer: &'w CommandBuffer,
    allocator: &'w entity::Allocator,
    types: &'w world::TypeRegistry,
}

impl<'w> Commands<'w> {
    /// Queue a new entity with the given bundle. The returned handle is
    /// valid for referencing immediately.
    pub fn spawn<B: Bundle>(&self, bundle: B) -> entity::Entity {
        let entity = self.allocator.alloc();
        self.buffer.push(Command::Spawn {
            entity,
            write: Box::new(move |world, entity| world.spawn_reserved(entity, bundle)),
        });
        entity
    }

    /// Queue an entity for removal at flush time.
    pub fn despawn(&self, entity: entity::Entity) {
        self.buffer.push(Command::Despawn { entity });
    }

    /// Queue components to attach to an existing entity, replacing
    /// duplicates.
    pub fn insert<B: Bundle>(&self, entity: entity::Entity, bundle: B) {
        self.buffer.push(Command::Insert {
            entity,
            write: Box::new(move |world, entity| world.insert(entity, bundle)),
        });
    }

    /// Queue component types to detach from an entity. Types the entity does
    /// not carry are ignored.
    pub fn remove<B: Bundle>(&self, entity: entity::Entity) {
        self.buffer.push(Command::Remove {
            entity,
            tokens: B::tokens(self.types),
        });
    }

    /// Queue a resource insert, replacing any existing instance at flush.
    pub fn insert_resource<R: Resource>(&self, value: R) {
        self.buffer.push(Command::InsertResource {
            write: Box::new(move |world| world.insert_resource(value)),
        });
    }

    /// Queue a resource removal.
    pub fn remove_resource<R: Resource>(&self) {
        self.buffer.push(Command::RemoveResource {
            type_id: std::any::TypeId::of::<R>(),
        });
    }
}

impl Parameter for Commands<'_> {
    type Value<'w> = Commands<'w>;

    fn init(_world: &mut world::World) {}

    /// Command recording conflicts with other recorders and with queries -
    /// the flush restructures what queries observe - which is captured by the
    /// descriptor's command flag.
    fn access(_world: &world::World) -> world::Access {
        let mut access = world::Access::new();
        access.set_command();
        access
    }

    unsafe fn extract<'w>(
        shard: &'w mut world::Shard<'_>,
        buffer: &'w CommandBuffer,
    ) -> Self::Value<'w> {
        Commands {
            buffer,
            allocator: shard.allocator(),
            types: shard.types(),
        }
    }
}

//! Minimal typed component columns.
//!
//! The scheduler treats physical component storage as an external
//! collaborator; this module is the smallest registry that satisfies the
//! contract: one column per component type, keyed by the type's
//! [`TypeToken`], with per-entity insert, remove, and lookup. Columns are
//! type-erased boxes downcast on access, the same pattern the event registry
//! uses for its queues.

use std::{any::Any, collections::HashMap};

use crate::ecs::{
    component::Component,
    entity,
    world::registry::TypeToken,
};

/// Type-erased interface over a single component column.
trait Column: Send + Sync {
    /// Drop the entity's value from this column, if present.
    fn remove(&mut self, entity: entity::Id);

    /// Returns `true` if the column holds a value for the entity.
    fn contains(&self, entity: entity::Id) -> bool;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Concrete column for component type `C`.
struct TypedColumn<C: Component> {
    cells: HashMap<entity::Id, C>,
}

impl<C: Component> TypedColumn<C> {
    fn new() -> Self {
        Self {
            cells: HashMap::new(),
        }
    }
}

impl<C: Component> Column for TypedColumn<C> {
    fn remove(&mut self, entity: entity::Id) {
        self.cells.remove(&entity);
    }

    fn contains(&self, entity: entity::Id) -> bool {
        self.cells.contains_key(&entity)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Component storage: one column per registered component type.
#[derive(Default)]
pub(crate) struct Storage {
    columns: HashMap<TypeToken, Box<dyn Column>>,
}

impl Storage {
    /// Make sure a column exists for component type `C`.
    pub fn ensure_column<C: Component>(&mut self, token: TypeToken) {
        self.columns
            .entry(token)
            .or_insert_with(|| Box::new(TypedColumn::<C>::new()));
    }

    /// Write a component value for the entity, replacing any existing one.
    pub fn insert<C: Component>(&mut self, token: TypeToken, entity: entity::Id, value: C) {
        self.ensure_column::<C>(token);
        let column = self
            .columns
            .get_mut(&token)
            .and_then(|column| column.as_any_mut().downcast_mut::<TypedColumn<C>>())
            .expect("column type mismatch for registered token");
        column.cells.insert(entity, value);
    }

    /// Remove the entity's value for the given component type, if present.
    pub fn remove(&mut self, token: TypeToken, entity: entity::Id) {
        if let Some(column) = self.columns.get_mut(&token) {
            column.remove(entity);
        }
    }

    /// Returns `true` if the entity has a value in the given column.
    pub fn contains(&self, token: TypeToken, entity: entity::Id) -> bool {
        self.columns
            .get(&token)
            .is_some_and(|column| column.contains(entity))
    }

    /// Borrow the entity's component value.
    pub fn get<C: Component>(&self, token: TypeToken, entity: entity::Id) -> Option<&C> {
        self.columns
            .get(&token)?
            .as_any()
            .downcast_ref::<TypedColumn<C>>()?
            .cells
            .get(&entity)
    }

    /// Mutably borrow the entity's component value.
    pub fn get_mut<C: Component>(&mut self, token: TypeToken, entity: entity::Id) -> Option<&mut C> {
        self.columns
            .get_mut(&token)?
            .as_any_mut()
            .downcast_mut::<TypedColumn<C>>()?
            .cells
            .get_mut(&entity)
    }

    /// Drop every component value attached to the entity.
    pub fn despawn(&mut self, entity: entity::Id) {
        for column in self.columns.values_mut() {
            column.remove(entity);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Health(u32);
    impl Component for Health {}

    struct Armor(u32);
    impl Component for Armor {}

    #[test]
    fn insert_and_get_round_trip() {
        // Given
        let mut storage = Storage::default();
        let token = TypeToken::new(0);
        let entity = entity::Id::from(3);

        // When
        storage.insert(token, entity, Health(75));

        // Then
        assert!(storage.contains(token, entity));
        assert_eq!(storage.get::<Health>(token, entity).unwrap().0, 75);
    }

    #[test]
    fn insert_replaces_existing_value() {
        let mut storage = Storage::default();
        let token = TypeToken::new(0);
        let entity = entity::Id::from(1);

        storage.insert(token, entity, Health(10));
        storage.insert(token, entity, Health(20));

        assert_eq!(storage.get::<Health>(token, entity).unwrap().0, 20);
    }

    #[test]
    fn despawn_clears_all_columns() {
        let mut storage = Storage::default();
        let health = TypeToken::new(0);
        let armor = TypeToken::new(1);
        let entity = entity::Id::from(1);

        storage.insert(health, entity, Health(10));
        storage.insert(armor, entity, Armor(5));

        storage.despawn(entity);

        assert!(!storage.contains(health, entity));
        assert!(!storage.contains(armor, entity));
    }

    #[test]
    fn get_mut_allows_in_place_update() {
        let mut storage = Storage::default();
        let token = TypeToken::new(0);
        let entity = entity::Id::from(0);

        storage.insert(token, entity, Health(1));
        storage.get_mut::<Health>(token, entity).unwrap().0 = 99;

        assert_eq!(storage.get::<Health>(token, entity).unwrap().0, 99);
    }

    #[test]
    fn missing_column_reads_are_none() {
        let storage = Storage::default();
        let token = TypeToken::new(9);
        let entity = entity::Id::from(0);

        assert!(!storage.contains(token, entity));
        assert!(storage.get::<Health>(token, entity).is_none());
    }
}

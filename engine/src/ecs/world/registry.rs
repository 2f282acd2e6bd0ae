//! Dense type-identity tokens for all typed world data.
//!
//! This module provides [`TypeRegistry`], a thread-safe registry mapping Rust
//! type identities to small numeric [`TypeToken`]s. Components, resources,
//! events, and states all draw their tokens from a single counter, so the
//! access-control bitsets can index every typed concern of a system with one
//! id space.
//!
//! # Design
//!
//! Tokens are allocated at first mention: the first time any code asks for a
//! type's token, the registry assigns the next free index. Registration order
//! therefore depends on system registration order, which is fine - tokens are
//! only compared for identity, never for rank.
//!
//! # Thread Safety
//!
//! Reads are lock-free via `DashMap`; the counter is a relaxed atomic. System
//! parameters resolve their tokens while holding only `&World`, including from
//! condition evaluation on the dispatcher thread.

use std::{
    any::TypeId as StdTypeId,
    sync::atomic::{AtomicU32, Ordering},
};

use dashmap::DashMap;

/// A dense identifier for a registered type.
///
/// Tokens index into the access bitsets used for conflict detection. The same
/// token space is shared by components, resources, events, and states; the
/// access descriptor keeps those concerns in separate sets, so sharing the
/// space costs nothing and keeps the registry to a single map.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeToken(u32);

impl TypeToken {
    /// Construct a token from a raw u32 value.
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the index of this token for use in indexable storage (e.g. bitset).
    #[inline]
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl From<u32> for TypeToken {
    #[inline]
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

/// Registry assigning [`TypeToken`]s to Rust types on first mention.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    /// Token lookup by Rust type identity.
    tokens: DashMap<StdTypeId, TypeToken>,

    /// The next free token index.
    next: AtomicU32,
}

impl TypeRegistry {
    /// Create a new, empty registry.
    pub fn new() -> Self {
        Self {
            tokens: DashMap::new(),
            next: AtomicU32::new(0),
        }
    }

    /// Get the token for type `T`, allocating one on first mention.
    pub fn token<T: 'static>(&self) -> TypeToken {
        let type_id = StdTypeId::of::<T>();
        if let Some(token) = self.tokens.get(&type_id) {
            return *token;
        }
        *self
            .tokens
            .entry(type_id)
            .or_insert_with(|| TypeToken::new(self.next.fetch_add(1, Ordering::Relaxed)))
    }

    /// Get the token for type `T` if it has been mentioned before.
    pub fn get<T: 'static>(&self) -> Option<TypeToken> {
        self.tokens.get(&StdTypeId::of::<T>()).map(|token| *token)
    }

    /// The number of registered types.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Returns `true` if no types have been registered.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

use std::fmt;
use std::hash::Hash;

use async_trait::async_trait;

use crate::storage::Result;

/// An entity with a unique identifier.
pub trait Entity {
    type Id: Eq + Hash + Clone + fmt::Display + Send + Sync;

    fn id(&self) -> Self::Id;
}

/// A one-to-many association that is resolved after the parent query.
///
/// Implemented by zero-sized marker types, one per association, so the
/// association name and the way children are attached are fixed at compile
/// time.
pub trait PluralAssociation: Send + Sync + 'static {
    type Parent: Entity + Send;
    type Child: Send;

    /// Association name, used in logs and errors.
    const NAME: &'static str;

    /// Stores the resolved children on the parent, replacing any previous
    /// value. `children` is empty when the parent has no related rows.
    fn attach(parent: &mut Self::Parent, children: Vec<Self::Child>);
}

/// Identifier type of an association's parent.
pub type ParentId<A> = <<A as PluralAssociation>::Parent as Entity>::Id;

/// A child row tagged with the identifier of the parent it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildRow<I, C> {
    pub parent_id: I,
    pub child: C,
}

impl<I, C> ChildRow<I, C> {
    pub fn new(parent_id: I, child: C) -> Self {
        Self { parent_id, child }
    }
}

/// Loads the children of a batch of parents for one association.
///
/// Implementations issue a single query for the whole batch. Rows may come
/// back in any order and interleaved across parents.
///
/// Backends with a bound on query parameters (SQLite's
/// `SQLITE_MAX_VARIABLE_NUMBER`) split batches above that bound themselves.
/// A batch built from one page holds at most
/// [`MAX_PAGE_SIZE`](crate::storage::MAX_PAGE_SIZE) ids.
#[async_trait]
pub trait AssociationLoader<A: PluralAssociation>: Send + Sync {
    async fn load_children(
        &self,
        parent_ids: &[ParentId<A>],
    ) -> Result<Vec<ChildRow<ParentId<A>, A::Child>>>;
}

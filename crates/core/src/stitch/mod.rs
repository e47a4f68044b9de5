//! Order-preserving collection stitching.
//!
//! A single relational query cannot eagerly fetch more than one plural
//! association without multiplying rows. Parents are therefore loaded
//! without their collections, and each collection is resolved afterwards by
//! one batched query whose rows are routed back to their parents here.

mod assemble;
mod error;
mod traits;

pub use assemble::{assemble, parent_ids};
pub use error::{Result, StitchError};
pub use traits::{AssociationLoader, ChildRow, Entity, ParentId, PluralAssociation};

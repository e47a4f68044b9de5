//! Resolves plural associations on already loaded parents.

use shipledger_core::stitch::{
    assemble, parent_ids, AssociationLoader, PluralAssociation, Result, StitchError,
};
use shipledger_core::storage::Page;

/// Populates one plural association on a batch of parents with a single
/// loader call.
///
/// Holds no state; one instance can serve any number of concurrent calls.
/// Parent identifiers must be unique within a batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct CollectionStitcher;

impl CollectionStitcher {
    pub fn new() -> Self {
        Self
    }

    /// Returns `parents` in the same order with the association attached.
    ///
    /// An empty batch is returned as is without calling the loader.
    ///
    /// # Errors
    ///
    /// Fails the whole batch if the loader fails or returns a row for a
    /// parent outside the batch.
    pub async fn stitch<A, L>(
        &self,
        parents: Vec<A::Parent>,
        loader: &L,
    ) -> Result<Vec<A::Parent>>
    where
        A: PluralAssociation,
        L: AssociationLoader<A> + ?Sized,
    {
        if parents.is_empty() {
            return Ok(parents);
        }

        let ids = parent_ids::<A>(&parents);
        let rows = loader
            .load_children(&ids)
            .await
            .map_err(|source| StitchError::Loader {
                association: A::NAME,
                source,
            })?;

        tracing::debug!(
            association = A::NAME,
            parents = parents.len(),
            rows = rows.len(),
            "Stitched association"
        );

        assemble::<A>(parents, rows)
    }

    /// Stitches the slice of a page. Page coordinates and the total count
    /// are carried over untouched.
    pub async fn stitch_page<A, L>(
        &self,
        page: Page<A::Parent>,
        loader: &L,
    ) -> Result<Page<A::Parent>>
    where
        A: PluralAssociation,
        L: AssociationLoader<A> + ?Sized,
    {
        let (items, meta) = page.into_parts();
        let items = self.stitch::<A, L>(items, loader).await?;
        Ok(meta.with_items(items))
    }

    /// Stitches an optional parent as a batch of one. `None` issues no query.
    pub async fn stitch_one<A, L>(
        &self,
        parent: Option<A::Parent>,
        loader: &L,
    ) -> Result<Option<A::Parent>>
    where
        A: PluralAssociation,
        L: AssociationLoader<A> + ?Sized,
    {
        let Some(parent) = parent else {
            return Ok(None);
        };

        let mut stitched = self.stitch::<A, L>(vec![parent], loader).await?;
        Ok(stitched.pop())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use shipledger_core::order::{Order, OrderItem, OrderItems};
    use shipledger_core::stitch::ChildRow;
    use shipledger_core::storage::{self, PageRequest, RepositoryError};
    use tokio::sync::RwLock;
    use uuid::Uuid;

    /// Mock loader serving item rows from memory and counting calls.
    struct MockItemLoader {
        items: RwLock<HashMap<Uuid, Vec<OrderItem>>>,
        calls: AtomicUsize,
        batch_sizes: RwLock<Vec<usize>>,
        fail: bool,
    }

    impl MockItemLoader {
        fn new() -> Self {
            Self {
                items: RwLock::new(HashMap::new()),
                calls: AtomicUsize::new(0),
                batch_sizes: RwLock::new(Vec::new()),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new()
            }
        }

        async fn with_items(self, order_id: Uuid, skus: &[&str]) -> Self {
            let items = skus
                .iter()
                .map(|sku| OrderItem::new(order_id, *sku, 1, 100))
                .collect();
            self.items.write().await.insert(order_id, items);
            self
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AssociationLoader<OrderItems> for MockItemLoader {
        async fn load_children(
            &self,
            parent_ids: &[Uuid],
        ) -> storage::Result<Vec<ChildRow<Uuid, OrderItem>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.batch_sizes.write().await.push(parent_ids.len());

            if self.fail {
                return Err(RepositoryError::QueryFailed("database is locked".to_string()));
            }

            // Return rows in reverse request order to exercise re-routing.
            let items = self.items.read().await;
            Ok(parent_ids
                .iter()
                .rev()
                .filter_map(|id| items.get(id))
                .flatten()
                .map(|item| ChildRow::new(item.order_id, item.clone()))
                .collect())
        }
    }

    fn orders(count: usize) -> Vec<Order> {
        (0..count)
            .map(|n| Order::new(format!("SO-{n}"), "buyer@example.com"))
            .collect()
    }

    fn skus(order: &Order) -> Vec<&str> {
        order
            .items
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|item| item.sku.as_str())
            .collect()
    }

    #[tokio::test]
    async fn test_stitch_uses_one_query_and_keeps_order() {
        let parents = orders(3);
        let loader = MockItemLoader::new()
            .with_items(parents[0].id, &["A-1", "A-2"])
            .await
            .with_items(parents[2].id, &["C-1"])
            .await;
        let expected_ids: Vec<Uuid> = parents.iter().map(|o| o.id).collect();

        let result = CollectionStitcher
            .stitch::<OrderItems, _>(parents, &loader)
            .await
            .unwrap();

        assert_eq!(loader.calls(), 1);
        assert_eq!(*loader.batch_sizes.read().await, vec![3]);
        assert_eq!(
            result.iter().map(|o| o.id).collect::<Vec<_>>(),
            expected_ids
        );
        assert_eq!(skus(&result[0]), vec!["A-1", "A-2"]);
        assert_eq!(result[1].items, Some(vec![]));
        assert_eq!(skus(&result[2]), vec!["C-1"]);
    }

    #[tokio::test]
    async fn test_empty_batch_issues_no_query() {
        let loader = MockItemLoader::new();

        let result = CollectionStitcher
            .stitch::<OrderItems, _>(vec![], &loader)
            .await
            .unwrap();

        assert!(result.is_empty());
        assert_eq!(loader.calls(), 0);
    }

    #[tokio::test]
    async fn test_page_metadata_passes_through() {
        let parents = orders(2);
        let loader = MockItemLoader::new()
            .with_items(parents[1].id, &["B-1"])
            .await;
        let page = Page::new(parents, PageRequest::new(4, 2).unwrap(), 57);

        let result = CollectionStitcher
            .stitch_page::<OrderItems, _>(page, &loader)
            .await
            .unwrap();

        assert_eq!(loader.calls(), 1);
        assert_eq!((result.page, result.size, result.total), (4, 2, 57));
        assert_eq!(result.items[0].items, Some(vec![]));
        assert_eq!(skus(&result.items[1]), vec!["B-1"]);
    }

    #[tokio::test]
    async fn test_absent_parent_issues_no_query() {
        let loader = MockItemLoader::new();

        let result = CollectionStitcher
            .stitch_one::<OrderItems, _>(None, &loader)
            .await
            .unwrap();

        assert!(result.is_none());
        assert_eq!(loader.calls(), 0);
    }

    #[tokio::test]
    async fn test_present_parent_is_a_batch_of_one() {
        let order = Order::new("SO-1", "buyer@example.com");
        let loader = MockItemLoader::new()
            .with_items(order.id, &["X-1"])
            .await;

        let result = CollectionStitcher
            .stitch_one::<OrderItems, _>(Some(order), &loader)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(*loader.batch_sizes.read().await, vec![1]);
        assert_eq!(skus(&result), vec!["X-1"]);
    }

    #[tokio::test]
    async fn test_loader_failure_fails_whole_call() {
        let loader = MockItemLoader::failing();

        let result = CollectionStitcher
            .stitch::<OrderItems, _>(orders(3), &loader)
            .await;

        assert_eq!(
            result,
            Err(StitchError::Loader {
                association: "items",
                source: RepositoryError::QueryFailed("database is locked".to_string()),
            })
        );
    }

    #[tokio::test]
    async fn test_works_through_trait_object() {
        let parents = orders(1);
        let loader = MockItemLoader::new()
            .with_items(parents[0].id, &["D-1"])
            .await;
        let dyn_loader: &dyn AssociationLoader<OrderItems> = &loader;

        let result = CollectionStitcher::new()
            .stitch::<OrderItems, _>(parents, dyn_loader)
            .await
            .unwrap();

        assert_eq!(skus(&result[0]), vec!["D-1"]);
    }
}

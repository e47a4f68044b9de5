//! Cached order repository decorator.
//!
//! Wraps an `OrderRepository` and its association loaders with the
//! cache-aside pattern over the provisioned order regions.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::join_all;
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use shipledger_core::cache::{self, RegionStore};
use shipledger_core::order::{
    Invoice, Order, OrderInvoices, OrderItem, OrderItems, OrderShipments, OrderStatus, Shipment,
    ORDERS_REGION, ORDER_INVOICES_REGION, ORDER_ITEMS_REGION, ORDER_SHIPMENTS_REGION,
};
use shipledger_core::stitch::{AssociationLoader, ChildRow, PluralAssociation};
use shipledger_core::storage::{OrderRepository, Page, PageRequest, Result};

use crate::cache::{CacheProvisioner, RegionHandle};

/// Handles of every region the order decorator reads and writes.
pub struct OrderRegions<S> {
    pub orders: RegionHandle<S>,
    pub items: RegionHandle<S>,
    pub shipments: RegionHandle<S>,
    pub invoices: RegionHandle<S>,
}

impl<S: RegionStore> OrderRegions<S> {
    /// Looks up (or provisions) the order regions.
    pub async fn provision(cache: &CacheProvisioner<S>) -> cache::Result<Self> {
        Ok(Self {
            orders: cache.ensure_region(ORDERS_REGION).await?,
            items: cache.ensure_region(ORDER_ITEMS_REGION).await?,
            shipments: cache.ensure_region(ORDER_SHIPMENTS_REGION).await?,
            invoices: cache.ensure_region(ORDER_INVOICES_REGION).await?,
        })
    }
}

/// An order association whose per-order collections are cached in their own
/// region, keyed by order id.
pub trait CachedAssociation: PluralAssociation<Parent = Order> {
    fn region<S>(regions: &OrderRegions<S>) -> &RegionHandle<S>;
}

impl CachedAssociation for OrderItems {
    fn region<S>(regions: &OrderRegions<S>) -> &RegionHandle<S> {
        &regions.items
    }
}

impl CachedAssociation for OrderShipments {
    fn region<S>(regions: &OrderRegions<S>) -> &RegionHandle<S> {
        &regions.shipments
    }
}

impl CachedAssociation for OrderInvoices {
    fn region<S>(regions: &OrderRegions<S>) -> &RegionHandle<S> {
        &regions.invoices
    }
}

/// Cached order repository decorator.
///
/// - **Reads**: `get_order` and the association loaders check the cache
///   first; misses are fetched from the repository and cached. Cache
///   failures degrade to a miss.
/// - **Writes**: persist to the repository, then invalidate the affected
///   entries.
///
/// `list_orders` is not cached; pages are cheap to query and expensive to
/// invalidate.
///
/// # Type Parameters
///
/// * `R` - The underlying repository implementation
/// * `S` - The region store backing the cache
pub struct CachedOrderRepository<R, S>
where
    R: OrderRepository,
    S: RegionStore,
{
    repository: Arc<R>,
    regions: OrderRegions<S>,
}

impl<R, S> CachedOrderRepository<R, S>
where
    R: OrderRepository,
    S: RegionStore,
{
    pub fn new(repository: Arc<R>, regions: OrderRegions<S>) -> Self {
        Self {
            repository,
            regions,
        }
    }

    #[cfg(test)]
    pub fn regions(&self) -> &OrderRegions<S> {
        &self.regions
    }

    async fn invalidate(&self, region: &RegionHandle<S>, order_id: Uuid) {
        if let Err(err) = region.remove(&order_id.to_string()).await {
            tracing::warn!(
                region = %region.name(),
                order_id = %order_id,
                error = %err,
                "Failed to invalidate cache entry"
            );
        }
    }
}

#[async_trait]
impl<R, S> OrderRepository for CachedOrderRepository<R, S>
where
    R: OrderRepository + 'static,
    S: RegionStore + 'static,
{
    async fn get_order(&self, id: Uuid) -> Result<Option<Order>> {
        let repository = &self.repository;

        let order = self
            .regions
            .orders
            .get_or_insert_with(&id.to_string(), || async move {
                match repository.get_order(id).await {
                    Ok(Some(order)) => Ok(order.without_associations()),
                    Ok(None) => Err(None),
                    Err(err) => Err(Some(err)),
                }
            })
            .await;

        match order {
            Ok(order) => Ok(Some(order)),
            // Absent orders are not cached.
            Err(None) => Ok(None),
            Err(Some(err)) => Err(err),
        }
    }

    async fn list_orders(&self, request: PageRequest) -> Result<Page<Order>> {
        self.repository.list_orders(request).await
    }

    async fn create_order(&self, order: &Order) -> Result<()> {
        self.repository.create_order(order).await?;

        // Populate cache immediately (cache-aside on write)
        let cached = order.clone().without_associations();
        if let Err(err) = self
            .regions
            .orders
            .put(&order.id.to_string(), &cached)
            .await
        {
            tracing::warn!(order_id = %order.id, error = %err, "Failed to cache new order");
        }

        tracing::debug!(order_id = %order.id, reference = %order.reference, "Order created");
        Ok(())
    }

    async fn update_order_status(&self, id: Uuid, status: OrderStatus) -> Result<()> {
        self.repository.update_order_status(id, status).await?;
        self.invalidate(&self.regions.orders, id).await;

        tracing::debug!(order_id = %id, status = status.as_str(), "Order status updated");
        Ok(())
    }

    async fn add_item(&self, item: &OrderItem) -> Result<()> {
        self.repository.add_item(item).await?;
        self.invalidate(&self.regions.items, item.order_id).await;
        Ok(())
    }

    async fn add_shipment(&self, shipment: &Shipment) -> Result<()> {
        self.repository.add_shipment(shipment).await?;
        self.invalidate(&self.regions.shipments, shipment.order_id).await;
        Ok(())
    }

    async fn add_invoice(&self, invoice: &Invoice) -> Result<()> {
        self.repository.add_invoice(invoice).await?;
        self.invalidate(&self.regions.invoices, invoice.order_id).await;
        Ok(())
    }
}

#[async_trait]
impl<R, S, A> AssociationLoader<A> for CachedOrderRepository<R, S>
where
    A: CachedAssociation,
    A::Child: Serialize + DeserializeOwned + Sync,
    R: OrderRepository + AssociationLoader<A> + 'static,
    S: RegionStore + 'static,
{
    /// Serves cached collections per order and loads every miss with a
    /// single call to the wrapped loader. Orders without children are cached
    /// as empty collections.
    async fn load_children(&self, parent_ids: &[Uuid]) -> Result<Vec<ChildRow<Uuid, A::Child>>> {
        let region = A::region(&self.regions);

        let lookups = join_all(parent_ids.iter().map(|id| async move {
            let cached = region.get::<Vec<A::Child>>(&id.to_string()).await;
            (*id, cached)
        }))
        .await;

        let mut rows = Vec::new();
        let mut misses = Vec::new();
        for (id, cached) in lookups {
            match cached {
                Ok(Some(children)) => {
                    rows.extend(children.into_iter().map(|child| ChildRow::new(id, child)))
                }
                Ok(None) => misses.push(id),
                Err(err) => {
                    tracing::warn!(
                        region = %region.name(),
                        order_id = %id,
                        error = %err,
                        "Cache read failed"
                    );
                    misses.push(id);
                }
            }
        }

        tracing::trace!(
            association = A::NAME,
            hits = parent_ids.len() - misses.len(),
            misses = misses.len(),
            "Association cache lookup"
        );

        if misses.is_empty() {
            return Ok(rows);
        }

        let loaded = self.repository.load_children(&misses).await?;

        let mut groups: HashMap<Uuid, Vec<A::Child>> =
            misses.iter().map(|id| (*id, Vec::new())).collect();
        let mut foreign = Vec::new();
        for row in loaded {
            match groups.get_mut(&row.parent_id) {
                Some(children) => children.push(row.child),
                // Not ours to cache; the stitcher reports it.
                None => foreign.push(row),
            }
        }

        for id in misses {
            let children = groups.remove(&id).unwrap_or_default();
            if let Err(err) = region.put(&id.to_string(), &children).await {
                tracing::warn!(
                    region = %region.name(),
                    order_id = %id,
                    error = %err,
                    "Failed to populate cache"
                );
            }
            rows.extend(children.into_iter().map(|child| ChildRow::new(id, child)));
        }

        rows.extend(foreign);
        Ok(rows)
    }
}

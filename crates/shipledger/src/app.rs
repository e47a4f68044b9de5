//! Application wiring.
//!
//! Connects the cache, provisions every region, opens the database and hands
//! out the cached repository. Everything is constructed once and passed
//! explicitly; nothing here is global.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use futures_util::stream::{select_all, StreamExt};
use uuid::Uuid;

use shipledger_core::cache::{RegionStats, RegionStore};
use shipledger_core::order::{
    Invoice, InvoiceStatus, Order, OrderAssociation, OrderInvoices, OrderItem, OrderItems,
    OrderShipments, OrderStatus, Shipment, CACHE_REGIONS,
};
use shipledger_core::storage::{OrderRepository, Page, PageRequest};

use crate::build_info;
use crate::cache::{self, ActiveStore, CacheProvisioner, InvalidationSource};
use crate::config::Config;
use crate::stitch::CollectionStitcher;
use crate::storage::{CachedOrderRepository, OrderRegions, SqliteRepository};

type Orders<S> = CachedOrderRepository<SqliteRepository, S>;

/// Shared application services.
pub struct App<S: RegionStore = ActiveStore> {
    pub cache: Arc<CacheProvisioner<S>>,
    pub orders: Arc<Orders<S>>,
    stitcher: CollectionStitcher,
}

impl App<ActiveStore> {
    /// Connects every backend described by `config`.
    ///
    /// Fails if the cache cannot be reached or a region cannot be
    /// provisioned; there is no degraded startup mode.
    pub async fn init(config: &Config) -> Result<Self> {
        let topology = config.topology().context("Invalid cache configuration")?;
        let store = cache::connect(&topology, config.connect_timeout(), config.cache_max_entries)
            .await
            .context("Failed to connect to cache")?;

        let repository = SqliteRepository::new(&config.sqlite_path)
            .await
            .with_context(|| format!("Failed to open database at {}", config.sqlite_path))?;

        Self::assemble(Arc::new(store), repository, config).await
    }
}

impl<S: RegionStore + 'static> App<S> {
    /// Provisions the static region list and wraps the repository.
    pub async fn assemble(
        store: Arc<S>,
        repository: SqliteRepository,
        config: &Config,
    ) -> Result<Self> {
        let provisioner = CacheProvisioner::new(
            store,
            build_info::key_prefix(),
            config.expiry_policy(),
        );

        provisioner
            .ensure_regions(CACHE_REGIONS)
            .await
            .context("Failed to provision cache regions")?;
        let regions = OrderRegions::provision(&provisioner).await?;

        tracing::info!(
            regions = CACHE_REGIONS.len(),
            prefix = %provisioner.key_prefix(),
            ttl_seconds = provisioner.expiry().ttl().as_secs(),
            "Cache ready"
        );

        Ok(Self {
            cache: Arc::new(provisioner),
            orders: Arc::new(CachedOrderRepository::new(Arc::new(repository), regions)),
            stitcher: CollectionStitcher::new(),
        })
    }

    /// Statistics for every provisioned region.
    pub async fn stats(&self) -> Result<Vec<RegionStats>> {
        Ok(self.cache.stats().await?)
    }

    /// Clears one provisioned region. Peers sharing the cache are notified.
    pub async fn clear_region(&self, name: &str) -> Result<()> {
        let region = self
            .cache
            .region(name)
            .await
            .with_context(|| format!("Unknown cache region '{name}'"))?;
        region.clear().await?;
        tracing::info!(region = name, "Cache region cleared");
        Ok(())
    }

    /// One page of orders, newest first, with the requested associations
    /// resolved.
    pub async fn list_orders(
        &self,
        request: PageRequest,
        associations: &[OrderAssociation],
    ) -> Result<Page<Order>> {
        let mut page = self.orders.list_orders(request).await?;

        for association in associations {
            page = match association {
                OrderAssociation::Items => {
                    self.stitcher
                        .stitch_page::<OrderItems, _>(page, self.orders.as_ref())
                        .await?
                }
                OrderAssociation::Shipments => {
                    self.stitcher
                        .stitch_page::<OrderShipments, _>(page, self.orders.as_ref())
                        .await?
                }
                OrderAssociation::Invoices => {
                    self.stitcher
                        .stitch_page::<OrderInvoices, _>(page, self.orders.as_ref())
                        .await?
                }
            };
        }

        tracing::debug!(
            page = page.page,
            returned = page.items.len(),
            total = page.total,
            total_pages = page.total_pages(),
            "Listed orders"
        );

        Ok(page)
    }

    /// A single order with the requested associations resolved.
    pub async fn show_order(
        &self,
        id: Uuid,
        associations: &[OrderAssociation],
    ) -> Result<Option<Order>> {
        let mut order = self.orders.get_order(id).await?;

        for association in associations {
            order = match association {
                OrderAssociation::Items => {
                    self.stitcher
                        .stitch_one::<OrderItems, _>(order, self.orders.as_ref())
                        .await?
                }
                OrderAssociation::Shipments => {
                    self.stitcher
                        .stitch_one::<OrderShipments, _>(order, self.orders.as_ref())
                        .await?
                }
                OrderAssociation::Invoices => {
                    self.stitcher
                        .stitch_one::<OrderInvoices, _>(order, self.orders.as_ref())
                        .await?
                }
            };
        }

        Ok(order)
    }

    /// Inserts `count` demo orders with a varying number of children.
    pub async fn seed(&self, count: u32) -> Result<Vec<Uuid>> {
        let now = Utc::now();
        let mut ids = Vec::with_capacity(count as usize);

        for n in 0..count {
            let order = Order::new(
                format!("SO-{}", Uuid::new_v4().simple()),
                format!("customer{n}@example.com"),
            )
            .with_status(demo_status(n))
            .with_placed_at(now - Duration::minutes(i64::from(n)));
            self.orders.create_order(&order).await?;

            for line in 0..(n % 4) {
                let item = OrderItem::new(
                    order.id,
                    format!("SKU-{:03}", (n * 7 + line) % 100),
                    line + 1,
                    i64::from(250 * (line + 1)),
                );
                self.orders.add_item(&item).await?;
            }

            if matches!(order.status, OrderStatus::Shipped | OrderStatus::Delivered) {
                let shipment = Shipment::new(order.id, "UPS", format!("1Z{n:08}"))
                    .shipped(order.placed_at + Duration::hours(6));
                self.orders.add_shipment(&shipment).await?;
            }

            if n % 3 != 0 {
                let invoice = Invoice::new(order.id, format!("INV-{}", order.reference), 1000)
                    .with_status(if n % 2 == 0 {
                        InvoiceStatus::Paid
                    } else {
                        InvoiceStatus::Issued
                    });
                self.orders.add_invoice(&invoice).await?;
            }

            ids.push(order.id);
        }

        tracing::info!(orders = ids.len(), "Seeded demo orders");
        Ok(ids)
    }
}

impl<S: RegionStore + InvalidationSource + 'static> App<S> {
    /// Logs every region clear broadcast by any process until Ctrl+C.
    pub async fn watch_invalidations(&self) -> Result<()> {
        let mut feeds = Vec::with_capacity(CACHE_REGIONS.len());
        for region in CACHE_REGIONS {
            feeds.push(self.cache.store().invalidations(region).await?);
        }
        let mut feed = select_all(feeds);

        tracing::info!(regions = CACHE_REGIONS.len(), "Watching region invalidations");

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Received Ctrl+C, stopping watch");
                    return Ok(());
                }
                next = feed.next() => match next {
                    Some(region) => tracing::info!(region = %region, "Region cleared by a peer"),
                    None => {
                        tracing::warn!("Invalidation feed closed");
                        return Ok(());
                    }
                },
            }
        }
    }
}

fn demo_status(n: u32) -> OrderStatus {
    match n % 5 {
        0 => OrderStatus::Pending,
        1 => OrderStatus::Confirmed,
        2 => OrderStatus::Shipped,
        3 => OrderStatus::Delivered,
        _ => OrderStatus::Cancelled,
    }
}

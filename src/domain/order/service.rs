use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use super::aggregate::Order;
use super::commands::{OrderCommand, PlaceOrder};
use super::errors::OrderError;
use super::events::OrderEvent;
use super::value_objects::{DeliveryAddress, OrderStatus};
use crate::domain::catalog::{CatalogError, CatalogService, Restaurant};
use crate::domain::pricing::{self, DiscountService, PricingError, PricingLine, Quote};
use crate::domain::tenant::TenantId;
use crate::event_sourcing::{load_aggregate, Aggregate, EventEnvelope, EventStore, EventStoreError};
use crate::metrics::Metrics;
use crate::storage::{DocumentStore, StoreError};

// ============================================================================
// Order Service
// ============================================================================
//
// Orchestrates: Command → Aggregate → Events → Event Store → Read Model
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum OrderServiceError {
    #[error("Order not found: {0}")]
    NotFound(Uuid),

    #[error("Order {0} cannot be changed by this caller in its current state")]
    Refused(Uuid),

    #[error("Restaurant {0} is not accepting orders")]
    RestaurantClosed(Uuid),

    #[error("Menu item {menu_item_id} is not on the menu of restaurant {restaurant_id}")]
    WrongRestaurant { menu_item_id: Uuid, restaurant_id: Uuid },

    #[error("{name} is currently unavailable")]
    Unavailable { name: String },

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Pricing(#[from] PricingError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    EventStore(#[from] EventStoreError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderLineRequest {
    pub menu_item_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub quantity: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuoteRequest {
    pub restaurant_id: Uuid,
    pub lines: Vec<OrderLineRequest>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaceOrderRequest {
    pub restaurant_id: Uuid,
    pub lines: Vec<OrderLineRequest>,
    pub delivery_address: DeliveryAddress,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderFilter {
    pub restaurant_id: Option<Uuid>,
    pub status: Option<OrderStatus>,
    pub customer_id: Option<Uuid>,
    /// `true` keeps orders still in progress, `false` only finished ones
    pub active: Option<bool>,
}

impl OrderFilter {
    fn matches(&self, order: &Order) -> bool {
        self.restaurant_id.map_or(true, |id| order.restaurant_id == id)
            && self.status.map_or(true, |status| order.status == status)
            && self.customer_id.map_or(true, |id| order.customer_id == id)
            && self.active.map_or(true, |active| order.status.is_terminal() != active)
    }
}

#[derive(Clone)]
pub struct OrderService {
    catalog: CatalogService,
    discounts: DiscountService,
    events: Arc<dyn EventStore<OrderEvent>>,
    orders: Arc<dyn DocumentStore<Order>>,
    metrics: Arc<Metrics>,
}

impl OrderService {
    pub fn new(
        catalog: CatalogService,
        discounts: DiscountService,
        events: Arc<dyn EventStore<OrderEvent>>,
        orders: Arc<dyn DocumentStore<Order>>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            catalog,
            discounts,
            events,
            orders,
            metrics,
        }
    }

    /// Resolve requested lines against the restaurant's current menu
    async fn resolve_lines(
        &self,
        tenant: TenantId,
        restaurant: &Restaurant,
        lines: &[OrderLineRequest],
    ) -> Result<Vec<PricingLine>, OrderServiceError> {
        let mut resolved = Vec::with_capacity(lines.len());

        for line in lines {
            let item = self.catalog.find_item(tenant, line.menu_item_id).await?;
            if item.restaurant_id != restaurant.id {
                return Err(OrderServiceError::WrongRestaurant {
                    menu_item_id: item.id,
                    restaurant_id: restaurant.id,
                });
            }
            if !item.is_available {
                return Err(OrderServiceError::Unavailable { name: item.name });
            }

            let (name, unit_price) = match line.variant_id {
                Some(variant_id) => {
                    let variant = item.variant(variant_id).ok_or(CatalogError::NotFound {
                        entity: "Variant",
                        id: variant_id,
                    })?;
                    let name = format!("{} ({})", item.name, variant.name);
                    if !variant.is_available {
                        return Err(OrderServiceError::Unavailable { name });
                    }
                    (name, variant.price)
                }
                None => (item.name.clone(), item.price),
            };

            resolved.push(PricingLine {
                menu_item_id: item.id,
                variant_id: line.variant_id,
                category_id: item.category_id,
                name,
                unit_price,
                quantity: line.quantity,
            });
        }

        Ok(resolved)
    }

    async fn price(
        &self,
        tenant: TenantId,
        restaurant_id: Uuid,
        lines: &[OrderLineRequest],
        now: DateTime<Utc>,
    ) -> Result<Quote, OrderServiceError> {
        if lines.is_empty() {
            return Err(PricingError::EmptyOrder.into());
        }

        let restaurant = self.catalog.get_restaurant(tenant, restaurant_id).await?;
        if !restaurant.is_active {
            return Err(OrderServiceError::RestaurantClosed(restaurant.id));
        }

        let lines = self.resolve_lines(tenant, &restaurant, lines).await?;
        let discounts = self.discounts.live(tenant, restaurant.id, now).await?;
        Ok(pricing::quote(&restaurant, &lines, &discounts, now)?)
    }

    /// Price an order without placing it
    pub async fn quote(&self, tenant: TenantId, request: &QuoteRequest) -> Result<Quote, OrderServiceError> {
        self.price(tenant, request.restaurant_id, &request.lines, Utc::now()).await
    }

    pub async fn place(
        &self,
        tenant: TenantId,
        customer_id: Uuid,
        request: PlaceOrderRequest,
        actor: Option<Uuid>,
    ) -> Result<Order, OrderServiceError> {
        let quote = self
            .price(tenant, request.restaurant_id, &request.lines, Utc::now())
            .await?;

        let command = PlaceOrder {
            order_id: Uuid::now_v7(),
            tenant_id: tenant,
            customer_id,
            quote,
            delivery_address: request.delivery_address,
            notes: request.notes.filter(|n| !n.trim().is_empty()),
        };
        if self.events.aggregate_exists(tenant, command.order_id).await? {
            return Err(OrderError::AlreadyPlaced.into());
        }
        let events = Order::place(&command)?;

        let correlation_id = Uuid::now_v7();
        let envelopes = self.envelopes(tenant, command.order_id, 0, events, correlation_id, actor);
        let order = Order::load_from_events(&envelopes)?;

        self.events
            .append_events(tenant, order.id, 0, envelopes)
            .await?;
        self.orders.insert(&order).await?;

        let scopes: Vec<&str> = order
            .lines
            .iter()
            .filter_map(|l| l.discount.as_ref().map(|d| d.scope.as_str()))
            .collect();
        self.metrics.record_order_placed(order.total.cents(), scopes);

        tracing::info!(
            order_id = %order.id,
            tenant_id = %tenant,
            restaurant_id = %order.restaurant_id,
            total = %order.total,
            "✅ Order placed"
        );
        Ok(order)
    }

    /// Run a lifecycle command against the stored stream of an order
    pub async fn transition(
        &self,
        tenant: TenantId,
        order_id: Uuid,
        command: OrderCommand,
        actor: Option<Uuid>,
    ) -> Result<Order, OrderServiceError> {
        self.transition_if(tenant, order_id, command, actor, |_| true).await
    }

    /// Like [`transition`](Self::transition), but only when `guard` accepts
    /// the order replayed from its stream. The append is made against the
    /// version the guard saw, so a concurrent change surfaces as a
    /// concurrency conflict instead of slipping past the guard.
    pub async fn transition_if<F>(
        &self,
        tenant: TenantId,
        order_id: Uuid,
        command: OrderCommand,
        actor: Option<Uuid>,
        guard: F,
    ) -> Result<Order, OrderServiceError>
    where
        F: FnOnce(&Order) -> bool + Send,
    {
        let mut order = load_aggregate::<Order, _>(self.events.as_ref(), tenant, order_id)
            .await?
            .ok_or(OrderServiceError::NotFound(order_id))?;
        if !guard(&order) {
            return Err(OrderServiceError::Refused(order_id));
        }

        let from = order.status;
        let expected_version = order.version();
        let events = order.handle_command(&command)?;

        let correlation_id = Uuid::now_v7();
        let envelopes = self.envelopes(tenant, order_id, expected_version, events, correlation_id, actor);
        for envelope in &envelopes {
            order.apply_event(&envelope.event_data)?;
        }

        self.events
            .append_events(tenant, order_id, expected_version, envelopes)
            .await?;
        self.refresh_read_model(&order).await?;

        self.metrics.record_order_transition(from.as_str(), order.status.as_str());
        tracing::info!(
            order_id = %order_id,
            tenant_id = %tenant,
            from = %from,
            to = %order.status,
            version = order.version,
            "Order status changed"
        );
        Ok(order)
    }

    fn envelopes(
        &self,
        tenant: TenantId,
        order_id: Uuid,
        expected_version: i64,
        events: Vec<OrderEvent>,
        correlation_id: Uuid,
        actor: Option<Uuid>,
    ) -> Vec<EventEnvelope<OrderEvent>> {
        events
            .into_iter()
            .zip(expected_version + 1..)
            .map(|(event, seq)| {
                let envelope = EventEnvelope::new(tenant, order_id, seq, event, correlation_id);
                match actor {
                    Some(user_id) => envelope.with_user(user_id),
                    None => envelope,
                }
            })
            .collect()
    }

    /// Concurrent transitions may finish out of order; an older state
    /// never replaces a newer one.
    async fn refresh_read_model(&self, order: &Order) -> Result<(), StoreError> {
        if !self.orders.save_versioned(order, order.version).await? {
            tracing::debug!(
                order_id = %order.id,
                version = order.version,
                "Read model already newer, skipping write"
            );
        }
        Ok(())
    }

    pub async fn get(&self, tenant: TenantId, order_id: Uuid) -> Result<Order, OrderServiceError> {
        self.orders
            .get(tenant, order_id)
            .await?
            .ok_or(OrderServiceError::NotFound(order_id))
    }

    /// Orders of the tenant matching `filter`, newest first
    pub async fn list(&self, tenant: TenantId, filter: &OrderFilter) -> Result<Vec<Order>, OrderServiceError> {
        let mut orders: Vec<Order> = self
            .orders
            .list(tenant)
            .await?
            .into_iter()
            .filter(|o| filter.matches(o))
            .collect();
        orders.sort_by(|a, b| b.placed_at.cmp(&a.placed_at).then_with(|| b.id.cmp(&a.id)));
        Ok(orders)
    }

    /// Every event of an order, in sequence order
    pub async fn history(
        &self,
        tenant: TenantId,
        order_id: Uuid,
    ) -> Result<Vec<EventEnvelope<OrderEvent>>, OrderServiceError> {
        let events = self.events.load_events(tenant, order_id).await?;
        if events.is_empty() {
            return Err(OrderServiceError::NotFound(order_id));
        }
        Ok(events)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::{MenuItemCreate, RestaurantCreate, SectionCreate, VariantCreate};
    use crate::domain::pricing::{DiscountCreate, DiscountKind, DiscountScope, Money};
    use crate::event_sourcing::MemoryEventStore;
    use crate::storage::{MemoryDocumentStore, Storage};
    use async_trait::async_trait;
    use std::time::Duration;

    struct Fixture {
        orders: OrderService,
        catalog: CatalogService,
        discounts: DiscountService,
        metrics: Arc<Metrics>,
        tenant: TenantId,
        restaurant_id: Uuid,
        burger_id: Uuid,
        fries_id: Uuid,
        large_fries_id: Uuid,
    }

    async fn fixture() -> Fixture {
        fixture_with(Storage::in_memory()).await
    }

    async fn fixture_with(storage: Storage) -> Fixture {
        let metrics = Arc::new(Metrics::new().unwrap());
        let catalog = CatalogService::new(
            storage.restaurants.clone(),
            storage.categories.clone(),
            storage.sections.clone(),
            storage.items.clone(),
            storage.discounts.clone(),
        );
        let discounts = DiscountService::new(storage.discounts.clone(), catalog.clone());
        let orders = OrderService::new(
            catalog.clone(),
            discounts.clone(),
            storage.order_events.clone(),
            storage.orders.clone(),
            metrics.clone(),
        );

        let tenant = TenantId::new();
        let restaurant = catalog
            .create_restaurant(
                tenant,
                RestaurantCreate {
                    name: "Burger Joint".to_string(),
                    description: None,
                    address: "5 Grill Rd".to_string(),
                    phone: None,
                    delivery_fee: Money::from_cents(250),
                    minimum_order: Money::from_cents(1000),
                },
            )
            .await
            .unwrap();
        let section = catalog
            .create_section(
                tenant,
                restaurant.id,
                SectionCreate {
                    name: "Mains".to_string(),
                    description: None,
                    sort_order: None,
                },
            )
            .await
            .unwrap();

        let item = |name: &str, cents: i64| MenuItemCreate {
            section_id: section.id,
            category_id: None,
            name: name.to_string(),
            description: None,
            price: Money::from_cents(cents),
            is_available: None,
        };
        let burger = catalog.create_item(tenant, restaurant.id, item("Burger", 900)).await.unwrap();
        let fries = catalog.create_item(tenant, restaurant.id, item("Fries", 300)).await.unwrap();
        let fries = catalog
            .add_variant(
                tenant,
                restaurant.id,
                fries.id,
                VariantCreate {
                    name: "Large".to_string(),
                    price: Money::from_cents(450),
                    is_available: None,
                },
            )
            .await
            .unwrap();

        Fixture {
            orders,
            catalog,
            discounts,
            metrics,
            tenant,
            restaurant_id: restaurant.id,
            burger_id: burger.id,
            fries_id: fries.id,
            large_fries_id: fries.variants[0].id,
        }
    }

    fn address() -> DeliveryAddress {
        DeliveryAddress {
            street: "1 Home Ave".to_string(),
            city: "Springfield".to_string(),
            postal_code: "12345".to_string(),
            instructions: Some("ring twice".to_string()),
        }
    }

    fn request(f: &Fixture, lines: Vec<OrderLineRequest>) -> PlaceOrderRequest {
        PlaceOrderRequest {
            restaurant_id: f.restaurant_id,
            lines,
            delivery_address: address(),
            notes: None,
        }
    }

    fn line(menu_item_id: Uuid, variant_id: Option<Uuid>, quantity: u32) -> OrderLineRequest {
        OrderLineRequest {
            menu_item_id,
            variant_id,
            quantity,
        }
    }

    #[tokio::test]
    async fn test_place_prices_with_variants_and_discounts() {
        let f = fixture().await;
        f.discounts
            .create(
                f.tenant,
                f.restaurant_id,
                DiscountCreate {
                    name: "Burger Tuesday".to_string(),
                    scope: DiscountScope::Item(f.burger_id),
                    kind: DiscountKind::FixedAmount {
                        amount: Money::from_cents(200),
                    },
                    starts_at: None,
                    ends_at: None,
                    is_active: None,
                },
            )
            .await
            .unwrap();

        let customer = Uuid::new_v4();
        let order = f
            .orders
            .place(
                f.tenant,
                customer,
                request(&f, vec![line(f.burger_id, None, 2), line(f.fries_id, Some(f.large_fries_id), 1)]),
                Some(customer),
            )
            .await
            .unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.version, 1);
        assert_eq!(order.subtotal, Money::from_cents(2250));
        assert_eq!(order.discount_total, Money::from_cents(400));
        assert_eq!(order.total, Money::from_cents(2100));
        assert_eq!(order.lines[1].name, "Fries (Large)");
        assert_eq!(order.lines[1].unit_price, Money::from_cents(450));

        assert_eq!(f.metrics.orders_placed_total.get(), 1);
        assert_eq!(f.orders.get(f.tenant, order.id).await.unwrap(), order);
    }

    #[tokio::test]
    async fn test_place_rejections() {
        let f = fixture().await;
        let customer = Uuid::new_v4();

        let err = f.orders.place(f.tenant, customer, request(&f, vec![]), None).await.unwrap_err();
        assert!(matches!(err, OrderServiceError::Pricing(PricingError::EmptyOrder)));

        let err = f
            .orders
            .place(f.tenant, customer, request(&f, vec![line(f.burger_id, None, 0)]), None)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderServiceError::Pricing(PricingError::InvalidQuantity { .. })));

        let err = f
            .orders
            .place(f.tenant, customer, request(&f, vec![line(f.fries_id, None, 1)]), None)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderServiceError::Pricing(PricingError::BelowMinimum { .. })));

        f.catalog
            .update_item(
                f.tenant,
                f.restaurant_id,
                f.burger_id,
                crate::domain::catalog::MenuItemUpdate {
                    is_available: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let err = f
            .orders
            .place(f.tenant, customer, request(&f, vec![line(f.burger_id, None, 2)]), None)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderServiceError::Unavailable { .. }));

        assert!(f.orders.list(f.tenant, &OrderFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_lines_must_belong_to_restaurant() {
        let f = fixture().await;
        let other = f
            .catalog
            .create_restaurant(
                f.tenant,
                RestaurantCreate {
                    name: "Elsewhere".to_string(),
                    description: None,
                    address: "9 Far Rd".to_string(),
                    phone: None,
                    delivery_fee: Money::ZERO,
                    minimum_order: Money::ZERO,
                },
            )
            .await
            .unwrap();

        let mut req = request(&f, vec![line(f.burger_id, None, 2)]);
        req.restaurant_id = other.id;
        let err = f.orders.place(f.tenant, Uuid::new_v4(), req, None).await.unwrap_err();
        assert!(matches!(err, OrderServiceError::WrongRestaurant { .. }));
    }

    #[tokio::test]
    async fn test_transitions_are_persisted_as_events() {
        let f = fixture().await;
        let order = f
            .orders
            .place(f.tenant, Uuid::new_v4(), request(&f, vec![line(f.burger_id, None, 2)]), None)
            .await
            .unwrap();

        let staff = Some(Uuid::new_v4());
        for command in [
            OrderCommand::Confirm { estimated_ready_minutes: Some(15) },
            OrderCommand::MarkReady,
            OrderCommand::Dispatch { courier: Some("Kim".to_string()) },
            OrderCommand::Deliver,
        ] {
            f.orders.transition(f.tenant, order.id, command, staff).await.unwrap();
        }

        let stored = f.orders.get(f.tenant, order.id).await.unwrap();
        assert_eq!(stored.status, OrderStatus::Delivered);
        assert_eq!(stored.version, 5);

        let history = f.orders.history(f.tenant, order.id).await.unwrap();
        let types: Vec<&str> = history.iter().map(|e| e.event_type.as_str()).collect();
        assert_eq!(
            types,
            vec!["OrderPlaced", "OrderConfirmed", "OrderReadyForPickup", "OrderOutForDelivery", "OrderDelivered"]
        );
        assert!(history.iter().skip(1).all(|e| e.user_id == staff));
    }

    #[tokio::test]
    async fn test_invalid_transition_leaves_order_untouched() {
        let f = fixture().await;
        let order = f
            .orders
            .place(f.tenant, Uuid::new_v4(), request(&f, vec![line(f.burger_id, None, 2)]), None)
            .await
            .unwrap();

        let err = f
            .orders
            .transition(f.tenant, order.id, OrderCommand::Deliver, None)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderServiceError::Order(OrderError::InvalidTransition { .. })));

        assert_eq!(f.orders.history(f.tenant, order.id).await.unwrap().len(), 1);
        assert_eq!(f.orders.get(f.tenant, order.id).await.unwrap().status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn test_list_filters() {
        let f = fixture().await;
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let first = f
            .orders
            .place(f.tenant, alice, request(&f, vec![line(f.burger_id, None, 2)]), None)
            .await
            .unwrap();
        f.orders
            .place(f.tenant, bob, request(&f, vec![line(f.burger_id, None, 3)]), None)
            .await
            .unwrap();
        f.orders
            .transition(f.tenant, first.id, OrderCommand::Confirm { estimated_ready_minutes: None }, None)
            .await
            .unwrap();

        let all = f.orders.list(f.tenant, &OrderFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);

        let alices = OrderFilter {
            customer_id: Some(alice),
            ..Default::default()
        };
        assert_eq!(f.orders.list(f.tenant, &alices).await.unwrap().len(), 1);

        let confirmed = OrderFilter {
            status: Some(OrderStatus::Confirmed),
            ..Default::default()
        };
        let found = f.orders.list(f.tenant, &confirmed).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, first.id);

        f.orders
            .transition(
                f.tenant,
                first.id,
                OrderCommand::Cancel { reason: None, canceled_by: None },
                None,
            )
            .await
            .unwrap();
        let open = OrderFilter {
            active: Some(true),
            ..Default::default()
        };
        let finished = OrderFilter {
            active: Some(false),
            ..Default::default()
        };
        assert_eq!(f.orders.list(f.tenant, &open).await.unwrap().len(), 1);
        assert_eq!(f.orders.list(f.tenant, &finished).await.unwrap()[0].id, first.id);
    }

    #[tokio::test]
    async fn test_orders_are_tenant_scoped() {
        let f = fixture().await;
        let order = f
            .orders
            .place(f.tenant, Uuid::new_v4(), request(&f, vec![line(f.burger_id, None, 2)]), None)
            .await
            .unwrap();

        let stranger = TenantId::new();
        assert!(matches!(
            f.orders.get(stranger, order.id).await.unwrap_err(),
            OrderServiceError::NotFound(_)
        ));
        assert!(matches!(
            f.orders
                .transition(stranger, order.id, OrderCommand::MarkReady, None)
                .await
                .unwrap_err(),
            OrderServiceError::NotFound(_)
        ));
        assert!(f.orders.history(stranger, order.id).await.is_err());
    }

    /// Order read model whose writes of confirmed orders stall for a while.
    struct SlowConfirmedWrites(MemoryDocumentStore<Order>);

    #[async_trait]
    impl DocumentStore<Order> for SlowConfirmedWrites {
        async fn insert(&self, doc: &Order) -> Result<(), StoreError> {
            self.0.insert(doc).await
        }

        async fn get(&self, tenant: TenantId, id: Uuid) -> Result<Option<Order>, StoreError> {
            self.0.get(tenant, id).await
        }

        async fn list(&self, tenant: TenantId) -> Result<Vec<Order>, StoreError> {
            self.0.list(tenant).await
        }

        async fn update(&self, doc: &Order) -> Result<(), StoreError> {
            self.0.update(doc).await
        }

        async fn delete(&self, tenant: TenantId, id: Uuid) -> Result<(), StoreError> {
            self.0.delete(tenant, id).await
        }

        async fn save_versioned(&self, doc: &Order, version: i64) -> Result<bool, StoreError> {
            if doc.status == OrderStatus::Confirmed {
                tokio::time::sleep(Duration::from_millis(200)).await;
            }
            self.0.save_versioned(doc, version).await
        }

        async fn find_by_field(&self, tenant: TenantId, field: &str, value: &str) -> Result<Vec<Order>, StoreError> {
            self.0.find_by_field(tenant, field, value).await
        }

        async fn list_all(&self) -> Result<Vec<Order>, StoreError> {
            self.0.list_all().await
        }

        async fn find_any_by_field(&self, field: &str, value: &str) -> Result<Vec<Order>, StoreError> {
            self.0.find_any_by_field(field, value).await
        }
    }

    /// Event store that pauses after every load, so concurrent commands
    /// all replay the same version before any of them appends.
    struct SlowLoads(MemoryEventStore<OrderEvent>);

    #[async_trait]
    impl EventStore<OrderEvent> for SlowLoads {
        async fn append_events(
            &self,
            tenant: TenantId,
            aggregate_id: Uuid,
            expected_version: i64,
            events: Vec<EventEnvelope<OrderEvent>>,
        ) -> Result<i64, EventStoreError> {
            self.0.append_events(tenant, aggregate_id, expected_version, events).await
        }

        async fn load_events(
            &self,
            tenant: TenantId,
            aggregate_id: Uuid,
        ) -> Result<Vec<EventEnvelope<OrderEvent>>, EventStoreError> {
            let events = self.0.load_events(tenant, aggregate_id).await?;
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(events)
        }

        async fn current_version(&self, tenant: TenantId, aggregate_id: Uuid) -> Result<i64, EventStoreError> {
            self.0.current_version(tenant, aggregate_id).await
        }
    }

    #[tokio::test]
    async fn test_read_model_keeps_newest_state_when_writes_finish_out_of_order() {
        let mut storage = Storage::in_memory();
        storage.orders = Arc::new(SlowConfirmedWrites(MemoryDocumentStore::new()));
        let f = fixture_with(storage).await;
        let order = f
            .orders
            .place(f.tenant, Uuid::new_v4(), request(&f, vec![line(f.burger_id, None, 2)]), None)
            .await
            .unwrap();

        let confirm = f.orders.transition(
            f.tenant,
            order.id,
            OrderCommand::Confirm { estimated_ready_minutes: None },
            None,
        );
        let mark_ready = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            f.orders.transition(f.tenant, order.id, OrderCommand::MarkReady, None).await
        };
        let (confirmed, ready) = tokio::join!(confirm, mark_ready);
        assert_eq!(confirmed.unwrap().status, OrderStatus::Confirmed);
        assert_eq!(ready.unwrap().status, OrderStatus::ReadyForPickup);

        let stored = f.orders.get(f.tenant, order.id).await.unwrap();
        assert_eq!(stored.status, OrderStatus::ReadyForPickup);
        assert_eq!(stored.version, 3);
        assert_eq!(f.orders.history(f.tenant, order.id).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_concurrent_transitions_conflict() {
        let mut storage = Storage::in_memory();
        storage.order_events = Arc::new(SlowLoads(MemoryEventStore::new()));
        let f = fixture_with(storage).await;
        let order = f
            .orders
            .place(f.tenant, Uuid::new_v4(), request(&f, vec![line(f.burger_id, None, 2)]), None)
            .await
            .unwrap();

        let (confirmed, canceled) = tokio::join!(
            f.orders.transition(
                f.tenant,
                order.id,
                OrderCommand::Confirm { estimated_ready_minutes: None },
                None,
            ),
            f.orders.transition(
                f.tenant,
                order.id,
                OrderCommand::Cancel { reason: None, canceled_by: None },
                None,
            ),
        );

        assert_eq!(confirmed.unwrap().status, OrderStatus::Confirmed);
        assert!(matches!(
            canceled.unwrap_err(),
            OrderServiceError::EventStore(EventStoreError::ConcurrencyConflict {
                expected: 1,
                actual: 2,
                ..
            })
        ));

        let stored = f.orders.get(f.tenant, order.id).await.unwrap();
        assert_eq!(stored.status, OrderStatus::Confirmed);
        assert_eq!(f.orders.history(f.tenant, order.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_guarded_transition_checks_the_stream() {
        let f = fixture().await;
        let customer = Uuid::new_v4();
        let order = f
            .orders
            .place(f.tenant, customer, request(&f, vec![line(f.burger_id, None, 2)]), None)
            .await
            .unwrap();
        let pending_and_own = |o: &Order| o.status == OrderStatus::Pending && o.customer_id == customer;
        let cancel = || OrderCommand::Cancel {
            reason: None,
            canceled_by: Some(customer),
        };

        f.orders
            .transition(f.tenant, order.id, OrderCommand::Confirm { estimated_ready_minutes: None }, None)
            .await
            .unwrap();
        let err = f
            .orders
            .transition_if(f.tenant, order.id, cancel(), Some(customer), pending_and_own)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderServiceError::Refused(id) if id == order.id));
        assert_eq!(f.orders.history(f.tenant, order.id).await.unwrap().len(), 2);
        assert_eq!(f.orders.get(f.tenant, order.id).await.unwrap().status, OrderStatus::Confirmed);

        let other = f
            .orders
            .place(f.tenant, customer, request(&f, vec![line(f.burger_id, None, 2)]), None)
            .await
            .unwrap();
        let canceled = f
            .orders
            .transition_if(f.tenant, other.id, cancel(), Some(customer), pending_and_own)
            .await
            .unwrap();
        assert_eq!(canceled.status, OrderStatus::Canceled);
        assert_eq!(canceled.canceled_by, Some(customer));
    }

    #[tokio::test]
    async fn test_quote_does_not_persist() {
        let f = fixture().await;
        let quote = f
            .orders
            .quote(
                f.tenant,
                &QuoteRequest {
                    restaurant_id: f.restaurant_id,
                    lines: vec![line(f.burger_id, None, 2)],
                },
            )
            .await
            .unwrap();
        assert_eq!(quote.total, Money::from_cents(2050));
        assert!(f.orders.list(f.tenant, &OrderFilter::default()).await.unwrap().is_empty());
    }
}

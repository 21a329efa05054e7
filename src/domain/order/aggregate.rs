use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::commands::{OrderCommand, PlaceOrder};
use super::errors::OrderError;
use super::events::*;
use super::value_objects::{DeliveryAddress, OrderLine, OrderStatus};
use crate::domain::pricing::Money;
use crate::domain::tenant::TenantId;
use crate::event_sourcing::core::Aggregate;
use crate::storage::Document;

// ============================================================================
// Order Aggregate - Domain Logic
// ============================================================================
//
// State is only ever changed by applying events. The same struct is stored
// as the order read model after each successful command.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    // Identity
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub version: i64,

    // Current State (derived from events)
    pub restaurant_id: Uuid,
    pub customer_id: Uuid,
    pub status: OrderStatus,
    pub lines: Vec<OrderLine>,
    pub delivery_address: DeliveryAddress,
    pub notes: Option<String>,

    // Pricing frozen at placement
    pub subtotal: Money,
    pub discount_total: Money,
    pub delivery_fee: Money,
    pub total: Money,

    // Lifecycle timestamps
    pub placed_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub estimated_ready_at: Option<DateTime<Utc>>,
    pub ready_at: Option<DateTime<Utc>>,
    pub dispatched_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub canceled_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,

    // Optional fields
    pub courier: Option<String>,
    pub cancel_reason: Option<String>,
    pub canceled_by: Option<Uuid>,
    pub failure_reason: Option<String>,
}

impl Order {
    /// Validate a placement and produce the first event of a new stream
    pub fn place(command: &PlaceOrder) -> Result<Vec<OrderEvent>, OrderError> {
        let quote = &command.quote;
        if quote.lines.is_empty() {
            return Err(OrderError::EmptyItems);
        }
        if let Some(line) = quote.lines.iter().find(|l| l.quantity == 0) {
            return Err(OrderError::InvalidQuantity {
                menu_item_id: line.menu_item_id,
            });
        }
        if !command.delivery_address.is_complete() {
            return Err(OrderError::IncompleteAddress);
        }

        Ok(vec![OrderEvent::Placed(OrderPlaced {
            order_id: command.order_id,
            tenant_id: command.tenant_id,
            restaurant_id: quote.restaurant_id,
            customer_id: command.customer_id,
            lines: quote.lines.clone(),
            delivery_address: command.delivery_address.clone(),
            notes: command.notes.clone(),
            subtotal: quote.subtotal,
            discount_total: quote.discount_total,
            delivery_fee: quote.delivery_fee,
            total: quote.total,
            placed_at: Utc::now(),
        })])
    }

    /// Guard a move into `to`
    fn ensure_transition(&self, to: OrderStatus) -> Result<(), OrderError> {
        if self.status == to {
            return Err(OrderError::AlreadyInStatus(to));
        }
        if !self.status.can_transition_to(to) {
            return Err(OrderError::InvalidTransition { from: self.status, to });
        }
        Ok(())
    }
}

impl Document for Order {
    const COLLECTION: &'static str = "orders";

    fn id(&self) -> Uuid {
        self.id
    }

    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

// ============================================================================
// Aggregate Trait Implementation
// ============================================================================

impl Aggregate for Order {
    type Event = OrderEvent;
    type Command = OrderCommand;
    type Error = OrderError;

    fn apply_first_event(event: &Self::Event) -> Result<Self, Self::Error> {
        match event {
            OrderEvent::Placed(e) => Ok(Self {
                id: e.order_id,
                tenant_id: e.tenant_id,
                version: 1,
                restaurant_id: e.restaurant_id,
                customer_id: e.customer_id,
                status: OrderStatus::Pending,
                lines: e.lines.clone(),
                delivery_address: e.delivery_address.clone(),
                notes: e.notes.clone(),
                subtotal: e.subtotal,
                discount_total: e.discount_total,
                delivery_fee: e.delivery_fee,
                total: e.total,
                placed_at: e.placed_at,
                confirmed_at: None,
                estimated_ready_at: None,
                ready_at: None,
                dispatched_at: None,
                delivered_at: None,
                canceled_at: None,
                failed_at: None,
                updated_at: e.placed_at,
                courier: None,
                cancel_reason: None,
                canceled_by: None,
                failure_reason: None,
            }),
            _ => Err(OrderError::NotInitialized),
        }
    }

    fn apply_event(&mut self, event: &Self::Event) -> Result<(), Self::Error> {
        if matches!(event, OrderEvent::Placed(_)) {
            return Err(OrderError::AlreadyPlaced);
        }
        self.ensure_transition(event.status())?;

        match event {
            OrderEvent::Placed(_) => {}
            OrderEvent::Confirmed(e) => {
                self.confirmed_at = Some(e.confirmed_at);
                self.estimated_ready_at = e.estimated_ready_at;
                self.updated_at = e.confirmed_at;
            }
            OrderEvent::ReadyForPickup(e) => {
                self.ready_at = Some(e.ready_at);
                self.updated_at = e.ready_at;
            }
            OrderEvent::OutForDelivery(e) => {
                self.courier = e.courier.clone();
                self.dispatched_at = Some(e.dispatched_at);
                self.updated_at = e.dispatched_at;
            }
            OrderEvent::Delivered(e) => {
                self.delivered_at = Some(e.delivered_at);
                self.updated_at = e.delivered_at;
            }
            OrderEvent::Canceled(e) => {
                self.cancel_reason = e.reason.clone();
                self.canceled_by = e.canceled_by;
                self.canceled_at = Some(e.canceled_at);
                self.updated_at = e.canceled_at;
            }
            OrderEvent::Failed(e) => {
                self.failure_reason = Some(e.reason.clone());
                self.failed_at = Some(e.failed_at);
                self.updated_at = e.failed_at;
            }
        }

        self.status = event.status();
        self.version += 1;
        Ok(())
    }

    fn handle_command(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        let now = Utc::now();
        let event = match command {
            OrderCommand::PlaceOrder(_) => return Err(OrderError::AlreadyPlaced),
            OrderCommand::Confirm { estimated_ready_minutes } => OrderEvent::Confirmed(OrderConfirmed {
                confirmed_at: now,
                estimated_ready_at: estimated_ready_minutes.map(|m| now + Duration::minutes(i64::from(m))),
            }),
            OrderCommand::MarkReady => OrderEvent::ReadyForPickup(OrderReadyForPickup { ready_at: now }),
            OrderCommand::Dispatch { courier } => OrderEvent::OutForDelivery(OrderOutForDelivery {
                courier: courier.clone(),
                dispatched_at: now,
            }),
            OrderCommand::Deliver => OrderEvent::Delivered(OrderDelivered { delivered_at: now }),
            OrderCommand::Cancel { reason, canceled_by } => OrderEvent::Canceled(OrderCanceled {
                reason: reason.clone(),
                canceled_by: *canceled_by,
                canceled_at: now,
            }),
            OrderCommand::Fail { reason } => OrderEvent::Failed(OrderFailed {
                reason: reason.trim().to_string(),
                failed_at: now,
            }),
        };

        self.ensure_transition(event.status())?;
        if let OrderEvent::Failed(failed) = &event {
            if failed.reason.is_empty() {
                return Err(OrderError::MissingFailureReason);
            }
        }

        Ok(vec![event])
    }

    fn aggregate_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn empty_history() -> Self::Error {
        OrderError::NotInitialized
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::pricing::{PricedLine, Quote};
    use crate::event_sourcing::core::EventEnvelope;

    fn placement() -> PlaceOrder {
        let line = PricedLine {
            menu_item_id: Uuid::new_v4(),
            variant_id: None,
            name: "Ramen".to_string(),
            quantity: 2,
            unit_price: Money::from_cents(1200),
            discount: None,
            line_total: Money::from_cents(2400),
        };
        PlaceOrder {
            order_id: Uuid::new_v4(),
            tenant_id: TenantId::new(),
            customer_id: Uuid::new_v4(),
            quote: Quote {
                restaurant_id: Uuid::new_v4(),
                lines: vec![line],
                subtotal: Money::from_cents(2400),
                discount_total: Money::ZERO,
                delivery_fee: Money::from_cents(300),
                total: Money::from_cents(2700),
            },
            delivery_address: DeliveryAddress {
                street: "10 Elm St".to_string(),
                city: "Springfield".to_string(),
                postal_code: "12345".to_string(),
                instructions: None,
            },
            notes: None,
        }
    }

    fn placed_order() -> Order {
        let events = Order::place(&placement()).unwrap();
        Order::apply_first_event(&events[0]).unwrap()
    }

    fn run(order: &mut Order, command: OrderCommand) -> Result<(), OrderError> {
        for event in order.handle_command(&command)? {
            order.apply_event(&event)?;
        }
        Ok(())
    }

    fn cancel() -> OrderCommand {
        OrderCommand::Cancel {
            reason: Some("changed my mind".to_string()),
            canceled_by: None,
        }
    }

    fn fail() -> OrderCommand {
        OrderCommand::Fail {
            reason: "kitchen fire".to_string(),
        }
    }

    #[test]
    fn test_place_order() {
        let order = placed_order();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.version, 1);
        assert_eq!(order.total, Money::from_cents(2700));
    }

    #[test]
    fn test_place_rejects_bad_input() {
        let mut empty = placement();
        empty.quote.lines.clear();
        assert_eq!(Order::place(&empty).unwrap_err(), OrderError::EmptyItems);

        let mut zero = placement();
        zero.quote.lines[0].quantity = 0;
        assert!(matches!(Order::place(&zero).unwrap_err(), OrderError::InvalidQuantity { .. }));

        let mut nowhere = placement();
        nowhere.delivery_address.street = " ".to_string();
        assert_eq!(Order::place(&nowhere).unwrap_err(), OrderError::IncompleteAddress);
    }

    #[test]
    fn test_full_lifecycle() {
        let mut order = placed_order();

        run(&mut order, OrderCommand::Confirm { estimated_ready_minutes: Some(20) }).unwrap();
        assert_eq!(order.status, OrderStatus::Confirmed);
        assert!(order.estimated_ready_at.is_some());

        run(&mut order, OrderCommand::MarkReady).unwrap();
        run(&mut order, OrderCommand::Dispatch { courier: Some("Sam".to_string()) }).unwrap();
        assert_eq!(order.courier.as_deref(), Some("Sam"));

        run(&mut order, OrderCommand::Deliver).unwrap();
        assert_eq!(order.status, OrderStatus::Delivered);
        assert_eq!(order.version, 5);
        assert!(order.delivered_at.is_some());
    }

    #[test]
    fn test_cannot_skip_states() {
        let mut order = placed_order();
        assert_eq!(
            run(&mut order, OrderCommand::Deliver).unwrap_err(),
            OrderError::InvalidTransition {
                from: OrderStatus::Pending,
                to: OrderStatus::Delivered
            }
        );
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.version, 1);
    }

    #[test]
    fn test_repeat_transition_names_state() {
        let mut order = placed_order();
        run(&mut order, OrderCommand::Confirm { estimated_ready_minutes: None }).unwrap();
        assert_eq!(
            run(&mut order, OrderCommand::Confirm { estimated_ready_minutes: None }).unwrap_err(),
            OrderError::AlreadyInStatus(OrderStatus::Confirmed)
        );
    }

    #[test]
    fn test_cancel_windows() {
        let mut pending = placed_order();
        run(&mut pending, cancel()).unwrap();
        assert_eq!(pending.status, OrderStatus::Canceled);
        assert_eq!(pending.cancel_reason.as_deref(), Some("changed my mind"));

        let mut ready = placed_order();
        run(&mut ready, OrderCommand::Confirm { estimated_ready_minutes: None }).unwrap();
        run(&mut ready, OrderCommand::MarkReady).unwrap();
        run(&mut ready, cancel()).unwrap();

        let mut dispatched = placed_order();
        run(&mut dispatched, OrderCommand::Confirm { estimated_ready_minutes: None }).unwrap();
        run(&mut dispatched, OrderCommand::MarkReady).unwrap();
        run(&mut dispatched, OrderCommand::Dispatch { courier: None }).unwrap();
        assert!(matches!(
            run(&mut dispatched, cancel()).unwrap_err(),
            OrderError::InvalidTransition { to: OrderStatus::Canceled, .. }
        ));
    }

    #[test]
    fn test_fail_windows() {
        let mut pending = placed_order();
        assert!(matches!(
            run(&mut pending, fail()).unwrap_err(),
            OrderError::InvalidTransition { from: OrderStatus::Pending, .. }
        ));

        let mut dispatched = placed_order();
        run(&mut dispatched, OrderCommand::Confirm { estimated_ready_minutes: None }).unwrap();
        run(&mut dispatched, OrderCommand::MarkReady).unwrap();
        run(&mut dispatched, OrderCommand::Dispatch { courier: None }).unwrap();
        run(&mut dispatched, fail()).unwrap();
        assert_eq!(dispatched.status, OrderStatus::Failed);
        assert_eq!(dispatched.failure_reason.as_deref(), Some("kitchen fire"));

        let mut confirmed = placed_order();
        run(&mut confirmed, OrderCommand::Confirm { estimated_ready_minutes: None }).unwrap();
        assert_eq!(
            run(&mut confirmed, OrderCommand::Fail { reason: "  ".to_string() }).unwrap_err(),
            OrderError::MissingFailureReason
        );
    }

    #[test]
    fn test_terminal_states_reject_everything() {
        let mut order = placed_order();
        run(&mut order, cancel()).unwrap();

        for command in [
            OrderCommand::Confirm { estimated_ready_minutes: None },
            OrderCommand::MarkReady,
            OrderCommand::Dispatch { courier: None },
            OrderCommand::Deliver,
            fail(),
        ] {
            assert!(matches!(
                order.handle_command(&command).unwrap_err(),
                OrderError::InvalidTransition { from: OrderStatus::Canceled, .. }
            ));
        }
        assert_eq!(order.handle_command(&cancel()).unwrap_err(), OrderError::AlreadyInStatus(OrderStatus::Canceled));
    }

    #[test]
    fn test_place_on_existing_order_is_rejected() {
        let order = placed_order();
        assert_eq!(
            order.handle_command(&OrderCommand::PlaceOrder(placement())).unwrap_err(),
            OrderError::AlreadyPlaced
        );
    }

    #[test]
    fn test_replay_matches_live_state() {
        let placement = placement();
        let first = Order::place(&placement).unwrap().remove(0);
        let mut live = Order::apply_first_event(&first).unwrap();
        let mut envelopes = vec![EventEnvelope::new(
            placement.tenant_id,
            placement.order_id,
            1,
            first,
            Uuid::new_v4(),
        )];

        for command in [OrderCommand::Confirm { estimated_ready_minutes: Some(5) }, OrderCommand::MarkReady] {
            for event in live.handle_command(&command).unwrap() {
                live.apply_event(&event).unwrap();
                envelopes.push(EventEnvelope::new(
                    placement.tenant_id,
                    placement.order_id,
                    live.version,
                    event,
                    Uuid::new_v4(),
                ));
            }
        }

        let replayed = Order::load_from_events(&envelopes).unwrap();
        assert_eq!(replayed.status, OrderStatus::ReadyForPickup);
        assert_eq!(replayed.version, live.version);
        assert_eq!(replayed.ready_at, live.ready_at);
    }

    #[test]
    fn test_replay_rejects_bad_history() {
        assert_eq!(Order::load_from_events(&[]).unwrap_err(), OrderError::NotInitialized);

        let mut order = placed_order();
        let skip = OrderEvent::Delivered(OrderDelivered { delivered_at: Utc::now() });
        assert!(order.apply_event(&skip).is_err());
    }
}

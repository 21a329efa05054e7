use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::value_objects::DeliveryAddress;
use crate::domain::pricing::Quote;
use crate::domain::tenant::TenantId;

// ============================================================================
// Order Commands - Intentions to change Order state
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceOrder {
    pub order_id: Uuid,
    pub tenant_id: TenantId,
    pub customer_id: Uuid,
    pub quote: Quote,
    pub delivery_address: DeliveryAddress,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum OrderCommand {
    PlaceOrder(PlaceOrder),
    Confirm {
        estimated_ready_minutes: Option<u32>,
    },
    MarkReady,
    Dispatch {
        courier: Option<String>,
    },
    Deliver,
    Cancel {
        reason: Option<String>,
        canceled_by: Option<Uuid>,
    },
    Fail {
        reason: String,
    },
}

//! Data models for the Price Estimator.
//!
//! The `models` module defines the canonical, strictly typed shapes
//! the estimator works on: the service catalog snapshot, the
//! customer's in-progress booking intent, and the resulting price
//! breakdown.  Loosely typed payloads coming from widgets or the
//! backend are normalised into these types by [`crate::adapter`]
//! before they reach the engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a tier, add-on or service.
///
/// The backend emits integer ids while locally created records carry
/// string ids.  Comparison is strict: `1` and `"1"` never match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    Int(i64),
    Str(String),
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Int(id) => write!(f, "{}", id),
            EntityId::Str(id) => f.write_str(id),
        }
    }
}

impl From<i64> for EntityId {
    fn from(id: i64) -> Self {
        EntityId::Int(id)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        EntityId::Str(id.to_string())
    }
}

/// The tier reference carried by a ticket selection.
///
/// Dropdown widgets hand back `{ "value": id }` objects while plain
/// inputs send the id itself.  Both shapes are kept so that line items
/// echo the reference exactly as it was selected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TierRef {
    Plain(EntityId),
    Wrapped { value: EntityId },
}

impl TierRef {
    /// The id to try first when resolving a tier.
    pub fn primary(&self) -> Option<&EntityId> {
        match self {
            TierRef::Plain(id) => Some(id),
            TierRef::Wrapped { .. } => None,
        }
    }

    /// The nested `value` id, tried when the primary lookup misses.
    pub fn nested(&self) -> Option<&EntityId> {
        match self {
            TierRef::Plain(_) => None,
            TierRef::Wrapped { value } => Some(value),
        }
    }
}

impl From<EntityId> for TierRef {
    fn from(id: EntityId) -> Self {
        TierRef::Plain(id)
    }
}

/// A purchasable ticket category.
///
/// `price` is already adjusted by the backend (date or demand based
/// pricing) by the time it reaches the estimator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketTier {
    pub id: EntityId,
    pub name: String,
    pub price: f64,
    pub min_quantity: Option<u32>,
    pub max_quantity: Option<u32>,
}

/// A supplementary purchasable item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddOn {
    pub id: EntityId,
    pub base_price: f64,
    /// Bundled add-ons are already paid for by the ticket and never
    /// contribute to the add-on total.
    pub is_included_in_ticket: bool,
}

/// How a coupon reduces the price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    Percentage,
    Fixed,
    /// Buy-one-get-one.  Only the backend evaluates these.
    Bogo,
    #[serde(other)]
    Unsupported,
}

/// A coupon definition.  `code` is matched exactly and case-sensitively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coupon {
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: f64,
    /// Cap for percentage coupons.  Zero means uncapped.
    pub max_discount_amount: f64,
}

/// Read-only snapshot of everything priceable for one service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceCatalog {
    pub ticket_tiers: Vec<TicketTier>,
    pub add_ons: Vec<AddOn>,
    pub coupons: Vec<Coupon>,
}

impl ServiceCatalog {
    /// Resolve a tier reference: the plain id first, then the nested
    /// `value` id.
    pub fn find_tier(&self, tier_ref: &TierRef) -> Option<&TicketTier> {
        let by_id = |id: &EntityId| self.ticket_tiers.iter().find(|t| &t.id == id);
        tier_ref
            .primary()
            .and_then(by_id)
            .or_else(|| tier_ref.nested().and_then(by_id))
    }

    pub fn find_add_on(&self, id: &EntityId) -> Option<&AddOn> {
        self.add_ons.iter().find(|a| &a.id == id)
    }

    pub fn find_coupon(&self, code: &str) -> Option<&Coupon> {
        self.coupons.iter().find(|c| c.code == code)
    }
}

/// Quantity of one tier chosen by the customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketSelection {
    pub tier_id: TierRef,
    pub quantity: f64,
}

/// Quantity of one add-on chosen by the customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddOnSelection {
    pub add_on_id: EntityId,
    pub quantity: f64,
}

/// The in-progress customer selection prior to payment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookingIntent {
    pub tickets: Vec<TicketSelection>,
    pub add_ons: Vec<AddOnSelection>,
    /// The code typed by the customer, if any.
    pub coupon_code: Option<String>,
}

/// One priced ticket selection.  Selections of the same tier are not
/// merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub ticket_tier_id: TierRef,
    pub name: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub subtotal: f64,
}

/// A named reduction of the ticket subtotal, such as `Coupon: SUMMER`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discount {
    pub name: String,
    pub amount: f64,
}

/// Client-side price estimate.
///
/// The four aggregate fields are rounded to 2 decimal places; line
/// items and discounts keep their computed precision.  This output is
/// provisional and is always superseded by the backend's calculation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub base_subtotal: f64,
    pub adjusted_subtotal: f64,
    pub add_ons_total: f64,
    pub final_total: f64,
    pub line_items: Vec<LineItem>,
    pub discounts: Vec<Discount>,
}

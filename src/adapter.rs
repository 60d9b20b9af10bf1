//! Boundary normalisation.
//!
//! Widgets and the backend disagree on key casing and on how values
//! are typed (prices arrive as `"19.99"` strings, tier ids sometimes
//! as `{ "value": id }` objects).  The raw structs here accept all of
//! those shapes and are converted into the canonical models once, so
//! the engine only ever sees strict types.
//!
//! Only a payload that is not an object at all is rejected.  `null` or
//! mistyped fields fall back to their defaults, list entries that are
//! unusable are dropped, and selections whose id cannot be read are
//! treated like selections of an unknown tier or add-on.

use crate::coerce::{is_truthy, safe_parse_f64, safe_parse_opt};
use crate::models::{
    AddOn, AddOnSelection, BookingIntent, Coupon, DiscountType, EntityId, ServiceCatalog,
    TicketSelection, TicketTier, TierRef,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Read a field as `T`, defaulting on `null` or a mistyped value.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Read a list, keeping the entries that deserialize as `T`.
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(lenient_opt_list(deserializer)?.unwrap_or_default())
}

/// Like [`lenient_list`], but anything other than an array is `None`.
fn lenient_opt_list<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => Some(
            items
                .into_iter()
                .filter_map(|item| serde_json::from_value(item).ok())
                .collect(),
        ),
        _ => None,
    })
}

/// Intent payload as sent by the booking widget.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawIntent {
    #[serde(deserialize_with = "lenient_list")]
    pub tickets: Vec<RawTicketSelection>,
    #[serde(rename = "addOns", alias = "add_ons", deserialize_with = "lenient_list")]
    pub add_ons: Vec<RawAddOnSelection>,
    #[serde(
        rename = "couponCodeInput",
        alias = "coupon_code",
        alias = "couponCode",
        deserialize_with = "lenient"
    )]
    pub coupon_code_input: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawTicketSelection {
    #[serde(deserialize_with = "lenient")]
    pub tier_id: Option<TierRef>,
    pub quantity: Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawAddOnSelection {
    #[serde(deserialize_with = "lenient")]
    pub add_on_id: Option<EntityId>,
    pub quantity: Value,
}

/// Service payload as served by the booking session endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawService {
    #[serde(deserialize_with = "lenient_opt_list")]
    pub ticket_tiers: Option<Vec<RawTicketTier>>,
    #[serde(rename = "ticketTiers", deserialize_with = "lenient_opt_list")]
    pub ticket_tiers_camel: Option<Vec<RawTicketTier>>,
    #[serde(alias = "add_ons", alias = "addOns", deserialize_with = "lenient_list")]
    pub addons: Vec<RawAddOn>,
    #[serde(deserialize_with = "lenient_list")]
    pub coupons: Vec<RawCoupon>,
}

/// A tier without a readable `id` is dropped from the list.
#[derive(Debug, Clone, Deserialize)]
pub struct RawTicketTier {
    pub id: EntityId,
    #[serde(default, deserialize_with = "lenient")]
    pub name: String,
    #[serde(default)]
    pub price: Value,
    #[serde(default)]
    pub base_price: Value,
    #[serde(default)]
    pub min_quantity: Value,
    #[serde(default)]
    pub max_quantity: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawAddOn {
    pub id: EntityId,
    #[serde(default)]
    pub base_price: Value,
    #[serde(default)]
    pub is_included_in_ticket: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawCoupon {
    #[serde(default, deserialize_with = "lenient")]
    pub code: String,
    #[serde(default)]
    pub discount_type: Value,
    #[serde(default)]
    pub discount_value: Value,
    #[serde(default)]
    pub max_discount_amount: Option<Value>,
    /// The backend nests the percentage cap here.
    #[serde(default)]
    pub effects: Option<Value>,
}

/// Unknown, missing or mistyped mechanisms are not estimated.
fn discount_type(value: Value) -> DiscountType {
    serde_json::from_value(value).unwrap_or(DiscountType::Unsupported)
}

fn quantity_bound(value: &Value) -> Option<u32> {
    if value.is_null() {
        return None;
    }
    let bound = safe_parse_f64(value);
    (bound >= 0.0).then(|| bound.min(u32::MAX as f64) as u32)
}

impl RawTicketSelection {
    /// `None` when the tier reference is unusable; such a selection can
    /// never match a tier.
    pub fn normalize(self) -> Option<TicketSelection> {
        let Some(tier_id) = self.tier_id else {
            debug!("dropping ticket selection without a usable tier id");
            return None;
        };
        Some(TicketSelection {
            tier_id,
            quantity: safe_parse_f64(&self.quantity),
        })
    }
}

impl RawAddOnSelection {
    pub fn normalize(self) -> Option<AddOnSelection> {
        let Some(add_on_id) = self.add_on_id else {
            debug!("dropping add-on selection without a usable add-on id");
            return None;
        };
        Some(AddOnSelection {
            add_on_id,
            quantity: safe_parse_f64(&self.quantity),
        })
    }
}

impl From<RawIntent> for BookingIntent {
    fn from(raw: RawIntent) -> Self {
        BookingIntent {
            tickets: raw
                .tickets
                .into_iter()
                .filter_map(RawTicketSelection::normalize)
                .collect(),
            add_ons: raw
                .add_ons
                .into_iter()
                .filter_map(RawAddOnSelection::normalize)
                .collect(),
            coupon_code: raw.coupon_code_input,
        }
    }
}

impl From<RawTicketTier> for TicketTier {
    fn from(raw: RawTicketTier) -> Self {
        // An unset or zero `price` falls back to `base_price`.
        let price = if is_truthy(&raw.price) {
            safe_parse_f64(&raw.price)
        } else {
            safe_parse_f64(&raw.base_price)
        };
        TicketTier {
            id: raw.id,
            name: raw.name,
            price,
            min_quantity: quantity_bound(&raw.min_quantity),
            max_quantity: quantity_bound(&raw.max_quantity),
        }
    }
}

impl From<RawAddOn> for AddOn {
    fn from(raw: RawAddOn) -> Self {
        AddOn {
            id: raw.id,
            base_price: safe_parse_f64(&raw.base_price),
            is_included_in_ticket: is_truthy(&raw.is_included_in_ticket),
        }
    }
}

impl From<RawCoupon> for Coupon {
    fn from(raw: RawCoupon) -> Self {
        let max_discount_amount = match raw.max_discount_amount.as_ref() {
            Some(v) if !v.is_null() => safe_parse_f64(v),
            _ => safe_parse_opt(
                raw.effects
                    .as_ref()
                    .and_then(|effects| effects.get("max_discount_amount")),
            ),
        };
        Coupon {
            code: raw.code,
            discount_type: discount_type(raw.discount_type),
            discount_value: safe_parse_f64(&raw.discount_value),
            max_discount_amount,
        }
    }
}

impl From<RawService> for ServiceCatalog {
    fn from(raw: RawService) -> Self {
        let tiers = raw
            .ticket_tiers
            .or(raw.ticket_tiers_camel)
            .unwrap_or_default();
        ServiceCatalog {
            ticket_tiers: tiers.into_iter().map(Into::into).collect(),
            add_ons: raw.addons.into_iter().map(Into::into).collect(),
            coupons: raw.coupons.into_iter().map(Into::into).collect(),
        }
    }
}

/// Normalise a raw intent payload.
pub fn intent_from_value(value: Value) -> Result<BookingIntent, AdapterError> {
    let raw: RawIntent = serde_json::from_value(value)?;
    Ok(raw.into())
}

/// Normalise a raw service payload.
pub fn catalog_from_value(value: Value) -> Result<ServiceCatalog, AdapterError> {
    let raw: RawService = serde_json::from_value(value)?;
    Ok(raw.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn intent_accepts_widget_keys() {
        let intent = intent_from_value(json!({
            "tickets": [
                {"tier_id": 1, "quantity": "2"},
                {"tier_id": {"value": 2}, "quantity": null}
            ],
            "addOns": [{"add_on_id": 9, "quantity": 1}],
            "couponCodeInput": "SUMMER"
        }))
        .unwrap();
        assert_eq!(intent.tickets.len(), 2);
        assert_eq!(intent.tickets[0].quantity, 2.0);
        assert_eq!(intent.tickets[1].quantity, 0.0);
        assert_eq!(intent.tickets[1].tier_id.nested(), Some(&EntityId::Int(2)));
        assert_eq!(intent.add_ons[0].add_on_id, EntityId::Int(9));
        assert_eq!(intent.coupon_code.as_deref(), Some("SUMMER"));
    }

    #[test]
    fn intent_accepts_snake_case_and_missing_lists() {
        let intent = intent_from_value(json!({
            "add_ons": [{"add_on_id": "x", "quantity": 3}],
            "coupon_code": "A"
        }))
        .unwrap();
        assert!(intent.tickets.is_empty());
        assert_eq!(intent.add_ons[0].quantity, 3.0);
        assert_eq!(intent.coupon_code.as_deref(), Some("A"));

        let empty = intent_from_value(json!({})).unwrap();
        assert_eq!(empty, BookingIntent::default());
    }

    #[test]
    fn service_prefers_snake_case_tier_list() {
        let catalog = catalog_from_value(json!({
            "ticket_tiers": [{"id": 1, "name": "Adult", "price": "20.00"}],
            "ticketTiers": [{"id": 2, "name": "Child", "price": "5.00"}]
        }))
        .unwrap();
        assert_eq!(catalog.ticket_tiers.len(), 1);
        assert_eq!(catalog.ticket_tiers[0].id, EntityId::Int(1));

        let camel = catalog_from_value(json!({
            "ticketTiers": [{"id": 2, "name": "Child", "price": "5.00"}]
        }))
        .unwrap();
        assert_eq!(camel.ticket_tiers[0].price, 5.0);
    }

    #[test]
    fn quantity_bounds_tolerate_strings() {
        let catalog = catalog_from_value(json!({
            "ticket_tiers": [{"id": 1, "name": "A", "price": 1, "min_quantity": "1", "max_quantity": 10}]
        }))
        .unwrap();
        assert_eq!(catalog.ticket_tiers[0].min_quantity, Some(1));
        assert_eq!(catalog.ticket_tiers[0].max_quantity, Some(10));
    }

    #[test]
    fn tier_price_falls_back_to_base_price() {
        let catalog = catalog_from_value(json!({
            "ticket_tiers": [
                {"id": 1, "name": "A", "base_price": "12.50"},
                {"id": 2, "name": "B", "price": 0, "base_price": 8},
                {"id": 3, "name": "C", "price": "0.00", "base_price": 8},
                {"id": 4, "name": "D", "price": "oops"}
            ]
        }))
        .unwrap();
        let prices: Vec<f64> = catalog.ticket_tiers.iter().map(|t| t.price).collect();
        // A non-empty string is a set price even when it parses to zero.
        assert_eq!(prices, vec![12.5, 8.0, 0.0, 0.0]);
    }

    #[test]
    fn add_on_flags_and_prices_are_coerced() {
        let catalog = catalog_from_value(json!({
            "addons": [
                {"id": 1, "base_price": "4.50", "is_included_in_ticket": 1},
                {"id": 2, "base_price": null}
            ]
        }))
        .unwrap();
        assert!(catalog.add_ons[0].is_included_in_ticket);
        assert_eq!(catalog.add_ons[0].base_price, 4.5);
        assert!(!catalog.add_ons[1].is_included_in_ticket);
        assert_eq!(catalog.add_ons[1].base_price, 0.0);
    }

    #[test]
    fn coupon_cap_is_read_from_effects_when_not_top_level() {
        let catalog = catalog_from_value(json!({
            "coupons": [
                {"code": "A", "discount_type": "percentage", "discount_value": "50",
                 "effects": {"max_discount_amount": "30.00"}},
                {"code": "B", "discount_type": "percentage", "discount_value": 10,
                 "max_discount_amount": 5, "effects": {"max_discount_amount": 99}},
                {"code": "C", "discount_type": "bogo"},
                {"code": "D"},
                {"code": "E", "discount_type": null}
            ]
        }))
        .unwrap();
        let c = &catalog.coupons;
        assert_eq!(c[0].max_discount_amount, 30.0);
        assert_eq!(c[0].discount_value, 50.0);
        assert_eq!(c[1].max_discount_amount, 5.0);
        assert_eq!(c[2].discount_type, DiscountType::Bogo);
        assert_eq!(c[2].discount_value, 0.0);
        assert_eq!(c[3].discount_type, DiscountType::Unsupported);
        assert_eq!(c[4].discount_type, DiscountType::Unsupported);
    }

    #[test]
    fn null_lists_and_fields_fall_back_to_defaults() {
        let catalog = catalog_from_value(json!({
            "ticket_tiers": [{"id": 1, "name": null, "price": "10.00"}],
            "addons": null,
            "coupons": null
        }))
        .unwrap();
        assert_eq!(catalog.ticket_tiers.len(), 1);
        assert_eq!(catalog.ticket_tiers[0].name, "");
        assert!(catalog.add_ons.is_empty());
        assert!(catalog.coupons.is_empty());

        let coupons = catalog_from_value(json!({
            "coupons": [{"code": null, "discount_type": "fixed", "discount_value": 5},
                        {"code": 7, "discount_type": "fixed", "discount_value": 5}]
        }))
        .unwrap();
        assert_eq!(coupons.coupons.len(), 2);
        assert_eq!(coupons.coupons[0].code, "");
        assert_eq!(coupons.coupons[1].code, "");
    }

    #[test]
    fn null_snake_case_tier_list_falls_back_to_camel_case() {
        let catalog = catalog_from_value(json!({
            "ticket_tiers": null,
            "ticketTiers": [{"id": 2, "name": "Child", "price": 5}]
        }))
        .unwrap();
        assert_eq!(catalog.ticket_tiers[0].id, EntityId::Int(2));
    }

    #[test]
    fn unusable_list_entries_are_dropped() {
        let catalog = catalog_from_value(json!({
            "ticket_tiers": [null, {"id": null, "name": "X"}, "tier", {"id": 3, "name": "C"}],
            "addons": "none",
            "coupons": [42, {"code": "OK", "discount_type": "fixed"}]
        }))
        .unwrap();
        assert_eq!(catalog.ticket_tiers.len(), 1);
        assert_eq!(catalog.ticket_tiers[0].id, EntityId::Int(3));
        assert!(catalog.add_ons.is_empty());
        assert_eq!(catalog.coupons.len(), 1);
        assert_eq!(catalog.coupons[0].code, "OK");
    }

    #[test]
    fn selections_with_unusable_ids_are_dropped() {
        let intent = intent_from_value(json!({
            "tickets": [
                {"tier_id": 1, "quantity": 2},
                {"tier_id": null, "quantity": 1},
                {"tier_id": true, "quantity": 1},
                {"quantity": 1},
                null
            ],
            "addOns": [{"add_on_id": null, "quantity": 1}, {"add_on_id": [1], "quantity": 1}],
            "couponCodeInput": null
        }))
        .unwrap();
        assert_eq!(intent.tickets.len(), 1);
        assert_eq!(intent.tickets[0].tier_id, TierRef::Plain(EntityId::Int(1)));
        assert!(intent.add_ons.is_empty());
        assert!(intent.coupon_code.is_none());

        let nulls = intent_from_value(json!({"tickets": null, "addOns": null})).unwrap();
        assert_eq!(nulls, BookingIntent::default());
    }

    #[test]
    fn non_object_payload_is_rejected() {
        assert!(matches!(
            intent_from_value(json!("nope")),
            Err(AdapterError::Malformed(_))
        ));
        assert!(catalog_from_value(json!(42)).is_err());
    }
}

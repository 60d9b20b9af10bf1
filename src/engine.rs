//! Price estimation engine.
//!
//! The `engine` module turns a [`BookingIntent`] and a
//! [`ServiceCatalog`] snapshot into a provisional [`PriceBreakdown`]
//! for instant UI feedback.  The backend's calculation is the
//! authority; this estimate deliberately leaves out tier-level pricing
//! rules (already baked into the tier price), BOGO coupons, tax and
//! currency handling.
//!
//! [`estimate`] is pure and never fails: unmatched references and
//! unusable numbers contribute zero.  [`estimate_batch`] prices many
//! candidate intents against one snapshot using [`rayon`].

use crate::coerce::round_money;
use crate::models::{
    BookingIntent, Coupon, Discount, DiscountType, LineItem, PriceBreakdown, ServiceCatalog,
};
use rayon::prelude::*;
use tracing::debug;

/// Estimate the price of `intent` against `catalog`.
pub fn estimate(intent: &BookingIntent, catalog: &ServiceCatalog) -> PriceBreakdown {
    let mut breakdown = PriceBreakdown::default();

    // Tickets.  Selections are not merged, even for the same tier.
    let mut ticket_subtotal = 0.0;
    for selection in &intent.tickets {
        let Some(tier) = catalog.find_tier(&selection.tier_id) else {
            debug!(tier = ?selection.tier_id, "skipping selection for unknown tier");
            continue;
        };
        if selection.quantity <= 0.0 {
            continue;
        }
        let subtotal = tier.price * selection.quantity;
        breakdown.line_items.push(LineItem {
            ticket_tier_id: selection.tier_id.clone(),
            name: tier.name.clone(),
            quantity: selection.quantity,
            unit_price: tier.price,
            subtotal,
        });
        ticket_subtotal += subtotal;
    }
    breakdown.base_subtotal = ticket_subtotal;
    breakdown.adjusted_subtotal = ticket_subtotal;

    // At most one coupon: the one matching the entered code.
    if let Some(code) = intent.coupon_code.as_deref() {
        if let Some(coupon) = catalog.find_coupon(code) {
            let amount = coupon_discount(coupon, ticket_subtotal);
            if amount > 0.0 {
                breakdown.discounts.push(Discount {
                    name: format!("Coupon: {}", code),
                    amount,
                });
            }
        }
    }

    let mut add_ons_total = 0.0;
    for selection in &intent.add_ons {
        match catalog.find_add_on(&selection.add_on_id) {
            Some(add_on) if !add_on.is_included_in_ticket => {
                add_ons_total += add_on.base_price * selection.quantity;
            }
            Some(_) => {}
            None => debug!(add_on = %selection.add_on_id, "skipping selection for unknown add-on"),
        }
    }
    breakdown.add_ons_total = add_ons_total;

    let total_discount: f64 = breakdown.discounts.iter().map(|d| d.amount).sum();
    breakdown.final_total = (ticket_subtotal - total_discount + add_ons_total).max(0.0);

    // Only the aggregates are rounded, and only now.
    breakdown.base_subtotal = round_money(breakdown.base_subtotal);
    breakdown.adjusted_subtotal = round_money(breakdown.adjusted_subtotal);
    breakdown.add_ons_total = round_money(breakdown.add_ons_total);
    breakdown.final_total = round_money(breakdown.final_total);
    breakdown
}

/// Estimate several candidate intents against one catalog snapshot.
///
/// Results are returned in the same order as `intents`.
pub fn estimate_batch(intents: &[BookingIntent], catalog: &ServiceCatalog) -> Vec<PriceBreakdown> {
    intents
        .par_iter()
        .map(|intent| estimate(intent, catalog))
        .collect()
}

/// Discount granted by `coupon` on the ticket subtotal, never more
/// than the subtotal itself.
fn coupon_discount(coupon: &Coupon, ticket_subtotal: f64) -> f64 {
    let discount = match coupon.discount_type {
        DiscountType::Percentage => {
            let potential = ticket_subtotal * (coupon.discount_value / 100.0);
            if coupon.max_discount_amount > 0.0 && potential > coupon.max_discount_amount {
                coupon.max_discount_amount
            } else {
                potential
            }
        }
        DiscountType::Fixed => coupon.discount_value,
        DiscountType::Bogo | DiscountType::Unsupported => {
            debug!(
                code = %coupon.code,
                discount_type = ?coupon.discount_type,
                "coupon mechanism is evaluated by the backend only"
            );
            0.0
        }
    };
    discount.min(ticket_subtotal)
}

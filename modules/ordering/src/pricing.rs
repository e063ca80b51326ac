use rust_decimal::{Decimal, RoundingStrategy};

use crate::config::OrderingConfig;

/// One cart position as priced at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartLine {
    pub price: Decimal,
    pub quantity: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceBreakdown {
    pub items_price: Decimal,
    pub shipping_price: Decimal,
    pub tax_price: Decimal,
    pub total_price: Decimal,
}

/// Monetary rounding: two decimal places, halves away from zero.
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Computes the full price breakdown for a cart. The storefront client runs
/// the same arithmetic for display, but the persisted numbers always come
/// from this function on the server; client-submitted totals are never
/// trusted.
pub fn quote(lines: &[CartLine], config: &OrderingConfig) -> PriceBreakdown {
    let items_price = round2(
        lines
            .iter()
            .map(|line| line.price * Decimal::from(line.quantity))
            .sum(),
    );
    let shipping_price = if items_price > config.free_shipping_threshold {
        Decimal::ZERO
    } else {
        round2(config.flat_shipping_price)
    };
    let tax_price = round2(config.tax_rate * items_price);
    let total_price = items_price + shipping_price + tax_price;
    PriceBreakdown {
        items_price,
        shipping_price,
        tax_price,
        total_price,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(value: &str) -> Decimal {
        value.parse().unwrap_or_default()
    }

    fn line(price: &str, quantity: i32) -> CartLine {
        CartLine {
            price: dec(price),
            quantity,
        }
    }

    #[test]
    fn large_cart_ships_free() {
        let quote = quote(&[line("60", 2)], &OrderingConfig::default());
        assert_eq!(quote.items_price, dec("120.00"));
        assert_eq!(quote.shipping_price, Decimal::ZERO);
        assert_eq!(quote.tax_price, dec("18.00"));
        assert_eq!(quote.total_price, dec("138.00"));
    }

    #[test]
    fn small_cart_pays_flat_shipping() {
        let quote = quote(&[line("30", 2)], &OrderingConfig::default());
        assert_eq!(quote.items_price, dec("60.00"));
        assert_eq!(quote.shipping_price, dec("10.00"));
        assert_eq!(quote.tax_price, dec("9.00"));
        assert_eq!(quote.total_price, dec("79.00"));
    }

    #[test]
    fn free_shipping_needs_strictly_more_than_the_threshold() {
        let config = OrderingConfig::default();
        let at_threshold = quote(&[line("100", 1)], &config);
        assert_eq!(at_threshold.shipping_price, dec("10"));
        let above_threshold = quote(&[line("100.01", 1)], &config);
        assert_eq!(above_threshold.shipping_price, Decimal::ZERO);
    }

    #[test]
    fn totals_always_add_up() {
        let config = OrderingConfig::default();
        let carts: &[&[CartLine]] = &[
            &[line("19.99", 3)],
            &[line("0.01", 1)],
            &[line("33.33", 1), line("66.67", 2)],
            &[line("5.55", 7), line("1.05", 2)],
        ];
        for cart in carts {
            let quote = quote(cart, &config);
            assert_eq!(
                quote.total_price,
                quote.items_price + quote.shipping_price + quote.tax_price
            );
            assert_eq!(
                quote.shipping_price == Decimal::ZERO,
                quote.items_price > config.free_shipping_threshold
            );
        }
    }

    #[test]
    fn tax_rounds_half_away_from_zero() {
        // 0.15 * 20.30 = 3.045 -> 3.05
        let quote = quote(&[line("20.30", 1)], &OrderingConfig::default());
        assert_eq!(quote.tax_price, dec("3.05"));
    }

    #[test]
    fn round2_midpoints_move_away_from_zero() {
        assert_eq!(round2(dec("0.005")), dec("0.01"));
        assert_eq!(round2(dec("2.675")), dec("2.68"));
        assert_eq!(round2(dec("1.004")), dec("1.00"));
    }

    #[test]
    fn empty_cart_quotes_only_shipping_and_zero_tax() {
        let quote = quote(&[], &OrderingConfig::default());
        assert_eq!(quote.items_price, Decimal::ZERO);
        assert_eq!(quote.shipping_price, dec("10"));
        assert_eq!(quote.tax_price, Decimal::ZERO);
    }
}

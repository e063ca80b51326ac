use rust_decimal::Decimal;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct OrderingConfig {
    /// Orders whose item total exceeds this ship for free.
    #[serde(default = "default_free_shipping_threshold")]
    pub free_shipping_threshold: Decimal,
    /// Flat rate applied below the free-shipping threshold.
    #[serde(default = "default_flat_shipping_price")]
    pub flat_shipping_price: Decimal,
    /// Tax applied to the item total.
    #[serde(default = "default_tax_rate")]
    pub tax_rate: Decimal,
    /// When enabled, an order cannot be marked delivered before it is paid.
    /// Off by default; the two flags are otherwise independent.
    #[serde(default)]
    pub require_paid_before_delivery: bool,
}

impl Default for OrderingConfig {
    fn default() -> Self {
        Self {
            free_shipping_threshold: default_free_shipping_threshold(),
            flat_shipping_price: default_flat_shipping_price(),
            tax_rate: default_tax_rate(),
            require_paid_before_delivery: false,
        }
    }
}

fn default_free_shipping_threshold() -> Decimal {
    Decimal::new(100, 0)
}

fn default_flat_shipping_price() -> Decimal {
    Decimal::new(10, 0)
}

fn default_tax_rate() -> Decimal {
    Decimal::new(15, 2)
}

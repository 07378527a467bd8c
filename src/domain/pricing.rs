//! Numeric helpers shared by every price computation.
//!
//! Stored prices are decimal strings; every derived value (unit local price,
//! savings, total value) is recomputed from those strings and the current
//! exchange rate on each read.

use crate::domain::entities::product::PriceMode;

/// Strict parse: `None` for empty, non-numeric or non-finite input.
pub fn parse_decimal(value: &str) -> Option<f64> {
    let trimmed = value.trim().replace(',', "");
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Lenient parse used for sorting and display: anything unparseable is zero.
pub fn parse_f64(value: &str) -> f64 {
    parse_decimal(value).unwrap_or(0.0)
}

pub fn format_money(value: f64) -> String {
    if !value.is_finite() {
        return String::new();
    }
    let rounded = format!("{value:.2}");
    if rounded == "-0.00" {
        "0.00".to_string()
    } else {
        rounded
    }
}

pub fn safe_div(numerator: f64, denominator: f64) -> f64 {
    if denominator.abs() < f64::EPSILON {
        0.0
    } else {
        numerator / denominator
    }
}

/// `rate` is "one unit of local currency buys `rate` units of foreign currency".
pub fn to_local(foreign: f64, rate: f64) -> f64 {
    safe_div(foreign, rate)
}

pub fn savings(old_local: f64, unit_local: f64) -> f64 {
    old_local - unit_local
}

pub fn total_value(unit_local: f64, quantity: u32) -> f64 {
    unit_local * f64::from(quantity)
}

/// Per-unit foreign cost after bundle division and delivery amortisation.
pub fn unit_foreign_price(
    raw: f64,
    mode: PriceMode,
    bundle_qty: u32,
    delivery: f64,
    qty: u32,
) -> f64 {
    let mut unit = match mode {
        PriceMode::Bundle if bundle_qty > 0 => raw / f64::from(bundle_qty),
        _ => raw,
    };
    if delivery > 0.0 && qty > 0 {
        unit += delivery / f64::from(qty);
    }
    unit
}

/// Quantity recorded alongside a committed price; `None` clears it.
pub fn effective_quantity(mode: PriceMode, bundle_qty: u32, qty: u32) -> Option<u32> {
    let effective = match mode {
        PriceMode::Bundle => bundle_qty,
        PriceMode::Unit => qty,
    };
    (effective > 0).then_some(effective)
}

pub fn parse_quantity(value: &str) -> Option<u32> {
    let parsed = parse_decimal(value)?;
    if parsed <= 0.0 {
        return None;
    }
    let rounded = parsed.round();
    if rounded > f64::from(u32::MAX) {
        return None;
    }
    Some(rounded as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_decimal_rejects_blank_and_garbage() {
        assert_eq!(parse_decimal(""), None);
        assert_eq!(parse_decimal("   "), None);
        assert_eq!(parse_decimal("abc"), None);
        assert_eq!(parse_decimal("NaN"), None);
        assert_eq!(parse_decimal(" 1,234.50 "), Some(1234.5));
    }

    #[test]
    fn format_money_rounds_to_two_places() {
        assert_eq!(format_money(25.0), "25.00");
        assert_eq!(format_money(1.005_f64 + 0.0001), "1.01");
        assert_eq!(format_money(-0.001), "0.00");
        assert_eq!(format_money(f64::NAN), "");
    }

    #[test]
    fn bundle_price_is_divided_by_lot_size() {
        let unit = unit_foreign_price(100.0, PriceMode::Bundle, 4, 0.0, 0);
        assert_eq!(format_money(unit), "25.00");
    }

    #[test]
    fn delivery_is_amortised_per_unit() {
        let unit = unit_foreign_price(10.0, PriceMode::Unit, 0, 20.0, 4);
        assert_eq!(format_money(unit), "15.00");
    }

    #[test]
    fn bundle_without_lot_size_keeps_raw_price() {
        let unit = unit_foreign_price(42.0, PriceMode::Bundle, 0, 0.0, 0);
        assert_eq!(format_money(unit), "42.00");
    }

    #[test]
    fn effective_quantity_follows_mode() {
        assert_eq!(effective_quantity(PriceMode::Bundle, 6, 2), Some(6));
        assert_eq!(effective_quantity(PriceMode::Unit, 6, 2), Some(2));
        assert_eq!(effective_quantity(PriceMode::Unit, 6, 0), None);
    }

    #[test]
    fn to_local_guards_zero_rate() {
        assert_eq!(format_money(to_local(50.0, 2.0)), "25.00");
        assert_eq!(to_local(50.0, 0.0), 0.0);
    }

    #[test]
    fn parse_quantity_only_accepts_positive() {
        assert_eq!(parse_quantity("3"), Some(3));
        assert_eq!(parse_quantity("2.0"), Some(2));
        assert_eq!(parse_quantity("0"), None);
        assert_eq!(parse_quantity("-1"), None);
        assert_eq!(parse_quantity(""), None);
    }
}

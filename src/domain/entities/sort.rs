use std::cmp::Ordering;

use crate::domain::entities::product::{Overrides, Product};
use crate::domain::pricing::{parse_decimal, parse_f64, to_local};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortColumn {
    Name,
    OldPrice,
    CnyPrice,
    NewCny,
    NewLocal,
    Savings,
    Quantity,
    TotalValue,
    OfficeStock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub column: SortColumn,
    pub direction: SortDirection,
}

impl SortSpec {
    /// Clicking the active column flips direction; a new column starts ascending.
    pub fn toggle(current: Option<SortSpec>, column: SortColumn) -> SortSpec {
        match current {
            Some(spec) if spec.column == column => SortSpec {
                column,
                direction: spec.direction.flipped(),
            },
            _ => SortSpec {
                column,
                direction: SortDirection::Asc,
            },
        }
    }
}

fn compare_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

fn override_price(overrides: &Overrides, name: &str) -> Option<f64> {
    overrides.price(name).and_then(parse_decimal)
}

fn sort_value(product: &Product, column: SortColumn, overrides: &Overrides, rate: f64) -> f64 {
    let new_cny = override_price(overrides, &product.name);
    match column {
        SortColumn::Name => 0.0,
        SortColumn::OldPrice => parse_f64(&product.old_price),
        SortColumn::CnyPrice => parse_f64(&product.cny_price),
        SortColumn::NewCny => new_cny.unwrap_or(0.0),
        SortColumn::NewLocal => new_cny.map(|cny| to_local(cny, rate)).unwrap_or(0.0),
        // Unpriced rows rank below every priced row.
        SortColumn::Savings => new_cny
            .map(|cny| parse_f64(&product.old_price) - to_local(cny, rate))
            .unwrap_or(f64::NEG_INFINITY),
        SortColumn::Quantity => f64::from(overrides.quantity(&product.name).unwrap_or(0)),
        SortColumn::TotalValue => match (new_cny, overrides.quantity(&product.name)) {
            (Some(cny), Some(qty)) => to_local(cny, rate) * f64::from(qty),
            _ => 0.0,
        },
        SortColumn::OfficeStock => parse_f64(&product.office_stock),
    }
}

pub fn compare_products(
    a: &Product,
    b: &Product,
    spec: SortSpec,
    overrides: &Overrides,
    rate: f64,
) -> Ordering {
    let ordering = match spec.column {
        SortColumn::Name => a.sort_key().cmp(&b.sort_key()),
        column => compare_f64(
            sort_value(a, column, overrides, rate),
            sort_value(b, column, overrides, rate),
        ),
    };
    match spec.direction {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
    }
}

/// Stable sort; ties keep their current relative order.
pub fn sort_products(products: &mut [Product], spec: SortSpec, overrides: &Overrides, rate: f64) {
    products.sort_by(|a, b| compare_products(a, b, spec, overrides, rate));
}

pub fn sort_by_name(products: &mut [Product]) {
    products.sort_by_key(Product::sort_key);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(products: &[Product]) -> Vec<&str> {
        products.iter().map(|p| p.name.as_str()).collect()
    }

    #[test]
    fn toggle_flips_same_column_and_resets_new_column() {
        let first = SortSpec::toggle(None, SortColumn::OldPrice);
        assert_eq!(first.direction, SortDirection::Asc);
        let second = SortSpec::toggle(Some(first), SortColumn::OldPrice);
        assert_eq!(second.direction, SortDirection::Desc);
        let third = SortSpec::toggle(Some(second), SortColumn::Name);
        assert_eq!(third.direction, SortDirection::Asc);
    }

    #[test]
    fn name_sort_ignores_case() {
        let mut products = vec![
            Product::new("banana", "1", "1"),
            Product::new("Apple", "1", "1"),
            Product::new("cherry", "1", "1"),
        ];
        sort_by_name(&mut products);
        assert_eq!(names(&products), vec!["Apple", "banana", "cherry"]);
    }

    #[test]
    fn unpriced_rows_sort_below_all_savings() {
        let mut overrides = Overrides::default();
        overrides.cny.insert("Gain".to_string(), "10.00".to_string());
        overrides.cny.insert("Loss".to_string(), "90.00".to_string());
        let mut products = vec![
            Product::new("Gain", "20.00", "0"),
            Product::new("Unpriced", "20.00", "0"),
            Product::new("Loss", "20.00", "0"),
        ];

        let spec = SortSpec {
            column: SortColumn::Savings,
            direction: SortDirection::Asc,
        };
        sort_products(&mut products, spec, &overrides, 2.0);

        assert_eq!(names(&products), vec!["Unpriced", "Loss", "Gain"]);
    }

    #[test]
    fn non_numeric_values_sort_as_zero_and_ties_are_stable() {
        let mut products = vec![
            Product::new("B", "n/a", "0"),
            Product::new("A", "", "0"),
            Product::new("C", "5", "0"),
        ];
        let spec = SortSpec {
            column: SortColumn::OldPrice,
            direction: SortDirection::Desc,
        };
        sort_products(&mut products, spec, &Overrides::default(), 1.0);
        assert_eq!(names(&products), vec!["C", "B", "A"]);
    }
}

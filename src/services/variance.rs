// src/services/variance.rs

use std::collections::HashMap;

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::{
    product::Product,
    report::{CountedItemDetail, InventoryReport},
    schedule::InventorySchedule,
};

/// round(100 * part / total) em inteiros, meio arredonda para cima.
/// Sempre em [0, 100]; `total == 0` dá 0.
pub fn rounded_percentage(part: usize, total: usize) -> i32 {
    if total == 0 {
        return 0;
    }
    let pct = (200 * part + total) / (2 * total);
    pct.min(100) as i32
}

/// Variação de um item: contado menos esperado.
pub fn item_variance(expected: i32, counted: i32) -> i32 {
    counted - expected
}

/// 100 * variação / esperado, com duas casas. Esperado zero dá zero.
pub fn variance_percentage(expected: i32, counted: i32) -> Decimal {
    if expected == 0 {
        return Decimal::ZERO;
    }
    (Decimal::from(item_variance(expected, counted)) * Decimal::ONE_HUNDRED / Decimal::from(expected))
        .round_dp(2)
}

pub fn compute_report(schedule: &InventorySchedule, products: &[Product]) -> InventoryReport {
    let by_id: HashMap<Uuid, &Product> = products.iter().map(|p| (p.id, p)).collect();
    // Produto ausente do catálogo vale zero, mas continua contando nos totais.
    let price_of = |id: &Uuid| by_id.get(id).map(|p| p.purchase_price).unwrap_or(Decimal::ZERO);

    let total_products = schedule.expected_products.len();
    let counted_products = schedule.counted_products.len();

    let total_expected_value: Decimal = schedule
        .expected_products
        .iter()
        .map(|e| Decimal::from(e.expected_quantity) * price_of(&e.product_id))
        .sum();

    let total_counted_value: Decimal = schedule
        .counted_products
        .iter()
        .map(|c| Decimal::from(c.counted_quantity) * price_of(&c.product_id))
        .sum();

    let not_found_items = schedule
        .expected_products
        .iter()
        .filter(|e| schedule.count_for(e.product_id).is_none())
        .cloned()
        .collect();

    let details = schedule
        .counted_products
        .iter()
        .map(|count| {
            let product = by_id.get(&count.product_id);
            let expected = schedule
                .expected_for(count.product_id)
                .map(|e| e.expected_quantity)
                .unwrap_or(0);
            let unit_price = price_of(&count.product_id);
            let expected_value = Decimal::from(expected) * unit_price;
            let counted_value = Decimal::from(count.counted_quantity) * unit_price;

            CountedItemDetail {
                product_id: count.product_id,
                sku: product.map(|p| p.sku.clone()),
                name: product.map(|p| p.name.clone()),
                unit: product.map(|p| p.unit.clone()),
                expected_quantity: expected,
                counted_quantity: count.counted_quantity,
                variance: item_variance(expected, count.counted_quantity),
                variance_percentage: variance_percentage(expected, count.counted_quantity),
                unit_price,
                expected_value,
                counted_value,
                value_difference: counted_value - expected_value,
            }
        })
        .collect();

    InventoryReport {
        schedule_id: schedule.id,
        total_products,
        counted_products,
        not_found_products: total_products.saturating_sub(counted_products),
        inventory_percentage: rounded_percentage(counted_products, total_products),
        total_expected_value,
        total_counted_value,
        variance: total_counted_value - total_expected_value,
        counted_items: schedule.counted_products.clone(),
        not_found_items,
        details,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::{
        product::ProductLocation,
        schedule::{CountStatus, ExpectedProduct, InventoryCount, Priority, ScheduleStatus},
    };
    use chrono::Utc;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    pub(crate) fn schedule() -> InventorySchedule {
        let now = Utc::now();
        InventorySchedule {
            id: Uuid::new_v4(),
            name: "Inventário mensal".into(),
            code: "INV-20250310-0900".into(),
            scheduled_date: now,
            status: ScheduleStatus::Scheduled,
            location: "Central".into(),
            sector: "Geral".into(),
            notes: None,
            expected_products: vec![],
            counted_products: vec![],
            activities: vec![],
            activity_status: vec![],
            assigned_users: vec![],
            user_roles: HashMap::new(),
            created_by: Uuid::new_v4(),
            version: 1,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    pub(crate) fn product(price: Decimal) -> Product {
        let now = Utc::now();
        Product {
            id: Uuid::new_v4(),
            sku: "CAB-0042".into(),
            name: "Cabo de cobre".into(),
            unit: "UN".into(),
            purchase_price: price,
            current_stock: 0,
            location: ProductLocation {
                id: "Central-A-1-".into(),
                warehouse: "Central".into(),
                aisle: "A".into(),
                shelf: "1".into(),
                position: None,
            },
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    fn expected(product_id: Uuid, qty: i32) -> ExpectedProduct {
        ExpectedProduct {
            product_id,
            expected_quantity: qty,
            current_stock: qty,
            priority: Priority::Medium,
        }
    }

    fn counted(product_id: Uuid, qty: i32) -> InventoryCount {
        InventoryCount {
            product_id,
            counted_quantity: qty,
            counted_by: Uuid::new_v4(),
            counted_at: Utc::now(),
            notes: None,
            variance: 0,
            validations: vec![],
            status: CountStatus::Counted,
            metadata: None,
        }
    }

    #[test]
    fn percentage_is_rounded_and_bounded() {
        assert_eq!(rounded_percentage(0, 0), 0);
        assert_eq!(rounded_percentage(5, 0), 0);
        assert_eq!(rounded_percentage(1, 3), 33);
        assert_eq!(rounded_percentage(2, 3), 67);
        assert_eq!(rounded_percentage(1, 8), 13); // 12.5 arredonda para cima
        assert_eq!(rounded_percentage(4, 3), 100);

        for total in 0..40 {
            for part in 0..60 {
                let p = rounded_percentage(part, total);
                assert!((0..=100).contains(&p));
            }
        }
    }

    #[test]
    fn report_sums_values_and_lists_missing_items() {
        let cabo = product(dec("10.00"));
        let fita = product(dec("2.50"));

        let mut s = schedule();
        s.expected_products = vec![expected(cabo.id, 40), expected(fita.id, 10)];
        s.counted_products = vec![counted(cabo.id, 38)];

        let report = compute_report(&s, &[cabo.clone(), fita.clone()]);

        assert_eq!(report.total_products, 2);
        assert_eq!(report.counted_products, 1);
        assert_eq!(report.not_found_products, 1);
        assert_eq!(report.inventory_percentage, 50);
        assert_eq!(report.total_expected_value, dec("425.00"));
        assert_eq!(report.total_counted_value, dec("380.00"));
        assert_eq!(report.variance, dec("-45.00"));
        assert_eq!(report.not_found_items.len(), 1);
        assert_eq!(report.not_found_items[0].product_id, fita.id);

        let row = &report.details[0];
        assert_eq!(row.variance, -2);
        assert_eq!(row.variance_percentage, dec("-5.00"));
        assert_eq!(row.value_difference, dec("-20.00"));
        assert_eq!(row.sku.as_deref(), Some("CAB-0042"));
    }

    #[test]
    fn missing_catalogue_product_counts_but_is_worth_nothing() {
        let ghost = Uuid::new_v4();
        let mut s = schedule();
        s.expected_products = vec![expected(ghost, 5)];
        s.counted_products = vec![counted(ghost, 7)];

        let report = compute_report(&s, &[]);

        assert_eq!(report.total_products, 1);
        assert_eq!(report.inventory_percentage, 100);
        assert_eq!(report.total_expected_value, Decimal::ZERO);
        assert_eq!(report.variance, Decimal::ZERO);
        assert!(report.details[0].sku.is_none());
        assert_eq!(report.details[0].variance, 2);
    }

    #[test]
    fn empty_expected_list_is_zero_percent_even_with_counts() {
        let mut s = schedule();
        s.counted_products = vec![counted(Uuid::new_v4(), 3)];

        let report = compute_report(&s, &[]);

        assert_eq!(report.inventory_percentage, 0);
        assert_eq!(report.not_found_products, 0);
        assert_eq!(report.details[0].variance_percentage, Decimal::ZERO);
    }
}

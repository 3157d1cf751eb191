use std::collections::BTreeMap;

use crate::{
    error::Error,
    jwt::Identity,
    schema::ShoppingListRow,
    store::Store,
};

/// Sums `(name, unit, amount)` lines per `(name, unit)`, ordered by name then unit.
///
/// Units are compared verbatim; "g" and "gram" stay separate rows.
pub fn aggregate<I>(lines: I) -> Vec<ShoppingListRow>
where
    I: IntoIterator<Item = (String, String, i32)>,
{
    let mut totals: BTreeMap<(String, String), i64> = BTreeMap::new();
    for (name, unit, amount) in lines {
        *totals.entry((name, unit)).or_insert(0) += i64::from(amount);
    }

    totals
        .into_iter()
        .map(|((name, measurement_unit), total)| ShoppingListRow {
            name,
            measurement_unit,
            total,
        })
        .collect()
}

pub fn render_shopping_list(rows: &[ShoppingListRow]) -> String {
    rows.iter()
        .map(|row| format!("{} - {} {}", row.name, row.total, row.measurement_unit))
        .collect::<Vec<_>>()
        .join("\n")
}

pub async fn cart_totals(
    store: &dyn Store,
    identity: &Identity,
) -> Result<Vec<ShoppingListRow>, Error> {
    let user_id = identity.require()?;
    store.shopping_list(user_id).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(name: &str, unit: &str, amount: i32) -> (String, String, i32) {
        (name.to_string(), unit.to_string(), amount)
    }

    #[test]
    fn totals_are_grouped_by_name_and_unit() {
        let rows = aggregate(vec![
            line("Sugar", "g", 100),
            line("Flour", "g", 200),
            line("Sugar", "g", 50),
            line("Sugar", "tbsp", 2),
        ]);

        let rendered: Vec<(&str, &str, i64)> = rows
            .iter()
            .map(|row| (row.name.as_str(), row.measurement_unit.as_str(), row.total))
            .collect();
        assert_eq!(
            rendered,
            vec![("Flour", "g", 200), ("Sugar", "g", 150), ("Sugar", "tbsp", 2)]
        );
    }

    #[test]
    fn totals_do_not_overflow_the_column_type() {
        let rows = aggregate(vec![line("Rice", "g", 32767), line("Rice", "g", 32767)]);
        assert_eq!(rows[0].total, 65534);
    }

    #[test]
    fn rendering_joins_lines_without_trailing_newline() {
        let rows = aggregate(vec![line("Sugar", "g", 100), line("Sugar", "g", 50)]);
        assert_eq!(render_shopping_list(&rows), "Sugar - 150 g");

        let rows = aggregate(vec![line("Eggs", "pcs", 2), line("Milk", "ml", 250)]);
        assert_eq!(render_shopping_list(&rows), "Eggs - 2 pcs\nMilk - 250 ml");
    }

    #[test]
    fn empty_cart_renders_empty_text() {
        assert_eq!(render_shopping_list(&aggregate(Vec::new())), "");
    }
}

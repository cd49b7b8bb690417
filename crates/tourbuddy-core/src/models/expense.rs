use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{require_text, Resource, ValidationError};
use crate::utils::round_cents;

/// Palette for chart slices, cycled by category index.
pub const CHART_COLORS: [&str; 6] = ["#FF6384", "#36A2EB", "#FFCE56", "#4BC0C0", "#9966FF", "#FF9F40"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub category: String,
    pub amount: f64,
}

/// Form state for an expense. The amount is kept as typed and parsed on save.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpenseDraft {
    pub category: String,
    pub amount: String,
}

impl Resource for Expense {
    const COLLECTION: &'static str = "expenses";

    type Draft = ExpenseDraft;

    fn to_draft(&self) -> ExpenseDraft {
        ExpenseDraft {
            category: self.category.clone(),
            amount: self.amount.to_string(),
        }
    }

    fn from_draft(draft: &ExpenseDraft, _now: DateTime<Utc>) -> Result<Self, ValidationError> {
        let category = require_text("category", &draft.category)?;
        let amount = parse_amount(&draft.amount)?;
        Ok(Expense { category, amount })
    }
}

fn parse_amount(input: &str) -> Result<f64, ValidationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new("amount", "must not be empty"));
    }
    match trimmed.parse::<f64>() {
        Ok(amount) if amount.is_finite() => Ok(amount),
        _ => Err(ValidationError::new("amount", "must be a number")),
    }
}

/// Summed amount for one category.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryTotal {
    pub category: String,
    pub amount: f64,
}

/// Sum of all expenses. Keeps full precision; `Display` rounds to cents.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ExpenseTotal {
    pub amount: f64,
}

impl fmt::Display for ExpenseTotal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", round_cents(self.amount))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartSlice {
    pub name: String,
    pub amount: f64,
    pub color: &'static str,
}

/// Group expenses by category in first-seen order.
///
/// Categories compare by exact string equality: "Food", "food" and "Food "
/// are three different groups.
pub fn group_by_category<'a, I>(expenses: I) -> Vec<CategoryTotal>
where
    I: IntoIterator<Item = &'a Expense>,
{
    let mut groups: Vec<CategoryTotal> = Vec::new();
    for expense in expenses {
        match groups.iter_mut().find(|g| g.category == expense.category) {
            Some(group) => group.amount += expense.amount,
            None => groups.push(CategoryTotal {
                category: expense.category.clone(),
                amount: expense.amount,
            }),
        }
    }
    groups
}

pub fn total<'a, I>(expenses: I) -> ExpenseTotal
where
    I: IntoIterator<Item = &'a Expense>,
{
    ExpenseTotal {
        amount: expenses.into_iter().fold(0.0, |acc, e| acc + e.amount),
    }
}

pub fn chart_slices(groups: &[CategoryTotal]) -> Vec<ChartSlice> {
    groups
        .iter()
        .enumerate()
        .map(|(i, group)| ChartSlice {
            name: group.category.clone(),
            amount: group.amount,
            color: CHART_COLORS[i % CHART_COLORS.len()],
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expense(category: &str, amount: f64) -> Expense {
        Expense {
            category: category.into(),
            amount,
        }
    }

    #[test]
    fn test_grouping_is_case_sensitive() {
        let expenses = [expense("Food", 10.0), expense("food", 5.0)];
        let groups = group_by_category(&expenses);
        assert_eq!(
            groups,
            vec![
                CategoryTotal { category: "Food".into(), amount: 10.0 },
                CategoryTotal { category: "food".into(), amount: 5.0 },
            ]
        );
    }

    #[test]
    fn test_grouping_sums_and_keeps_first_seen_order() {
        let expenses = [
            expense("Stay", 100.0),
            expense("Food", 10.0),
            expense("Stay", 50.5),
            expense("Food ", 1.0),
        ];
        let groups = group_by_category(&expenses);
        let names: Vec<_> = groups.iter().map(|g| g.category.as_str()).collect();
        assert_eq!(names, vec!["Stay", "Food", "Food "]);
        assert_eq!(groups[0].amount, 150.5);
    }

    #[test]
    fn test_total_display_rounds_but_keeps_precision() {
        let expenses = [expense("Food", 10.0), expense("food", 5.0)];
        let sum = total(&expenses);
        assert_eq!(sum.to_string(), "15.00");
        assert_eq!(sum.amount, 15.0);

        let fine = total(&[expense("Tips", 0.125), expense("Tips", 0.125)]);
        assert_eq!(fine.amount, 0.25);
        assert_eq!(fine.to_string(), "0.25");
    }

    #[test]
    fn test_total_of_nothing() {
        let sum = total(&[]);
        assert_eq!(sum.to_string(), "0.00");
        assert!(sum.amount.is_sign_positive());
    }

    #[test]
    fn test_total_display_rounds_half_cents_up() {
        assert_eq!(total(&[expense("Tips", 0.125)]).to_string(), "0.13");
        assert_eq!(total(&[expense("Refund", -0.001)]).to_string(), "0.00");
    }

    #[test]
    fn test_chart_colors_cycle() {
        let groups: Vec<_> = (0..7)
            .map(|i| CategoryTotal { category: format!("c{i}"), amount: 1.0 })
            .collect();
        let slices = chart_slices(&groups);
        assert_eq!(slices[0].color, CHART_COLORS[0]);
        assert_eq!(slices[6].color, CHART_COLORS[0]);
        assert_eq!(slices[5].color, "#FF9F40");
    }

    #[test]
    fn test_amount_parsing() {
        let draft = ExpenseDraft { category: "Food".into(), amount: " 12.50 ".into() };
        assert_eq!(Expense::from_draft(&draft, Utc::now()).unwrap().amount, 12.5);

        let draft = ExpenseDraft { category: "Food".into(), amount: "twelve".into() };
        assert_eq!(Expense::from_draft(&draft, Utc::now()).unwrap_err().field, "amount");

        let draft = ExpenseDraft { category: "Food".into(), amount: "inf".into() };
        assert_eq!(Expense::from_draft(&draft, Utc::now()).unwrap_err().field, "amount");

        let draft = ExpenseDraft { category: "".into(), amount: "3".into() };
        assert_eq!(Expense::from_draft(&draft, Utc::now()).unwrap_err().field, "category");
    }
}

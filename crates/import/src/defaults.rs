//! Built-in categorization rules installed by
//! [`with_default_rules`](crate::rules::CategoryRuleEngine::with_default_rules).

use tally_core::TransactionType::{self, Expense, Income};

use crate::rules::CategorizationRule;

const DEFAULT_RULES: &[(&str, &str, TransactionType, i32, &[&str])] = &[
    (
        "Restaurants",
        "Food & Dining",
        Expense,
        2,
        &[
            "restaurant", "cafe", "coffee", "starbucks", "mcdonald", "burger", "pizza", "subway",
            "kfc", "taco", "chipotle", "panera",
        ],
    ),
    (
        "Grocery Stores",
        "Food & Dining",
        Expense,
        2,
        &[
            "grocery", "supermarket", "walmart", "target", "kroger", "safeway", "whole foods",
            "trader joe", "costco", "sam's club",
        ],
    ),
    (
        "Gas Stations",
        "Transportation",
        Expense,
        2,
        &["shell", "exxon", "bp", "chevron", "mobil", "gas station", "fuel", "gasoline"],
    ),
    ("Ride Sharing", "Transportation", Expense, 3, &["uber", "lyft", "taxi", "cab"]),
    (
        "Public Transit",
        "Transportation",
        Expense,
        2,
        &["metro", "subway", "bus", "transit", "mta", "bart"],
    ),
    (
        "Electric/Gas Utilities",
        "Bills & Utilities",
        Expense,
        3,
        &["electric", "electricity", "gas company", "utility", "power", "energy"],
    ),
    (
        "Internet/Phone",
        "Bills & Utilities",
        Expense,
        3,
        &[
            "verizon", "at&t", "comcast", "xfinity", "spectrum", "internet", "phone", "wireless",
            "cellular",
        ],
    ),
    (
        "Streaming Services",
        "Entertainment",
        Expense,
        3,
        &[
            "netflix", "hulu", "disney+", "amazon prime", "spotify", "apple music",
            "youtube premium",
        ],
    ),
    ("Online Shopping", "Shopping", Expense, 1, &["amazon", "ebay", "etsy", "online", "paypal"]),
    (
        "Retail Stores",
        "Shopping",
        Expense,
        2,
        &["target", "walmart", "best buy", "home depot", "lowes", "macy", "nordstrom"],
    ),
    (
        "Medical",
        "Healthcare",
        Expense,
        3,
        &[
            "doctor", "hospital", "clinic", "medical", "pharmacy", "cvs", "walgreens", "dentist",
            "dental",
        ],
    ),
    (
        "Salary/Wages",
        "Income",
        Income,
        3,
        &["payroll", "salary", "wages", "direct deposit", "employer"],
    ),
    (
        "Interest/Dividends",
        "Income",
        Income,
        2,
        &["interest", "dividend", "investment", "return"],
    ),
    (
        "Movies/Theater",
        "Entertainment",
        Expense,
        2,
        &["movie", "theater", "cinema", "amc", "regal"],
    ),
    (
        "Airlines",
        "Travel",
        Expense,
        3,
        &[
            "airline", "airways", "delta", "american airlines", "united", "southwest", "jetblue",
        ],
    ),
    (
        "Hotels",
        "Travel",
        Expense,
        3,
        &["hotel", "motel", "inn", "resort", "marriott", "hilton", "hyatt", "airbnb"],
    ),
];

pub fn default_rules() -> Vec<CategorizationRule> {
    DEFAULT_RULES
        .iter()
        .map(|&(name, category, ty, priority, keywords)| {
            CategorizationRule::new(name, category, keywords.iter().copied(), priority).for_type(ty)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::CategoryRuleEngine;
    use rust_decimal::Decimal;

    fn categorize(desc: &str, ty: TransactionType) -> Option<String> {
        CategoryRuleEngine::with_default_rules()
            .categorize(desc, Decimal::new(2500, 2), ty)
            .map(|r| r.category)
    }

    #[test]
    fn ships_sixteen_valid_rules() {
        assert_eq!(default_rules().len(), 16);
        assert!(CategoryRuleEngine::new(default_rules()).is_ok());
    }

    #[test]
    fn common_merchants() {
        assert_eq!(categorize("STARBUCKS #1234", Expense).as_deref(), Some("Food & Dining"));
        assert_eq!(categorize("SHELL OIL 5551", Expense).as_deref(), Some("Transportation"));
        assert_eq!(categorize("UBER *TRIP", Expense).as_deref(), Some("Transportation"));
        assert_eq!(categorize("ACME CORP PAYROLL", Income).as_deref(), Some("Income"));
    }

    #[test]
    fn type_filter_blocks_expense_rules_for_income() {
        assert_eq!(categorize("STARBUCKS REFUND", Income), None);
    }

    #[test]
    fn priority_three_beats_priority_one() {
        // "amazon prime" (streaming, 3) outranks "amazon" (online shopping, 1).
        assert_eq!(categorize("AMAZON PRIME*2K3", Expense).as_deref(), Some("Entertainment"));
        assert_eq!(categorize("AMAZON MKTPLACE", Expense).as_deref(), Some("Shopping"));
    }
}

//! Fixed lookup lists offered to brief authors.

pub const PRODUCT_CATEGORIES: &[&str] = &[
    "Bakery & Bread",
    "Beverages",
    "Canned & Jarred Goods",
    "Dairy & Eggs",
    "Frozen Foods",
    "Fresh Produce",
    "Meat & Seafood",
    "Snacks & Confectionery",
    "Condiments & Sauces",
    "Grains & Pasta",
    "Health & Wellness",
];

pub const SOURCING_COUNTRIES: &[&str] = &[
    "United States",
    "United Kingdom",
    "Germany",
    "France",
    "Italy",
    "Spain",
    "Netherlands",
    "Belgium",
    "Poland",
    "Turkey",
    "China",
    "India",
    "Thailand",
    "Vietnam",
];

pub fn product_categories() -> Vec<String> {
    PRODUCT_CATEGORIES.iter().map(|c| c.to_string()).collect()
}

pub fn sourcing_countries() -> Vec<String> {
    SOURCING_COUNTRIES.iter().map(|c| c.to_string()).collect()
}

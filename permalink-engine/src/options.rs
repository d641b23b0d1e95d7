use serde::{Deserialize, Serialize};

pub const DEFAULT_URL_SUFFIX: &str = ".html";

/// Generation policy shared by the product and category generators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewriteOptions {
    pub product_url_suffix: String,
    pub category_url_suffix: String,
    /// Emit `category/path/product.html` rewrites for each assigned category
    pub generate_category_paths: bool,
    /// Drop the category-less canonical rewrite whenever a category rewrite exists
    pub category_rewrites_replace_canonical: bool,
}

impl Default for RewriteOptions {
    fn default() -> Self {
        Self {
            product_url_suffix: DEFAULT_URL_SUFFIX.to_string(),
            category_url_suffix: DEFAULT_URL_SUFFIX.to_string(),
            generate_category_paths: true,
            category_rewrites_replace_canonical: false,
        }
    }
}

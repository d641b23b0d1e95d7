// Request path construction for products and categories

use crate::catalog::{Category, CategoryTree, Product, Scope};
use crate::error::{Result, RewriteError};
use crate::options::RewriteOptions;
use crate::rewrite::EntityType;

/// Builds deterministic request paths from url keys and category ancestry.
#[derive(Debug, Clone)]
pub struct PathBuilder {
    product_suffix: String,
    category_suffix: String,
}

impl PathBuilder {
    pub fn new(options: &RewriteOptions) -> Self {
        Self {
            product_suffix: options.product_url_suffix.clone(),
            category_suffix: options.category_url_suffix.clone(),
        }
    }

    /// Slash-joined url keys of the category and its non-root ancestors, without suffix.
    pub fn category_url_path(
        &self,
        category: &Category,
        scope: Scope,
        tree: &CategoryTree,
    ) -> Result<String> {
        let unresolvable = |reason: String| RewriteError::CategoryPathUnresolvable {
            category_id: category.id,
            store_id: scope.store_id(),
            reason,
        };

        if category.is_root() {
            return Err(unresolvable("root categories have no url path".to_string()));
        }

        let mut segments = Vec::with_capacity(category.level() - 1);
        for ancestor_id in category.path.iter().skip(2) {
            let ancestor = tree
                .get(*ancestor_id)
                .ok_or_else(|| unresolvable(format!("ancestor {} is not loaded", ancestor_id)))?;
            let key = ancestor
                .url_key_for(scope)
                .ok_or_else(|| unresolvable(format!("ancestor {} has no url key", ancestor_id)))?;
            segments.push(normalize_segment(key));
        }

        let own_key = category
            .url_key_for(scope)
            .ok_or_else(|| unresolvable("category has no url key".to_string()))?;
        segments.push(normalize_segment(own_key));

        Ok(segments.join("/"))
    }

    pub fn category_request_path(
        &self,
        category: &Category,
        scope: Scope,
        tree: &CategoryTree,
    ) -> Result<String> {
        let path = self.category_url_path(category, scope, tree)?;
        Ok(format!("{}{}", path, self.category_suffix))
    }

    /// Product request path for the scope, optionally nested under a category url path.
    ///
    /// The canonical form honours an explicit store `url_path`; category-aware
    /// paths always use the url key.
    pub fn product_request_path(
        &self,
        product: &Product,
        scope: Scope,
        category_path: Option<&str>,
    ) -> Result<String> {
        let missing = || RewriteError::MissingUrlKey {
            entity_type: EntityType::Product,
            entity_id: product.id,
            store_id: scope.store_id(),
        };

        match category_path {
            Some(category_path) => {
                let key = product.url_key_for(scope).ok_or_else(missing)?;
                Ok(format!(
                    "{}/{}{}",
                    category_path.trim_matches('/'),
                    normalize_segment(key),
                    self.product_suffix
                ))
            }
            None => {
                let segment = match product.url_path_for(scope) {
                    Some(path) => path.trim_matches('/'),
                    None => product.url_key_for(scope).map(normalize_segment).ok_or_else(missing)?,
                };
                if segment.is_empty() {
                    return Err(missing());
                }
                Ok(format!("{}{}", segment, self.product_suffix))
            }
        }
    }
}

fn normalize_segment(key: &str) -> &str {
    key.trim().trim_matches('/')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StoreAttributes;

    fn tree() -> CategoryTree {
        CategoryTree::new(vec![
            Category::new(1, vec![], "root"),
            Category::new(2, vec![1], "default-category"),
            Category::new(3, vec![1, 2], "men").with_store_key(2, "hommes"),
            Category::new(4, vec![1, 2, 3], "shoes").with_store_key(2, "chaussures"),
        ])
    }

    fn builder() -> PathBuilder {
        PathBuilder::new(&RewriteOptions::default())
    }

    #[test]
    fn test_category_path_skips_roots() {
        let tree = tree();
        let shoes = tree.get(4).unwrap();
        let path = builder().category_url_path(shoes, Scope::Global, &tree).unwrap();
        assert_eq!(path, "men/shoes");
    }

    #[test]
    fn test_category_path_uses_store_keys() {
        let tree = tree();
        let shoes = tree.get(4).unwrap();

        assert_eq!(
            builder().category_url_path(shoes, Scope::Store(2), &tree).unwrap(),
            "hommes/chaussures"
        );
        assert_eq!(
            builder().category_url_path(shoes, Scope::Store(1), &tree).unwrap(),
            "men/shoes"
        );
    }

    #[test]
    fn test_category_request_path_has_suffix() {
        let tree = tree();
        let men = tree.get(3).unwrap();
        assert_eq!(
            builder().category_request_path(men, Scope::Global, &tree).unwrap(),
            "men.html"
        );
    }

    #[test]
    fn test_missing_ancestor_is_unresolvable() {
        let tree = CategoryTree::new(vec![Category::new(9, vec![1, 2, 8], "boots")]);
        let boots = tree.get(9).unwrap();

        let err = builder()
            .category_url_path(boots, Scope::Store(1), &tree)
            .unwrap_err();
        assert!(matches!(
            err,
            RewriteError::CategoryPathUnresolvable { category_id: 9, store_id: 1, .. }
        ));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_root_category_is_unresolvable() {
        let tree = tree();
        let root = tree.get(2).unwrap();
        assert!(builder().category_url_path(root, Scope::Global, &tree).is_err());
    }

    #[test]
    fn test_product_canonical_path() {
        let product = Product::new(123, "shoe");
        assert_eq!(
            builder().product_request_path(&product, Scope::Global, None).unwrap(),
            "shoe.html"
        );
    }

    #[test]
    fn test_product_category_path() {
        let product = Product::new(123, "shoe");
        assert_eq!(
            builder()
                .product_request_path(&product, Scope::Store(1), Some("men/shoes"))
                .unwrap(),
            "men/shoes/shoe.html"
        );
    }

    #[test]
    fn test_product_url_path_override_applies_to_canonical_only() {
        let product = Product::new(123, "shoe").with_override(
            1,
            StoreAttributes {
                url_path: Some("sale/shoe".to_string()),
                ..StoreAttributes::default()
            },
        );

        assert_eq!(
            builder().product_request_path(&product, Scope::Store(1), None).unwrap(),
            "sale/shoe.html"
        );
        assert_eq!(
            builder()
                .product_request_path(&product, Scope::Store(1), Some("men"))
                .unwrap(),
            "men/shoe.html"
        );
    }

    #[test]
    fn test_missing_url_key_is_an_error() {
        let mut product = Product::new(7, "");
        product.url_key = None;

        let err = builder()
            .product_request_path(&product, Scope::Store(3), None)
            .unwrap_err();
        assert_eq!(
            err,
            RewriteError::MissingUrlKey {
                entity_type: EntityType::Product,
                entity_id: 7,
                store_id: 3,
            }
        );
        assert!(err.is_fatal());
    }

    #[test]
    fn test_blank_url_key_is_missing() {
        let product = Product::new(7, "   ");
        assert!(builder().product_request_path(&product, Scope::Global, None).is_err());
    }

    #[test]
    fn test_custom_suffix() {
        let options = RewriteOptions {
            product_url_suffix: String::new(),
            ..RewriteOptions::default()
        };
        let product = Product::new(1, "shoe");
        assert_eq!(
            PathBuilder::new(&options)
                .product_request_path(&product, Scope::Global, None)
                .unwrap(),
            "shoe"
        );
    }
}

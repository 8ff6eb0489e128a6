use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a permission record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermissionId(Uuid);

impl PermissionId {
    /// Creates a new random permission identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a permission identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for PermissionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PermissionId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Persisted permission definition.
///
/// The name is the permission's identity; renames go through the registry so
/// they cannot collide. `default_granted` is informational for provisioning
/// flows and is never read by grant evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    /// Stable permission identifier.
    pub id: PermissionId,
    /// Unique permission name, e.g. `view_products`.
    pub name: String,
    /// Optional human-readable description.
    pub description: Option<String>,
    /// Whether provisioning flows grant this permission by default.
    pub default_granted: bool,
}

/// One entry of a canonical permission set handed to registry reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionDefinition {
    /// Unique permission name.
    pub name: String,
    /// Optional human-readable description.
    pub description: Option<String>,
    /// Whether provisioning flows grant this permission by default.
    pub default_granted: bool,
}

impl PermissionDefinition {
    /// Creates a canonical permission definition.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        default_granted: bool,
    ) -> Self {
        Self {
            name: name.into(),
            description: Some(description.into()),
            default_granted,
        }
    }
}

/// Built-in canonical permission set for the platform.
///
/// Reconciling the registry against this set creates missing rows and
/// removes rows whose names are no longer listed here.
#[must_use]
pub fn standard_catalog() -> Vec<PermissionDefinition> {
    STANDARD_PERMISSIONS
        .iter()
        .map(|(name, description, default_granted)| {
            PermissionDefinition::new(*name, *description, *default_granted)
        })
        .collect()
}

static STANDARD_PERMISSIONS: &[(&str, &str, bool)] = &[
    // User administration
    ("view_users", "View the user list", false),
    ("view_user_details", "View user details", false),
    ("create_user", "Create a new user", false),
    ("edit_user", "Edit user information", false),
    ("delete_user", "Delete a user", false),
    ("activate_deactivate_user", "Activate or lock a user", false),
    ("manage_user_permissions", "Manage per-user permissions", false),
    // Group administration
    ("view_groups", "View the group list", false),
    ("view_group_details", "View group details", false),
    ("create_group", "Create a new group", false),
    ("edit_group", "Edit group information", false),
    ("delete_group", "Delete a group", false),
    ("manage_group_members", "Manage group members", false),
    ("manage_group_permissions", "Manage group permissions", false),
    // Permission administration
    ("view_permissions", "View the permission list", false),
    ("create_permission", "Create a new permission", false),
    ("edit_permission", "Edit a permission", false),
    ("delete_permission", "Delete a permission", false),
    // Product management
    ("view_products", "View the product list", true),
    ("view_product_details", "View product details", true),
    ("create_product", "Create a new product", false),
    ("edit_product", "Edit product information", false),
    ("delete_product", "Delete a product", false),
    ("manage_featured_products", "Manage featured products", false),
    ("manage_product_stock", "Manage product stock levels", false),
    // Category management
    ("view_categories", "View the category list", true),
    ("create_category", "Create a new category", false),
    ("edit_category", "Edit a category", false),
    ("delete_category", "Delete a category", false),
    // Cart management
    ("create_cart", "Add products to a cart", true),
    ("view_carts", "View user carts", false),
    ("edit_carts", "Edit user carts", false),
    ("delete_carts", "Delete user carts", false),
    // Wishlist management
    ("view_wishlists", "View user wishlists", false),
    ("edit_wishlists", "Edit user wishlists", false),
    ("delete_wishlists", "Remove products from wishlists", false),
    // Coupon management
    ("view_coupons", "View the coupon list", false),
    ("create_coupon", "Create a new coupon", false),
    ("edit_coupon", "Edit a coupon", false),
    ("delete_coupon", "Delete a coupon", false),
    ("activate_deactivate_coupon", "Activate or deactivate a coupon", false),
    // Order management
    ("view_orders", "View the order list", false),
    ("view_order_details", "View order details", false),
    ("update_shipping_status", "Update shipping status", false),
    ("update_payment_status", "Update payment status", false),
    ("delete_order", "Delete an order", false),
    // Review management
    ("view_reviews", "View the review list", true),
    ("approve_disapprove_review", "Approve or reject a review", false),
    ("delete_review", "Delete a review", false),
    // Platform administration
    ("access_admin_dashboard", "Access the admin dashboard", false),
    ("manage_system_settings", "Manage system settings", false),
    ("view_system_logs", "View system logs", false),
];

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::standard_catalog;

    #[test]
    fn catalog_names_are_unique() {
        let catalog = standard_catalog();
        let names: BTreeSet<&str> = catalog.iter().map(|entry| entry.name.as_str()).collect();
        assert_eq!(names.len(), catalog.len());
    }

    #[test]
    fn catalog_defaults_public_read_entries() {
        let catalog = standard_catalog();
        let granted: BTreeSet<&str> = catalog
            .iter()
            .filter(|entry| entry.default_granted)
            .map(|entry| entry.name.as_str())
            .collect();

        let expected: BTreeSet<&str> = [
            "view_products",
            "view_product_details",
            "view_categories",
            "create_cart",
            "view_reviews",
        ]
        .into_iter()
        .collect();

        assert_eq!(granted, expected);
    }

    #[test]
    fn catalog_entries_carry_descriptions() {
        assert!(
            standard_catalog()
                .iter()
                .all(|entry| entry.description.is_some())
        );
    }
}

//! Repository trait definitions
//!
//! These traits define the contract for catalog data access.
//! Implementations live in the infrastructure layer.

use async_trait::async_trait;

use super::DomainError;

/// Vendor data for API responses
#[derive(Debug, Clone, serde::Serialize)]
pub struct Vendor {
    pub id: i32,
    pub name: String,
    pub code_prefix: String,
    pub address: Option<String>,
    pub contact: Option<String>,
    pub notes: Option<String>,
    pub product_count: u64,
    pub created_at: String,
    pub updated_at: String,
}

/// Input for creating or replacing a vendor
#[derive(Debug, Clone, serde::Deserialize)]
pub struct VendorInput {
    pub name: String,
    pub code_prefix: String,
    pub address: Option<String>,
    pub contact: Option<String>,
    pub notes: Option<String>,
}

impl VendorInput {
    /// Trim text fields, uppercase the code prefix and reject blanks
    pub fn normalized(self) -> Result<Self, DomainError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(DomainError::validation("Vendor name is required"));
        }

        let code_prefix = self.code_prefix.trim().to_uppercase();
        if code_prefix.is_empty() {
            return Err(DomainError::validation("Vendor code prefix is required"));
        }
        if !code_prefix.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(DomainError::validation(
                "Vendor code prefix must be alphanumeric",
            ));
        }

        Ok(Self {
            name,
            code_prefix,
            address: non_blank(self.address),
            contact: non_blank(self.contact),
            notes: non_blank(self.notes),
        })
    }
}

/// Variant as exposed by the catalog
#[derive(Debug, Clone, serde::Serialize)]
pub struct Variant {
    pub id: i32,
    pub color: String,
    pub size: String,
    pub stock: i32,
}

/// Product with its vendor name and variants
#[derive(Debug, Clone, serde::Serialize)]
pub struct Product {
    pub id: i32,
    pub vendor_id: i32,
    pub vendor_name: Option<String>,
    pub code: String,
    pub description: String,
    pub buying_price: f64,
    pub selling_price: f64,
    pub discount_limit: Option<f64>,
    pub is_active: bool,
    pub season: Option<String>,
    pub variants: Vec<Variant>,
    pub total_stock: i32,
}

/// Variant entry of a product input. `id` is set for variants that already exist.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct VariantInput {
    pub id: Option<i32>,
    pub color: String,
    pub size: String,
}

/// Input for creating or replacing a product.
/// Stock is never part of the input; it only moves through invoices.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ProductInput {
    pub vendor_id: i32,
    pub code: String,
    pub description: String,
    pub buying_price: f64,
    pub selling_price: f64,
    pub discount_limit: Option<f64>,
    pub is_active: Option<bool>,
    pub season: Option<String>,
    #[serde(default)]
    pub variants: Vec<VariantInput>,
}

impl ProductInput {
    pub fn normalized(self) -> Result<Self, DomainError> {
        let code = self.code.trim().to_uppercase();
        if code.is_empty() {
            return Err(DomainError::validation("Product code is required"));
        }
        let description = self.description.trim().to_string();
        if description.is_empty() {
            return Err(DomainError::validation("Product description is required"));
        }
        if !(self.buying_price >= 0.0) || !(self.selling_price >= 0.0) {
            return Err(DomainError::validation("Prices must be zero or positive"));
        }
        if let Some(limit) = self.discount_limit
            && !(0.0..=100.0).contains(&limit)
        {
            return Err(DomainError::validation(
                "Discount limit must be between 0 and 100",
            ));
        }

        let mut variants: Vec<VariantInput> = Vec::with_capacity(self.variants.len());
        for v in self.variants {
            let color = v.color.trim().to_string();
            let size = v.size.trim().to_uppercase();
            if color.is_empty() || size.is_empty() {
                return Err(DomainError::validation("Variant color and size are required"));
            }
            if variants
                .iter()
                .any(|o| o.color.eq_ignore_ascii_case(&color) && o.size == size)
            {
                return Err(DomainError::validation(format!(
                    "Duplicate variant {} / {}",
                    color, size
                )));
            }
            variants.push(VariantInput { id: v.id, color, size });
        }

        Ok(Self {
            vendor_id: self.vendor_id,
            code,
            description,
            buying_price: self.buying_price,
            selling_price: self.selling_price,
            discount_limit: self.discount_limit,
            is_active: self.is_active,
            season: non_blank(self.season),
            variants,
        })
    }
}

/// Filter criteria for product queries
#[derive(Debug, Default, Clone)]
pub struct ProductFilter {
    pub vendor_id: Option<i32>,
    pub active: Option<bool>,
    pub query: Option<String>,
}

/// Flattened variant row used to assemble invoice lines
#[derive(Debug, Clone, serde::Serialize)]
pub struct VariantLookup {
    pub variant_id: i32,
    pub product_id: i32,
    pub vendor_id: i32,
    pub product_code: String,
    pub description: String,
    pub color: String,
    pub size: String,
    pub stock: i32,
    pub buying_price: f64,
    pub selling_price: f64,
    pub discount_limit: Option<f64>,
    pub is_active: bool,
}

/// Repository trait for Vendor entity
#[async_trait]
pub trait VendorRepository: Send + Sync {
    /// Find all vendors, ordered by name
    async fn find_all(&self) -> Result<Vec<Vendor>, DomainError>;

    /// Find a vendor by ID
    async fn find_by_id(&self, id: i32) -> Result<Option<Vendor>, DomainError>;

    /// Create a new vendor (name must be unique)
    async fn create(&self, input: VendorInput) -> Result<Vendor, DomainError>;

    /// Replace a vendor's fields
    async fn update(&self, id: i32, input: VendorInput) -> Result<Vendor, DomainError>;

    /// Delete a vendor that has no products and no documents
    async fn delete(&self, id: i32) -> Result<(), DomainError>;

    /// Suggest the next free product code for this vendor
    async fn next_product_code(&self, id: i32) -> Result<String, DomainError>;
}

/// Repository trait for Product entity (and its variants)
#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn find_all(&self, filter: ProductFilter) -> Result<Vec<Product>, DomainError>;

    async fn find_by_id(&self, id: i32) -> Result<Option<Product>, DomainError>;

    /// Create a product with its initial variants (stock 0)
    async fn create(&self, input: ProductInput) -> Result<Product, DomainError>;

    /// Replace product fields and reconcile the variant set
    async fn update(&self, id: i32, input: ProductInput) -> Result<Product, DomainError>;

    async fn set_active(&self, id: i32, active: bool) -> Result<Product, DomainError>;

    /// Delete a product whose variants hold no stock and appear on no document
    async fn delete(&self, id: i32) -> Result<(), DomainError>;

    /// Search variants by product code or description
    async fn search_variants(
        &self,
        query: Option<String>,
        limit: u64,
    ) -> Result<Vec<VariantLookup>, DomainError>;
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product_input() -> ProductInput {
        ProductInput {
            vendor_id: 1,
            code: " acm-0001 ".to_string(),
            description: "Linen shirt".to_string(),
            buying_price: 10.0,
            selling_price: 25.0,
            discount_limit: Some(20.0),
            is_active: None,
            season: Some("  ".to_string()),
            variants: vec![VariantInput {
                id: None,
                color: "Blue ".to_string(),
                size: "m".to_string(),
            }],
        }
    }

    #[test]
    fn vendor_input_is_trimmed_and_prefix_uppercased() {
        let input = VendorInput {
            name: "  Acme  ".to_string(),
            code_prefix: "acm".to_string(),
            address: Some("".to_string()),
            contact: None,
            notes: None,
        }
        .normalized()
        .unwrap();

        assert_eq!(input.name, "Acme");
        assert_eq!(input.code_prefix, "ACM");
        assert_eq!(input.address, None);
    }

    #[test]
    fn vendor_prefix_must_be_alphanumeric() {
        let err = VendorInput {
            name: "Acme".to_string(),
            code_prefix: "A-1".to_string(),
            address: None,
            contact: None,
            notes: None,
        }
        .normalized()
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn product_input_normalizes_code_and_variants() {
        let input = product_input().normalized().unwrap();
        assert_eq!(input.code, "ACM-0001");
        assert_eq!(input.season, None);
        assert_eq!(input.variants[0].color, "Blue");
        assert_eq!(input.variants[0].size, "M");
    }

    #[test]
    fn product_input_rejects_discount_limit_out_of_range() {
        let mut input = product_input();
        input.discount_limit = Some(120.0);
        assert!(input.normalized().is_err());
    }

    #[test]
    fn product_input_rejects_duplicate_variants() {
        let mut input = product_input();
        input.variants.push(VariantInput {
            id: None,
            color: "blue".to_string(),
            size: "M".to_string(),
        });
        assert!(input.normalized().is_err());
    }

    #[test]
    fn product_input_rejects_negative_price() {
        let mut input = product_input();
        input.buying_price = -1.0;
        assert!(input.normalized().is_err());
    }
}

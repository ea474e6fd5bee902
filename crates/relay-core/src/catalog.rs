//! # Product Catalog
//!
//! Products offered through checkout preferences.
//! Loaded from `config/products.toml`; a built-in catalog is used when no file exists.

use serde::{Deserialize, Serialize};

/// Currencies accepted by Mercado Pago sites (ISO 4217)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    ARS,
    BRL,
    CLP,
    COP,
    MXN,
    PEN,
    UYU,
    USD,
}

impl Currency {
    /// Returns the ISO 4217 code as the provider expects it (`currency_id`)
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::ARS => "ARS",
            Currency::BRL => "BRL",
            Currency::CLP => "CLP",
            Currency::COP => "COP",
            Currency::MXN => "MXN",
            Currency::PEN => "PEN",
            Currency::UYU => "UYU",
            Currency::USD => "USD",
        }
    }

    /// Parse a provider `currency_id`
    pub fn from_code(code: &str) -> Option<Self> {
        match code.to_ascii_uppercase().as_str() {
            "ARS" => Some(Currency::ARS),
            "BRL" => Some(Currency::BRL),
            "CLP" => Some(Currency::CLP),
            "COP" => Some(Currency::COP),
            "MXN" => Some(Currency::MXN),
            "PEN" => Some(Currency::PEN),
            "UYU" => Some(Currency::UYU),
            "USD" => Some(Currency::USD),
            _ => None,
        }
    }

    /// Number of decimal places the provider accepts for `unit_price`
    /// (CLP and COP are integer-only)
    pub fn decimal_places(&self) -> u8 {
        match self {
            Currency::CLP | Currency::COP => 0,
            _ => 2,
        }
    }

    /// Round a decimal amount to what this currency can represent
    pub fn round(&self, amount: f64) -> f64 {
        let multiplier = 10_f64.powi(self.decimal_places() as i32);
        (amount * multiplier).round() / multiplier
    }
}

impl Default for Currency {
    fn default() -> Self {
        Currency::ARS
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A product in the catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Unique product identifier (e.g., "asesoramiento")
    pub id: String,

    /// Title shown on the checkout page
    pub title: String,

    /// Short description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Unit price as a decimal amount
    pub unit_price: f64,

    /// Currency
    #[serde(default)]
    pub currency: Currency,

    /// Whether this product is active and available for purchase
    #[serde(default = "default_true")]
    pub active: bool,

    /// Optional image URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture_url: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Product {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        unit_price: f64,
        currency: Currency,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            unit_price: currency.round(unit_price),
            currency,
            active: true,
            picture_url: None,
        }
    }
}

/// Product catalog (loaded from config)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductCatalog {
    /// Product bought when `/create-order` names no items
    #[serde(default)]
    pub default_product: Option<String>,

    #[serde(default)]
    pub products: Vec<Product>,
}

impl ProductCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self {
            default_product: None,
            products: Vec::new(),
        }
    }

    /// The catalog used when no `config/products.toml` is found:
    /// a single personal consultation.
    pub fn builtin() -> Self {
        let product = Product::new("asesoramiento", "Asesoramiento personalizado", 100.0, Currency::ARS);
        Self {
            default_product: Some(product.id.clone()),
            products: vec![product],
        }
    }

    /// Add a product to the catalog
    pub fn add(&mut self, product: Product) {
        self.products.push(product);
    }

    /// Find a product by ID
    pub fn get(&self, id: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    /// The product bought when an order names no items.
    ///
    /// A configured default must be active; an inactive one is never
    /// swapped for another product. Without a configured default the
    /// first active product is used.
    pub fn default_product(&self) -> Option<&Product> {
        match self.default_product.as_deref() {
            Some(id) => self.get(id).filter(|p| p.active),
            None => self.active_products().next(),
        }
    }

    /// Get all active products
    pub fn active_products(&self) -> impl Iterator<Item = &Product> {
        self.products.iter().filter(|p| p.active)
    }

    /// Load catalog from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_rounding() {
        assert_eq!(Currency::ARS.round(10.999), 11.0);
        assert_eq!(Currency::ARS.round(10.994), 10.99);
        assert_eq!(Currency::CLP.round(1500.6), 1501.0);
    }

    #[test]
    fn test_currency_codes() {
        assert_eq!(Currency::from_code("ars"), Some(Currency::ARS));
        assert_eq!(Currency::from_code("BRL"), Some(Currency::BRL));
        assert_eq!(Currency::from_code("XYZ"), None);
        assert_eq!(Currency::MXN.to_string(), "MXN");
    }

    #[test]
    fn test_builtin_catalog() {
        let catalog = ProductCatalog::builtin();
        let product = catalog.default_product().unwrap();

        assert_eq!(product.title, "Asesoramiento personalizado");
        assert_eq!(product.unit_price, 100.0);
        assert_eq!(product.currency, Currency::ARS);
    }

    #[test]
    fn test_catalog_from_toml() {
        let catalog = ProductCatalog::from_toml(
            r#"
            default_product = "mentoria"

            [[products]]
            id = "asesoramiento"
            title = "Asesoramiento personalizado"
            unit_price = 100.0

            [[products]]
            id = "mentoria"
            title = "Mentoria mensual"
            unit_price = 2500.5
            currency = "MXN"
            description = "Cuatro sesiones"

            [[products]]
            id = "retirado"
            title = "Producto retirado"
            unit_price = 10.0
            active = false
            "#,
        )
        .unwrap();

        assert_eq!(catalog.products.len(), 3);
        assert_eq!(catalog.default_product().unwrap().id, "mentoria");
        assert_eq!(catalog.get("mentoria").unwrap().currency, Currency::MXN);
        assert_eq!(catalog.get("asesoramiento").unwrap().currency, Currency::ARS);
        assert_eq!(catalog.active_products().count(), 2);
    }

    #[test]
    fn test_default_product_falls_back_to_first_active() {
        let mut catalog = ProductCatalog::new();
        assert!(catalog.default_product().is_none());

        let mut retired = Product::new("a", "A", 1.0, Currency::ARS);
        retired.active = false;
        catalog.add(retired);
        catalog.add(Product::new("b", "B", 2.0, Currency::ARS));
        assert_eq!(catalog.default_product().unwrap().id, "b");
    }

    #[test]
    fn test_inactive_default_product_is_not_sold() {
        let catalog = ProductCatalog::from_toml(
            r#"
            default_product = "retirado"

            [[products]]
            id = "retirado"
            title = "Producto retirado"
            unit_price = 10.0
            active = false

            [[products]]
            id = "asesoramiento"
            title = "Asesoramiento personalizado"
            unit_price = 100.0
            "#,
        )
        .unwrap();

        assert!(catalog.default_product().is_none());
        assert!(catalog.get("retirado").is_some());
    }
}

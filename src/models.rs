use serde::{Deserialize, Serialize};

/// Tax-inclusive price stored on every product row.
pub fn final_price(sale_price: f64, tax_rate: i32) -> f64 {
    sale_price * (1.0 + tax_rate as f64 / 100.0)
}

/// Two-decimal rounding for displayed money amounts.
pub(crate) fn round2(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Customer,
}

impl Role {
    pub fn from_code(code: i64) -> Role {
        if code == 1 {
            Role::Admin
        } else {
            Role::Customer
        }
    }

    pub fn code(self) -> i64 {
        match self {
            Role::Admin => 1,
            Role::Customer => 2,
        }
    }
}

/// Identity context passed explicitly into every role-dependent read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Viewer {
    Admin,
    Customer(i64),
    Guest,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub phone: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    pub city: String,
    pub province: String,
    pub role: Role,
    pub joined_on: String,
    pub deleted: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub phone: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    pub city: String,
    pub province: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Supplier {
    pub id: i64,
    pub company: String,
    pub tax_id: String,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub city: String,
    pub province: String,
    pub joined_on: String,
    pub deleted: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NewSupplier {
    pub company: String,
    pub tax_id: String,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub city: String,
    pub province: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub image_path: String,
    pub deleted: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Product {
    pub id: i64,
    pub category_id: i64,
    pub category_name: Option<String>,
    pub brand: String,
    pub model: String,
    pub description: String,
    pub supplier_id: i64,
    pub purchase_price: f64,
    pub sale_price: f64,
    pub tax_rate: i32,
    pub max_quantity: i32,
    pub stock: i32,
    pub final_price: f64,
    pub deleted: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NewProduct {
    pub category_id: i64,
    pub brand: String,
    pub model: String,
    pub description: String,
    pub supplier_id: i64,
    pub purchase_price: f64,
    pub sale_price: f64,
    pub tax_rate: i32,
    pub max_quantity: i32,
    pub stock: i32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateProduct {
    pub id: i64,
    pub category_id: i64,
    pub brand: String,
    pub model: String,
    pub description: String,
    pub supplier_id: i64,
    pub purchase_price: f64,
    pub sale_price: f64,
    pub tax_rate: i32,
    pub max_quantity: i32,
    pub stock: i32,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Order {
    pub id: i64,
    pub customer_id: i64,
    pub customer_username: Option<String>,
    pub created_on: String,
}

/// One requested (product, quantity) pair of a cart submission.
#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
pub struct ItemRequest {
    pub product_id: i64,
    pub quantity: i32,
}

/// Line detail joined against the product catalog for display.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OrderLine {
    pub product_id: i64,
    pub category_name: Option<String>,
    pub brand: String,
    pub model: String,
    pub quantity: i32,
    pub sale_price: f64,
    pub tax_rate: i32,
    pub line_total: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OrderView {
    pub order: Order,
    pub lines: Vec<OrderLine>,
    pub total: f64,
}

/// Non-fatal notice that a requested quantity was clamped to available stock.
#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
pub struct StockAdjustment {
    pub product_id: i64,
    pub requested: i32,
    pub fulfilled: i32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PlacedOrder {
    pub order: OrderView,
    pub adjustments: Vec<StockAdjustment>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Invoice {
    pub id: i64,
    pub customer_id: i64,
    pub customer_username: Option<String>,
    pub created_on: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct InvoiceView {
    pub invoice: Invoice,
    pub lines: Vec<OrderLine>,
    pub total: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LedgerEntry {
    pub id: i64,
    pub product_id: i64,
    pub customer_id: Option<i64>,
    pub supplier_id: i64,
    pub quantity: i32,
    pub entry_date: String,
    pub amount: f64,
    pub balance: f64,
}

/// A ledger entry joined with its product, customer and supplier names.
/// The running balance is only disclosed to administrators.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Movement {
    pub id: i64,
    pub model: String,
    pub customer: Option<String>,
    pub supplier: String,
    pub quantity: i32,
    pub entry_date: String,
    pub amount: f64,
    pub balance: Option<f64>,
}

/// Twelve monthly figures for one calendar year with ledger activity.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct YearlyLedger {
    pub year: i32,
    pub months: [f64; 12],
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProductMargin {
    pub product_id: i64,
    pub brand: String,
    pub model: String,
    pub purchase_price: f64,
    pub sale_price: f64,
    pub margin: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MarginReport {
    pub highest: Vec<ProductMargin>,
    pub lowest: Vec<ProductMargin>,
}

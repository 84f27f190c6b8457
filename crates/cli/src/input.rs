use clap::Args;
use record::Order;

/// Current time in the format used by the order export.
pub fn now_utc() -> String {
    chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Fields of an order entered by hand.
#[derive(Args, Debug, Clone, Default)]
pub struct NewOrder {
    /// Unique order id
    #[arg(long)]
    pub order_id: i64,

    #[arg(long)]
    pub product_id: i64,

    #[arg(long, default_value_t = 1)]
    pub quantity: i32,

    #[arg(long)]
    pub category_id: i64,

    /// Category label, e.g. jewelry.ring
    #[arg(long, default_value = "")]
    pub category_alias: String,

    #[arg(long, default_value_t = 0)]
    pub brand_id: i32,

    /// Unit price in USD
    #[arg(long)]
    pub price: f64,

    #[arg(long, default_value_t = 0)]
    pub user_id: i64,

    /// Single-letter gender code (f, m)
    #[arg(long, default_value = "")]
    pub gender: String,

    #[arg(long, default_value = "")]
    pub color: String,

    #[arg(long, default_value = "")]
    pub metal: String,

    #[arg(long, default_value = "")]
    pub gem: String,

    /// Order date; defaults to now
    #[arg(long)]
    pub timestamp: Option<String>,
}

impl NewOrder {
    pub fn into_order(self) -> Order {
        Order {
            timestamp: self.timestamp.unwrap_or_else(now_utc),
            order_id: self.order_id,
            product_id: self.product_id,
            quantity: self.quantity,
            category_id: self.category_id,
            category_alias: self.category_alias,
            brand_id: self.brand_id,
            price: self.price,
            user_id: self.user_id,
            gender: self.gender.bytes().next().unwrap_or(0),
            color: self.color,
            metal: self.metal,
            gem: self.gem,
        }
    }
}

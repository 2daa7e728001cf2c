use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Profit of a lot: `(sell − cost) × quantity`.
pub fn compute_profit(quantity: u32, cost_price: f64, sell_price: f64) -> f64 {
    (sell_price - cost_price) * f64::from(quantity)
}

/// A single ledger entry: an item bought or crafted, and optionally sold.
///
/// `profit` is derived from the price and quantity fields and is rewritten
/// by the ledger every time one of them changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    /// Assigned by the repository on insert, never reused
    pub id: u64,

    pub item_name: String,

    pub quantity: u32,

    /// Cost of the lot per unit
    pub cost_price: f64,

    /// Sell price per unit (0 until a price is set)
    pub sell_price: f64,

    /// When the entry was recorded. Immutable after creation.
    pub added_date: DateTime<Utc>,

    /// `None` means the item has not been sold yet
    #[serde(default)]
    pub sell_date: Option<DateTime<Utc>>,

    pub profit: f64,
}

impl Sale {
    /// Build a record from input data. The id is a placeholder until the
    /// repository assigns one.
    pub fn from_new(new: NewSale) -> Self {
        let profit = compute_profit(new.quantity, new.cost_price, new.sell_price);
        Self {
            id: 0,
            item_name: new.item_name,
            quantity: new.quantity,
            cost_price: new.cost_price,
            sell_price: new.sell_price,
            added_date: new.added_date.unwrap_or_else(Utc::now),
            sell_date: new.sell_date,
            profit,
        }
    }

    /// `sell_price × quantity`
    pub fn turnover(&self) -> f64 {
        self.sell_price * f64::from(self.quantity)
    }

    pub fn is_sold(&self) -> bool {
        self.sell_date.is_some()
    }

    /// Merge a patch into this record. Profit is taken from the patch as-is;
    /// the ledger is responsible for putting a recomputed value there.
    pub fn apply(&mut self, patch: &SalePatch) {
        if let Some(name) = &patch.item_name {
            self.item_name = name.clone();
        }
        if let Some(quantity) = patch.quantity {
            self.quantity = quantity;
        }
        if let Some(cost) = patch.cost_price {
            self.cost_price = cost;
        }
        if let Some(sell) = patch.sell_price {
            self.sell_price = sell;
        }
        if let Some(sell_date) = patch.sell_date {
            self.sell_date = sell_date;
        }
        if let Some(profit) = patch.profit {
            self.profit = profit;
        }
    }

    /// Data for inserting a copy of this record.
    pub fn to_new_sale(&self) -> NewSale {
        NewSale {
            item_name: self.item_name.clone(),
            quantity: self.quantity,
            cost_price: self.cost_price,
            sell_price: self.sell_price,
            added_date: None,
            sell_date: self.sell_date,
        }
    }
}

/// Input for `SalesLedger::add_sale`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSale {
    pub item_name: String,
    pub quantity: u32,
    pub cost_price: f64,
    #[serde(default)]
    pub sell_price: f64,
    /// Defaults to the insertion time
    #[serde(default)]
    pub added_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sell_date: Option<DateTime<Utc>>,
}

impl NewSale {
    pub fn new(item_name: impl Into<String>, quantity: u32, cost_price: f64, sell_price: f64) -> Self {
        Self {
            item_name: item_name.into(),
            quantity,
            cost_price,
            sell_price,
            added_date: None,
            sell_date: None,
        }
    }

    pub fn sold_on(mut self, date: DateTime<Utc>) -> Self {
        self.sell_date = Some(date);
        self
    }
}

/// Partial update of a sale. `None` leaves a field untouched.
///
/// `sell_date` is doubly optional: `Some(None)` clears the date and marks
/// the sale as unsold again. There is no `added_date` field on purpose.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sell_price: Option<f64>,
    #[serde(
        default,
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub sell_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profit: Option<f64>,
}

impl SalePatch {
    pub fn item_name(mut self, name: impl Into<String>) -> Self {
        self.item_name = Some(name.into());
        self
    }

    pub fn quantity(mut self, quantity: u32) -> Self {
        self.quantity = Some(quantity);
        self
    }

    pub fn cost_price(mut self, cost: f64) -> Self {
        self.cost_price = Some(cost);
        self
    }

    pub fn sell_price(mut self, sell: f64) -> Self {
        self.sell_price = Some(sell);
        self
    }

    pub fn sell_date(mut self, date: Option<DateTime<Utc>>) -> Self {
        self.sell_date = Some(date);
        self
    }

    /// True if the patch changes any input of the profit formula.
    pub fn touches_profit(&self) -> bool {
        self.quantity.is_some() || self.cost_price.is_some() || self.sell_price.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self == &SalePatch::default()
    }
}

/// A field that is present in the input is `Some`, even when it is `null`.
fn present_or_null<'de, D, T>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

/// Conjunction of optional filters for `list_sales`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaleFilter {
    /// Case-insensitive substring of the item name
    pub item_name: Option<String>,
    /// `Some(true)` = sold only, `Some(false)` = unsold only
    pub sold: Option<bool>,
}

impl SaleFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn name(mut self, term: impl Into<String>) -> Self {
        self.item_name = Some(term.into());
        self
    }

    pub fn sold(mut self, sold: bool) -> Self {
        self.sold = Some(sold);
        self
    }

    pub fn matches(&self, sale: &Sale) -> bool {
        let name_ok = match &self.item_name {
            Some(term) if !term.is_empty() => sale
                .item_name
                .to_lowercase()
                .contains(&term.to_lowercase()),
            _ => true,
        };
        let sold_ok = self.sold.is_none_or(|sold| sale.is_sold() == sold);
        name_ok && sold_ok
    }
}

/// One page of `list_sales` results.
#[derive(Debug, Clone, PartialEq)]
pub struct SalePage {
    pub sales: Vec<Sale>,
    /// Number of records matching the filter across all pages
    pub total: u64,
    /// 1-based
    pub page: u32,
    pub page_size: u32,
}

impl SalePage {
    pub fn total_pages(&self) -> u64 {
        self.total.div_ceil(u64::from(self.page_size.max(1)))
    }

    /// 1-based index of the first record on this page, 0 if the page is empty.
    pub fn first_index(&self) -> u64 {
        if self.sales.is_empty() {
            return 0;
        }
        u64::from(self.page - 1) * u64::from(self.page_size) + 1
    }

    /// 1-based index of the last record on this page, 0 if the page is empty.
    pub fn last_index(&self) -> u64 {
        if self.sales.is_empty() {
            return 0;
        }
        self.first_index() + self.sales.len() as u64 - 1
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        u64::from(self.page) < self.total_pages()
    }
}

/// Aggregates over the whole ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SalesTotals {
    pub total_profit: f64,
    pub total_turnover: f64,
}

/// Field expression summed by `SaleRepository::aggregate_sum`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SumField {
    /// `profit`
    Profit,
    /// `sell_price × quantity`
    Turnover,
}

impl SumField {
    pub fn value_of(&self, sale: &Sale) -> f64 {
        match self {
            SumField::Profit => sale.profit,
            SumField::Turnover => sale.turnover(),
        }
    }
}

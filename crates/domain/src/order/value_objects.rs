//! Value objects for the order domain.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Money amount represented in cents to avoid floating point issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money {
    /// Amount in cents (e.g., 1000 = $10.00)
    cents: i64,
}

impl Money {
    /// Creates a new Money amount from cents.
    pub fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    /// Creates a Money amount from a decimal value in major units, rounding
    /// to the nearest cent.
    ///
    /// Wire payloads carry amounts as JSON numbers (`25.0`), which is where
    /// this conversion happens.
    pub fn from_major(amount: f64) -> Self {
        Self {
            cents: (amount * 100.0).round() as i64,
        }
    }

    /// Returns zero money.
    pub fn zero() -> Self {
        Self { cents: 0 }
    }

    /// Returns the amount in cents.
    pub fn cents(&self) -> i64 {
        self.cents
    }

    /// Returns the amount in major units as a float, for wire payloads.
    pub fn as_major(&self) -> f64 {
        self.cents as f64 / 100.0
    }

    /// Returns the dollar portion (whole number).
    pub fn dollars(&self) -> i64 {
        self.cents / 100
    }

    /// Returns the cents portion (remainder after dollars).
    pub fn cents_part(&self) -> i64 {
        self.cents.abs() % 100
    }

    /// Returns true if the amount is positive.
    pub fn is_positive(&self) -> bool {
        self.cents > 0
    }

    /// Multiplies by a quantity.
    pub fn multiply(&self, quantity: u32) -> Money {
        Money {
            cents: self.cents * quantity as i64,
        }
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.cents < 0 {
            write!(f, "-${}.{:02}", self.dollars().abs(), self.cents_part())
        } else {
            write!(f, "${}.{:02}", self.dollars(), self.cents_part())
        }
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money {
            cents: self.cents + rhs.cents,
        }
    }
}

impl std::ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.cents += rhs.cents;
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

/// Total amount of an order. Always strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Money", into = "Money")]
pub struct Amount(Money);

impl Amount {
    /// Validates and wraps a money value.
    pub fn new(amount: Money) -> Result<Self, ValidationError> {
        if !amount.is_positive() {
            return Err(ValidationError::InvalidAmount { amount });
        }
        Ok(Self(amount))
    }

    /// Computes the amount as the sum of `quantity × unit_price` over `items`.
    ///
    /// Fails with [`ValidationError::NoItems`] for an empty slice.
    pub fn from_items(items: &[super::OrderItem]) -> Result<Self, ValidationError> {
        if items.is_empty() {
            return Err(ValidationError::NoItems);
        }
        Self::new(items.iter().map(|item| item.total_price()).sum())
    }

    /// Returns the underlying money value.
    pub fn money(&self) -> Money {
        self.0
    }
}

impl TryFrom<Money> for Amount {
    type Error = ValidationError;

    fn try_from(value: Money) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Money {
    fn from(value: Amount) -> Self {
        value.0
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Price per unit of an order item. Always strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Money", into = "Money")]
pub struct UnitPrice(Money);

impl UnitPrice {
    /// Validates and wraps a money value.
    pub fn new(price: Money) -> Result<Self, ValidationError> {
        if !price.is_positive() {
            return Err(ValidationError::InvalidUnitPrice { price });
        }
        Ok(Self(price))
    }

    /// Returns the underlying money value.
    pub fn money(&self) -> Money {
        self.0
    }
}

impl TryFrom<Money> for UnitPrice {
    type Error = ValidationError;

    fn try_from(value: Money) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UnitPrice> for Money {
    fn from(value: UnitPrice) -> Self {
        value.0
    }
}

/// Number of units ordered. Always strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Quantity(u32);

impl Quantity {
    /// Validates and wraps a quantity.
    pub fn new(quantity: u32) -> Result<Self, ValidationError> {
        if quantity == 0 {
            return Err(ValidationError::InvalidQuantity { quantity });
        }
        Ok(Self(quantity))
    }

    /// Returns the quantity as an integer.
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for Quantity {
    type Error = ValidationError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quantity> for u32 {
    fn from(value: Quantity) -> Self {
        value.0
    }
}

/// Product identifier (SKU). Never blank.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProductId(String);

impl ProductId {
    /// Validates and wraps a product identifier.
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ValidationError::EmptyProductId);
        }
        Ok(Self(id))
    }

    /// Returns the product ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ProductId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ProductId> for String {
    fn from(value: ProductId) -> Self {
        value.0
    }
}

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Human-readable name, between 3 and 100 characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Name(String);

impl Name {
    pub const MIN_LEN: usize = 3;
    pub const MAX_LEN: usize = 100;

    /// Validates and wraps a name.
    pub fn new(name: impl Into<String>) -> Result<Self, ValidationError> {
        let name = name.into();
        let len = name.chars().count();
        if !(Self::MIN_LEN..=Self::MAX_LEN).contains(&len) {
            return Err(ValidationError::InvalidName {
                name,
                min: Self::MIN_LEN,
                max: Self::MAX_LEN,
            });
        }
        Ok(Self(name))
    }

    /// Returns the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Name {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Name> for String {
    fn from(value: Name) -> Self {
        value.0
    }
}

impl std::fmt::Display for Name {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_from_cents() {
        let money = Money::from_cents(1234);
        assert_eq!(money.cents(), 1234);
        assert_eq!(money.dollars(), 12);
        assert_eq!(money.cents_part(), 34);
    }

    #[test]
    fn test_money_from_major_rounds_to_cents() {
        assert_eq!(Money::from_major(25.0).cents(), 2500);
        assert_eq!(Money::from_major(19.999).cents(), 2000);
        assert_eq!(Money::from_major(0.1 + 0.2).cents(), 30);
    }

    #[test]
    fn test_money_display() {
        assert_eq!(Money::from_cents(1234).to_string(), "$12.34");
        assert_eq!(Money::from_cents(5).to_string(), "$0.05");
        assert_eq!(Money::from_cents(-1234).to_string(), "-$12.34");
    }

    #[test]
    fn test_money_sum() {
        let total: Money = [100, 250, 5].into_iter().map(Money::from_cents).sum();
        assert_eq!(total.cents(), 355);
    }

    #[test]
    fn test_amount_must_be_positive() {
        assert!(Amount::new(Money::from_cents(1)).is_ok());
        assert_eq!(
            Amount::new(Money::zero()),
            Err(ValidationError::InvalidAmount {
                amount: Money::zero()
            })
        );
        assert!(Amount::new(Money::from_cents(-5)).is_err());
    }

    #[test]
    fn test_amount_from_no_items_fails() {
        assert_eq!(Amount::from_items(&[]), Err(ValidationError::NoItems));
    }

    #[test]
    fn test_unit_price_must_be_positive() {
        assert!(UnitPrice::new(Money::from_cents(999)).is_ok());
        assert!(matches!(
            UnitPrice::new(Money::zero()),
            Err(ValidationError::InvalidUnitPrice { .. })
        ));
    }

    #[test]
    fn test_quantity_must_be_positive() {
        assert_eq!(Quantity::new(3).unwrap().value(), 3);
        assert_eq!(
            Quantity::new(0),
            Err(ValidationError::InvalidQuantity { quantity: 0 })
        );
    }

    #[test]
    fn test_product_id_rejects_blank() {
        assert_eq!(ProductId::new("SKU-001").unwrap().as_str(), "SKU-001");
        assert_eq!(ProductId::new(""), Err(ValidationError::EmptyProductId));
        assert_eq!(ProductId::new("  "), Err(ValidationError::EmptyProductId));
    }

    #[test]
    fn test_name_length_bounds() {
        assert!(Name::new("abc").is_ok());
        assert!(Name::new("a".repeat(100)).is_ok());
        assert!(Name::new("ab").is_err());
        assert!(Name::new("a".repeat(101)).is_err());
        // Counted in characters, not bytes.
        assert!(Name::new("äöü").is_ok());
    }

    #[test]
    fn test_deserialization_validates() {
        assert!(serde_json::from_str::<Quantity>("0").is_err());
        assert!(serde_json::from_str::<ProductId>("\"\"").is_err());
        assert_eq!(serde_json::from_str::<Quantity>("2").unwrap().value(), 2);
    }
}

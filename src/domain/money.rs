use crate::domain::name::Name;
use crate::error::LedgerError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const SECONDS_PER_HOUR: i128 = 3600;
const MAX_SYMBOL_LEN: usize = 7;
const MAX_PRECISION: u32 = 18;

/// A currency code together with its fixed number of decimal places.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol {
    pub code: String,
    pub precision: u32,
}

impl Symbol {
    pub fn new(code: impl Into<String>, precision: u32) -> Result<Self, LedgerError> {
        let symbol = Self {
            code: code.into(),
            precision,
        };
        symbol.validate()?;
        Ok(symbol)
    }

    /// Checks the code is 1 to 7 uppercase ASCII letters and the precision is in range.
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.code.is_empty()
            || self.code.len() > MAX_SYMBOL_LEN
            || !self.code.bytes().all(|b| b.is_ascii_uppercase())
        {
            return Err(LedgerError::InvalidCurrency(format!(
                "invalid symbol code '{}'",
                self.code
            )));
        }
        if self.precision > MAX_PRECISION {
            return Err(LedgerError::InvalidCurrency(format!(
                "symbol precision {} exceeds {MAX_PRECISION}",
                self.precision
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.precision, self.code)
    }
}

/// A symbol as issued by a specific token authority.
///
/// Two tokens with the same code from different issuers are different currencies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Currency {
    pub symbol: Symbol,
    pub issuer: Name,
}

impl Currency {
    pub fn new(symbol: Symbol, issuer: Name) -> Self {
        Self { symbol, issuer }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.symbol.code, self.issuer)
    }
}

/// A strictly positive decimal quantity.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, LedgerError> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(LedgerError::PreconditionFailed(
                "amount must be positive".to_string(),
            ))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = LedgerError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

/// A quantity of a specific currency, carried at exactly the symbol's precision.
///
/// Arithmetic is checked: mixing currencies fails with `InvalidCurrency` and
/// going below zero fails with `InsufficientFunds`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    amount: Decimal,
    currency: Currency,
}

impl Money {
    pub fn new(amount: Decimal, currency: Currency) -> Result<Self, LedgerError> {
        currency.symbol.validate()?;
        let precision = currency.symbol.precision;
        if amount.normalize().scale() > precision {
            return Err(LedgerError::InvalidCurrency(format!(
                "{amount} has more than {precision} decimal places for {}",
                currency.symbol.code
            )));
        }
        let mut amount = amount;
        amount.rescale(precision);
        Self::at_precision(amount, currency)
    }

    /// Rejects amounts that lost decimal places to a full mantissa.
    fn at_precision(amount: Decimal, currency: Currency) -> Result<Self, LedgerError> {
        if amount.scale() != currency.symbol.precision {
            return Err(LedgerError::PreconditionFailed(format!(
                "{amount} {} overflows at precision {}",
                currency.symbol.code, currency.symbol.precision
            )));
        }
        Ok(Self { amount, currency })
    }

    pub fn zero(currency: Currency) -> Self {
        let mut amount = Decimal::ZERO;
        amount.rescale(currency.symbol.precision);
        Self { amount, currency }
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn currency(&self) -> &Currency {
        &self.currency
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// Fails with `InvalidCurrency` unless `other` is in the same currency.
    pub fn ensure_same_currency(&self, other: &Currency) -> Result<(), LedgerError> {
        if self.currency.symbol != other.symbol {
            return Err(LedgerError::InvalidCurrency(format!(
                "expected symbol {}, got {}",
                self.currency.symbol, other.symbol
            )));
        }
        if self.currency.issuer != other.issuer {
            return Err(LedgerError::InvalidCurrency(format!(
                "expected issuer {}, got {}",
                self.currency.issuer, other.issuer
            )));
        }
        Ok(())
    }

    pub fn checked_add(&self, rhs: &Money) -> Result<Money, LedgerError> {
        self.ensure_same_currency(&rhs.currency)?;
        let amount = self.amount.checked_add(rhs.amount).ok_or_else(|| {
            LedgerError::PreconditionFailed(format!("{self} + {rhs} overflows"))
        })?;
        Self::at_precision(amount, self.currency.clone())
    }

    pub fn checked_sub(&self, rhs: &Money) -> Result<Money, LedgerError> {
        self.ensure_same_currency(&rhs.currency)?;
        if rhs.amount > self.amount {
            return Err(LedgerError::InsufficientFunds(format!(
                "{rhs} exceeds {self}"
            )));
        }
        Ok(Self {
            amount: self.amount - rhs.amount,
            currency: self.currency.clone(),
        })
    }

    /// Amount in the smallest unit of the currency (e.g. 10.0000 -> 100000).
    fn minor_units(&self) -> i128 {
        let mut amount = self.amount;
        amount.rescale(self.currency.symbol.precision);
        amount.mantissa()
    }

    /// Pay owed for `seconds` of work when `self` is an hourly rate.
    ///
    /// Computed exactly in minor units and rounded toward zero:
    /// `floor(rate_units * seconds / 3600)`. No floating point is involved,
    /// so the result is identical on every platform and for every call.
    pub fn prorate(&self, seconds: i64) -> Result<Money, LedgerError> {
        if seconds < 0 {
            return Err(LedgerError::PreconditionFailed(
                "cannot prorate negative time".to_string(),
            ));
        }
        let units = self
            .minor_units()
            .checked_mul(i128::from(seconds))
            .ok_or_else(|| {
                LedgerError::PreconditionFailed(format!("payment for {seconds}s overflows"))
            })?
            .div_euclid(SECONDS_PER_HOUR);
        let amount = Decimal::try_from_i128_with_scale(units, self.currency.symbol.precision)
            .map_err(|_| {
                LedgerError::PreconditionFailed(format!("payment for {seconds}s overflows"))
            })?;
        Ok(Self {
            amount,
            currency: self.currency.clone(),
        })
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}@{}",
            self.amount, self.currency.symbol.code, self.currency.issuer
        )
    }
}

/// Parses `"<amount> <CODE>@<issuer>"`, e.g. `"10.0000 USD@token"`.
///
/// The precision of the currency is the number of decimal places written.
impl FromStr for Money {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (amount, rest) = s
            .split_once(' ')
            .ok_or_else(|| LedgerError::Parse(format!("'{s}' is not '<amount> <CODE>@<issuer>'")))?;
        let (code, issuer) = rest
            .trim()
            .split_once('@')
            .ok_or_else(|| LedgerError::Parse(format!("'{s}' is missing '@<issuer>'")))?;
        let amount = Decimal::from_str(amount)
            .map_err(|e| LedgerError::Parse(format!("bad amount '{amount}': {e}")))?;
        let symbol = Symbol::new(code, amount.scale())?;
        let issuer = Name::new(issuer)?;
        Money::new(amount, Currency::new(symbol, issuer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn usd() -> Currency {
        Currency::new(Symbol::new("USD", 4).unwrap(), Name::new("token").unwrap())
    }

    fn usd_amount(value: Decimal) -> Money {
        Money::new(value, usd()).unwrap()
    }

    #[test]
    fn test_amount_validation() {
        assert!(Amount::new(dec!(1.0)).is_ok());
        assert!(matches!(
            Amount::new(dec!(0.0)),
            Err(LedgerError::PreconditionFailed(_))
        ));
        assert!(matches!(
            Amount::new(dec!(-1.0)),
            Err(LedgerError::PreconditionFailed(_))
        ));
    }

    #[test]
    fn test_symbol_validation() {
        assert!(Symbol::new("USD", 4).is_ok());
        assert!(matches!(
            Symbol::new("usd", 4),
            Err(LedgerError::InvalidCurrency(_))
        ));
        assert!(matches!(
            Symbol::new("TOOLONGX", 4),
            Err(LedgerError::InvalidCurrency(_))
        ));
        assert!(matches!(
            Symbol::new("USD", 19),
            Err(LedgerError::InvalidCurrency(_))
        ));
    }

    #[test]
    fn test_money_parse_and_display() {
        let money: Money = "10.0000 USD@token".parse().unwrap();
        assert_eq!(money.amount(), dec!(10.0000));
        assert_eq!(money.currency(), &usd());
        assert_eq!(money.to_string(), "10.0000 USD@token");

        assert!(matches!(
            "10.0000 USD".parse::<Money>(),
            Err(LedgerError::Parse(_))
        ));
        assert!(matches!(
            "ten USD@token".parse::<Money>(),
            Err(LedgerError::Parse(_))
        ));
    }

    #[test]
    fn test_money_rejects_excess_precision() {
        assert!(matches!(
            Money::new(dec!(1.00001), usd()),
            Err(LedgerError::InvalidCurrency(_))
        ));
        // Trailing zeros beyond the precision are harmless.
        let money = Money::new(dec!(1.500000), usd()).unwrap();
        assert_eq!(money.to_string(), "1.5000 USD@token");
    }

    #[test]
    fn test_checked_arithmetic() {
        let ten = usd_amount(dec!(10));
        let four = usd_amount(dec!(4));
        assert_eq!(ten.checked_add(&four).unwrap(), usd_amount(dec!(14)));
        assert_eq!(ten.checked_sub(&four).unwrap(), usd_amount(dec!(6)));
        assert!(matches!(
            four.checked_sub(&ten),
            Err(LedgerError::InsufficientFunds(_))
        ));
    }

    #[test]
    fn test_checked_arithmetic_rejects_other_issuer() {
        let ten = usd_amount(dec!(10));
        let fake = Money::new(
            dec!(1),
            Currency::new(Symbol::new("USD", 4).unwrap(), Name::new("faketoken").unwrap()),
        )
        .unwrap();
        assert!(matches!(
            ten.checked_add(&fake),
            Err(LedgerError::InvalidCurrency(_))
        ));
    }

    #[test]
    fn test_prorate_whole_and_partial_hours() {
        let rate = usd_amount(dec!(10.0000));
        assert_eq!(rate.prorate(3600).unwrap(), usd_amount(dec!(10.0000)));
        assert_eq!(rate.prorate(1800).unwrap(), usd_amount(dec!(5.0000)));
        assert_eq!(rate.prorate(0).unwrap(), usd_amount(dec!(0)));
    }

    #[test]
    fn test_prorate_floors_to_minor_unit() {
        // 10.0000/h for 1s = 0.002777.. -> 0.0027
        let rate = usd_amount(dec!(10.0000));
        assert_eq!(rate.prorate(1).unwrap(), usd_amount(dec!(0.0027)));

        // 0.0001/h for 1s rounds to nothing
        let tiny = usd_amount(dec!(0.0001));
        assert!(tiny.prorate(1).unwrap().is_zero());
    }

    #[test]
    fn test_add_near_mantissa_limit_overflows() {
        let half = usd_amount(dec!(5000000000000000000000000.0001));
        assert!(matches!(
            half.checked_add(&half),
            Err(LedgerError::PreconditionFailed(_))
        ));

        let tiny = usd_amount(dec!(0.0001));
        assert_eq!(
            half.checked_add(&tiny).unwrap().amount(),
            dec!(5000000000000000000000000.0002)
        );
    }

    #[test]
    fn test_money_new_rejects_values_too_wide_for_precision() {
        // Fits as an integer, but not with four decimal places.
        assert!(matches!(
            Money::new(Decimal::MAX, usd()),
            Err(LedgerError::PreconditionFailed(_))
        ));
    }

    #[test]
    fn test_prorate_rejects_negative() {
        let rate = usd_amount(dec!(10));
        assert!(matches!(
            rate.prorate(-1),
            Err(LedgerError::PreconditionFailed(_))
        ));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_split_prorate_never_overpays(
            rate_units in 1i64..10_000_000,
            splits in prop::collection::vec(1i64..20_000, 1..8),
        ) {
            let rate = usd_amount(Decimal::new(rate_units, 4));
            let total: i64 = splits.iter().sum();
            let whole = rate.prorate(total).unwrap().amount();
            let parts: Decimal = splits
                .iter()
                .map(|s| rate.prorate(*s).unwrap().amount())
                .sum();

            prop_assert!(parts <= whole);
            // Each split floors away less than one minor unit.
            prop_assert!(whole - parts < Decimal::new(splits.len() as i64, 4));
        }
    }
}

use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;
use uuid::Uuid;

use crate::bank::Bank;
use crate::error::StoreError;
use crate::ledger::{AMOUNT_SCALE, MAX_AMOUNT};
use crate::models::{Currency, Transaction};

/// UZS per USDT used when no rate is configured.
pub const DEFAULT_UZS_PER_USDT: Decimal = Decimal::from_parts(12_700, 0, 0, false, 0);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConversionError {
    #[error("Exchange rate must be greater than zero")]
    InvalidRate,
    #[error("Amount must be greater than zero")]
    NonPositiveAmount,
    #[error("{amount_uzs} UZS is worth less than 0.01 USDT")]
    BelowMinimum { amount_uzs: Decimal },
    #[error("{amount_uzs} UZS exceeds the largest convertible amount")]
    AboveMaximum { amount_uzs: Decimal },
}

/// Fixed UZS→USDT rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExchangeRate {
    uzs_per_usdt: Decimal,
}

impl Default for ExchangeRate {
    fn default() -> Self {
        Self {
            uzs_per_usdt: DEFAULT_UZS_PER_USDT,
        }
    }
}

impl ExchangeRate {
    pub fn new(uzs_per_usdt: Decimal) -> Result<Self, ConversionError> {
        if uzs_per_usdt <= Decimal::ZERO {
            return Err(ConversionError::InvalidRate);
        }
        Ok(Self { uzs_per_usdt })
    }

    pub fn uzs_per_usdt(&self) -> Decimal {
        self.uzs_per_usdt
    }

    /// `amount_uzs / rate`, rounded half-even to the ledger scale.
    pub fn convert_uzs_to_usdt(&self, amount_uzs: Decimal) -> Result<Decimal, ConversionError> {
        if amount_uzs <= Decimal::ZERO {
            return Err(ConversionError::NonPositiveAmount);
        }
        let mut usdt = (amount_uzs / self.uzs_per_usdt)
            .round_dp_with_strategy(AMOUNT_SCALE, RoundingStrategy::MidpointNearestEven);
        if usdt.is_zero() {
            return Err(ConversionError::BelowMinimum { amount_uzs });
        }
        if usdt > MAX_AMOUNT {
            return Err(ConversionError::AboveMaximum { amount_uzs });
        }
        usdt.rescale(AMOUNT_SCALE);
        Ok(usdt)
    }
}

#[derive(Debug, Clone)]
pub struct Conversion {
    pub uzs_amount: Decimal,
    pub usdt_amount: Decimal,
    pub transaction: Transaction,
}

/// Converts `amount_uzs` and deposits the result into the owner's USDT
/// wallet.
pub async fn convert_uzs_to_usdt(
    bank: &dyn Bank,
    rate: &ExchangeRate,
    owner_id: Uuid,
    amount_uzs: Decimal,
) -> Result<Conversion, StoreError> {
    let usdt_amount = rate.convert_uzs_to_usdt(amount_uzs)?;
    let wallet = bank
        .find_wallet(owner_id, Currency::Usdt)
        .await?
        .ok_or(StoreError::NoWallet(Currency::Usdt))?;

    let transaction = bank.deposit(owner_id, wallet.id, usdt_amount).await?;
    log::info!(
        "Converted {} UZS to {} USDT for user {}",
        amount_uzs,
        usdt_amount,
        owner_id
    );

    Ok(Conversion {
        uzs_amount: amount_uzs,
        usdt_amount,
        transaction,
    })
}

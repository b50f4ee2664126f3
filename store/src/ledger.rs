//! Balance rules shared by every storage backend.
//!
//! Backends lock the wallets an [`Operation`] touches, hand them to
//! [`apply`], and persist the returned [`BalanceChange`]s together with the
//! transaction record inside one storage transaction.

use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Currency, TransactionKind, Wallet};

/// Decimal places carried by every balance and amount.
pub const AMOUNT_SCALE: u32 = 2;

/// Largest amount or balance a `NUMERIC(20, 2)` column can hold.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(1_661_992_959, 1_808_227_885, 5, false, 2);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Amount must be greater than zero")]
    NonPositiveAmount,
    #[error("Amount must have at most {AMOUNT_SCALE} decimal places")]
    TooPrecise,
    #[error("Amount must not exceed {MAX_AMOUNT}")]
    AmountTooLarge,
    #[error("Balance would exceed {MAX_AMOUNT}")]
    BalanceLimitExceeded,
    #[error("Insufficient balance")]
    InsufficientFunds,
    #[error("Cannot transfer to the same wallet")]
    SameWallet,
    #[error("Cannot transfer between {from} and {to} wallets")]
    CurrencyMismatch { from: Currency, to: Currency },
    #[error("Wallet {0} not found")]
    WalletNotFound(Uuid),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Deposit {
        wallet_id: Uuid,
        amount: Decimal,
    },
    Withdrawal {
        wallet_id: Uuid,
        amount: Decimal,
    },
    Transfer {
        source: Uuid,
        destination: Uuid,
        amount: Decimal,
    },
}

impl Operation {
    pub fn kind(&self) -> TransactionKind {
        match self {
            Operation::Deposit { .. } => TransactionKind::Deposit,
            Operation::Withdrawal { .. } => TransactionKind::Withdrawal,
            Operation::Transfer { .. } => TransactionKind::Transfer,
        }
    }

    /// The wallet the acting user must own.
    pub fn wallet_id(&self) -> Uuid {
        match *self {
            Operation::Deposit { wallet_id, .. } | Operation::Withdrawal { wallet_id, .. } => {
                wallet_id
            }
            Operation::Transfer { source, .. } => source,
        }
    }

    pub fn counterparty_wallet_id(&self) -> Option<Uuid> {
        match *self {
            Operation::Transfer { destination, .. } => Some(destination),
            _ => None,
        }
    }

    pub fn amount(&self) -> Decimal {
        match *self {
            Operation::Deposit { amount, .. }
            | Operation::Withdrawal { amount, .. }
            | Operation::Transfer { amount, .. } => amount,
        }
    }

    /// Wallets to lock, in ascending id order.
    pub fn wallet_ids(&self) -> Vec<Uuid> {
        let mut ids = vec![self.wallet_id()];
        if let Some(counterparty) = self.counterparty_wallet_id() {
            if counterparty != ids[0] {
                ids.push(counterparty);
            }
        }
        ids.sort();
        ids
    }

    /// Checks that only depend on the operation itself.
    pub fn validate(&self) -> Result<Decimal, LedgerError> {
        let amount = validate_amount(self.amount())?;
        if let Operation::Transfer {
            source,
            destination,
            ..
        } = self
        {
            if source == destination {
                return Err(LedgerError::SameWallet);
            }
        }
        Ok(amount)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceChange {
    pub wallet_id: Uuid,
    pub balance: Decimal,
}

/// Outcome of a validated operation, ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posting {
    pub amount: Decimal,
    pub currency: Currency,
    pub changes: Vec<BalanceChange>,
}

/// Brings an amount to [`AMOUNT_SCALE`], rejecting anything that would lose
/// precision.
pub fn validate_amount(amount: Decimal) -> Result<Decimal, LedgerError> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::NonPositiveAmount);
    }
    if amount.normalize().scale() > AMOUNT_SCALE {
        return Err(LedgerError::TooPrecise);
    }
    if amount > MAX_AMOUNT {
        return Err(LedgerError::AmountTooLarge);
    }
    Ok(at_scale(amount))
}

pub fn at_scale(mut value: Decimal) -> Decimal {
    value.rescale(AMOUNT_SCALE);
    value
}

pub fn credit(balance: Decimal, amount: Decimal) -> Result<Decimal, LedgerError> {
    balance
        .checked_add(amount)
        .filter(|total| *total <= MAX_AMOUNT)
        .map(at_scale)
        .ok_or(LedgerError::BalanceLimitExceeded)
}

pub fn debit(balance: Decimal, amount: Decimal) -> Result<Decimal, LedgerError> {
    if balance < amount {
        return Err(LedgerError::InsufficientFunds);
    }
    Ok(at_scale(balance - amount))
}

/// Computes the new balances for `op`.
///
/// `wallets` must hold every wallet in [`Operation::wallet_ids`] that
/// exists; the operated wallet must also belong to `owner_id`.
pub fn apply(
    owner_id: Uuid,
    op: &Operation,
    wallets: &[Wallet],
) -> Result<Posting, LedgerError> {
    let amount = op.validate()?;
    let find = |id: Uuid| wallets.iter().find(|w| w.id == id);

    let wallet = find(op.wallet_id())
        .filter(|w| w.owner_id == owner_id)
        .ok_or(LedgerError::WalletNotFound(op.wallet_id()))?;

    let changes = match *op {
        Operation::Deposit { .. } => vec![BalanceChange {
            wallet_id: wallet.id,
            balance: credit(wallet.balance, amount)?,
        }],
        Operation::Withdrawal { .. } => vec![BalanceChange {
            wallet_id: wallet.id,
            balance: debit(wallet.balance, amount)?,
        }],
        Operation::Transfer { destination, .. } => {
            let target = find(destination).ok_or(LedgerError::WalletNotFound(destination))?;
            if wallet.currency != target.currency {
                return Err(LedgerError::CurrencyMismatch {
                    from: wallet.currency,
                    to: target.currency,
                });
            }
            vec![
                BalanceChange {
                    wallet_id: wallet.id,
                    balance: debit(wallet.balance, amount)?,
                },
                BalanceChange {
                    wallet_id: target.id,
                    balance: credit(target.balance, amount)?,
                },
            ]
        }
    };

    Ok(Posting {
        amount,
        currency: wallet.currency,
        changes,
    })
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use chrono::Utc;

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn wallet(owner_id: Uuid, balance: &str) -> Wallet {
        Wallet {
            id: Uuid::new_v4(),
            owner_id,
            currency: Currency::Usdt,
            balance: dec(balance),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn amount_validation() {
        assert_eq!(validate_amount(dec("0")), Err(LedgerError::NonPositiveAmount));
        assert_eq!(validate_amount(dec("-1")), Err(LedgerError::NonPositiveAmount));
        assert_eq!(validate_amount(dec("0.001")), Err(LedgerError::TooPrecise));
        // trailing zeros are not extra precision
        assert_eq!(validate_amount(dec("1.500")).unwrap().to_string(), "1.50");
        assert_eq!(validate_amount(dec("7")).unwrap().to_string(), "7.00");
    }

    #[test]
    fn amount_upper_bound() {
        assert_eq!(MAX_AMOUNT.to_string(), "999999999999999999.99");
        assert_eq!(validate_amount(MAX_AMOUNT), Ok(MAX_AMOUNT));
        assert_eq!(
            validate_amount(dec("1000000000000000000")),
            Err(LedgerError::AmountTooLarge)
        );
        assert_eq!(
            validate_amount(dec("70000000000000000000000000000")),
            Err(LedgerError::AmountTooLarge)
        );
    }

    #[test]
    fn balance_upper_bound() {
        let owner = Uuid::new_v4();
        let w = wallet(owner, "999999999999999999.00");

        let changes = apply(
            owner,
            &Operation::Deposit {
                wallet_id: w.id,
                amount: dec("0.99"),
            },
            &[w.clone()],
        )
        .unwrap()
        .changes;
        assert_eq!(changes[0].balance, MAX_AMOUNT);
        assert_eq!(changes[0].balance.scale(), AMOUNT_SCALE);

        let over = Operation::Deposit {
            wallet_id: w.id,
            amount: dec("1"),
        };
        assert_eq!(
            apply(owner, &over, &[w.clone()]),
            Err(LedgerError::BalanceLimitExceeded)
        );

        // the destination is checked on transfers too
        let from = wallet(owner, "5.00");
        let to = wallet(Uuid::new_v4(), "999999999999999999.00");
        let transfer = Operation::Transfer {
            source: from.id,
            destination: to.id,
            amount: dec("1"),
        };
        assert_eq!(
            apply(owner, &transfer, &[from, to]),
            Err(LedgerError::BalanceLimitExceeded)
        );
    }

    #[test]
    fn deposit_and_withdraw() {
        let owner = Uuid::new_v4();
        let mut w = wallet(owner, "0.00");

        let posting = apply(
            owner,
            &Operation::Deposit {
                wallet_id: w.id,
                amount: dec("10"),
            },
            &[w.clone()],
        )
        .unwrap();
        assert_eq!(posting.amount.to_string(), "10.00");
        assert_eq!(posting.currency, Currency::Usdt);
        let changes = posting.changes;
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].balance.to_string(), "10.00");
        w.balance = changes[0].balance;

        let withdraw = Operation::Withdrawal {
            wallet_id: w.id,
            amount: dec("10.01"),
        };
        assert_eq!(
            apply(owner, &withdraw, &[w.clone()]),
            Err(LedgerError::InsufficientFunds)
        );

        let changes = apply(
            owner,
            &Operation::Withdrawal {
                wallet_id: w.id,
                amount: dec("10"),
            },
            &[w.clone()],
        )
        .unwrap()
        .changes;
        assert_eq!(changes[0].balance, Decimal::ZERO);
    }

    #[test]
    fn withdraw_then_deposit_restores_balance() {
        let owner = Uuid::new_v4();
        let mut w = wallet(owner, "42.10");
        let original = w.balance;
        let amount = dec("17.35");

        w.balance = apply(
            owner,
            &Operation::Withdrawal {
                wallet_id: w.id,
                amount,
            },
            &[w.clone()],
        )
        .unwrap()
        .changes[0]
            .balance;
        w.balance = apply(
            owner,
            &Operation::Deposit {
                wallet_id: w.id,
                amount,
            },
            &[w.clone()],
        )
        .unwrap()
        .changes[0]
            .balance;
        assert_eq!(w.balance, original);
    }

    #[test]
    fn transfer_preserves_total() {
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let from = wallet(alice, "100.00");
        let to = wallet(bob, "5.00");

        let changes = apply(
            alice,
            &Operation::Transfer {
                source: from.id,
                destination: to.id,
                amount: dec("30.25"),
            },
            &[to.clone(), from.clone()],
        )
        .unwrap()
        .changes;

        let new_from = changes.iter().find(|c| c.wallet_id == from.id).unwrap();
        let new_to = changes.iter().find(|c| c.wallet_id == to.id).unwrap();
        assert_eq!(new_from.balance, dec("69.75"));
        assert_eq!(new_to.balance, dec("35.25"));
        assert_eq!(
            new_from.balance + new_to.balance,
            from.balance + to.balance
        );
    }

    #[test]
    fn transfer_rejections() {
        let alice = Uuid::new_v4();
        let from = wallet(alice, "10.00");
        let to = wallet(Uuid::new_v4(), "0.00");

        let same = Operation::Transfer {
            source: from.id,
            destination: from.id,
            amount: dec("1"),
        };
        assert_eq!(apply(alice, &same, &[from.clone()]), Err(LedgerError::SameWallet));

        let too_much = Operation::Transfer {
            source: from.id,
            destination: to.id,
            amount: dec("10.01"),
        };
        assert_eq!(
            apply(alice, &too_much, &[from.clone(), to.clone()]),
            Err(LedgerError::InsufficientFunds)
        );

        let missing = Uuid::new_v4();
        let unknown_target = Operation::Transfer {
            source: from.id,
            destination: missing,
            amount: dec("1"),
        };
        assert_eq!(
            apply(alice, &unknown_target, &[from.clone()]),
            Err(LedgerError::WalletNotFound(missing))
        );
    }

    #[test]
    fn foreign_wallet_is_not_found() {
        let alice = Uuid::new_v4();
        let bobs = wallet(Uuid::new_v4(), "50.00");

        let op = Operation::Withdrawal {
            wallet_id: bobs.id,
            amount: dec("1"),
        };
        assert_eq!(
            apply(alice, &op, &[bobs.clone()]),
            Err(LedgerError::WalletNotFound(bobs.id))
        );
    }

    #[test]
    fn lock_order_is_sorted_and_deduplicated() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let ids = Operation::Transfer {
            source: a,
            destination: b,
            amount: dec("1"),
        }
        .wallet_ids();
        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(ids, expected);

        let ids = Operation::Transfer {
            source: a,
            destination: a,
            amount: dec("1"),
        }
        .wallet_ids();
        assert_eq!(ids, vec![a]);
    }
}

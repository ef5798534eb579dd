//! Types and traits for confidential token sale crates
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

use frame_support::pallet_prelude::*;
use sp_std::prelude::*;

pub mod decryption;
pub mod pricing;
pub mod units;

pub use pricing::{quote_required, BASE_UNITS};

/// Opaque handle to an encrypted 64-bit amount.
/// The byte layout is owned by the encrypted-arithmetic backend; ledgers store
/// and forward handles but never look inside them.
pub type EncryptedAmount = [u8; 64];

/// Handle returned for accounts that never held a balance.
pub const ZERO_HANDLE: EncryptedAmount = [0u8; 64];

/// Identifier of a sale ledger instance.
pub type TokenId = u32;

/// New handles produced by an encrypted transfer.
#[derive(Clone, Copy, PartialEq, Eq, RuntimeDebug)]
pub struct EncryptedTransfer {
    /// Sender balance after the transfer.
    pub from_balance: EncryptedAmount,
    /// Receiver balance after the transfer.
    pub to_balance: EncryptedAmount,
    /// The amount that actually moved.
    pub transferred: EncryptedAmount,
}

/// Encrypted-integer capability supplied by the confidential computing layer.
///
/// Implementations define what a handle means. Callers may only derive a handle
/// from a clear value, move value between handles, and grant decryption rights.
pub trait EncryptedArithmetic<AccountId> {
    /// Encrypt a public value into a fresh handle.
    fn encrypt_clear(value: u64) -> Result<EncryptedAmount, DispatchError>;

    /// Move `amount` from the `from` balance into the `to` balance.
    fn transfer(
        from: &EncryptedAmount,
        to: &EncryptedAmount,
        amount: &EncryptedAmount,
    ) -> Result<EncryptedTransfer, DispatchError>;

    /// Authorize `who` to request decryption of `handle` through the relay.
    fn allow(handle: &EncryptedAmount, who: &AccountId) -> DispatchResult;
}

/// Entry point the registry uses to instantiate sale ledgers.
pub trait SaleLedgerFactory<AccountId, Balance> {
    /// Create a ledger owned by `owner` whose whole `total_supply` is minted to
    /// the ledger itself as saleable inventory.
    fn create_ledger(
        owner: &AccountId,
        name: Vec<u8>,
        symbol: Vec<u8>,
        total_supply: u64,
        price_per_token: Balance,
    ) -> Result<TokenId, DispatchError>;
}

/// Public view of a ledger for front ends and scripts.
#[derive(Clone, PartialEq, Eq, Encode, Decode, TypeInfo, RuntimeDebug)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub struct SaleInfo<AccountId, Balance> {
    pub token: TokenId,
    pub owner: AccountId,
    pub creator: AccountId,
    pub name: Vec<u8>,
    pub symbol: Vec<u8>,
    pub total_supply: u64,
    pub remaining_for_sale: u64,
    pub price_per_token: Balance,
    /// Account holding the inventory and collected payment.
    pub ledger_account: AccountId,
}

impl<AccountId, Balance> SaleInfo<AccountId, Balance> {
    pub fn sold(&self) -> u64 {
        self.total_supply.saturating_sub(self.remaining_for_sale)
    }

    pub fn is_sold_out(&self) -> bool {
        self.remaining_for_sale == 0
    }
}

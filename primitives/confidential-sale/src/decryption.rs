//! Authorization consumed by the off-chain decryption relay.
//!
//! An account that was granted access to a handle (see
//! [`EncryptedArithmetic::allow`](crate::EncryptedArithmetic::allow)) signs a
//! permit naming the ledgers it wants to read and a validity window. The relay
//! returns clear values only while the permit is active.

use frame_support::pallet_prelude::*;

use crate::TokenId;

pub const SECONDS_PER_DAY: u64 = 86_400;

/// Longest validity window a relay accepts.
pub const MAX_PERMIT_DURATION_DAYS: u32 = 365;

pub type MaxPermitLedgers = ConstU32<10>;
pub type MaxSignatureLen = ConstU32<128>;

#[derive(Clone, PartialEq, Eq, Encode, Decode, TypeInfo, MaxEncodedLen, RuntimeDebug)]
pub struct DecryptionPermit<AccountId> {
    pub requester: AccountId,
    pub ledgers: BoundedVec<TokenId, MaxPermitLedgers>,
    /// Unix seconds.
    pub start_timestamp: u64,
    pub duration_days: u32,
    /// Opaque wallet signature over the fields above.
    pub signature: BoundedVec<u8, MaxSignatureLen>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PermitError {
    ZeroDuration,
    DurationTooLong,
    NotYetValid,
    Expired,
    LedgerNotCovered,
}

impl<AccountId> DecryptionPermit<AccountId> {
    /// First second at which the permit is no longer valid.
    pub fn expires_at(&self) -> u64 {
        self.start_timestamp
            .saturating_add((self.duration_days as u64).saturating_mul(SECONDS_PER_DAY))
    }

    /// Validate the window and scope at unix time `now`.
    pub fn check(&self, ledger: TokenId, now: u64) -> Result<(), PermitError> {
        if self.duration_days == 0 {
            return Err(PermitError::ZeroDuration);
        }
        if self.duration_days > MAX_PERMIT_DURATION_DAYS {
            return Err(PermitError::DurationTooLong);
        }
        if now < self.start_timestamp {
            return Err(PermitError::NotYetValid);
        }
        if now >= self.expires_at() {
            return Err(PermitError::Expired);
        }
        if !self.ledgers.contains(&ledger) {
            return Err(PermitError::LedgerNotCovered);
        }
        Ok(())
    }
}

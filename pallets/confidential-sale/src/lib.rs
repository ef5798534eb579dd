//! **pallet-confidential-sale**
//!
//! Sells a confidential token for native currency. Each ledger (one per
//! `TokenId`) owns:
//! - a table of encrypted balances handled through `EncryptedArithmetic`,
//! - a public `remaining_for_sale` counter mirroring the encrypted inventory
//!   held by the ledger's own account,
//! - a price for one whole token (`BASE_UNITS` base units) and an owner.
//!
//! Flow of `buy`:
//! 1) validate amount, inventory and payment (in that order),
//! 2) decrement the public counter and collect the payment into the ledger account,
//! 3) move the encrypted amount from the ledger account to the buyer,
//! 4) refund any overpayment.
//!
//! Every mutating entry point runs in its own storage layer and under a per-ledger
//! reentrancy guard, so a failed refund or withdrawal leaves no trace and no
//! nested call can act on the ledger while a transfer is in flight.
//!
//! Ledgers are created through [`SaleLedgerFactory`], normally by
//! `pallet-token-registry`.

#![cfg_attr(not(feature = "std"), no_std)]

use frame_support::{
    pallet_prelude::*,
    storage::with_storage_layer,
    traits::{
        fungible::{Inspect, Mutate},
        tokens::{Fortitude, Preservation},
    },
    PalletId,
};
use frame_system::pallet_prelude::*;
use sp_runtime::{
    traits::{AccountIdConversion, Saturating, TrailingZeroInput, Zero},
    SaturatedConversion,
};
use sp_std::prelude::*;

use confidential_sale_primitives::{
    quote_required, EncryptedAmount, EncryptedArithmetic, SaleInfo, SaleLedgerFactory, TokenId,
    ZERO_HANDLE,
};

pub use pallet::*;
pub use weights::WeightInfo;

#[cfg(feature = "runtime-benchmarks")]
mod benchmarking;
#[cfg(test)]
mod mock;
pub mod weights;

pub(crate) const LOG_TARGET: &str = "runtime::confidential-sale";

pub type BalanceOf<T> =
    <<T as Config>::Currency as Inspect<<T as frame_system::Config>::AccountId>>::Balance;

pub type SaleLedgerOf<T> = SaleLedger<
    <T as frame_system::Config>::AccountId,
    BalanceOf<T>,
    BoundedVec<u8, <T as Config>::MaxNameLength>,
    BoundedVec<u8, <T as Config>::MaxSymbolLength>,
>;

/// Public state of one sale ledger.
#[derive(Clone, PartialEq, Eq, Encode, Decode, TypeInfo, MaxEncodedLen, RuntimeDebug)]
pub struct SaleLedger<AccountId, Balance, BoundedName, BoundedSymbol> {
    pub owner: AccountId,
    pub creator: AccountId,
    pub name: BoundedName,
    pub symbol: BoundedSymbol,
    pub total_supply: u64,
    /// Always `<= total_supply`; only `buy` lowers it.
    pub remaining_for_sale: u64,
    pub price_per_token: Balance,
}

/// Failure reasons of the ledger entry points.
///
/// Richer than the pallet `Error`: payment and inventory failures carry the
/// values the caller needs to correct the request.
#[derive(Clone, PartialEq, Eq, RuntimeDebug)]
pub enum SaleError<Balance> {
    UnknownLedger,
    InvalidAmount,
    InsufficientInventory { requested: u64, remaining: u64 },
    InsufficientPayment { required: Balance, paid: Balance },
    TransferFailure,
    InvalidWithdraw,
    Unauthorized,
    Reentrancy,
    InvalidOwner,
    Dispatch(DispatchError),
}

impl<Balance> From<DispatchError> for SaleError<Balance> {
    fn from(e: DispatchError) -> Self {
        SaleError::Dispatch(e)
    }
}

#[frame_support::pallet]
pub mod pallet {
    use super::*;

    #[pallet::config]
    pub trait Config: frame_system::Config {
        type RuntimeEvent: From<Event<Self>> + IsType<<Self as frame_system::Config>::RuntimeEvent>;

        /// Native currency used for payment, refunds and withdrawals.
        type Currency: Mutate<Self::AccountId>;

        /// Encrypted-integer backend holding the meaning of balance handles.
        type Encrypted: EncryptedArithmetic<Self::AccountId>;

        /// PalletId from which every ledger account is derived.
        #[pallet::constant]
        type PalletId: Get<PalletId>;

        #[pallet::constant]
        type MaxNameLength: Get<u32>;

        #[pallet::constant]
        type MaxSymbolLength: Get<u32>;

        type WeightInfo: WeightInfo;
    }

    #[pallet::pallet]
    pub struct Pallet<T>(_);

    #[pallet::storage]
    pub type NextTokenId<T: Config> = StorageValue<_, TokenId, ValueQuery>;

    #[pallet::storage]
    pub type Ledgers<T: Config> =
        StorageMap<_, Twox64Concat, TokenId, SaleLedgerOf<T>, OptionQuery>;

    /// Encrypted balance handle per (ledger, account).
    #[pallet::storage]
    pub type ConfidentialBalances<T: Config> = StorageDoubleMap<
        _,
        Twox64Concat,
        TokenId,
        Blake2_128Concat,
        T::AccountId,
        EncryptedAmount,
        OptionQuery,
    >;

    /// Set while a mutating call on the ledger is in progress.
    #[pallet::storage]
    pub type Entered<T: Config> = StorageMap<_, Twox64Concat, TokenId, (), OptionQuery>;

    #[pallet::event]
    #[pallet::generate_deposit(pub(super) fn deposit_event)]
    pub enum Event<T: Config> {
        /// A ledger was created and its whole supply minted to the ledger account.
        LedgerInitialized {
            token: TokenId,
            owner: T::AccountId,
            ledger_account: T::AccountId,
            total_supply: u64,
            inventory: EncryptedAmount,
        },
        TokensPurchased {
            token: TokenId,
            buyer: T::AccountId,
            amount: u64,
            required: BalanceOf<T>,
            paid: BalanceOf<T>,
            transferred: EncryptedAmount,
        },
        PriceUpdated {
            token: TokenId,
            old: BalanceOf<T>,
            new: BalanceOf<T>,
        },
        Withdrawn {
            token: TokenId,
            to: T::AccountId,
            amount: BalanceOf<T>,
        },
        OwnershipTransferred {
            token: TokenId,
            previous: T::AccountId,
            new: T::AccountId,
        },
    }

    #[pallet::error]
    pub enum Error<T> {
        UnknownLedger,
        /// Zero or out-of-range amount or supply.
        InvalidAmount,
        /// Requested more than is left for sale.
        InsufficientInventory,
        /// Payment below the quoted requirement.
        InsufficientPayment,
        /// A refund or withdrawal transfer did not go through.
        TransferFailure,
        /// Null recipient, zero amount, or more than the ledger holds.
        InvalidWithdraw,
        /// Caller is not the ledger owner.
        Unauthorized,
        /// A mutating call on this ledger is already in progress.
        Reentrancy,
        InvalidOwner,
        NameTooLong,
        SymbolTooLong,
        NoAvailableTokenId,
    }

    #[pallet::call]
    impl<T: Config> Pallet<T> {
        /// Buy `amount` base units of `token`, attaching `paid` native currency.
        ///
        /// Anything above the quote is refunded in the same call.
        #[pallet::call_index(0)]
        #[pallet::weight(T::WeightInfo::buy())]
        pub fn buy(
            origin: OriginFor<T>,
            token: TokenId,
            amount: u64,
            paid: BalanceOf<T>,
        ) -> DispatchResult {
            let buyer = ensure_signed(origin)?;
            Self::try_buy(token, &buyer, amount, paid)
                .map(|_| ())
                .map_err(Self::into_dispatch_error)
        }

        #[pallet::call_index(1)]
        #[pallet::weight(T::WeightInfo::set_price_per_token())]
        pub fn set_price_per_token(
            origin: OriginFor<T>,
            token: TokenId,
            new_price: BalanceOf<T>,
        ) -> DispatchResult {
            let who = ensure_signed(origin)?;
            Self::try_set_price(token, &who, new_price).map_err(Self::into_dispatch_error)
        }

        /// Send `amount` of collected payment to `to`. Partial withdrawals are allowed
        /// as long as what stays behind is zero or at least the existential deposit.
        #[pallet::call_index(2)]
        #[pallet::weight(T::WeightInfo::withdraw())]
        pub fn withdraw(
            origin: OriginFor<T>,
            token: TokenId,
            to: T::AccountId,
            amount: BalanceOf<T>,
        ) -> DispatchResult {
            let who = ensure_signed(origin)?;
            Self::try_withdraw(token, &who, &to, amount).map_err(Self::into_dispatch_error)
        }

        #[pallet::call_index(3)]
        #[pallet::weight(T::WeightInfo::transfer_ownership())]
        pub fn transfer_ownership(
            origin: OriginFor<T>,
            token: TokenId,
            new_owner: T::AccountId,
        ) -> DispatchResult {
            let who = ensure_signed(origin)?;
            Self::try_transfer_ownership(token, &who, &new_owner)
                .map_err(Self::into_dispatch_error)
        }
    }

    impl<T: Config> Pallet<T> {
        // --------------------------- Reads ---------------------------------------------

        /// Account holding the ledger's inventory and collected payment.
        #[inline]
        pub fn ledger_account(token: TokenId) -> T::AccountId {
            T::PalletId::get().into_sub_account_truncating(token)
        }

        pub fn ledger(token: TokenId) -> Option<SaleLedgerOf<T>> {
            Ledgers::<T>::get(token)
        }

        /// Payment required for `amount` base units at the current price.
        /// `None` for an unknown ledger or a quote that overflows the balance type.
        pub fn quote_buy(token: TokenId, amount: u64) -> Option<BalanceOf<T>> {
            Ledgers::<T>::get(token).and_then(|ledger| Self::quote(&ledger, amount))
        }

        pub fn confidential_balance_of(token: TokenId, who: &T::AccountId) -> EncryptedAmount {
            ConfidentialBalances::<T>::get(token, who).unwrap_or(ZERO_HANDLE)
        }

        pub fn remaining_for_sale(token: TokenId) -> Option<u64> {
            Ledgers::<T>::get(token).map(|l| l.remaining_for_sale)
        }

        pub fn price_per_token(token: TokenId) -> Option<BalanceOf<T>> {
            Ledgers::<T>::get(token).map(|l| l.price_per_token)
        }

        pub fn owner(token: TokenId) -> Option<T::AccountId> {
            Ledgers::<T>::get(token).map(|l| l.owner)
        }

        /// Collected payment available for withdrawal.
        pub fn collected(token: TokenId) -> BalanceOf<T> {
            T::Currency::reducible_balance(
                &Self::ledger_account(token),
                Preservation::Expendable,
                Fortitude::Polite,
            )
        }

        pub fn sale_info(token: TokenId) -> Option<SaleInfo<T::AccountId, BalanceOf<T>>> {
            Ledgers::<T>::get(token).map(|l| SaleInfo {
                token,
                owner: l.owner,
                creator: l.creator,
                name: l.name.into_inner(),
                symbol: l.symbol.into_inner(),
                total_supply: l.total_supply,
                remaining_for_sale: l.remaining_for_sale,
                price_per_token: l.price_per_token,
                ledger_account: Self::ledger_account(token),
            })
        }

        // --------------------------- Entry points --------------------------------------

        /// Buy on behalf of `buyer`; returns the handle of the transferred amount.
        pub fn try_buy(
            token: TokenId,
            buyer: &T::AccountId,
            amount: u64,
            paid: BalanceOf<T>,
        ) -> Result<EncryptedAmount, SaleError<BalanceOf<T>>> {
            Self::with_guard(token, || {
                let mut ledger = Ledgers::<T>::get(token).ok_or(SaleError::UnknownLedger)?;
                if amount == 0 {
                    return Err(SaleError::InvalidAmount);
                }
                if amount > ledger.remaining_for_sale {
                    return Err(SaleError::InsufficientInventory {
                        requested: amount,
                        remaining: ledger.remaining_for_sale,
                    });
                }
                let required = Self::quote(&ledger, amount).ok_or(SaleError::InvalidAmount)?;
                if paid < required {
                    return Err(SaleError::InsufficientPayment { required, paid });
                }

                ledger.remaining_for_sale = ledger.remaining_for_sale.saturating_sub(amount);
                Ledgers::<T>::insert(token, &ledger);

                let vault = Self::ledger_account(token);
                if !paid.is_zero() {
                    T::Currency::transfer(buyer, &vault, paid, Preservation::Expendable)?;
                }
                let transferred = Self::move_encrypted(token, &vault, buyer, amount)?;

                let excess = paid.saturating_sub(required);
                if !excess.is_zero() {
                    if Self::leaves_dust(&vault, excess) {
                        log::warn!(
                            target: LOG_TARGET,
                            "refund of {:?} on ledger {} would leave dust in the ledger account",
                            excess,
                            token,
                        );
                        return Err(SaleError::TransferFailure);
                    }
                    T::Currency::transfer(&vault, buyer, excess, Preservation::Expendable)
                        .map_err(|e| {
                            log::warn!(
                                target: LOG_TARGET,
                                "refund of {:?} to {:?} on ledger {} failed: {:?}",
                                excess,
                                buyer,
                                token,
                                e,
                            );
                            SaleError::TransferFailure
                        })?;
                }

                log::debug!(
                    target: LOG_TARGET,
                    "ledger {}: sold {} to {:?}, {} left",
                    token,
                    amount,
                    buyer,
                    ledger.remaining_for_sale,
                );
                Self::deposit_event(Event::TokensPurchased {
                    token,
                    buyer: buyer.clone(),
                    amount,
                    required,
                    paid,
                    transferred,
                });
                Ok(transferred)
            })
        }

        pub fn try_set_price(
            token: TokenId,
            who: &T::AccountId,
            new_price: BalanceOf<T>,
        ) -> Result<(), SaleError<BalanceOf<T>>> {
            Self::with_guard(token, || {
                let mut ledger = Ledgers::<T>::get(token).ok_or(SaleError::UnknownLedger)?;
                Self::ensure_owner(&ledger, who)?;
                let old = core::mem::replace(&mut ledger.price_per_token, new_price);
                Ledgers::<T>::insert(token, &ledger);
                Self::deposit_event(Event::PriceUpdated { token, old, new: new_price });
                Ok(())
            })
        }

        pub fn try_withdraw(
            token: TokenId,
            who: &T::AccountId,
            to: &T::AccountId,
            amount: BalanceOf<T>,
        ) -> Result<(), SaleError<BalanceOf<T>>> {
            Self::with_guard(token, || {
                let ledger = Ledgers::<T>::get(token).ok_or(SaleError::UnknownLedger)?;
                Self::ensure_owner(&ledger, who)?;
                let vault = Self::ledger_account(token);
                if Self::is_null(to) ||
                    amount.is_zero() ||
                    amount > Self::collected(token) ||
                    Self::leaves_dust(&vault, amount)
                {
                    return Err(SaleError::InvalidWithdraw);
                }

                T::Currency::transfer(&vault, to, amount, Preservation::Expendable).map_err(
                    |e| {
                        log::warn!(
                            target: LOG_TARGET,
                            "withdrawal of {:?} from ledger {} to {:?} failed: {:?}",
                            amount,
                            token,
                            to,
                            e,
                        );
                        SaleError::TransferFailure
                    },
                )?;

                Self::deposit_event(Event::Withdrawn { token, to: to.clone(), amount });
                Ok(())
            })
        }

        pub fn try_transfer_ownership(
            token: TokenId,
            who: &T::AccountId,
            new_owner: &T::AccountId,
        ) -> Result<(), SaleError<BalanceOf<T>>> {
            Self::with_guard(token, || {
                let mut ledger = Ledgers::<T>::get(token).ok_or(SaleError::UnknownLedger)?;
                Self::ensure_owner(&ledger, who)?;
                if Self::is_null(new_owner) {
                    return Err(SaleError::InvalidOwner);
                }
                let previous = core::mem::replace(&mut ledger.owner, new_owner.clone());
                Ledgers::<T>::insert(token, &ledger);
                Self::deposit_event(Event::OwnershipTransferred {
                    token,
                    previous,
                    new: new_owner.clone(),
                });
                Ok(())
            })
        }

        // --------------------------- Helpers -------------------------------------------

        fn quote(ledger: &SaleLedgerOf<T>, amount: u64) -> Option<BalanceOf<T>> {
            let price = ledger.price_per_token.saturated_into::<u128>();
            let required = quote_required(amount, price)?;
            <BalanceOf<T> as TryFrom<u128>>::try_from(required).ok()
        }

        /// Run `body` in its own storage layer with the ledger's guard held.
        /// The guard is released on success and on failure.
        fn with_guard<R>(
            token: TokenId,
            body: impl FnOnce() -> Result<R, SaleError<BalanceOf<T>>>,
        ) -> Result<R, SaleError<BalanceOf<T>>> {
            if Entered::<T>::contains_key(token) {
                return Err(SaleError::Reentrancy);
            }
            Entered::<T>::insert(token, ());
            let result = with_storage_layer(body);
            Entered::<T>::remove(token);
            result
        }

        fn ensure_owner(
            ledger: &SaleLedgerOf<T>,
            who: &T::AccountId,
        ) -> Result<(), SaleError<BalanceOf<T>>> {
            if ledger.owner != *who {
                return Err(SaleError::Unauthorized);
            }
            Ok(())
        }

        /// Paying `amount` out of `vault` would leave a non-zero balance below the
        /// existential deposit, which the currency would reap as dust.
        fn leaves_dust(vault: &T::AccountId, amount: BalanceOf<T>) -> bool {
            let remaining = T::Currency::balance(vault).saturating_sub(amount);
            !remaining.is_zero() && remaining < T::Currency::minimum_balance()
        }

        /// The all-zero account stands in for a null address.
        fn is_null(who: &T::AccountId) -> bool {
            T::AccountId::decode(&mut TrailingZeroInput::zeroes())
                .map_or(false, |zero| zero == *who)
        }

        /// Move `amount` between two encrypted balances of `token` and grant each
        /// party access to the handles it now owns.
        fn move_encrypted(
            token: TokenId,
            from: &T::AccountId,
            to: &T::AccountId,
            amount: u64,
        ) -> Result<EncryptedAmount, DispatchError> {
            let amount_ct = T::Encrypted::encrypt_clear(amount)?;
            let moved = T::Encrypted::transfer(
                &Self::confidential_balance_of(token, from),
                &Self::confidential_balance_of(token, to),
                &amount_ct,
            )?;

            ConfidentialBalances::<T>::insert(token, from, moved.from_balance);
            ConfidentialBalances::<T>::insert(token, to, moved.to_balance);
            T::Encrypted::allow(&moved.from_balance, from)?;
            T::Encrypted::allow(&moved.to_balance, to)?;
            T::Encrypted::allow(&moved.transferred, from)?;
            T::Encrypted::allow(&moved.transferred, to)?;
            Ok(moved.transferred)
        }

        fn into_dispatch_error(e: SaleError<BalanceOf<T>>) -> DispatchError {
            match e {
                SaleError::UnknownLedger => Error::<T>::UnknownLedger.into(),
                SaleError::InvalidAmount => Error::<T>::InvalidAmount.into(),
                SaleError::InsufficientInventory { requested, remaining } => {
                    log::debug!(
                        target: LOG_TARGET,
                        "insufficient inventory: requested {}, remaining {}",
                        requested,
                        remaining,
                    );
                    Error::<T>::InsufficientInventory.into()
                }
                SaleError::InsufficientPayment { required, paid } => {
                    log::debug!(
                        target: LOG_TARGET,
                        "insufficient payment: required {:?}, paid {:?}",
                        required,
                        paid,
                    );
                    Error::<T>::InsufficientPayment.into()
                }
                SaleError::TransferFailure => Error::<T>::TransferFailure.into(),
                SaleError::InvalidWithdraw => Error::<T>::InvalidWithdraw.into(),
                SaleError::Unauthorized => Error::<T>::Unauthorized.into(),
                SaleError::Reentrancy => Error::<T>::Reentrancy.into(),
                SaleError::InvalidOwner => Error::<T>::InvalidOwner.into(),
                SaleError::Dispatch(e) => e,
            }
        }

        fn do_create_ledger(
            owner: &T::AccountId,
            name: Vec<u8>,
            symbol: Vec<u8>,
            total_supply: u64,
            price_per_token: BalanceOf<T>,
        ) -> Result<TokenId, DispatchError> {
            ensure!(total_supply > 0, Error::<T>::InvalidAmount);
            let name: BoundedVec<u8, T::MaxNameLength> =
                name.try_into().map_err(|_| Error::<T>::NameTooLong)?;
            let symbol: BoundedVec<u8, T::MaxSymbolLength> =
                symbol.try_into().map_err(|_| Error::<T>::SymbolTooLong)?;

            let token = NextTokenId::<T>::get();
            let next = token.checked_add(1).ok_or(Error::<T>::NoAvailableTokenId)?;

            // The ledger sells from its own encrypted balance.
            let vault = Self::ledger_account(token);
            let inventory = T::Encrypted::encrypt_clear(total_supply)?;
            T::Encrypted::allow(&inventory, &vault)?;
            ConfidentialBalances::<T>::insert(token, &vault, inventory);

            Ledgers::<T>::insert(
                token,
                SaleLedger {
                    owner: owner.clone(),
                    creator: owner.clone(),
                    name,
                    symbol,
                    total_supply,
                    remaining_for_sale: total_supply,
                    price_per_token,
                },
            );
            NextTokenId::<T>::put(next);

            log::debug!(
                target: LOG_TARGET,
                "ledger {} created by {:?} with supply {}",
                token,
                owner,
                total_supply,
            );
            Self::deposit_event(Event::LedgerInitialized {
                token,
                owner: owner.clone(),
                ledger_account: vault,
                total_supply,
                inventory,
            });
            Ok(token)
        }
    }

    impl<T: Config> SaleLedgerFactory<T::AccountId, BalanceOf<T>> for Pallet<T> {
        fn create_ledger(
            owner: &T::AccountId,
            name: Vec<u8>,
            symbol: Vec<u8>,
            total_supply: u64,
            price_per_token: BalanceOf<T>,
        ) -> Result<TokenId, DispatchError> {
            with_storage_layer(|| {
                Self::do_create_ledger(owner, name, symbol, total_supply, price_per_token)
            })
        }
    }
}

//! **pallet-token-registry**
//!
//! Factory for confidential sale ledgers. `create` asks the configured
//! [`SaleLedgerFactory`] for a new ledger owned by the caller, then records the
//! ledger id in two append-only indexes:
//! - `AllInstances`, in creation order,
//! - `InstancesByCreator`, one sequence per creator.
//!
//! Ledger construction errors are returned unchanged and nothing is recorded.

#![cfg_attr(not(feature = "std"), no_std)]

use frame_support::pallet_prelude::*;
use frame_system::pallet_prelude::*;
use sp_std::prelude::*;

use confidential_sale_primitives::{SaleLedgerFactory, TokenId};

pub use pallet::*;
pub use weights::WeightInfo;

#[cfg(feature = "runtime-benchmarks")]
mod benchmarking;
pub mod weights;

pub(crate) const LOG_TARGET: &str = "runtime::token-registry";

#[frame_support::pallet]
pub mod pallet {
    use super::*;

    #[pallet::config]
    pub trait Config: frame_system::Config {
        type RuntimeEvent: From<Event<Self>> + IsType<<Self as frame_system::Config>::RuntimeEvent>;

        /// Price unit of the ledgers this registry creates.
        type Balance: Parameter + Member + MaxEncodedLen + Copy;

        /// Builds the ledgers.
        type Factory: SaleLedgerFactory<Self::AccountId, Self::Balance>;

        type WeightInfo: WeightInfo;
    }

    #[pallet::pallet]
    pub struct Pallet<T>(_);

    #[pallet::storage]
    pub type InstanceCount<T: Config> = StorageValue<_, u32, ValueQuery>;

    #[pallet::storage]
    pub type AllInstances<T: Config> = StorageMap<_, Twox64Concat, u32, TokenId, OptionQuery>;

    #[pallet::storage]
    pub type CreatorInstanceCount<T: Config> =
        StorageMap<_, Blake2_128Concat, T::AccountId, u32, ValueQuery>;

    #[pallet::storage]
    pub type InstancesByCreator<T: Config> = StorageDoubleMap<
        _,
        Blake2_128Concat,
        T::AccountId,
        Twox64Concat,
        u32,
        TokenId,
        OptionQuery,
    >;

    #[pallet::event]
    #[pallet::generate_deposit(pub(super) fn deposit_event)]
    pub enum Event<T: Config> {
        TokenCreated {
            creator: T::AccountId,
            token: TokenId,
            name: Vec<u8>,
            symbol: Vec<u8>,
            total_supply: u64,
            price_per_token: T::Balance,
        },
    }

    #[pallet::error]
    pub enum Error<T> {
        /// The global or per-creator index is exhausted.
        InstanceIndexOverflow,
    }

    #[pallet::call]
    impl<T: Config> Pallet<T> {
        /// Create a sale ledger owned by the caller and mint `total_supply`
        /// base units into its inventory.
        #[pallet::call_index(0)]
        #[pallet::weight(T::WeightInfo::create())]
        pub fn create(
            origin: OriginFor<T>,
            name: Vec<u8>,
            symbol: Vec<u8>,
            total_supply: u64,
            price_per_token: T::Balance,
        ) -> DispatchResult {
            let creator = ensure_signed(origin)?;
            Self::do_create(&creator, name, symbol, total_supply, price_per_token).map(|_| ())
        }
    }

    impl<T: Config> Pallet<T> {
        pub fn do_create(
            creator: &T::AccountId,
            name: Vec<u8>,
            symbol: Vec<u8>,
            total_supply: u64,
            price_per_token: T::Balance,
        ) -> Result<TokenId, DispatchError> {
            let index = InstanceCount::<T>::get();
            let next = index.checked_add(1).ok_or(Error::<T>::InstanceIndexOverflow)?;
            let creator_index = CreatorInstanceCount::<T>::get(creator);
            let creator_next =
                creator_index.checked_add(1).ok_or(Error::<T>::InstanceIndexOverflow)?;

            let token = T::Factory::create_ledger(
                creator,
                name.clone(),
                symbol.clone(),
                total_supply,
                price_per_token,
            )?;

            AllInstances::<T>::insert(index, token);
            InstanceCount::<T>::put(next);
            InstancesByCreator::<T>::insert(creator, creator_index, token);
            CreatorInstanceCount::<T>::insert(creator, creator_next);

            log::debug!(
                target: LOG_TARGET,
                "ledger {} registered at {} for {:?}",
                token,
                index,
                creator,
            );
            Self::deposit_event(Event::TokenCreated {
                creator: creator.clone(),
                token,
                name,
                symbol,
                total_supply,
                price_per_token,
            });
            Ok(token)
        }

        // --------------------------- Reads ---------------------------------------------

        /// Every ledger ever created, oldest first.
        pub fn all_instances() -> Vec<TokenId> {
            (0..InstanceCount::<T>::get())
                .filter_map(|i| AllInstances::<T>::get(i))
                .collect()
        }

        /// Ledgers created by `creator`, oldest first.
        pub fn instances_by_creator(creator: &T::AccountId) -> Vec<TokenId> {
            (0..CreatorInstanceCount::<T>::get(creator))
                .filter_map(|i| InstancesByCreator::<T>::get(creator, i))
                .collect()
        }

        pub fn instance_count() -> u32 {
            InstanceCount::<T>::get()
        }

        pub fn creator_instance_count(creator: &T::AccountId) -> u32 {
            CreatorInstanceCount::<T>::get(creator)
        }
    }
}

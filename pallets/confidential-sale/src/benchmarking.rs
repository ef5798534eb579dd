//! Benchmarking for `pallet-confidential-sale`.
//!
//! The encrypted transfer inside `buy` is priced by the `EncryptedArithmetic`
//! backend; these benchmarks cover the ledger bookkeeping around it.

use crate::*;
use confidential_sale_primitives::BASE_UNITS;
use frame_benchmarking::v2::*;
use frame_system::RawOrigin;

fn setup_ledger<T: Config>(owner: &T::AccountId) -> TokenId {
    let price: BalanceOf<T> = 1_000u32.into();
    <Pallet<T> as SaleLedgerFactory<T::AccountId, BalanceOf<T>>>::create_ledger(
        owner,
        b"Bench".to_vec(),
        b"BNCH".to_vec(),
        1_000 * BASE_UNITS,
        price,
    )
    .expect("ledger created")
}

fn fund<T: Config>(who: &T::AccountId, amount: BalanceOf<T>) {
    let amount = amount.saturating_add(T::Currency::minimum_balance());
    T::Currency::set_balance(who, amount);
}

#[benchmarks]
mod benchmarks {
    use super::*;

    // Overpays by the existential deposit so the refund path is taken.
    #[benchmark]
    fn buy() {
        let owner: T::AccountId = account("owner", 0, 0);
        let buyer: T::AccountId = whitelisted_caller();
        let token = setup_ledger::<T>(&owner);
        let amount = 10 * BASE_UNITS;
        let required = Pallet::<T>::quote_buy(token, amount).expect("quote fits");
        let paid = required.saturating_add(T::Currency::minimum_balance());
        fund::<T>(&buyer, paid.saturating_add(paid));

        #[extrinsic_call]
        buy(RawOrigin::Signed(buyer.clone()), token, amount, paid);

        assert_eq!(
            Pallet::<T>::remaining_for_sale(token),
            Some(1_000 * BASE_UNITS - amount)
        );
    }

    #[benchmark]
    fn set_price_per_token() {
        let owner: T::AccountId = whitelisted_caller();
        let token = setup_ledger::<T>(&owner);
        let new_price: BalanceOf<T> = 2_000u32.into();

        #[extrinsic_call]
        set_price_per_token(RawOrigin::Signed(owner), token, new_price);

        assert_eq!(Pallet::<T>::price_per_token(token), Some(new_price));
    }

    #[benchmark]
    fn withdraw() {
        let owner: T::AccountId = whitelisted_caller();
        let recipient: T::AccountId = account("recipient", 0, 0);
        let token = setup_ledger::<T>(&owner);
        let amount: BalanceOf<T> = 1_000_000u32.into();
        fund::<T>(&Pallet::<T>::ledger_account(token), amount);
        let amount = amount.saturating_add(T::Currency::minimum_balance());

        #[extrinsic_call]
        withdraw(RawOrigin::Signed(owner), token, recipient.clone(), amount);

        assert_eq!(T::Currency::balance(&recipient), amount);
    }

    #[benchmark]
    fn transfer_ownership() {
        let owner: T::AccountId = whitelisted_caller();
        let new_owner: T::AccountId = account("new_owner", 0, 0);
        let token = setup_ledger::<T>(&owner);

        #[extrinsic_call]
        transfer_ownership(RawOrigin::Signed(owner), token, new_owner.clone());

        assert_eq!(Pallet::<T>::owner(token), Some(new_owner));
    }

    impl_benchmark_test_suite!(Pallet, crate::mock::new_test_ext(), crate::mock::Runtime);
}

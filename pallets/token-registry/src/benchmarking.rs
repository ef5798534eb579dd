//! Benchmarking for `pallet-token-registry`.

use crate::*;
use frame_benchmarking::v2::*;
use frame_system::RawOrigin;

#[benchmarks(where T::Balance: From<u32>)]
mod benchmarks {
    use super::*;

    #[benchmark]
    fn create() {
        let creator: T::AccountId = whitelisted_caller();
        let name = b"Benchmark Token".to_vec();
        let symbol = b"BNCH".to_vec();

        #[extrinsic_call]
        create(RawOrigin::Signed(creator.clone()), name, symbol, 1_000_000, 1_000u32.into());

        assert_eq!(Pallet::<T>::instance_count(), 1);
        assert_eq!(Pallet::<T>::creator_instance_count(&creator), 1);
    }

    impl_benchmark_test_suite!(Pallet, crate::mock::new_test_ext(), crate::mock::Runtime);
}

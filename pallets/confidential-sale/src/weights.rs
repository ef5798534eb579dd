//! Weights for `pallet-confidential-sale`.
//!
//! Placeholder values until the benchmarks in `benchmarking.rs` are run
//! against a production runtime.

use frame_support::weights::Weight;

pub trait WeightInfo {
    fn buy() -> Weight;
    fn set_price_per_token() -> Weight;
    fn withdraw() -> Weight;
    fn transfer_ownership() -> Weight;
}

impl WeightInfo for () {
    fn buy() -> Weight {
        Weight::from_parts(120_000, 0)
    }
    fn set_price_per_token() -> Weight {
        Weight::from_parts(30_000, 0)
    }
    fn withdraw() -> Weight {
        Weight::from_parts(60_000, 0)
    }
    fn transfer_ownership() -> Weight {
        Weight::from_parts(30_000, 0)
    }
}

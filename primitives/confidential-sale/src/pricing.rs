//! Price quoting for ledger purchases.

use sp_arithmetic::{helpers_128bit::multiply_by_rational_with_rounding, per_things::Rounding};

/// Base units per whole token (6 decimals).
pub const BASE_UNITS: u64 = 1_000_000;

/// Native amount required to buy `amount` base units at `price_per_token`
/// (price of one whole token).
///
/// Rounds up so a buyer can never underpay by a unit. The product is formed in
/// a 256-bit intermediate; `None` means the result does not fit in `u128`.
pub fn quote_required(amount: u64, price_per_token: u128) -> Option<u128> {
    if amount == 0 || price_per_token == 0 {
        return Some(0);
    }
    multiply_by_rational_with_rounding(
        amount as u128,
        price_per_token,
        BASE_UNITS as u128,
        Rounding::Up,
    )
}

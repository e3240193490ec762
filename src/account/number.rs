//! Account number drawing.

use rand::Rng;
use rand::rngs::OsRng;

/// Number of digits of an account number.
pub const ACCOUNT_NUMBER_LENGTH: usize = 10;
/// Exclusive upper bound of the drawn value.
const UPPER_BOUND: u32 = 1_000_000_000;

/// Draw a candidate account number from the OS CSPRNG.
///
/// The value is uniform in `[0, 1_000_000_000)` and zero-padded to
/// [`ACCOUNT_NUMBER_LENGTH`] digits. Uniqueness is checked by the caller.
pub fn draw_account_number() -> String {
    let value = OsRng.gen_range(0..UPPER_BOUND);
    format!("{value:0width$}", width = ACCOUNT_NUMBER_LENGTH)
}

/// Whether `number` has the shape of an account number.
pub fn is_account_number(number: &str) -> bool {
    number.len() == ACCOUNT_NUMBER_LENGTH
        && number.bytes().all(|b| b.is_ascii_digit())
}

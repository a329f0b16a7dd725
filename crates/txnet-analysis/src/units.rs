//! Atomic-unit conversion and display sizing.

/// Atomic units per base unit on the observed ledger (1 ETH = 10^18 Wei).
pub const DEFAULT_UNIT_SCALE: u128 = 1_000_000_000_000_000_000;

/// Smallest display size handed to renderers.
pub const MIN_DISPLAY_SIZE: u32 = 1;

/// Largest display size handed to renderers.
pub const MAX_DISPLAY_SIZE: u32 = 12;

/// Balances at or below this value get [`MIN_DISPLAY_SIZE`].
pub const DISPLAY_FLOOR_BALANCE: f64 = 1.0;

/// Converts an atomic amount to base units.
///
/// Whole and fractional parts are converted separately so that large Wei
/// values keep their sub-unit precision as far as `f64` allows.
pub fn atomic_to_base(atomic: u128, scale: u128) -> f64 {
    debug_assert!(scale > 0, "unit scale must be non-zero");
    let whole = atomic / scale;
    let fractional = atomic % scale;
    whole as f64 + fractional as f64 / scale as f64
}

/// Saturating logarithmic node size for a balance in base units.
///
/// - balance <= [`DISPLAY_FLOOR_BALANCE`] -> [`MIN_DISPLAY_SIZE`]
/// - otherwise `floor(log10(balance)) + 1`, capped at [`MAX_DISPLAY_SIZE`]
pub fn display_size(balance: f64) -> u32 {
    if !balance.is_finite() || balance <= DISPLAY_FLOOR_BALANCE {
        return MIN_DISPLAY_SIZE;
    }
    let magnitude = balance.log10().floor().max(0.0) as u32;
    magnitude
        .saturating_add(1)
        .clamp(MIN_DISPLAY_SIZE, MAX_DISPLAY_SIZE)
}

/// Formats an atomic amount as base units with exactly 6 decimal places.
///
/// Examples with the default scale:
/// - `1_000_000_000_000_000_000` -> `"1.000000"`
/// - `123_000_000_000_000` -> `"0.000123"`
pub fn format_units(atomic: u128, scale: u128) -> String {
    const PRECISION: u128 = 1_000_000;

    let whole = atomic / scale;
    let fractional = (atomic % scale).saturating_mul(PRECISION) / scale;

    format!("{whole}.{fractional:06}")
}

//! Protocol constants. All values are 18-decimal fixed point unless noted.

/// One whole unit in 18-decimal fixed point (`1e18`).
///
/// # Examples
///
/// ```
/// use stakeup_core::constants::WAD;
/// assert_eq!(WAD, 10u128.pow(18));
/// ```
pub const WAD: u128 = 1_000_000_000_000_000_000;

/// Decimal places of the internal unit of account.
pub const WAD_DECIMALS: u8 = 18;

/// Basis-point scale: 10_000 bps = 100%.
pub const BPS_SCALE: u128 = 10_000;

pub const ONE_MINUTE: u64 = 60;
pub const ONE_HOUR: u64 = ONE_MINUTE * 60;
pub const ONE_DAY: u64 = ONE_HOUR * 24;
pub const ONE_WEEK: u64 = ONE_DAY * 7;

/// A schedule year is exactly 52 weeks, not a calendar year.
///
/// # Examples
///
/// ```
/// use stakeup_core::constants::{ONE_WEEK, ONE_YEAR};
/// assert_eq!(ONE_YEAR, ONE_WEEK * 52);
/// ```
pub const ONE_YEAR: u64 = ONE_WEEK * 52;

/// Reward epochs (weeks) per schedule year.
pub const EPOCHS_PER_YEAR: u64 = 52;

/// Length of one reward epoch.
pub const EPOCH_DURATION: u64 = ONE_WEEK;

/// Number of years covered by the drip table.
pub const SCHEDULE_YEARS: u64 = 6;

/// Total duration of the drip schedule.
pub const SCHEDULE_DURATION: u64 = ONE_YEAR * SCHEDULE_YEARS;

pub const DEFAULT_MINT_BPS: u16 = 1;
pub const DEFAULT_REDEEM_BPS: u16 = 50;
pub const DEFAULT_PERFORMANCE_BPS: u16 = 1_000;

/// Decimals of the underlying stablecoin (and the receipt token minted 1:1 against it).
pub const DEFAULT_UNDERLYING_DECIMALS: u8 = 6;

/// Window before a pool's commit phase ends during which idle underlying is
/// committed to it.
pub const AUTO_DEPLOY_WINDOW: u64 = ONE_DAY;

/// Mainnet USDC, 6 decimals.
pub const MAINNET_USDC: [u8; 20] = [
    0xa0, 0xb8, 0x69, 0x91, 0xc6, 0x21, 0x8b, 0x36, 0xc1, 0xd1, 0x9d, 0x4a, 0x2e, 0x9e, 0xb0,
    0xce, 0x36, 0x06, 0xeb, 0x48,
];

/// Mainnet FRAX, 18 decimals.
pub const MAINNET_FRAX: [u8; 20] = [
    0x85, 0x3d, 0x95, 0x5a, 0xce, 0xf8, 0x22, 0xdb, 0x05, 0x8e, 0xb8, 0x50, 0x59, 0x11, 0xed,
    0x77, 0xf1, 0x75, 0xb9, 0x9e,
];

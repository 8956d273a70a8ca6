//! Termlend Core - Shared domain types
//!
//! - `Wad`: 1e18 fixed-point values and the one rounding library used by every engine
//! - Ids: `MarketId`, `AssetId`, `OwnerId`, `NamespaceId`, `ProfileId`
//! - `Clock`: slot + unix time source

pub mod clock;
pub mod ids;
pub mod wad;

pub use clock::{Clock, ManualClock, SystemClock};
pub use ids::{AssetId, MarketId, NamespaceId, OwnerId, ProfileId};
pub use wad::{MathError, Wad, BPS_DENOMINATOR, WAD};

//! Market data model.
//!
//! - [`Organization`]: read-only store record
//! - [`MarketEntity`]: organization + distance, identifiers, tag
//! - [`MarketView`]: immutable snapshot of one resolved market
//! - [`Tag`] / [`TagScope`]: classification overlay values

mod entity;
mod filter;
mod organization;
mod tag;
mod view;

pub use entity::MarketEntity;
pub use filter::MarketFilter;
pub use organization::{Address, Organization};
pub use tag::{Tag, TagScope};
pub use view::{MarketSummary, MarketView, ResolutionIssue};

//! Request/response shapes for citizen demands and their CityHall sync sub-state.

mod list;
mod request;
mod response;
mod sync;

pub use list::{DEFAULT_PER_PAGE, DemandListResponse, DemandQuery, MAX_PER_PAGE};
pub use request::{
    DEFAULT_PRIORITY, DEFAULT_STATUS, DemandBase, DemandCreate, DemandUpdate, TITLE_MAX_CHARS,
};
pub use response::DemandResponse;
pub use sync::{DemandCityHallSync, SyncStatus};

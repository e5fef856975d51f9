pub mod cabinet;
pub mod demand;
pub mod field;
pub mod tenant;
pub mod timestamps;
pub mod validation;

pub use cabinet::{CabinetStatus, Plan};
pub use demand::{
    DemandBase, DemandCityHallSync, DemandCreate, DemandListResponse, DemandQuery,
    DemandResponse, DemandUpdate, SyncStatus,
};
pub use field::FieldUpdate;
pub use tenant::TenantContext;
pub use timestamps::Timestamps;
pub use validation::ValidationError;

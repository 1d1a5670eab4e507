pub mod config;
pub mod error;
pub mod filter;
pub mod format;
pub mod history;
pub mod math;
pub mod memo;
pub mod orchestrator;
pub mod poller;
pub mod query;
pub mod sort;
pub mod views;

pub use config::FarmViewConfig;
pub use error::ActionError;
pub use filter::{
    FarmFilter,
    FarmStatus,
    PositionRange,
};
pub use orchestrator::{
    ActionKind,
    ActionState,
    FarmActions,
    LiquiditySelection,
    ModalState,
};
pub use poller::Poller;
pub use query::{
    FarmQuery,
    FarmTab,
};
pub use sort::{
    SortDirection,
    SortField,
    SortState,
};
pub use views::{
    build_farm_views,
    FarmGroupView,
    NativePrices,
    PoolView,
    PositionMemo,
    VestingData,
    ViewContext,
};

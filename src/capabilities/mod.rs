mod api;
mod storage;

pub use self::api::{Api, ApiError, ApiOperation, ApiOutput, ApiResult, REGION_TABLE_PATH, REVIEWS_PATH};
pub use self::storage::{
    Storage, StorageError, StorageOperation, StorageOutput, StorageResult, MAX_KEY_LENGTH,
    MAX_VALUE_SIZE,
};

// Crux's built-in Render capability covers view invalidation as-is.
pub use crux_core::render::Render;

use crate::app::{App, Event};

pub type AppApi = Api<Event>;
pub type AppStorage = Storage<Event>;
pub type AppRender = Render<Event>;

#[derive(crux_core::macros::Effect)]
#[effect(app = "App")]
pub struct Capabilities {
    pub api: Api<Event>,
    pub storage: Storage<Event>,
    pub render: Render<Event>,
}

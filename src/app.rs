use serde::{Deserialize, Serialize};

use crate::capabilities::{ApiError, Capabilities, StorageError};
use crate::feed::{
    ApplyOutcome, Category, FeedFilter, FeedPage, FeedPaginator, FeedPhase,
};
use crate::regions::{DistrictSelection, RegionSelection, RegionTable};
use crate::{
    format_time_ago, get_current_time_ms, preview, AppError, PREVIEW_LENGTH, SETTINGS_KEY,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Event {
    Noop,

    AppStarted,
    RegionTableResponse(Box<Result<RegionTable, ApiError>>),
    SettingsRestored(Box<Result<Option<Vec<u8>>, StorageError>>),
    SettingsPersisted(Box<Result<(), StorageError>>),

    RegionSelected { region: String },
    DistrictSelected { district: String },
    CitySelected { city: String },
    SubDistrictSelected { sub_district: String },
    NeighborhoodSelected { neighborhood: String },
    CategorySelected { category: Category },

    FeedEndReached,
    FeedRefreshRequested,
    FeedPageResponse {
        epoch: u64,
        result: Box<Result<FeedPage, ApiError>>,
    },

    NetworkStatusChanged { online: bool },
    DismissError,
}

impl Event {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Noop => "noop",
            Self::AppStarted => "app_started",
            Self::RegionTableResponse(_) => "region_table_response",
            Self::SettingsRestored(_) => "settings_restored",
            Self::SettingsPersisted(_) => "settings_persisted",
            Self::RegionSelected { .. } => "region_selected",
            Self::DistrictSelected { .. } => "district_selected",
            Self::CitySelected { .. } => "city_selected",
            Self::SubDistrictSelected { .. } => "sub_district_selected",
            Self::NeighborhoodSelected { .. } => "neighborhood_selected",
            Self::CategorySelected { .. } => "category_selected",
            Self::FeedEndReached => "feed_end_reached",
            Self::FeedRefreshRequested => "feed_refresh_requested",
            Self::FeedPageResponse { .. } => "feed_page_response",
            Self::NetworkStatusChanged { .. } => "network_status_changed",
            Self::DismissError => "dismiss_error",
        }
    }

    #[must_use]
    pub const fn is_user_initiated(&self) -> bool {
        matches!(
            self,
            Self::RegionSelected { .. }
                | Self::DistrictSelected { .. }
                | Self::CitySelected { .. }
                | Self::SubDistrictSelected { .. }
                | Self::NeighborhoodSelected { .. }
                | Self::CategorySelected { .. }
                | Self::FeedEndReached
                | Self::FeedRefreshRequested
                | Self::DismissError
        )
    }
}

impl Default for Event {
    fn default() -> Self {
        Self::Noop
    }
}

pub struct Model {
    pub region_table: RegionTable,
    pub region_table_loaded: bool,
    pub selection: RegionSelection,
    pub category: Category,
    pub paginator: FeedPaginator,
    pub network_online: bool,
    pub active_error: Option<AppError>,
    pub now_ms: u64,
}

impl Default for Model {
    fn default() -> Self {
        Self {
            region_table: RegionTable::builtin(),
            region_table_loaded: false,
            selection: RegionSelection::default(),
            category: Category::All,
            paginator: FeedPaginator::default(),
            network_online: true,
            active_error: None,
            now_ms: get_current_time_ms(),
        }
    }
}

impl Model {
    pub fn update_timestamp(&mut self) {
        self.now_ms = get_current_time_ms();
    }

    pub fn set_error(&mut self, error: AppError) {
        self.active_error = Some(error);
    }

    pub fn clear_error(&mut self) {
        self.active_error = None;
    }

    #[must_use]
    pub fn current_filter(&self) -> FeedFilter {
        FeedFilter {
            region: self.selection.region().to_string(),
            category: self.category,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReviewListItem {
    pub id: String,
    pub restaurant_name: String,
    pub location_label: String,
    pub category_label: String,
    pub content_preview: String,
    pub rating: f32,
    pub author_nickname: String,
    pub has_photo: bool,
    pub like_count: u32,
    pub comment_count: u32,
    pub time_ago: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserFacingError {
    pub message: String,
    pub is_transient: bool,
    pub is_retryable: bool,
    pub error_code: String,
}

impl From<&AppError> for UserFacingError {
    fn from(e: &AppError) -> Self {
        Self {
            message: e.user_facing_message(),
            is_transient: e.severity == crate::ErrorSeverity::Transient,
            is_retryable: e.is_retryable(),
            error_code: e.code().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ViewModel {
    pub regions: Vec<String>,
    pub is_city_level_region: bool,
    pub district_options: Vec<String>,
    pub sub_district_options: Vec<String>,
    pub neighborhood_options: Vec<String>,
    pub selected_region: String,
    pub selected_district_label: String,
    pub selected_neighborhood: Option<String>,

    pub categories: Vec<String>,
    pub selected_category: String,

    pub feed: Vec<ReviewListItem>,
    pub feed_phase: FeedPhase,
    pub is_loading_more: bool,
    pub has_more: bool,

    pub online: bool,
    pub error: Option<UserFacingError>,
}

#[derive(Default)]
pub struct App;

impl App {
    fn apply_filter(model: &mut Model, caps: &Capabilities) {
        let filter = model.current_filter();
        if model.paginator.set_filter(filter) {
            Self::persist_settings(model, caps);
            Self::dispatch_next_page(model, caps);
        }
        caps.render.render();
    }

    fn dispatch_next_page(model: &mut Model, caps: &Capabilities) {
        if let Some(request) = model.paginator.load_more() {
            let epoch = request.epoch;
            caps.api.fetch_reviews(&request, move |result| Event::FeedPageResponse {
                epoch,
                result: Box::new(result),
            });
        }
    }

    fn persist_settings(model: &Model, caps: &Capabilities) {
        match serde_json::to_vec(model.paginator.filter()) {
            Ok(bytes) => {
                caps.storage.write(SETTINGS_KEY, bytes, |result| {
                    Event::SettingsPersisted(Box::new(result))
                });
            }
            Err(e) => tracing::error!(error = %e, "failed to serialize feed settings"),
        }
    }

    fn build_list_items(model: &Model) -> Vec<ReviewListItem> {
        model
            .paginator
            .items()
            .iter()
            .map(|review| ReviewListItem {
                id: review.id.as_str().to_string(),
                restaurant_name: review.restaurant_name.clone(),
                location_label: match &review.district {
                    Some(district) => format!("{} {district}", review.region),
                    None => review.region.clone(),
                },
                category_label: review.category.as_str().to_string(),
                content_preview: preview(&review.content, PREVIEW_LENGTH),
                rating: review.rating,
                author_nickname: review.author_nickname.clone(),
                has_photo: !review.photo_urls.is_empty(),
                like_count: review.like_count,
                comment_count: review.comment_count,
                time_ago: format_time_ago(review.created_at_ms, model.now_ms),
            })
            .collect()
    }
}

impl crux_core::App for App {
    type Event = Event;
    type Model = Model;
    type ViewModel = ViewModel;
    type Capabilities = Capabilities;

    fn update(&self, event: Event, model: &mut Model, caps: &Capabilities) {
        model.update_timestamp();
        tracing::debug!(event = event.name(), user = event.is_user_initiated(), "event");

        match event {
            Event::Noop => {}

            Event::AppStarted => {
                caps.api
                    .fetch_region_table(|result| Event::RegionTableResponse(Box::new(result)));
                caps.storage
                    .read(SETTINGS_KEY, |result| Event::SettingsRestored(Box::new(result)));
                Self::dispatch_next_page(model, caps);
                caps.render.render();
            }

            Event::RegionTableResponse(result) => match *result {
                Ok(table) => {
                    model.region_table = table;
                    model.region_table_loaded = true;
                    caps.render.render();
                }
                Err(e) => {
                    // Builtin table keeps the selector usable.
                    tracing::warn!(error = %e, "region table fetch failed");
                }
            },

            Event::SettingsRestored(result) => match *result {
                Ok(Some(bytes)) => match serde_json::from_slice::<FeedFilter>(&bytes) {
                    Ok(filter) => {
                        model.selection.set_region(filter.region.clone());
                        model.category = filter.category;
                        if model.paginator.set_filter(filter) {
                            Self::dispatch_next_page(model, caps);
                        }
                        caps.render.render();
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "discarding corrupt stored settings");
                    }
                },
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "settings restore failed");
                }
            },

            Event::SettingsPersisted(result) => {
                if let Err(e) = *result {
                    // Not surfaced: losing the remembered filter is benign.
                    tracing::warn!(error = %e, "settings persist failed");
                }
            }

            Event::RegionSelected { region } => {
                model.selection.set_region(region);
                Self::apply_filter(model, caps);
            }

            Event::DistrictSelected { district } => {
                model
                    .selection
                    .set_district(DistrictSelection::plain(district));
                caps.render.render();
            }

            Event::CitySelected { city } => {
                model.selection.set_district(DistrictSelection::city(city));
                caps.render.render();
            }

            Event::SubDistrictSelected { sub_district } => {
                model.selection.set_sub_district(sub_district);
                caps.render.render();
            }

            Event::NeighborhoodSelected { neighborhood } => {
                model.selection.set_neighborhood(neighborhood);
                caps.render.render();
            }

            Event::CategorySelected { category } => {
                model.category = category;
                Self::apply_filter(model, caps);
            }

            Event::FeedEndReached => {
                if !model.network_online {
                    tracing::debug!("offline, load-more suppressed");
                    return;
                }
                Self::dispatch_next_page(model, caps);
            }

            Event::FeedRefreshRequested => {
                model.clear_error();
                model.paginator.refresh();
                Self::dispatch_next_page(model, caps);
                caps.render.render();
            }

            Event::FeedPageResponse { epoch, result } => match *result {
                Ok(page) => {
                    if let ApplyOutcome::Applied { appended } =
                        model.paginator.apply_page(epoch, page)
                    {
                        tracing::debug!(appended, total = model.paginator.len(), "page merged");
                        caps.render.render();
                    }
                }
                Err(e) => {
                    let app_error = e.to_app_error();
                    if model.paginator.apply_failure(epoch, app_error.clone())
                        == ApplyOutcome::Failed
                    {
                        model.set_error(app_error);
                        caps.render.render();
                    }
                }
            },

            Event::NetworkStatusChanged { online } => {
                model.network_online = online;
                caps.render.render();
            }

            Event::DismissError => {
                model.clear_error();
                caps.render.render();
            }
        }
    }

    fn view(&self, model: &Model) -> ViewModel {
        let table = &model.region_table;
        let region = model.selection.region();

        let is_city_level = table.is_city_level(region);
        let district_options = if is_city_level {
            table.cities(region)
        } else {
            table.districts(region)
        };

        let sub_district_options = model
            .selection
            .district()
            .and_then(DistrictSelection::city_name)
            .map(|city| table.sub_districts(region, city))
            .unwrap_or_default();

        let district_label = model.selection.district_label(table);
        let neighborhood_options = if district_label.is_empty() {
            Vec::new()
        } else {
            table.neighborhoods(region, &district_label)
        };

        ViewModel {
            regions: table.regions().into_iter().map(String::from).collect(),
            is_city_level_region: is_city_level,
            district_options: district_options.into_iter().map(String::from).collect(),
            sub_district_options: sub_district_options
                .into_iter()
                .map(String::from)
                .collect(),
            neighborhood_options: neighborhood_options
                .into_iter()
                .map(String::from)
                .collect(),
            selected_region: region.to_string(),
            selected_district_label: district_label,
            selected_neighborhood: model.selection.neighborhood().map(String::from),

            categories: Category::ALL_CATEGORIES
                .iter()
                .map(|c| c.as_str().to_string())
                .collect(),
            selected_category: model.category.as_str().to_string(),

            feed: Self::build_list_items(model),
            feed_phase: model.paginator.phase(),
            is_loading_more: model.paginator.is_in_flight(),
            has_more: model.paginator.has_more(),

            online: model.network_online,
            error: model.active_error.as_ref().map(UserFacingError::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{ReviewId, ReviewSummary};
    use crate::regions::REGION_ALL;
    use crate::ErrorKind;

    fn review(id: &str, content: &str, created_at_ms: u64) -> ReviewSummary {
        ReviewSummary {
            id: ReviewId::new(id),
            restaurant_name: "연남 국수집".into(),
            region: "서울".into(),
            district: Some("마포구".into()),
            category: Category::Korean,
            content: content.into(),
            rating: 4.0,
            author_nickname: "면식가".into(),
            photo_urls: vec!["https://cdn.example.com/1.jpg".into()],
            like_count: 3,
            comment_count: 1,
            created_at_ms,
        }
    }

    mod event_tests {
        use super::*;

        #[test]
        fn test_event_default() {
            assert!(matches!(Event::default(), Event::Noop));
        }

        #[test]
        fn test_event_name() {
            assert_eq!(Event::Noop.name(), "noop");
            assert_eq!(Event::AppStarted.name(), "app_started");
            assert_eq!(Event::FeedEndReached.name(), "feed_end_reached");
        }

        #[test]
        fn test_event_is_user_initiated() {
            assert!(!Event::Noop.is_user_initiated());
            assert!(!Event::AppStarted.is_user_initiated());
            assert!(Event::FeedEndReached.is_user_initiated());
            assert!(Event::RegionSelected {
                region: "서울".into()
            }
            .is_user_initiated());
        }
    }

    mod model_tests {
        use super::*;

        #[test]
        fn test_model_default() {
            let model = Model::default();
            assert_eq!(model.selection.region(), REGION_ALL);
            assert_eq!(model.category, Category::All);
            assert!(model.paginator.is_empty());
            assert!(model.network_online);
            assert!(model.active_error.is_none());
            assert!(!model.region_table_loaded);
        }

        #[test]
        fn test_current_filter_follows_selection() {
            let mut model = Model::default();
            model.selection.set_region("서울");
            model.category = Category::Cafe;

            let filter = model.current_filter();
            assert_eq!(filter.region, "서울");
            assert_eq!(filter.category, Category::Cafe);
        }
    }

    mod view_tests {
        use super::*;

        #[test]
        fn test_view_default_model() {
            let app = App;
            let model = Model::default();
            let view = crux_core::App::view(&app, &model);

            assert_eq!(view.regions[0], REGION_ALL);
            assert_eq!(view.selected_region, REGION_ALL);
            assert!(view.district_options.is_empty());
            assert_eq!(view.categories[0], "전체");
            assert_eq!(view.feed_phase, FeedPhase::Idle);
            assert!(view.has_more);
            assert!(view.feed.is_empty());
            assert!(view.error.is_none());
        }

        #[test]
        fn test_view_city_level_options() {
            let app = App;
            let mut model = Model::default();
            model.selection.set_region("경기");
            model
                .selection
                .set_district(DistrictSelection::city("수원시"));

            let view = crux_core::App::view(&app, &model);
            assert!(view.is_city_level_region);
            assert!(view.district_options.contains(&"수원시".to_string()));
            assert_eq!(
                view.sub_district_options,
                vec!["장안구", "권선구", "팔달구", "영통구"]
            );
            // Sub-district still pending, so no composed label yet.
            assert_eq!(view.selected_district_label, "");
        }

        #[test]
        fn test_view_list_items() {
            let app = App;
            let mut model = Model::default();
            let now = model.now_ms;

            let epoch = model.paginator.epoch();
            let request = model.paginator.load_more().unwrap();
            assert_eq!(request.epoch, epoch);
            model.paginator.apply_page(
                epoch,
                FeedPage {
                    items: vec![review("r1", &"길".repeat(120), now - 3_600_000)],
                    page_index: 0,
                    is_last: false,
                },
            );

            let view = crux_core::App::view(&app, &model);
            assert_eq!(view.feed.len(), 1);
            let item = &view.feed[0];
            assert_eq!(item.location_label, "서울 마포구");
            assert_eq!(item.category_label, "한식");
            assert!(item.has_photo);
            assert_eq!(item.time_ago, "1h ago");
            assert!(item.content_preview.chars().count() <= PREVIEW_LENGTH);
        }

        #[test]
        fn test_view_error_mapping() {
            let app = App;
            let mut model = Model::default();
            model.set_error(AppError::new(ErrorKind::Network, "boom"));

            let view = crux_core::App::view(&app, &model);
            let error = view.error.unwrap();
            assert_eq!(error.error_code, "NETWORK_ERROR");
            assert!(error.is_retryable);
            assert!(error.is_transient);
        }
    }
}

use crux_core::testing::AppTester;
use crux_core::App as _;

use shared::capabilities::{ApiOperation, ApiOutput};
use shared::regions::{DistrictEntry, RegionEntry, RegionTable, REGION_ALL};
use shared::{App, Effect, Event, Model};

fn view(model: &Model) -> shared::ViewModel {
    App::default().view(model)
}

#[test]
fn test_region_table_fetched_once_at_startup() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();

    let mut update = app.update(Event::AppStarted, &mut model);
    let table_request = update
        .effects
        .iter_mut()
        .find_map(|effect| match effect {
            Effect::Api(request)
                if matches!(request.operation, ApiOperation::FetchRegionTable) =>
            {
                Some(request)
            }
            _ => None,
        })
        .expect("region table fetch dispatched at startup");

    let server_table = RegionTable::new(vec![RegionEntry {
        name: "서울".into(),
        city_level: false,
        districts: vec![DistrictEntry {
            name: "마포구".into(),
            sub_districts: vec![],
            neighborhoods: vec!["연남동".into()],
        }],
    }]);

    let resolved = app
        .resolve(table_request, Ok(ApiOutput::RegionTable(server_table.clone())))
        .expect("resolve region table");
    for event in resolved.events {
        let _ = app.update(event, &mut model);
    }

    assert!(model.region_table_loaded);
    assert_eq!(model.region_table, server_table);
    assert_eq!(view(&model).regions, vec![REGION_ALL, "서울"]);
}

#[test]
fn test_region_table_failure_keeps_builtin() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();

    let mut update = app.update(Event::AppStarted, &mut model);
    let table_request = update
        .effects
        .iter_mut()
        .find_map(|effect| match effect {
            Effect::Api(request)
                if matches!(request.operation, ApiOperation::FetchRegionTable) =>
            {
                Some(request)
            }
            _ => None,
        })
        .expect("region table fetch dispatched at startup");

    let resolved = app
        .resolve(
            table_request,
            Err(shared::capabilities::ApiError::Timeout { timeout_ms: 15_000 }),
        )
        .expect("resolve region table failure");
    for event in resolved.events {
        let _ = app.update(event, &mut model);
    }

    assert!(!model.region_table_loaded);
    assert!(view(&model).regions.contains(&"서울".to_string()));
    assert!(model.active_error.is_none());
}

#[test]
fn test_city_with_sub_districts_labels_after_both_chosen() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();

    let _ = app.update(
        Event::RegionSelected {
            region: "경기".into(),
        },
        &mut model,
    );
    let v = view(&model);
    assert!(v.is_city_level_region);
    assert!(v.district_options.contains(&"수원시".to_string()));

    let _ = app.update(
        Event::CitySelected {
            city: "수원시".into(),
        },
        &mut model,
    );
    let v = view(&model);
    assert_eq!(v.selected_district_label, "");
    assert_eq!(
        v.sub_district_options,
        vec!["장안구", "권선구", "팔달구", "영통구"]
    );

    let _ = app.update(
        Event::SubDistrictSelected {
            sub_district: "장안구".into(),
        },
        &mut model,
    );
    assert_eq!(view(&model).selected_district_label, "수원시 장안구");

    // Switching to a city without sub-districts labels immediately.
    let _ = app.update(
        Event::CitySelected {
            city: "남양주시".into(),
        },
        &mut model,
    );
    let v = view(&model);
    assert_eq!(v.selected_district_label, "남양주시");
    assert!(v.sub_district_options.is_empty());
}

#[test]
fn test_region_change_cascades_through_update_loop() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();

    let _ = app.update(
        Event::RegionSelected {
            region: "서울".into(),
        },
        &mut model,
    );
    let _ = app.update(
        Event::DistrictSelected {
            district: "마포구".into(),
        },
        &mut model,
    );
    let _ = app.update(
        Event::NeighborhoodSelected {
            neighborhood: "연남동".into(),
        },
        &mut model,
    );

    let v = view(&model);
    assert_eq!(v.selected_district_label, "마포구");
    assert_eq!(v.selected_neighborhood.as_deref(), Some("연남동"));
    assert!(v.neighborhood_options.contains(&"연남동".to_string()));

    let _ = app.update(
        Event::RegionSelected {
            region: "부산".into(),
        },
        &mut model,
    );

    let v = view(&model);
    assert_eq!(v.selected_region, "부산");
    assert_eq!(v.selected_district_label, "");
    assert_eq!(v.selected_neighborhood, None);
    assert!(v.district_options.contains(&"해운대구".to_string()));
}

#[test]
fn test_district_options_never_leak_across_regions() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();

    let _ = app.update(
        Event::RegionSelected {
            region: "서울".into(),
        },
        &mut model,
    );
    let seoul = view(&model).district_options;

    let _ = app.update(
        Event::RegionSelected {
            region: "부산".into(),
        },
        &mut model,
    );
    let busan = view(&model).district_options;

    assert!(seoul.contains(&"강남구".to_string()));
    assert!(!busan.contains(&"강남구".to_string()));
    assert!(busan.contains(&"해운대구".to_string()));
    assert!(!seoul.contains(&"해운대구".to_string()));
}

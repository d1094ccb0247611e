#![allow(missing_docs)]

use std::path::Path;

use pretty_assertions::assert_eq;
use vehicle::route::list_routes;
use vehicle::{Error, Route, load_route};

const DATA_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/data");

// Should load the sample route and convert ITN integers to degrees.
#[test]
fn load_sample_route() {
    let waypoints =
        load_route(Path::new(DATA_DIR).join("karlsruhe.itn")).expect("should load route");
    assert_eq!(waypoints.len(), 4);

    let route = Route::new(waypoints).expect("should build route");
    let first = route.first();
    assert!((first.longitude - 8.45453).abs() < 1e-9);
    assert!((first.latitude - 49.02352).abs() < 1e-9);
    assert_eq!(route.advance(3), 0);
}

// Should report the file and line of a malformed waypoint.
#[test]
fn load_broken_route() {
    let err = load_route(Path::new(DATA_DIR).join("broken.itn")).expect_err("should fail");

    let Error::RouteParse(description) = &err else {
        panic!("expected a route parse error");
    };
    assert!(description.contains("broken.itn"), "{description}");
    assert!(description.contains("line 2: missing latitude"), "{description}");
}

// Should load an empty file as an empty route, which the simulator rejects.
#[test]
fn load_empty_route() {
    let waypoints = load_route(Path::new(DATA_DIR).join("empty.itn")).expect("should load");
    assert!(waypoints.is_empty());
    assert!(matches!(Route::new(waypoints), Err(Error::InvalidRoute)));
}

// Should fail to read a file that does not exist.
#[test]
fn load_missing_route() {
    let err = load_route(Path::new(DATA_DIR).join("atlantis.itn")).expect_err("should fail");
    assert_eq!(err.code(), "route_parse_error");
}

// Should list only ITN files, in name order.
#[test]
fn list_data_routes() {
    let routes = list_routes(DATA_DIR).expect("should list routes");
    let names: Vec<_> = routes
        .iter()
        .filter_map(|path| path.file_name().and_then(|name| name.to_str()))
        .collect();

    assert_eq!(names, vec!["broken.itn", "empty.itn", "karlsruhe.itn"]);
}

//! Built-in in-process tools
//!
//! | Tool | Handler | Returns |
//! |------|---------|---------|
//! | `geo.distance` | great-circle distance | `distance_km`, `distance_miles` |
//! | `geo.bearing` | initial bearing | `bearing_degrees`, `compass` |
//! | `hardware.status` | scarce-device ownership | one entry per managed device |
//! | `hardware.scan` | one hardware scan | the scan report |

use std::sync::Arc;

use argos_application::{HardwareScanner, ResourceManager};
use argos_domain::tool::entities::{InProcessConfig, ParameterSchema, Parameters, ToolDefinition, TransportConfig};
use serde_json::{Value, json};

use super::in_process::{HandlerResult, InProcessAdapter};

const EARTH_RADIUS_KM: f64 = 6371.0;
const EARTH_RADIUS_MILES: f64 = 3959.0;

const COMPASS_POINTS: [&str; 8] = ["N", "NE", "E", "SE", "S", "SW", "W", "NW"];

pub const GEO_DISTANCE: &str = "geo.distance";
pub const GEO_BEARING: &str = "geo.bearing";
pub const HARDWARE_STATUS: &str = "hardware.status";
pub const HARDWARE_SCAN: &str = "hardware.scan";

fn internal(handler: &str) -> TransportConfig {
    TransportConfig::InProcess(InProcessConfig {
        handler: handler.to_string(),
    })
}

fn coordinate_tool(name: &str, description: &str) -> ToolDefinition {
    ToolDefinition::new(name, "geo", description, internal(name))
        .with_required("lat1", ParameterSchema::number("Latitude of the first point"))
        .with_required("lon1", ParameterSchema::number("Longitude of the first point"))
        .with_required("lat2", ParameterSchema::number("Latitude of the second point"))
        .with_required("lon2", ParameterSchema::number("Longitude of the second point"))
        .with_workflow("geospatial_analysis")
        .with_tag("geo")
        .with_tag("calculation")
}

/// Definitions for every built-in tool
pub fn builtin_tools() -> Vec<ToolDefinition> {
    vec![
        coordinate_tool(GEO_DISTANCE, "Great-circle distance between two coordinates"),
        coordinate_tool(GEO_BEARING, "Initial compass bearing from the first coordinate to the second"),
        ToolDefinition::new(
            HARDWARE_STATUS,
            "hardware",
            "Ownership and detection state of the scarce radio devices",
            internal(HARDWARE_STATUS),
        )
        .with_tag("hardware")
        .with_tag("status"),
        ToolDefinition::new(
            HARDWARE_SCAN,
            "hardware",
            "Scan the host for SDR, WiFi, Bluetooth, GPS and cellular hardware",
            internal(HARDWARE_SCAN),
        )
        .with_tag("hardware")
        .with_tag("discovery"),
    ]
}

/// Register every built-in handler
pub fn register_builtin_handlers(
    adapter: &InProcessAdapter,
    resources: Arc<ResourceManager>,
    scanner: Arc<HardwareScanner>,
) {
    register_geo_handlers(adapter);
    register_hardware_handlers(adapter, resources, scanner);
}

pub fn register_geo_handlers(adapter: &InProcessAdapter) {
    adapter.register_handler(GEO_DISTANCE, |params, _| async move { distance(&params) });
    adapter.register_handler(GEO_BEARING, |params, _| async move { bearing(&params) });
}

pub fn register_hardware_handlers(
    adapter: &InProcessAdapter,
    resources: Arc<ResourceManager>,
    scanner: Arc<HardwareScanner>,
) {
    adapter.register_handler(HARDWARE_STATUS, move |_, _| {
        let resources = Arc::clone(&resources);
        async move { serde_json::to_value(resources.status()).map_err(|e| e.to_string()) }
    });
    adapter.register_handler(HARDWARE_SCAN, move |_, _| {
        let scanner = Arc::clone(&scanner);
        async move { serde_json::to_value(scanner.scan().await).map_err(|e| e.to_string()) }
    });
}

fn number(params: &Parameters, name: &str) -> Result<f64, String> {
    params
        .get(name)
        .and_then(Value::as_f64)
        .ok_or_else(|| format!("Parameter {} must be a number", name))
}

/// (lat1, lon1, lat2, lon2) in radians
fn coordinates(params: &Parameters) -> Result<(f64, f64, f64, f64), String> {
    Ok((
        number(params, "lat1")?.to_radians(),
        number(params, "lon1")?.to_radians(),
        number(params, "lat2")?.to_radians(),
        number(params, "lon2")?.to_radians(),
    ))
}

/// Haversine central angle between two points, in radians
fn central_angle(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = lat2 - lat1;
    let d_lon = lon2 - lon1;
    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * a.sqrt().atan2((1.0 - a).sqrt())
}

fn distance(params: &Parameters) -> HandlerResult {
    let (lat1, lon1, lat2, lon2) = coordinates(params)?;
    let c = central_angle(lat1, lon1, lat2, lon2);
    Ok(json!({
        "distance_km": EARTH_RADIUS_KM * c,
        "distance_miles": EARTH_RADIUS_MILES * c,
    }))
}

fn bearing(params: &Parameters) -> HandlerResult {
    let (lat1, lon1, lat2, lon2) = coordinates(params)?;
    let d_lon = lon2 - lon1;
    let y = d_lon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * d_lon.cos();
    let degrees = (y.atan2(x).to_degrees() + 360.0) % 360.0;
    let compass = COMPASS_POINTS[((degrees + 22.5) / 45.0) as usize % COMPASS_POINTS.len()];
    Ok(json!({ "bearing_degrees": degrees, "compass": compass }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use argos_application::{
        DevicePresence, HardwareRegistry, ProcessControl, ProcessInfo, ResourceConfig,
        ToolBackendAdapter, ports::process_control::Result as SystemResult,
    };
    use argos_domain::{ScarceDevice, tool::value_objects::ExecutionStatus};
    use async_trait::async_trait;

    fn points(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> Parameters {
        json!({"lat1": lat1, "lon1": lon1, "lat2": lat2, "lon2": lon2})
            .as_object()
            .cloned()
            .unwrap()
    }

    struct IdleHost;

    #[async_trait]
    impl ProcessControl for IdleHost {
        async fn list_processes(&self) -> SystemResult<Vec<ProcessInfo>> {
            Ok(Vec::new())
        }
        async fn kill(&self, _pid: u32) -> SystemResult<()> {
            Ok(())
        }
        async fn running_containers(&self) -> SystemResult<Vec<String>> {
            Ok(Vec::new())
        }
        async fn stop_container(&self, _name: &str) -> SystemResult<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl DevicePresence for IdleHost {
        async fn is_present(&self, _device: ScarceDevice) -> SystemResult<bool> {
            Ok(false)
        }
    }

    #[test]
    fn test_builtin_tools_are_valid() {
        let tools = builtin_tools();
        assert_eq!(tools.len(), 4);
        for tool in &tools {
            tool.validate().unwrap();
        }
        assert!(tools[0].is_required("lat1"));
    }

    #[test]
    fn test_distance_one_degree_of_longitude_at_equator() {
        let result = distance(&points(0.0, 0.0, 0.0, 1.0)).unwrap();
        let km = result["distance_km"].as_f64().unwrap();
        let miles = result["distance_miles"].as_f64().unwrap();
        assert!((km - 111.195).abs() < 0.01, "{km}");
        assert!((miles - 69.09).abs() < 0.01, "{miles}");
    }

    #[test]
    fn test_distance_same_point_is_zero() {
        let result = distance(&points(38.89, -77.03, 38.89, -77.03)).unwrap();
        assert_eq!(result["distance_km"].as_f64().unwrap(), 0.0);
    }

    #[test]
    fn test_bearing_cardinal_directions() {
        let east = bearing(&points(0.0, 0.0, 0.0, 1.0)).unwrap();
        assert!((east["bearing_degrees"].as_f64().unwrap() - 90.0).abs() < 1e-9);
        assert_eq!(east["compass"], "E");

        let north = bearing(&points(0.0, 0.0, 1.0, 0.0)).unwrap();
        assert!(north["bearing_degrees"].as_f64().unwrap().abs() < 1e-9);
        assert_eq!(north["compass"], "N");

        let south_west = bearing(&points(0.0, 0.0, -1.0, -1.0)).unwrap();
        assert_eq!(south_west["compass"], "SW");
    }

    #[test]
    fn test_missing_coordinate_is_error() {
        let mut params = points(0.0, 0.0, 0.0, 0.0);
        params.remove("lon2");
        assert_eq!(distance(&params).unwrap_err(), "Parameter lon2 must be a number");
    }

    #[tokio::test]
    async fn test_geo_distance_through_adapter() {
        let adapter = InProcessAdapter::new();
        register_geo_handlers(&adapter);
        let tool = &builtin_tools()[0];

        let result = adapter.execute(tool, &points(0.0, 0.0, 0.0, 1.0), None).await;

        assert_eq!(result.status, ExecutionStatus::Success);
        assert!(result.data.unwrap()["distance_km"].as_f64().unwrap() > 111.0);
    }

    #[tokio::test]
    async fn test_hardware_handlers_report_state() {
        let host = Arc::new(IdleHost);
        let resources = Arc::new(ResourceManager::new(ResourceConfig::default(), host.clone(), host));
        resources.acquire("kismet", ScarceDevice::Alfa).await;
        let scanner = Arc::new(HardwareScanner::new(Arc::new(HardwareRegistry::new())));

        let adapter = InProcessAdapter::new();
        register_builtin_handlers(&adapter, resources, scanner);
        let tools = builtin_tools();

        let status = adapter.execute(&tools[2], &Parameters::new(), None).await;
        let states = status.data.unwrap();
        let alfa = states
            .as_array()
            .unwrap()
            .iter()
            .find(|s| s["device"] == "alfa")
            .unwrap()
            .clone();
        assert_eq!(alfa["owner"], "kismet");
        assert_eq!(alfa["is_available"], false);

        let scan = adapter.execute(&tools[3], &Parameters::new(), None).await;
        assert!(scan.is_success());
        assert_eq!(scan.data.unwrap()["devices"], json!([]));
    }
}

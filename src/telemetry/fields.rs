//! Header names of the telemetry record schema

pub const TIME: &str = "Time";
pub const VEHICLE_ID: &str = "Vehicle_ID";
pub const SPEED: &str = "Speed";
pub const ACCELERATION: &str = "Acceleration";
pub const LATITUDE: &str = "Latitude";
pub const LONGITUDE: &str = "Longitude";
pub const LANE: &str = "Lane";
pub const SPEED_LIMIT: &str = "Speed_Limit";
pub const HEADWAY_DISTANCE: &str = "Headway_Distance";
pub const TIME_GAP: &str = "Time_Gap";
pub const LANE_CHANGE: &str = "Lane_Change";
pub const COLLISION: &str = "Collision";

/// Columns the risk scorer cannot work without
pub const RISK_REQUIRED: [&str; 6] = [
    VEHICLE_ID,
    SPEED,
    SPEED_LIMIT,
    ACCELERATION,
    LANE_CHANGE,
    TIME_GAP,
];

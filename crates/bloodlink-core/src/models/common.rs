//! Value types shared by several entities: roles, polymorphic entity
//! references, geolocation, addresses, and blood groups.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::CoreError;

/// The role carried in an access token and recorded on every transition.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Role {
    Donor,
    Hospital,
    #[serde(rename = "NGO")]
    Ngo,
    Admin,
}

string_enum!(Role {
    Donor => "Donor",
    Hospital => "Hospital",
    Ngo => "NGO",
    Admin => "Admin",
});

impl Role {
    /// The collection an account with this role is stored in.
    pub fn entity_type(&self) -> EntityType {
        match self {
            Role::Donor | Role::Admin => EntityType::User,
            Role::Hospital => EntityType::Hospital,
            Role::Ngo => EntityType::Ngo,
        }
    }
}

/// Discriminator naming the collection a reference resolves into.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum EntityType {
    User,
    Hospital,
    #[serde(rename = "NGO")]
    Ngo,
}

string_enum!(EntityType {
    User => "User",
    Hospital => "Hospital",
    Ngo => "NGO",
});

/// A weak reference: an identifier plus the type tag needed to resolve it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct EntityRef {
    pub id: Uuid,
    pub entity_type: EntityType,
}

impl EntityRef {
    pub fn new(id: Uuid, entity_type: EntityType) -> Self {
        Self { id, entity_type }
    }
}

/// The authenticated caller of a workflow operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn new(id: Uuid, role: Role) -> Self {
        Self { id, role }
    }

    pub fn entity_ref(&self) -> EntityRef {
        EntityRef::new(self.id, self.role.entity_type())
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// True when the actor is the referenced entity.
    pub fn is(&self, entity: &EntityRef) -> bool {
        self.entity_ref() == *entity
    }
}

/// A WGS84 point. Serialized as GeoJSON:
/// `{"type": "Point", "coordinates": [longitude, latitude]}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GeoJsonPoint", into = "GeoJsonPoint")]
pub struct GeoPoint {
    pub longitude: f64,
    pub latitude: f64,
}

const EARTH_RADIUS_KM: f64 = 6371.0;

impl GeoPoint {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }

    /// Great-circle distance in kilometres (haversine).
    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        let (lat1, lat2) = (self.latitude.to_radians(), other.latitude.to_radians());
        let dlat = lat2 - lat1;
        let dlon = (other.longitude - self.longitude).to_radians();
        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
    }

    /// Smallest longitude/latitude box holding every point within
    /// `radius_km`. Spans every longitude near the poles and across the
    /// antimeridian.
    pub fn bounds_within(&self, radius_km: f64) -> GeoBounds {
        let angular = radius_km / EARTH_RADIUS_KM;
        let lat_delta = angular.to_degrees();
        let min_latitude = (self.latitude - lat_delta).max(-90.0);
        let max_latitude = (self.latitude + lat_delta).min(90.0);
        let full = GeoBounds {
            min_longitude: -180.0,
            max_longitude: 180.0,
            min_latitude,
            max_latitude,
        };

        let spread = angular.sin() / self.latitude.to_radians().cos();
        if min_latitude <= -90.0 || max_latitude >= 90.0 || spread >= 1.0 {
            return full;
        }
        let lon_delta = spread.asin().to_degrees();
        let (min_longitude, max_longitude) = (self.longitude - lon_delta, self.longitude + lon_delta);
        if min_longitude < -180.0 || max_longitude > 180.0 {
            return full;
        }
        GeoBounds {
            min_longitude,
            max_longitude,
            ..full
        }
    }
}

/// Inclusive coordinate box used to pre-filter stored locations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBounds {
    pub min_longitude: f64,
    pub max_longitude: f64,
    pub min_latitude: f64,
    pub max_latitude: f64,
}

impl GeoBounds {
    pub fn contains(&self, point: &GeoPoint) -> bool {
        (self.min_longitude..=self.max_longitude).contains(&point.longitude)
            && (self.min_latitude..=self.max_latitude).contains(&point.latitude)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeoJsonPoint {
    #[serde(rename = "type")]
    kind: String,
    coordinates: [f64; 2],
}

impl TryFrom<GeoJsonPoint> for GeoPoint {
    type Error = CoreError;

    fn try_from(value: GeoJsonPoint) -> Result<Self, Self::Error> {
        if value.kind != "Point" {
            return Err(CoreError::validation(format!(
                "location: unsupported geometry type {}",
                value.kind
            )));
        }
        let [longitude, latitude] = value.coordinates;
        Ok(GeoPoint::new(longitude, latitude))
    }
}

impl From<GeoPoint> for GeoJsonPoint {
    fn from(point: GeoPoint) -> Self {
        GeoJsonPoint {
            kind: "Point".into(),
            coordinates: [point.longitude, point.latitude],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct Address {
    #[validate(length(min = 1, max = 200))]
    pub street: String,
    #[validate(length(min = 1, max = 100))]
    pub city: String,
    #[validate(length(min = 1, max = 100))]
    pub state: String,
    #[validate(custom(function = "crate::validation::validate_pin_code"))]
    pub pin_code: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum BloodGroup {
    #[serde(rename = "A+")]
    APositive,
    #[serde(rename = "A-")]
    ANegative,
    #[serde(rename = "B+")]
    BPositive,
    #[serde(rename = "B-")]
    BNegative,
    #[serde(rename = "AB+")]
    AbPositive,
    #[serde(rename = "AB-")]
    AbNegative,
    #[serde(rename = "O+")]
    OPositive,
    #[serde(rename = "O-")]
    ONegative,
}

string_enum!(BloodGroup {
    APositive => "A+",
    ANegative => "A-",
    BPositive => "B+",
    BNegative => "B-",
    AbPositive => "AB+",
    AbNegative => "AB-",
    OPositive => "O+",
    ONegative => "O-",
});

/// Account standing shared by users, hospitals and NGOs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AccountStatus {
    Active,
    Inactive,
    Suspended,
}

string_enum!(AccountStatus {
    Active => "Active",
    Inactive => "Inactive",
    Suspended => "Suspended",
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geo_point_serializes_as_geojson() {
        let p = GeoPoint::new(77.5946, 12.9716);
        let json = serde_json::to_value(p).unwrap();
        assert_eq!(json["type"], "Point");
        assert_eq!(json["coordinates"][0], 77.5946);
        assert_eq!(json["coordinates"][1], 12.9716);
    }

    #[test]
    fn geo_point_rejects_non_point_geometry() {
        let raw = r#"{"type":"LineString","coordinates":[1.0,2.0]}"#;
        assert!(serde_json::from_str::<GeoPoint>(raw).is_err());
    }

    #[test]
    fn distance_between_known_cities() {
        // Bengaluru -> Chennai is roughly 290 km.
        let blr = GeoPoint::new(77.5946, 12.9716);
        let maa = GeoPoint::new(80.2707, 13.0827);
        let d = blr.distance_km(&maa);
        assert!((280.0..300.0).contains(&d), "got {d}");
    }

    #[test]
    fn bounds_cover_the_search_circle() {
        let blr = GeoPoint::new(77.5946, 12.9716);
        let bounds = blr.bounds_within(300.0);
        assert!(bounds.contains(&GeoPoint::new(80.2707, 13.0827)));
        assert!(!bounds.contains(&GeoPoint::new(72.8777, 19.0760)));
        assert!(bounds.max_latitude - bounds.min_latitude < 6.0);

        // Points right on the circle's east and north edges stay inside.
        let east = GeoPoint::new(77.5946 + 2.76, 12.9716);
        assert!(blr.distance_km(&east) <= 300.0);
        assert!(bounds.contains(&east));
        let north = GeoPoint::new(77.5946, 12.9716 + 2.69);
        assert!(blr.distance_km(&north) <= 300.0);
        assert!(bounds.contains(&north));
    }

    #[test]
    fn bounds_widen_near_poles_and_antimeridian() {
        let arctic = GeoPoint::new(10.0, 88.0).bounds_within(400.0);
        assert_eq!(arctic.min_longitude, -180.0);
        assert_eq!(arctic.max_latitude, 90.0);

        let fiji = GeoPoint::new(179.5, -17.7).bounds_within(100.0);
        assert_eq!((fiji.min_longitude, fiji.max_longitude), (-180.0, 180.0));
        assert!(fiji.contains(&GeoPoint::new(-179.8, -17.7)));
    }

    #[test]
    fn blood_group_round_trips_through_str() {
        for group in BloodGroup::ALL {
            assert_eq!(group.as_str().parse::<BloodGroup>().unwrap(), *group);
        }
        assert!("C+".parse::<BloodGroup>().is_err());
    }

    #[test]
    fn role_maps_to_collection() {
        assert_eq!(Role::Admin.entity_type(), EntityType::User);
        assert_eq!(Role::Ngo.entity_type(), EntityType::Ngo);
        assert_eq!(serde_json::to_value(Role::Ngo).unwrap(), "NGO");
    }
}

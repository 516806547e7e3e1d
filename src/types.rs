use serde::{Deserialize, Deserializer, Serialize};

/// Location resolved from a postal code by the geocoding service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationResult {
    pub country: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub places: Vec<Place>,
    #[serde(rename = "post code", default, skip_serializing_if = "Option::is_none")]
    pub post_code: Option<String>,
    #[serde(
        rename = "country abbreviation",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub country_abbreviation: Option<String>,
}

impl LocationResult {
    /// The place shown to the user. Later entries are never consulted.
    pub fn primary_place(&self) -> Option<&Place> {
        self.places.first()
    }
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Place>, D::Error> {
    Ok(Option::<Vec<Place>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Individual place in the response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub state: String,
    #[serde(rename = "place name")]
    pub place_name: String,
    #[serde(
        rename = "state abbreviation",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub state_abbreviation: Option<String>,
    // The service sends coordinates as strings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<String>,
}

impl Place {
    /// Parse latitude/longitude into numbers, if both are present and valid
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        let lat = self.latitude.as_deref()?.trim().parse().ok()?;
        let lon = self.longitude.as_deref()?.trim().parse().ok()?;
        Some((lat, lon))
    }
}

//! Projection of a lookup session onto what the user sees.
//!
//! [`project`] is pure: it reads the controller and builds a [`View`]; the
//! renderers below only transcribe that view into text or HTML.

use std::fmt;
use std::ops::RangeInclusive;

use maud::{DOCTYPE, Markup, html};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Serialize;

use crate::controller::LookupController;
use crate::types::LocationResult;

/// Length bounds enforced on the postal code input field
pub const POSTAL_CODE_LENGTH: RangeInclusive<usize> = 6..=10;

const MAP_EMBED_BASE: &str = "https://maps.google.com/maps";
const MAP_ZOOM: u8 = 13;
pub const MAP_WIDTH: u32 = 300;
pub const MAP_HEIGHT: u32 = 150;

/// Everything except `A-Z a-z 0-9 - _ . ! ~ * ' ( )`, as in URI components
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Input-level length check. An empty value passes so that submit can report it.
pub fn input_length_ok(raw: &str) -> bool {
    raw.is_empty() || POSTAL_CODE_LENGTH.contains(&raw.chars().count())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct View {
    pub query: String,
    pub submit_label: &'static str,
    pub submit_disabled: bool,
    pub show_clear: bool,
    pub error: Option<String>,
    pub location: Option<LocationView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationView {
    pub country: String,
    /// Absent when the service returned no places
    pub place: Option<PlaceView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaceView {
    pub state: String,
    pub place_name: String,
    /// `(latitude, longitude)` when the service sent usable values
    pub coordinates: Option<(f64, f64)>,
    pub map: MapEmbed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapEmbed {
    pub src: String,
    pub width: u32,
    pub height: u32,
}

impl MapEmbed {
    pub fn for_place(place_name: &str) -> Self {
        Self {
            src: map_embed_url(place_name),
            width: MAP_WIDTH,
            height: MAP_HEIGHT,
        }
    }
}

/// Embed URL for a map centred on `place_name`
pub fn map_embed_url(place_name: &str) -> String {
    format!(
        "{}?q={}&t=&z={}&ie=UTF8&iwloc=&output=embed",
        MAP_EMBED_BASE,
        utf8_percent_encode(place_name, URI_COMPONENT),
        MAP_ZOOM
    )
}

impl LocationView {
    fn from_result(result: &LocationResult) -> Self {
        Self {
            country: result.country.clone(),
            place: result.primary_place().map(|place| PlaceView {
                state: place.state.clone(),
                place_name: place.place_name.clone(),
                coordinates: place.coordinates(),
                map: MapEmbed::for_place(&place.place_name),
            }),
        }
    }
}

pub fn project(controller: &LookupController) -> View {
    let loading = controller.is_loading();
    // The previous result stays on screen while a new lookup is loading
    let location = controller.location().map(LocationView::from_result);

    View {
        query: controller.query().to_string(),
        submit_label: if loading { "Fetching Information" } else { "Search" },
        submit_disabled: loading,
        show_clear: location.is_some(),
        error: controller.error().filter(|e| !e.is_empty()).map(str::to_string),
        location,
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.submit_disabled {
            writeln!(f, "{}...", self.submit_label)?;
        }
        if let Some(ref error) = self.error {
            writeln!(f, "Error: {}", error)?;
        }
        if let Some(ref location) = self.location {
            writeln!(f, "Location Information:")?;
            writeln!(f, "  Country: {}", location.country)?;
            if let Some(ref place) = location.place {
                writeln!(f, "  State: {}", place.state)?;
                writeln!(f, "  Place Name: {}", place.place_name)?;
                if let Some((lat, lon)) = place.coordinates {
                    writeln!(f, "  Coordinates: {}, {}", lat, lon)?;
                }
                writeln!(f, "  Map: {}", place.map.src)?;
            }
        }
        Ok(())
    }
}

/// Full HTML page for the session
pub fn render_page(view: &View) -> Markup {
    html! {
        (DOCTYPE)
        html {
            head {
                meta charset="utf-8";
                title { "Postal Code App" }
            }
            body {
                div class="App" {
                    h1 { "Postal Code App" }
                    form method="post" action="/lookup" class="form-container" {
                        label {
                            "Enter Postal Code:"
                            input type="text" name="postal_code"
                                minlength=(POSTAL_CODE_LENGTH.start())
                                maxlength=(POSTAL_CODE_LENGTH.end())
                                placeholder="Postal code"
                                value=(view.query);
                        }
                        button type="submit" class="btn btn-primary" disabled[view.submit_disabled] {
                            (view.submit_label)
                        }
                        @if view.show_clear {
                            button type="submit" formaction="/clear" formnovalidate class="clear-button" { "Clear" }
                        }
                    }
                    @if let Some(ref error) = view.error {
                        p class="error" { (error) }
                    }
                    @if let Some(ref location) = view.location {
                        (render_location(location))
                    }
                }
            }
        }
    }
}

fn render_location(location: &LocationView) -> Markup {
    html! {
        div class="location-info-container" {
            h2 { "Location Information:" }
            p { "Country: " (location.country) }
            @if let Some(ref place) = location.place {
                div {
                    p { "State: " (place.state) }
                    p { "Place Name: " (place.place_name) }
                    div class="mapbox" {
                        div class="map-container" {
                            iframe title="Google Map" src=(place.map.src)
                                width=(place.map.width) height=(place.map.height)
                                allowfullscreen {}
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::tests::{FakeGeocoder, bangalore};
    use crate::geocoder::GeocodeError;

    #[test]
    fn test_idle_view() {
        let view = project(&LookupController::new());
        assert_eq!(view.query, "");
        assert_eq!(view.submit_label, "Search");
        assert!(!view.submit_disabled);
        assert!(!view.show_clear);
        assert!(view.error.is_none());
        assert!(view.location.is_none());
    }

    #[tokio::test]
    async fn test_success_view() {
        let mut controller = LookupController::new();
        controller.update_query("560001");
        controller
            .submit(&FakeGeocoder::new(Ok(bangalore())))
            .await
            .unwrap();

        let view = project(&controller);
        assert!(view.show_clear);
        let location = view.location.as_ref().unwrap();
        assert_eq!(location.country, "India");
        let place = location.place.as_ref().unwrap();
        assert_eq!(place.state, "Karnataka");
        assert_eq!(place.place_name, "Bangalore");
        assert_eq!(place.map.width, 300);
        assert_eq!(place.map.height, 150);

        let text = view.to_string();
        assert!(text.contains("Country: India"));
        assert!(text.contains("State: Karnataka"));
        assert!(text.contains("Place Name: Bangalore"));
    }

    #[tokio::test]
    async fn test_empty_places_omit_place_section() {
        let mut result = bangalore();
        result.places.clear();

        let mut controller = LookupController::new();
        controller.update_query("560001");
        controller
            .submit(&FakeGeocoder::new(Ok(result)))
            .await
            .unwrap();

        let view = project(&controller);
        let location = view.location.as_ref().unwrap();
        assert_eq!(location.country, "India");
        assert!(location.place.is_none());

        let page = render_page(&view).into_string();
        assert!(page.contains("Country: India"));
        assert!(!page.contains("State:"));
        assert!(!page.contains("iframe"));
    }

    #[tokio::test]
    async fn test_error_view() {
        let mut controller = LookupController::new();
        controller.update_query("000000");
        let _ = controller
            .submit(&FakeGeocoder::new(Err(GeocodeError::Status(404))))
            .await;

        let view = project(&controller);
        assert_eq!(
            view.error.as_deref(),
            Some("Invalid postal code. Please enter a valid one.")
        );
        assert!(view.location.is_none());
        assert!(!view.show_clear);

        let page = render_page(&view).into_string();
        assert!(page.contains(r#"<p class="error">Invalid postal code. Please enter a valid one.</p>"#));
        assert!(!page.contains("Clear"));
    }

    #[test]
    fn test_loading_view_keeps_previous_result() {
        let mut controller = LookupController::new();
        controller.update_query("560001");
        let pending = controller.begin_submit().unwrap();
        let _ = controller.finish_submit(pending, Ok(bangalore()));

        let _pending = controller.begin_submit().unwrap();
        let view = project(&controller);
        assert!(view.submit_disabled);
        assert_eq!(view.submit_label, "Fetching Information");
        assert!(view.location.is_some());

        let page = render_page(&view).into_string();
        assert!(page.contains("disabled"));
        assert!(page.contains("Fetching Information"));
    }

    #[test]
    fn test_map_embed_url() {
        assert_eq!(
            map_embed_url("Bangalore"),
            "https://maps.google.com/maps?q=Bangalore&t=&z=13&ie=UTF8&iwloc=&output=embed"
        );
        assert_eq!(
            map_embed_url("Dr. Ambedkar Veedhi & Co"),
            "https://maps.google.com/maps?q=Dr.%20Ambedkar%20Veedhi%20%26%20Co&t=&z=13&ie=UTF8&iwloc=&output=embed"
        );
        // Unreserved punctuation passes through untouched
        assert!(map_embed_url("St. Mary's (East)!*~").starts_with(
            "https://maps.google.com/maps?q=St.%20Mary's%20(East)!*~&"
        ));
        assert!(map_embed_url("Bengaluru/Hosur?x=1#y").contains("q=Bengaluru%2FHosur%3Fx%3D1%23y&"));
    }

    #[tokio::test]
    async fn test_coordinates_shown() {
        let mut result = bangalore();
        result.places[0].latitude = Some("12.9833".to_string());
        result.places[0].longitude = Some("77.6".to_string());

        let mut controller = LookupController::new();
        controller.update_query("560001");
        controller
            .submit(&FakeGeocoder::new(Ok(result)))
            .await
            .unwrap();

        let view = project(&controller);
        let place = view.location.as_ref().unwrap().place.as_ref().unwrap();
        assert_eq!(place.coordinates, Some((12.9833, 77.6)));
        assert!(view.to_string().contains("Coordinates: 12.9833, 77.6"));

        // Without usable coordinates the line is left out
        controller
            .submit(&FakeGeocoder::new(Ok(bangalore())))
            .await
            .unwrap();
        assert!(!project(&controller).to_string().contains("Coordinates:"));
    }

    #[tokio::test]
    async fn test_clear_button_skips_validation() {
        let mut controller = LookupController::new();
        controller.update_query("560001");
        controller
            .submit(&FakeGeocoder::new(Ok(bangalore())))
            .await
            .unwrap();
        controller.update_query("56");

        let page = render_page(&project(&controller)).into_string();
        assert!(page.contains(r#"formaction="/clear" formnovalidate"#));
    }

    #[test]
    fn test_page_escapes_query() {
        let mut controller = LookupController::new();
        controller.update_query(r#""><script>"#);
        let page = render_page(&project(&controller)).into_string();
        assert!(!page.contains("<script>"));
        assert!(page.contains(r#"maxlength="10""#));
        assert!(page.contains(r#"minlength="6""#));
    }

    #[test]
    fn test_input_length() {
        assert!(input_length_ok(""));
        assert!(input_length_ok("560001"));
        assert!(input_length_ok("5600011234"));
        assert!(!input_length_ok("56001"));
        assert!(!input_length_ok("56000112345"));
    }
}

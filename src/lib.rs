pub mod client;
pub mod controller;
pub mod geocoder;
pub mod types;
pub mod view;

pub use client::{ClientConfig, ZippopotamClient};
pub use controller::{LookupController, LookupError, PendingLookup, ViewState};
pub use geocoder::{GeocodeError, Geocoder};
pub use types::{LocationResult, Place};
pub use view::{View, project, render_page};

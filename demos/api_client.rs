/// Example HTTP client demonstrating how to call the lookup server API
///
/// Run the server first:
/// ```bash
/// cargo run --bin server
/// ```
///
/// Then run this example:
/// ```bash
/// cargo run --example api_client -- 560001
/// ```
use serde::Deserialize;

#[derive(Deserialize, Debug)]
struct LookupResponse {
    data: ViewData,
}

#[derive(Deserialize, Debug)]
struct ViewData {
    location: Option<LocationData>,
}

#[derive(Deserialize, Debug)]
struct LocationData {
    country: String,
    place: Option<PlaceData>,
}

#[derive(Deserialize, Debug)]
struct PlaceData {
    state: String,
    place_name: String,
    map: MapData,
}

#[derive(Deserialize, Debug)]
struct MapData {
    src: String,
}

#[derive(Deserialize, Debug)]
struct ErrorResponse {
    error: String,
}

#[derive(Deserialize, Debug)]
struct HealthResponse {
    status: String,
    version: String,
}

#[derive(Deserialize, Debug)]
struct MetricsResponse {
    total_lookups: u64,
    lookups_in_flight: u64,
    uptime_seconds: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let base_url = std::env::var("API_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
    let postal_codes: Vec<String> = match std::env::args().skip(1).collect::<Vec<_>>() {
        args if args.is_empty() => vec!["560001".to_string(), "000000".to_string()],
        args => args,
    };
    let client = reqwest::Client::new();

    println!("=== Postal Code Lookup API Client Demo ===\n");

    println!("1. Checking server health...");
    let health: HealthResponse = client
        .get(format!("{}/health", base_url))
        .send()
        .await?
        .json()
        .await?;
    println!("   Server status: {}", health.status);
    println!("   Version: {}\n", health.version);

    println!("2. Looking up {} postal code(s)...", postal_codes.len());
    for code in &postal_codes {
        let response = client
            .get(format!("{}/api/lookup/{}", base_url, code))
            .send()
            .await?;

        if response.status().is_success() {
            let result: LookupResponse = response.json().await?;
            match result.data.location {
                Some(location) => {
                    println!("   [{}] Country: {}", code, location.country);
                    if let Some(place) = location.place {
                        println!("        State: {}", place.state);
                        println!("        Place Name: {}", place.place_name);
                        println!("        Map: {}", place.map.src);
                    }
                }
                None => println!("   [{}] No location returned", code),
            }
        } else {
            let status = response.status();
            let error: ErrorResponse = response.json().await?;
            println!("   [{}] {} - {}", code, status, error.error);
        }
    }
    println!();

    println!("3. Getting server metrics...");
    let metrics: MetricsResponse = client
        .get(format!("{}/api/metrics", base_url))
        .send()
        .await?
        .json()
        .await?;
    println!("   Total lookups: {}", metrics.total_lookups);
    println!("   In flight: {}", metrics.lookups_in_flight);
    println!("   Uptime: {}s", metrics.uptime_seconds);

    Ok(())
}

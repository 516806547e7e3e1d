use std::env;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pincode_lookup::view::{POSTAL_CODE_LENGTH, input_length_ok};
use pincode_lookup::{ClientConfig, LookupController, ZippopotamClient, project};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pincode_lookup=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() > 2 || args.get(1).is_some_and(|a| a == "-h" || a == "--help") {
        eprintln!("Usage: {} [postal_code]", args[0]);
        eprintln!("  postal_code: look up once and exit (omit for interactive mode)");
        eprintln!("  env: ZIPPOPOTAM_URL, LOOKUP_COUNTRY, LOOKUP_PROXY");
        std::process::exit(1);
    }

    let client = ZippopotamClient::with_config(ClientConfig::from_env())
        .context("Failed to initialize lookup client")?;
    let mut controller = LookupController::new();

    // One-shot mode
    if let Some(postal_code) = args.get(1) {
        controller.update_query(postal_code.as_str());
        let outcome = controller.submit(&client).await;
        print!("{}", project(&controller));
        if outcome.is_err() {
            std::process::exit(1);
        }
        return Ok(());
    }

    println!("Postal Code App");
    println!("Enter a postal code, :clear to reset, :quit to exit.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"Enter Postal Code: ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match line.as_str() {
            ":quit" | ":q" => break,
            ":clear" | ":c" => {
                controller.clear();
                println!("Cleared.");
                continue;
            }
            raw if !input_length_ok(raw) => {
                println!(
                    "Postal code must be {} to {} characters.",
                    POSTAL_CODE_LENGTH.start(),
                    POSTAL_CODE_LENGTH.end()
                );
                continue;
            }
            raw => controller.update_query(raw),
        }

        // Errors are already part of the projected view
        let _ = controller.submit(&client).await;
        print!("{}", project(&controller));
    }

    Ok(())
}

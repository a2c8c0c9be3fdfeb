//! Pasar CLI - Drive a cart against a live backend.
//!
//! # Usage
//!
//! ```bash
//! # Show the cart with hydrated product detail
//! pasar show
//!
//! # Add two units of product 42
//! pasar add 42 2
//!
//! # Set line item 7 to quantity 3
//! pasar update 7 3
//!
//! # Remove line item 7 (quantity zero is a removal by convention)
//! pasar remove 7
//!
//! # Clear the cart
//! pasar clear
//! ```
//!
//! # Environment Variables
//!
//! - `PASAR_API_URL` - Base URL of the Pasar REST backend
//! - `PASAR_API_TOKEN` - Bearer token for authenticated calls

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "pasar")]
#[command(author, version, about = "Pasar cart CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the cart with hydrated product detail
    Show,
    /// Add a product to the cart
    Add {
        /// Product ID
        product_id: i64,

        /// Units to add
        #[arg(default_value_t = 1)]
        quantity: u32,
    },
    /// Set a line item's quantity (use `remove` to take it to zero)
    Update {
        /// Line item ID
        line_id: String,

        /// New quantity (must be at least 1)
        quantity: u32,
    },
    /// Remove a line item
    Remove {
        /// Line item ID
        line_id: String,
    },
    /// Remove every line item
    Clear,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Show => commands::cart::show().await?,
        Commands::Add {
            product_id,
            quantity,
        } => commands::cart::add(product_id, quantity).await?,
        Commands::Update { line_id, quantity } => {
            commands::cart::update(&line_id, quantity).await?;
        }
        Commands::Remove { line_id } => commands::cart::remove(&line_id).await?,
        Commands::Clear => commands::cart::clear().await?,
    }
    Ok(())
}

//! CLI command implementations.

pub mod build;
pub mod config;
pub mod prefetch;
pub mod slots;

use clap::{Args, Subcommand};

/// Arguments for the prefetch command.
#[derive(Args)]
pub struct PrefetchArgs {
    /// Only prefetch these slots (default: all configured slots).
    #[arg(short, long)]
    pub slot: Vec<String>,
}

/// Arguments for the slots command.
#[derive(Args)]
pub struct SlotsArgs {
    #[command(subcommand)]
    pub command: Option<SlotsCommand>,
}

#[derive(Subcommand)]
pub enum SlotsCommand {
    /// List configured slots.
    List,
    /// Fetch and filter the items of one slot.
    Show {
        /// Slot key.
        slot: String,

        /// Case-insensitive name search.
        #[arg(short, long)]
        search: Option<String>,

        /// Category tab.
        #[arg(long)]
        category: Option<String>,

        /// Value of the slot's type attribute.
        #[arg(long = "type")]
        type_value: Option<String>,

        /// Value of the slot's capacity attribute.
        #[arg(long)]
        capacity: Option<String>,
    },
}

/// Arguments for the build command.
#[derive(Args)]
pub struct BuildArgs {
    /// Item to select, as `slot=item_id`. Repeat for multi-select slots.
    #[arg(short, long = "pick", value_name = "SLOT=ITEM")]
    pub picks: Vec<String>,

    /// Show the build and total without adding it to the cart.
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration.
    Show,
    /// Initialize a new config file.
    Init {
        /// Store API root.
        #[arg(long, default_value = "http://localhost:8080/wp-json/builder/v1")]
        base_url: String,

        /// Cart page URL.
        #[arg(long, default_value = "http://localhost:8080/cart")]
        cart_url: String,

        /// Force overwrite existing config.
        #[arg(short, long)]
        force: bool,
    },
    /// Validate the config file.
    Validate,
}

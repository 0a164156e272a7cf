use clap::Subcommand;

/// Offer commands.
#[derive(Clone, Debug, Subcommand)]
pub enum OfferCommands {
    /// List offers of an estimate.
    List {
        #[arg(long)]
        estimate: String,
    },
    /// Get an offer by ID.
    Get { id: String },
    /// List the lines of an offer.
    Items { id: String },
    /// Delete an offer with its lines and alerts.
    Delete { id: String },
}

/// Offer line commands.
#[derive(Clone, Debug, Subcommand)]
pub enum OfferItemCommands {
    /// Get an offer line by ID.
    Get { id: String },
    /// Map an offer line onto a price-list item.
    Map {
        id: String,
        #[arg(long = "price-list-item")]
        price_list_item: String,
        /// Take the catalog price.
        #[arg(long)]
        apply_price: bool,
    },
}

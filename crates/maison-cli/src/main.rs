use clap::Parser;
use maison_core::models::{
    Condition, NotificationDraft, NotificationKind, NotificationQuery, Priority, ProductDraft,
    ProductFilters,
};
use maison_core::{Config, DataService};
use maison_store::{BlobStore, MemoryStore, SqliteStore};
use std::sync::Arc;
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "maison")]
#[command(version, about = "Luxury-goods marketplace data service", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Show which data provider the configuration resolves to
    Provider,
    /// Product operations
    Products {
        #[command(subcommand)]
        command: ProductCommands,
    },
    /// Notification operations
    Notifications {
        #[command(subcommand)]
        command: NotificationCommands,
    },
    /// Marketplace aggregates derived from the local catalog
    Stats,
    /// A user's activity rollup
    Activity {
        /// User id
        #[arg(long)]
        user: String,
    },
}

#[derive(clap::Subcommand)]
enum ProductCommands {
    /// List active products, newest first
    List {
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        min_price: Option<f64>,
        #[arg(long)]
        max_price: Option<f64>,
        /// Case-insensitive substring search over title, description, tags
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        offset: Option<usize>,
    },
    /// Create a listing
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        price: f64,
        #[arg(long)]
        category: String,
        #[arg(long)]
        seller: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "USD")]
        currency: String,
        #[arg(long, default_value = "good")]
        condition: String,
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
    },
    /// Show one product and count the view
    View {
        id: String,
    },
    /// Toggle a product in a user's favorites
    Favorite {
        id: String,
        #[arg(long)]
        user: String,
    },
    /// Record a completed sale
    Sold {
        id: String,
        #[arg(long)]
        buyer: String,
    },
}

#[derive(clap::Subcommand)]
enum NotificationCommands {
    /// List a user's notifications, newest first
    List {
        #[arg(long)]
        user: String,
        /// Only unread ones
        #[arg(long)]
        unread: bool,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        offset: Option<usize>,
    },
    /// Mark one notification read
    Read {
        id: String,
    },
    /// Mark everything read for a user
    ReadAll {
        #[arg(long)]
        user: String,
    },
    /// Unread badge count for a user
    UnreadCount {
        #[arg(long)]
        user: String,
    },
    /// Send a notification
    Send {
        #[arg(long)]
        user: String,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        body: String,
        #[arg(long, default_value = "system")]
        kind: String,
        #[arg(long, default_value = "medium")]
        priority: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging - helps when things go sideways
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "maison=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = Config::load().unwrap_or_else(|e| {
        warn!("Config unreadable ({}), using defaults", e);
        Config::default()
    });
    let store = open_store(&config);
    let service = DataService::new(&config, store)?;

    match cli.command {
        Commands::Provider => {
            println!("{}", service.provider());
        }
        Commands::Products { command } => run_products(&service, command).await?,
        Commands::Notifications { command } => run_notifications(&service, command).await?,
        Commands::Stats => {
            let stats = service.catalog().get_marketplace_stats()?;
            println!(
                "{} active products | {} views | {} sellers | mean price {:.2}",
                stats.active_products, stats.total_views, stats.distinct_sellers, stats.mean_price
            );
        }
        Commands::Activity { user } => {
            let activity = service.catalog().user_activity(&user)?;
            println!("{}", serde_json::to_string_pretty(&activity)?);
        }
    }

    Ok(())
}

/// Open the configured SQLite store, dropping to in-memory if the disk
/// refuses to cooperate - the marketplace starts either way
fn open_store(config: &Config) -> Arc<dyn BlobStore> {
    let path = match config.store_path() {
        Ok(path) => path,
        Err(e) => {
            warn!("No store path available ({}), state will not persist", e);
            return Arc::new(MemoryStore::new());
        }
    };
    if let Some(parent) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            warn!("Could not create {} ({}), state will not persist", parent.display(), e);
            return Arc::new(MemoryStore::new());
        }
    }
    match SqliteStore::new(&path.to_string_lossy()) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            warn!("Could not open store at {} ({}), state will not persist", path.display(), e);
            Arc::new(MemoryStore::new())
        }
    }
}

async fn run_products(service: &DataService, command: ProductCommands) -> anyhow::Result<()> {
    match command {
        ProductCommands::List {
            category,
            min_price,
            max_price,
            search,
            limit,
            offset,
        } => {
            let filters = ProductFilters {
                category,
                min_price,
                max_price,
                search_query: search,
                limit,
                offset,
            };
            let products = service.fetch_products(&filters).await;
            for p in &products {
                println!(
                    "{}  {:>10.2} {}  [{}] {} ({} views, {} favorites)",
                    p.id, p.price, p.currency, p.category, p.title, p.views_count, p.favorites_count
                );
            }
            println!("{} products", products.len());
        }
        ProductCommands::Create {
            title,
            price,
            category,
            seller,
            description,
            currency,
            condition,
            tags,
        } => {
            let mut draft = ProductDraft::new(&title, price, &category, &seller);
            draft.description = description;
            draft.currency = currency;
            draft.condition = Condition::parse(&condition);
            draft.tags = tags;
            let product = service.create_product(draft).await?;
            println!("Created {}", product.id);
        }
        ProductCommands::View { id } => match service.catalog().increment_views(&id) {
            Ok(_) => {
                if let Some(p) = service.catalog().get_product(&id)? {
                    println!("{}", serde_json::to_string_pretty(&p)?);
                }
            }
            Err(maison_core::Error::NotFound(_)) => println!("Not found: {}", id),
            Err(e) => return Err(e.into()),
        },
        ProductCommands::Favorite { id, user } => {
            let favorited = service.catalog().toggle_favorite(&id, &user)?;
            println!(
                "{} is {} favorited by {}",
                id,
                if favorited { "now" } else { "no longer" },
                user
            );
        }
        ProductCommands::Sold { id, buyer } => {
            let product = service.catalog().mark_sold(&id, &buyer)?;
            println!("{} sold to {}", product.id, buyer);
        }
    }
    Ok(())
}

async fn run_notifications(
    service: &DataService,
    command: NotificationCommands,
) -> anyhow::Result<()> {
    match command {
        NotificationCommands::List {
            user,
            unread,
            limit,
            offset,
        } => {
            let query = NotificationQuery {
                unread_only: unread,
                limit,
                offset,
            };
            let notifications = service.fetch_notifications(&user, &query).await;
            for n in &notifications {
                println!(
                    "{} {} [{}/{}] {}",
                    if n.read { " " } else { "*" },
                    n.id,
                    n.kind.label(),
                    n.priority,
                    n.title
                );
            }
        }
        NotificationCommands::Read { id } => {
            service.mark_read(&id).await;
            println!("Marked {} read", id);
        }
        NotificationCommands::ReadAll { user } => {
            service.mark_all_read(&user).await;
            println!("All read for {}", user);
        }
        NotificationCommands::UnreadCount { user } => {
            println!("{}", service.count_unread(&user).await);
        }
        NotificationCommands::Send {
            user,
            title,
            body,
            kind,
            priority,
        } => {
            let notification = service
                .create_notification(NotificationDraft {
                    user_id: user,
                    kind: NotificationKind::parse(&kind),
                    priority: Priority::parse(&priority),
                    title,
                    body,
                    related: None,
                })
                .await?;
            println!("Sent {}", notification.id);
        }
    }
    Ok(())
}

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use sr_core::{
    Analytics, Category, DashboardStats, InventoryService, Product, ProductFormData, ProductId,
    ProductPatch, ProductQuery, ProductRepository, ProductStatus, SortDirection, SortField,
    StockFilter,
};
use sr_fs::{resolve_config, sample_products, set_data_dir, AppConfig, FsStore};
use sr_notify::ChangeNotifier;
use sr_remote::RemoteBackend;
use sr_utils::{format_currency, write_csv};

#[derive(Parser)]
#[command(name = "stockroom", version, about = "Stockroom inventory CLI")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Initialize the local product store.
    Init {
        /// Optional directory to keep the store in.
        #[arg(long)]
        path: Option<String>,
        /// Seed an empty store with sample products.
        #[arg(long)]
        sample: bool,
    },
    /// List products.
    List {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Show a single product by id.
    Show { id: String },
    /// Add a product.
    Add {
        #[command(flatten)]
        product: ProductArgs,
    },
    /// Update fields of a product by id.
    Update {
        id: String,
        #[command(flatten)]
        patch: PatchArgs,
    },
    /// Delete a product by id.
    Delete { id: String },
    /// Show dashboard totals.
    Stats,
    /// Show category and stock breakdowns.
    Analytics,
    /// Export products to a CSV file.
    Export {
        path: String,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Reprint dashboard totals whenever the catalog may have changed.
    Watch,
}

#[derive(Args)]
struct FilterArgs {
    /// Match name, SKU, or category.
    #[arg(long)]
    search: Option<String>,
    #[arg(long, value_parser = parse_category)]
    category: Option<Category>,
    #[arg(long, value_enum, default_value = "all")]
    stock: StockArg,
    #[arg(long, value_enum, default_value = "name")]
    sort: SortArg,
    /// Sort in descending order.
    #[arg(long)]
    desc: bool,
}

#[derive(Args)]
struct ProductArgs {
    #[arg(long)]
    sku: String,
    #[arg(long)]
    name: String,
    #[arg(long, value_parser = parse_category)]
    category: Category,
    #[arg(long)]
    price: f64,
    #[arg(long, default_value_t = 0)]
    quantity: u32,
    #[arg(long, default_value_t = 0)]
    min_stock: u32,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    supplier: Option<String>,
    #[arg(long)]
    image_url: Option<String>,
    #[arg(long, value_enum, default_value = "active")]
    status: StatusArg,
}

#[derive(Args)]
struct PatchArgs {
    #[arg(long)]
    sku: Option<String>,
    #[arg(long)]
    name: Option<String>,
    #[arg(long, value_parser = parse_category)]
    category: Option<Category>,
    #[arg(long)]
    price: Option<f64>,
    #[arg(long)]
    quantity: Option<u32>,
    #[arg(long)]
    min_stock: Option<u32>,
    /// Pass an empty string to clear.
    #[arg(long)]
    description: Option<String>,
    /// Pass an empty string to clear.
    #[arg(long)]
    supplier: Option<String>,
    /// Pass an empty string to clear.
    #[arg(long)]
    image_url: Option<String>,
    #[arg(long, value_enum)]
    status: Option<StatusArg>,
}

#[derive(Clone, Copy, ValueEnum)]
enum StockArg {
    All,
    InStock,
    LowStock,
    OutOfStock,
}

#[derive(Clone, Copy, ValueEnum)]
enum SortArg {
    Sku,
    Name,
    Category,
    Price,
    Quantity,
    Status,
    Updated,
}

#[derive(Clone, Copy, ValueEnum)]
enum StatusArg {
    Active,
    Inactive,
    Discontinued,
}

impl From<StockArg> for StockFilter {
    fn from(value: StockArg) -> Self {
        match value {
            StockArg::All => StockFilter::All,
            StockArg::InStock => StockFilter::InStock,
            StockArg::LowStock => StockFilter::LowStock,
            StockArg::OutOfStock => StockFilter::OutOfStock,
        }
    }
}

impl From<SortArg> for SortField {
    fn from(value: SortArg) -> Self {
        match value {
            SortArg::Sku => SortField::Sku,
            SortArg::Name => SortField::Name,
            SortArg::Category => SortField::Category,
            SortArg::Price => SortField::Price,
            SortArg::Quantity => SortField::Quantity,
            SortArg::Status => SortField::Status,
            SortArg::Updated => SortField::UpdatedAt,
        }
    }
}

impl From<StatusArg> for ProductStatus {
    fn from(value: StatusArg) -> Self {
        match value {
            StatusArg::Active => ProductStatus::Active,
            StatusArg::Inactive => ProductStatus::Inactive,
            StatusArg::Discontinued => ProductStatus::Discontinued,
        }
    }
}

impl From<FilterArgs> for ProductQuery {
    fn from(args: FilterArgs) -> Self {
        ProductQuery {
            search: args.search,
            category: args.category,
            stock: args.stock.into(),
            sort: args.sort.into(),
            direction: if args.desc {
                SortDirection::Desc
            } else {
                SortDirection::Asc
            },
        }
    }
}

impl From<ProductArgs> for ProductFormData {
    fn from(args: ProductArgs) -> Self {
        ProductFormData {
            sku: args.sku,
            name: args.name,
            description: args.description,
            category: args.category,
            price: args.price,
            quantity: args.quantity,
            min_stock: args.min_stock,
            supplier: args.supplier,
            image_url: args.image_url,
            status: args.status.into(),
        }
    }
}

impl From<PatchArgs> for ProductPatch {
    fn from(args: PatchArgs) -> Self {
        ProductPatch {
            sku: args.sku,
            name: args.name,
            description: args.description,
            category: args.category,
            price: args.price,
            quantity: args.quantity,
            min_stock: args.min_stock,
            supplier: args.supplier,
            image_url: args.image_url,
            status: args.status.map(Into::into),
        }
    }
}

fn parse_category(value: &str) -> Result<Category, String> {
    value.parse::<Category>().map_err(|_| {
        let names: Vec<_> = Category::ALL.iter().map(|c| c.as_str()).collect();
        format!("expected one of: {}", names.join(", "))
    })
}

pub fn run() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    if let Command::Init { path, sample } = &cli.command {
        let config = resolve_config().context("failed to load config")?;
        let path = match path {
            Some(path) => PathBuf::from(path),
            None => config.data_path()?,
        };
        return init_store(&path, *sample);
    }

    let config = resolve_config().context("failed to load config")?;
    let service = build_service(&config)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to initialize runtime")?;
    runtime.block_on(dispatch(&service, cli.command))
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    // A second init (e.g. from tests) is harmless.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}

fn init_store(path: &std::path::Path, sample: bool) -> Result<()> {
    let store = FsStore::new(path.to_path_buf());
    store.init().context("failed to initialize store")?;
    if sample {
        let seeded = store
            .seed(&sample_products()?)
            .context("failed to seed sample products")?;
        if !seeded {
            println!("Store already has products; sample data skipped");
        }
    }
    set_data_dir(path)?;
    println!("Store initialized at {}", store.path().display());
    Ok(())
}

fn build_service(config: &AppConfig) -> Result<InventoryService> {
    let store = FsStore::new(config.data_path()?);
    if !store.exists() && !config.remote.enabled {
        return Err(anyhow!(
            "Stockroom is not initialized. Run `stockroom init` to get started."
        ));
    }
    let local = Arc::new(ProductRepository::new(store));

    if config.remote.enabled {
        let remote = RemoteBackend::new(&config.remote.base_url)
            .context("failed to build API client")?;
        info!(base_url = remote.base_url(), "remote API enabled");
        return Ok(InventoryService::with_remote(local, Arc::new(remote)));
    }
    debug!("using local store only");
    Ok(InventoryService::local(local))
}

async fn dispatch(service: &InventoryService, command: Command) -> Result<()> {
    match command {
        Command::List { filter } => list_products(service, filter.into()).await,
        Command::Show { id } => show_product(service, &id).await,
        Command::Add { product } => add_product(service, product.into()).await,
        Command::Update { id, patch } => update_product(service, &id, patch.into()).await,
        Command::Delete { id } => delete_product(service, &id).await,
        Command::Stats => print_stats(service).await,
        Command::Analytics => print_analytics(service).await,
        Command::Export { path, filter } => export_products(service, &path, filter.into()).await,
        Command::Watch => watch(service).await,
        Command::Init { .. } => unreachable!("handled before the runtime starts"),
    }
}

async fn list_products(service: &InventoryService, query: ProductQuery) -> Result<()> {
    let products = service
        .query(&query)
        .await
        .context("failed to list products")?;
    for product in &products {
        println!("{}", render_row(product));
    }
    Ok(())
}

async fn show_product(service: &InventoryService, id: &str) -> Result<()> {
    let product = service
        .get(&ProductId::from(id))
        .await
        .context("failed to get product")?;
    let yaml = serde_yaml::to_string(&product).context("failed to render product")?;
    print!("{yaml}");
    Ok(())
}

async fn add_product(service: &InventoryService, data: ProductFormData) -> Result<()> {
    data.validate().context("invalid product")?;
    let product = service
        .create(data)
        .await
        .context("failed to create product")?;
    println!("{}", product.id);
    Ok(())
}

async fn update_product(service: &InventoryService, id: &str, patch: ProductPatch) -> Result<()> {
    patch.validate().context("invalid product")?;
    let product = service
        .update(&ProductId::from(id), patch)
        .await
        .context("failed to update product")?;
    println!("{}", render_row(&product));
    Ok(())
}

async fn delete_product(service: &InventoryService, id: &str) -> Result<()> {
    service
        .delete(&ProductId::from(id))
        .await
        .context("failed to delete product")?;
    Ok(())
}

async fn print_stats(service: &InventoryService) -> Result<()> {
    let stats = service.stats().await.context("failed to load stats")?;
    println!("{}", render_stats(&stats));
    Ok(())
}

async fn print_analytics(service: &InventoryService) -> Result<()> {
    let analytics = service
        .analytics()
        .await
        .context("failed to load analytics")?;
    println!("{}", render_analytics(&analytics));
    Ok(())
}

async fn export_products(service: &InventoryService, path: &str, query: ProductQuery) -> Result<()> {
    let products = service
        .query(&query)
        .await
        .context("failed to list products")?;
    write_csv(std::path::Path::new(path), &products).context("failed to write CSV")?;
    println!("Exported {} products to {path}", products.len());
    Ok(())
}

async fn watch(service: &InventoryService) -> Result<()> {
    let (signals_tx, mut signals) = tokio::sync::mpsc::unbounded_channel();
    let subscription = ChangeNotifier::default().subscribe(move || {
        let _ = signals_tx.send(());
    });

    print_stats(service).await?;
    loop {
        tokio::select! {
            signal = signals.recv() => {
                if signal.is_none() {
                    break;
                }
                print_stats(service).await?;
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    subscription.cancel();
    Ok(())
}

fn render_row(product: &Product) -> String {
    format!(
        "{}\t{}\t{}\t{}\t{}\t{}\t{}",
        product.id,
        product.sku,
        product.name,
        product.category,
        format_currency(product.price),
        product.quantity,
        product.status
    )
}

fn render_stats(stats: &DashboardStats) -> String {
    [
        format!("Total products\t{}", stats.total_products),
        format!("Total value\t{}", format_currency(stats.total_value)),
        format!("Low stock\t{}", stats.low_stock_items),
        format!("Out of stock\t{}", stats.out_of_stock_items),
    ]
    .join("\n")
}

fn render_analytics(analytics: &Analytics) -> String {
    let mut lines = vec!["Categories".to_string()];
    for summary in &analytics.categories {
        lines.push(format!(
            "  {}\t{} products\t{}",
            summary.category,
            summary.products,
            format_currency(summary.value)
        ));
    }
    lines.push("Stock".to_string());
    lines.push(format!("  In stock\t{}", analytics.stock.in_stock));
    lines.push(format!("  Low stock\t{}", analytics.stock.low_stock));
    lines.push(format!("  Out of stock\t{}", analytics.stock.out_of_stock));
    lines.push("Top products".to_string());
    for product in &analytics.top_products {
        lines.push(format!(
            "  {}\t{}\t{} units",
            product.name,
            format_currency(product.value),
            product.quantity
        ));
    }
    if let Some(category) = analytics.most_valuable_category {
        lines.push(format!("Most valuable category\t{category}"));
    }
    lines.push(format!(
        "Average product value\t{}",
        format_currency(analytics.average_value)
    ));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use sr_core::compute_analytics;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn list_filters_parse_into_query() {
        let cli = Cli::try_parse_from([
            "stockroom",
            "list",
            "--category",
            "home & garden",
            "--stock",
            "low-stock",
            "--sort",
            "price",
            "--desc",
        ])
        .expect("parse");
        let Command::List { filter } = cli.command else {
            panic!("expected list command");
        };
        let query = ProductQuery::from(filter);
        assert_eq!(query.category, Some(Category::HomeAndGarden));
        assert_eq!(query.stock, StockFilter::LowStock);
        assert_eq!(query.sort, SortField::Price);
        assert_eq!(query.direction, SortDirection::Desc);
    }

    #[test]
    fn unknown_category_is_rejected() {
        let result = Cli::try_parse_from(["stockroom", "list", "--category", "Gadgets"]);
        assert!(result.is_err());
    }

    #[test]
    fn add_arguments_build_form_data() {
        let cli = Cli::try_parse_from([
            "stockroom",
            "add",
            "--sku",
            "DESK-001",
            "--name",
            "Standing Desk",
            "--category",
            "Furniture",
            "--price",
            "499",
            "--quantity",
            "4",
        ])
        .expect("parse");
        let Command::Add { product } = cli.command else {
            panic!("expected add command");
        };
        let data = ProductFormData::from(product);
        assert_eq!(data.min_stock, 0);
        assert_eq!(data.status, ProductStatus::Active);
        assert!(data.validate().is_ok());
    }

    #[test]
    fn empty_update_builds_empty_patch() {
        let cli = Cli::try_parse_from(["stockroom", "update", "42"]).expect("parse");
        let Command::Update { patch, .. } = cli.command else {
            panic!("expected update command");
        };
        assert!(ProductPatch::from(patch).is_empty());
    }

    #[test]
    fn stats_rendering() {
        let stats = DashboardStats {
            total_products: 4,
            total_value: 83_794.2,
            low_stock_items: 1,
            out_of_stock_items: 1,
        };
        insta::assert_snapshot!(render_stats(&stats), @r"
        Total products	4
        Total value	$83,794.20
        Low stock	1
        Out of stock	1
        ");
    }

    #[test]
    fn analytics_rendering_names_the_leading_category() {
        let products = sample_products().expect("samples");
        let rendered = render_analytics(&compute_analytics(&products));
        assert!(rendered.contains("Most valuable category\tElectronics"));
        assert!(rendered.contains("  Out of stock\t1"));
    }

    #[test]
    fn analytics_rendering_of_empty_catalog() {
        insta::assert_snapshot!(render_analytics(&compute_analytics(&[])), @r"
        Categories
        Stock
          In stock	0
          Low stock	0
          Out of stock	0
        Top products
        Average product value	$0.00
        ");
    }
}

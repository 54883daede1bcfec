//! ArcGIS CLI
//!
//! Command-line interface for browsing an ArcGIS REST catalog and exporting
//! table records.

use arcgis_client::{Catalog, Client, ClientConfig, Query, Server, Service, ServiceType};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const DEFAULT_SERVER: &str = "https://sampleserver6.arcgisonline.com/arcgis/rest/services";

#[derive(Parser)]
#[command(name = "arcgis")]
#[command(version, about = "ArcGIS REST catalog CLI", long_about = None)]
struct Cli {
    /// Root URL of the REST services directory
    #[arg(short, long, default_value = DEFAULT_SERVER, global = true)]
    server: String,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 30, global = true)]
    timeout: u64,

    /// Skip TLS certificate verification
    #[arg(long, global = true)]
    insecure: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the server's folders
    Folders,

    /// List services at the root or in a folder
    Services {
        /// Folder to list instead of the root
        #[arg(short, long)]
        folder: Option<String>,
    },

    /// List the tables of a feature service
    Tables {
        /// Service name
        service: String,

        /// Folder containing the service
        #[arg(short, long)]
        folder: Option<String>,
    },

    /// Show the fields of a table
    Fields {
        /// Service name
        service: String,

        /// Table id
        table: i64,

        /// Folder containing the service
        #[arg(short, long)]
        folder: Option<String>,
    },

    /// Query a table and print or save the records
    Query {
        /// Service name
        service: String,

        /// Table id
        table: i64,

        /// Folder containing the service
        #[arg(short, long)]
        folder: Option<String>,

        /// SQL where clause
        #[arg(short, long, default_value = "1=1")]
        r#where: String,

        /// Index of the first record
        #[arg(long)]
        offset: Option<u64>,

        /// Page size
        #[arg(long)]
        count: Option<u64>,

        /// Fields to order by
        #[arg(long)]
        order_by: Option<String>,

        /// Fields to return
        #[arg(long, default_value = "*")]
        out_fields: String,

        /// Fetch every page
        #[arg(short, long)]
        all: bool,

        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Csv)]
        format: Format,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Csv,
    Json,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = connect(&cli).and_then(|server| match cli.command {
        Commands::Folders => list_folders(&server),
        Commands::Services { folder } => list_services(&server, folder.as_deref()),
        Commands::Tables { service, folder } => {
            list_tables(&server, folder.as_deref(), &service)
        }
        Commands::Fields {
            service,
            table,
            folder,
        } => show_fields(&server, folder.as_deref(), &service, table),
        Commands::Query {
            service,
            table,
            folder,
            r#where,
            offset,
            count,
            order_by,
            out_fields,
            all,
            format,
            output,
        } => {
            let mut query = Query::new().filter(r#where).out_fields(out_fields);
            if let Some(offset) = offset {
                query = query.offset(offset);
            }
            if let Some(count) = count {
                query = query.record_count(count);
            }
            if let Some(order_by) = order_by {
                query = query.order_by(order_by);
            }
            if all {
                query = query.all();
            }
            run_query(&server, folder.as_deref(), &service, table, &query, format, output)
        }
    });

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn connect(cli: &Cli) -> Result<Server, Box<dyn std::error::Error>> {
    let config = ClientConfig::builder()
        .timeout(Duration::from_secs(cli.timeout))
        .tls_verify(!cli.insecure)
        .build()?;
    let client = Client::new(config)?;
    Ok(client.server(&cli.server)?)
}

fn catalog<'a>(
    server: &'a Server,
    folder: Option<&str>,
) -> Result<&'a Catalog, Box<dyn std::error::Error>> {
    Ok(match folder {
        Some(name) => &**server.folder(name)?,
        None => &**server,
    })
}

fn feature_service<'a>(
    server: &'a Server,
    folder: Option<&str>,
    name: &str,
) -> Result<&'a Service, Box<dyn std::error::Error>> {
    Ok(catalog(server, folder)?.service(name, Some(ServiceType::FeatureServer))?)
}

fn list_folders(server: &Server) -> Result<(), Box<dyn std::error::Error>> {
    println!("Folders:");
    println!();

    for folder in server.folders()? {
        println!("  {}", folder.name());
    }

    Ok(())
}

fn list_services(server: &Server, folder: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = catalog(server, folder)?;

    println!("Services:");
    println!();

    for service in catalog.services()? {
        println!("  {} ({})", service.name(), service.service_type());
    }

    Ok(())
}

fn list_tables(
    server: &Server,
    folder: Option<&str>,
    service: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let service = feature_service(server, folder, service)?;

    println!("Tables in {}:", service.name());
    println!();

    for table in service.tables()?.values() {
        println!("  {:>4}  {}", table.id(), table.name());
    }

    Ok(())
}

fn show_fields(
    server: &Server,
    folder: Option<&str>,
    service: &str,
    table: i64,
) -> Result<(), Box<dyn std::error::Error>> {
    let table = feature_service(server, folder, service)?.table(table)?;

    println!("Fields of {} (max {} records per page):", table.name(), table.max_record_count()?);
    println!();

    for field in table.fields()?.values() {
        print!("  {} ({})", field.name, field.field_type);
        if field.alias != field.name {
            print!(" \"{}\"", field.alias);
        }
        println!();
    }

    Ok(())
}

fn run_query(
    server: &Server,
    folder: Option<&str>,
    service: &str,
    table: i64,
    query: &Query,
    format: Format,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let table = feature_service(server, folder, service)?.table(table)?;
    let records = table.query(query)?;
    tracing::debug!(table = %table.name(), records = records.len(), "Query complete");

    match (output, format) {
        (Some(path), Format::Csv) => {
            records.write_csv(&path)?;
            eprintln!("Wrote {} records to '{}'", records.len(), path.display());
        }
        (Some(path), Format::Json) => {
            records.write_json(&path)?;
            eprintln!("Wrote {} records to '{}'", records.len(), path.display());
        }
        (None, Format::Csv) => print!("{}", records.to_csv()?),
        (None, Format::Json) => println!("{}", records.to_json()?),
    }

    Ok(())
}

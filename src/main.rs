use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::sync::Arc;

use zonefee::config::Settings;
use zonefee::geo::format_coords;
use zonefee::{
    Address, AddressValidator, DeliveryFeeResolver, GeoPoint, GeocodingGateway, NominatimGateway,
    OfflineGateway, ServiceRegion, ZoneError,
};

/// zonefee — delivery zone and fee resolution
///
/// Decides whether an address is inside a business's delivery area and
/// which fee applies. Regions come from a JSON file (array of regions).
///
/// Examples:
///   zonefee fee --regions regions.json --neighborhood Centro
///   zonefee validate --regions regions.json --lat -23.55 --lon -46.63
///   zonefee validate --regions regions.json --street "Rua Augusta" --number 500 --city "São Paulo"
///   zonefee reverse --lat -23.5613 --lon -46.6565
///   zonefee serve --port 3100
#[derive(Parser)]
#[command(name = "zonefee", version, about, long_about = None)]
struct Cli {
    /// Config file (defaults to ~/.zonefee/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Offline mode: never call the geocoder.
    #[arg(long, global = true)]
    offline: bool,

    /// Debug logging.
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve the delivery fee for an address.
    Fee(AddressArgs),
    /// Validate an address against the delivery area.
    Validate(AddressArgs),
    /// Reverse-geocode coordinates into an address.
    Reverse {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
    },
    /// Serve the HTTP API.
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
}

#[derive(Args)]
struct AddressArgs {
    /// JSON file holding the business's regions.
    #[arg(long)]
    regions: PathBuf,

    #[arg(long, default_value = "")]
    street: String,

    #[arg(long, default_value = "")]
    number: String,

    #[arg(long, default_value = "")]
    neighborhood: String,

    #[arg(long, default_value = "")]
    city: String,

    #[arg(long, default_value = "")]
    state: String,

    #[arg(long, default_value = "")]
    postal_code: String,

    /// Latitude (-90 to 90), if already known.
    #[arg(long, allow_hyphen_values = true)]
    lat: Option<f64>,

    /// Longitude (-180 to 180), if already known.
    #[arg(long, allow_hyphen_values = true)]
    lon: Option<f64>,
}

impl AddressArgs {
    fn address(&self) -> Address {
        Address {
            street: self.street.clone(),
            number: self.number.clone(),
            neighborhood: self.neighborhood.clone(),
            city: self.city.clone(),
            state: self.state.clone(),
            postal_code: self.postal_code.clone(),
            latitude: self.lat,
            longitude: self.lon,
        }
    }

    fn load_regions(&self) -> Result<Vec<ServiceRegion>, ZoneError> {
        let text = std::fs::read_to_string(&self.regions)?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    }
    .unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });

    zonefee::logging::init(cli.verbose, settings.logging.format);

    let gateway: Arc<dyn GeocodingGateway> = if cli.offline || settings.geocoder.offline {
        Arc::new(OfflineGateway)
    } else {
        Arc::new(NominatimGateway::new(settings.nominatim()))
    };
    let fees = DeliveryFeeResolver::new(gateway, settings.policy()).with_coordinates_hook(|addr, p| {
        tracing::info!(address = %addr, coords = %format_coords(p.latitude, p.longitude), "geocoded coordinates");
    });
    let validator = AddressValidator::new(fees);

    if let Err(e) = run(cli.command, &settings, validator).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(command: Command, settings: &Settings, validator: AddressValidator) -> Result<(), ZoneError> {
    match command {
        Command::Fee(args) => {
            let regions = args.load_regions()?;
            let quote = validator.fees().resolve(&args.address(), &regions).await?;
            if !quote.matched() {
                eprintln!("  No delivery region matched this address.");
            }
            println!("{}", serde_json::to_string_pretty(&quote)?);
        }
        Command::Validate(args) => {
            let regions = args.load_regions()?;
            let verdict = validator.validate(&args.address(), &regions).await;
            match (&verdict.message, verdict.fee) {
                (Some(msg), _) => eprintln!("  \u{2717} {}", msg),
                (None, Some(fee)) if fee == Decimal::ZERO => eprintln!("  \u{2713} Deliverable, no fee"),
                (None, Some(fee)) => eprintln!("  \u{2713} Deliverable, fee {}", fee),
                (None, None) => {}
            }
            println!("{}", serde_json::to_string_pretty(&verdict)?);
        }
        Command::Reverse { lat, lon } => {
            let point = GeoPoint::new(lat, lon);
            if !point.is_valid() {
                return Err(ZoneError::InvalidInput(
                    "coordinates out of range. Lat: -90..90, Lon: -180..180".into(),
                ));
            }
            let address = validator.fees().reverse(point).await?;
            println!("{}", serde_json::to_string_pretty(&address)?);
        }
        Command::Serve { host, port } => {
            let host = host.unwrap_or_else(|| settings.server.host.clone());
            let port = port.unwrap_or(settings.server.port);
            eprintln!("  zonefee server on http://{}:{}  (Ctrl+C to stop)", host, port);
            zonefee::server::start(&host, port, validator).await?;
        }
    }
    Ok(())
}

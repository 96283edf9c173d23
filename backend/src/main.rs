//! YNAB Converter CLI - Turn bank exports into YNAB import files
//!
//! # Main Commands
//!
//! ```bash
//! ynab-converter convert export.csv              # Write ./ynab_data_YYYYMMDD.csv
//! ynab-converter preview statement.xlsx -w 1     # First rows of the second sheet
//! ynab-converter serve                           # Start HTTP server (port 3000)
//! ynab-converter profile list                    # Manage saved settings
//! ```
//!
//! # Inspection Commands
//!
//! ```bash
//! ynab-converter parse export.csv                # Parsed table as JSON
//! ynab-converter sheets statement.xlsx           # Worksheet names
//! ynab-converter catalog                         # Encodings, delimiters, schemas
//! ```

use clap::{Args, Parser, Subcommand};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use ynab_converter::api::CatalogResponse;
use ynab_converter::{
    config, convert_bytes, load_table, read_source, serialize, serialize_table, transform,
    worksheet_names, ColumnMapping, ConversionOptions, Delimiter, Profile, ProfileStore, TargetColumn, TargetSchema,
    DEFAULT_PROFILE_NAME,
};

#[derive(Parser)]
#[command(name = "ynab-converter")]
#[command(about = "Convert bank CSV and Excel exports to YNAB import files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a file and print the table as JSON
    Parse {
        /// Input CSV or Excel file
        input: PathBuf,

        #[command(flatten)]
        conversion: ConversionArgs,

        /// Print CSV instead of JSON
        #[arg(long)]
        csv: bool,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the worksheets of an Excel file
    Sheets {
        /// Input Excel file
        input: PathBuf,
    },

    /// Print the first converted rows
    Preview {
        /// Input CSV or Excel file
        input: PathBuf,

        #[command(flatten)]
        conversion: ConversionArgs,

        /// Number of rows to show
        #[arg(short = 'n', long, default_value_t = config::PREVIEW_ROWS)]
        rows: usize,
    },

    /// Convert a file to YNAB CSV
    Convert {
        /// Input CSV or Excel file
        input: PathBuf,

        #[command(flatten)]
        conversion: ConversionArgs,

        /// Output file, `-` for stdout (default: ./ynab_data_YYYYMMDD.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show supported encodings, delimiters and schemas
    Catalog,

    /// Start HTTP server
    Serve {
        /// Port to listen on (default: $PORT or 3000)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Manage saved profiles
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
}

#[derive(Subcommand)]
enum ProfileAction {
    /// List all stored profiles
    List,

    /// Show a profile as JSON
    Show {
        /// Profile name
        name: String,
    },

    /// Save the given settings under a name
    Save {
        /// Profile name
        name: String,

        #[command(flatten)]
        conversion: ConversionArgs,
    },

    /// Delete a profile
    Delete {
        /// Profile name
        name: String,
    },
}

/// Settings shared by every command that reads a file.
///
/// Flags override the chosen profile.
#[derive(Args, Debug, Clone, Default)]
struct ConversionArgs {
    /// Profile to start from (default: "default profile")
    #[arg(long)]
    profile: Option<String>,

    /// Field delimiter: auto, ',', ';' or '|'
    #[arg(short, long)]
    delimiter: Option<Delimiter>,

    /// Text encoding, or `auto` to detect
    #[arg(short, long)]
    encoding: Option<String>,

    /// 1-based line holding the header row
    #[arg(long)]
    start_row: Option<usize>,

    /// Use the first line as header and as first data row
    #[arg(long)]
    duplicate_first_row: bool,

    /// Swap Outflow and Inflow for signed amounts
    #[arg(long)]
    invert: bool,

    /// Zero-based worksheet index for Excel files
    #[arg(short, long)]
    worksheet: Option<usize>,

    /// Output schema: legacy (Outflow/Inflow) or unified (Amount)
    #[arg(long)]
    schema: Option<TargetSchema>,

    /// Column mapping, e.g. `--map Payee=Description` (empty source unmaps)
    #[arg(long = "map", value_name = "TARGET=SOURCE", value_parser = parse_mapping_entry)]
    map: Vec<(TargetColumn, String)>,
}

/// Everything needed to run one conversion.
#[derive(Debug, Clone, PartialEq)]
struct Resolved {
    options: ConversionOptions,
    schema: TargetSchema,
    mapping: ColumnMapping,
}

fn parse_mapping_entry(s: &str) -> Result<(TargetColumn, String), String> {
    let (target, source) = s
        .split_once('=')
        .ok_or_else(|| format!("Expected TARGET=SOURCE, got '{}'", s))?;
    let target = TargetColumn::from_str(target)?;
    Ok((target, source.to_string()))
}

impl ConversionArgs {
    fn resolve(&self, store: &ProfileStore) -> Result<Resolved, Box<dyn std::error::Error>> {
        let profile = match &self.profile {
            Some(name) => store.get(name)?.clone(),
            None => store.resolve(DEFAULT_PROFILE_NAME),
        };

        let mut options = profile.options();
        if let Some(delimiter) = self.delimiter {
            options.delimiter = delimiter;
        }
        if let Some(encoding) = &self.encoding {
            options.encoding = encoding.clone();
        }
        if let Some(start_row) = self.start_row {
            options.start_row = start_row;
        }
        if let Some(worksheet) = self.worksheet {
            options.worksheet_index = worksheet;
        }
        options.duplicate_first_row |= self.duplicate_first_row;
        options.invert_sign = self.invert;
        options.validate()?;

        let schema = self.schema.unwrap_or(profile.column_format);

        let mut mapping = profile.chosen_columns;
        for (target, source) in &self.map {
            if source.is_empty() {
                mapping.unset(*target);
            } else {
                mapping.set(*target, source.clone());
            }
        }

        Ok(Resolved {
            options,
            schema,
            mapping,
        })
    }

    fn resolve_from_store(&self) -> Result<Resolved, Box<dyn std::error::Error>> {
        let store = ProfileStore::open(config::profiles_path())?;
        self.resolve(&store)
    }
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Parse {
            input,
            conversion,
            csv,
            output,
        } => cmd_parse(&input, &conversion, csv, output.as_deref()),

        Commands::Sheets { input } => cmd_sheets(&input),

        Commands::Preview {
            input,
            conversion,
            rows,
        } => cmd_preview(&input, &conversion, rows),

        Commands::Convert {
            input,
            conversion,
            output,
        } => cmd_convert(&input, &conversion, output.as_deref()),

        Commands::Catalog => cmd_catalog(),

        Commands::Serve { port } => cmd_serve(port.unwrap_or_else(config::port)).await,

        Commands::Profile { action } => cmd_profile(action),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_parse(
    input: &Path,
    conversion: &ConversionArgs,
    csv: bool,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let resolved = conversion.resolve_from_store()?;
    let (file_name, bytes) = read_source(input)?;

    let loaded = load_table(&file_name, &bytes, &resolved.options)?;
    eprintln!("   Columns: {}", loaded.table.headers.join(", "));

    let content = if csv {
        serialize_table(&loaded.table)?
    } else {
        serde_json::to_string_pretty(&loaded.table)?
    };
    write_output(&content, output)
}

fn cmd_sheets(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let (file_name, bytes) = read_source(input)?;
    if !ynab_converter::is_spreadsheet(&file_name) {
        return Err(format!("Not an Excel file: {}", file_name).into());
    }

    for (index, name) in worksheet_names(&bytes)?.iter().enumerate() {
        println!("{:3}  {}", index, name);
    }
    Ok(())
}

fn cmd_preview(input: &Path, conversion: &ConversionArgs, rows: usize) -> Result<(), Box<dyn std::error::Error>> {
    let resolved = conversion.resolve_from_store()?;
    let (file_name, bytes) = read_source(input)?;

    let loaded = load_table(&file_name, &bytes, &resolved.options)?;
    let preview = transform(
        &loaded.table,
        resolved.schema,
        &resolved.mapping,
        resolved.options.invert_sign,
        Some(rows),
    );

    eprintln!(
        "   Showing {} of {} rows ({} schema)",
        preview.len(),
        loaded.table.row_count(),
        resolved.schema.name()
    );
    print!("{}", serialize(resolved.schema, &preview)?);
    Ok(())
}

fn cmd_convert(
    input: &Path,
    conversion: &ConversionArgs,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let resolved = conversion.resolve_from_store()?;
    let (file_name, bytes) = read_source(input)?;

    let result = convert_bytes(
        &file_name,
        &bytes,
        &resolved.options,
        resolved.schema,
        &resolved.mapping,
    )?;

    match output {
        Some(p) if p == Path::new("-") => {
            std::io::stdout().write_all(result.csv.as_bytes())?;
        }
        Some(p) => {
            fs::write(p, &result.csv)?;
            eprintln!("Output written to: {}", p.display());
        }
        None => {
            fs::write(&result.file_name, &result.csv)?;
            eprintln!("Output written to: {}", result.file_name);
        }
    }
    Ok(())
}

fn cmd_catalog() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(&CatalogResponse::current())?);
    Ok(())
}

async fn cmd_serve(port: u16) -> Result<(), Box<dyn std::error::Error>> {
    ynab_converter::server::start_server(port).await
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}

fn cmd_profile(action: ProfileAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut store = ProfileStore::open(config::profiles_path())?;

    match action {
        ProfileAction::List => {
            eprintln!("Profiles in {}:", store.path().display());
            for name in store.names() {
                let marker = if name == DEFAULT_PROFILE_NAME { " (built in)" } else { "" };
                println!("  {}{}", name, marker);
            }
        }

        ProfileAction::Show { name } => {
            let profile = store.get(&name)?;
            println!("{}", serde_json::to_string_pretty(profile)?);
        }

        ProfileAction::Save { name, conversion } => {
            let resolved = conversion.resolve(&store)?;
            let profile = Profile::capture(&resolved.options, resolved.schema, &resolved.mapping);
            store.upsert(&name, profile);
            store.save()?;
            eprintln!("Profile saved: {}", name.to_lowercase());
        }

        ProfileAction::Delete { name } => {
            store.remove(&name)?;
            store.save()?;
            eprintln!("Profile deleted: {}", name.to_lowercase());
        }
    }

    Ok(())
}

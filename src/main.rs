use clap::{Args, Parser, Subcommand};
use ledgerctl::alias::{AliasError, AliasFilter, AliasRecord, AliasService};
use ledgerctl::config::{CliConfig, ConfigError, Context, ContextError};
use ledgerctl::kms::{KeyAlgorithm, KeyRefId, KmsError};
use ledgerctl::resolver::{KeyResolverError, Operator};
use ledgerctl::storage::StoreError;
use ledgerctl::types::{EntityId, EntityType, ErrorKind, EvmAddress, Network};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ledgerctl", version, about = "Manage ledger aliases, keys and operators")]
struct Cli {
    /// State directory (defaults to $LEDGERCTL_HOME or ~/.ledgerctl)
    #[arg(long, global = true)]
    home: Option<PathBuf>,

    /// Network to operate on (defaults to $LEDGERCTL_NETWORK or testnet)
    #[arg(long, short, global = true)]
    network: Option<Network>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Manage entity aliases
    #[command(subcommand)]
    Alias(AliasCommand),

    /// Manage stored keys
    #[command(subcommand)]
    Key(KeyCommand),

    /// Manage the default signer of a network
    #[command(subcommand)]
    Operator(OperatorCommand),

    /// Resolve a signer argument (alias or entityId:[algorithm:]privateKey)
    Signer {
        reference: Option<String>,
        #[command(flatten)]
        storage: StorageArgs,
    },
}

#[derive(Args)]
struct StorageArgs {
    /// Key manager for imported keys (local or local_encrypted)
    #[arg(long)]
    manager: Option<String>,

    /// Provenance tag recorded on the key (repeatable)
    #[arg(long = "tag")]
    tags: Vec<String>,
}

#[derive(Subcommand)]
enum AliasCommand {
    /// Register an alias
    Add {
        alias: String,
        #[arg(long = "type", default_value = "account")]
        entity_type: EntityType,
        #[arg(long)]
        entity_id: Option<EntityId>,
        #[arg(long)]
        evm_address: Option<EvmAddress>,
        /// Attach a stored key as this alias's signer
        #[arg(long)]
        key_ref: Option<String>,
        /// Allow the name to coexist with an alias of another type
        #[arg(long)]
        shared: bool,
    },
    /// List aliases
    List {
        #[arg(long = "type")]
        entity_type: Option<EntityType>,
        /// Include every network
        #[arg(long)]
        all: bool,
    },
    /// Show one alias
    Show {
        alias: String,
        #[arg(long = "type", default_value = "account")]
        entity_type: EntityType,
    },
    /// Remove an alias (all entity types) from the network
    Remove { alias: String },
}

#[derive(Subcommand)]
enum KeyCommand {
    /// Generate a new key
    Generate {
        #[arg(long, default_value = "ecdsa")]
        algorithm: KeyAlgorithm,
        #[command(flatten)]
        storage: StorageArgs,
    },
    /// Import private key text (DER or hex)
    Import {
        #[arg(long)]
        algorithm: KeyAlgorithm,
        /// Private key text (DER, hex or 0x hex)
        #[arg(long)]
        key: String,
        /// Reject the import unless the key derives this public key
        #[arg(long)]
        expect_public_key: Option<String>,
        #[command(flatten)]
        storage: StorageArgs,
    },
    /// List stored keys
    List,
    /// Show a stored key
    Show { key_ref: String },
    /// Remove a stored key
    Remove { key_ref: String },
}

#[derive(Subcommand)]
enum OperatorCommand {
    /// Set the operator from a signer argument
    Set {
        reference: String,
        #[command(flatten)]
        storage: StorageArgs,
    },
    /// Show the operator
    Show,
    /// Clear the operator
    Clear,
}

struct CliError {
    kind: ErrorKind,
    message: String,
}

impl CliError {
    fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    fn exit_code(&self) -> u8 {
        match self.kind {
            ErrorKind::Validation => 2,
            ErrorKind::NotFound => 3,
            ErrorKind::State => 4,
            ErrorKind::External => 5,
            ErrorKind::Storage => 6,
        }
    }
}

macro_rules! impl_cli_error {
    ($($error:ty),* $(,)?) => {
        $(impl From<$error> for CliError {
            fn from(e: $error) -> Self {
                CliError::new(e.kind(), e.to_string())
            }
        })*
    };
}

impl_cli_error!(
    ConfigError,
    ContextError,
    KmsError,
    AliasError,
    KeyResolverError,
    StoreError,
);

type CommandResult = Result<(), CliError>;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e.message);
            ExitCode::from(e.exit_code())
        }
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> CommandResult {
    let mut config = CliConfig::from_env()?;
    if let Some(home) = cli.home {
        config = config.with_home_dir(home);
    }
    if let Some(network) = cli.network {
        config = config.with_network(network);
    }

    let ctx = Context::open(config)?;
    let network = ctx.config.network;

    match cli.command {
        Command::Alias(command) => run_alias(&ctx, network, command)?,
        Command::Key(command) => run_key(&ctx, command)?,
        Command::Operator(command) => run_operator(&ctx, network, command)?,
        Command::Signer { reference, storage } => {
            let manager = manager_name(&ctx, &storage);
            let signer = ctx.key_resolver(network).get_or_init_key_with_fallback(
                reference.as_deref(),
                &manager,
                &storage.tags,
            )?;
            println!("account:    {}", signer.account_id);
            println!("public key: {}", signer.public_key);
            println!("key ref:    {}", signer.key_ref_id);
        }
    }

    ctx.close()?;
    Ok(())
}

fn manager_name(ctx: &Context, storage: &StorageArgs) -> String {
    storage
        .manager
        .clone()
        .unwrap_or_else(|| ctx.config.key_manager.clone())
}

fn print_record(record: &AliasRecord) {
    let entity = record
        .entity_id
        .map(|id| id.to_string())
        .unwrap_or_else(|| "-".to_string());
    let evm = record
        .evm_address
        .map(|a| a.to_string())
        .unwrap_or_else(|| "-".to_string());
    let key = record
        .key_ref_id
        .as_ref()
        .map(|k| k.to_string())
        .unwrap_or_else(|| "-".to_string());
    println!(
        "{:<24} {:<9} {:<10} {:<16} {:<42} {}",
        record.alias,
        record.entity_type.to_string(),
        record.network.to_string(),
        entity,
        evm,
        key
    );
}

fn run_alias(ctx: &Context, network: Network, command: AliasCommand) -> CommandResult {
    match command {
        AliasCommand::Add {
            alias,
            entity_type,
            entity_id,
            evm_address,
            key_ref,
            shared,
        } => {
            let mut record = AliasRecord::new(&alias, entity_type, network);
            if let Some(id) = entity_id {
                record = record.with_entity_id(id);
            }
            if let Some(address) = evm_address {
                record = record.with_evm_address(address);
            }
            if let Some(key_ref) = key_ref {
                let key_ref_id = KeyRefId::new(key_ref);
                let public_key = ctx
                    .kms
                    .get_public_key(&key_ref_id)?
                    .ok_or_else(|| {
                        CliError::new(ErrorKind::NotFound, format!("key {} not found", key_ref_id))
                    })?;
                if record.evm_address.is_none() && public_key.algorithm() == KeyAlgorithm::Ecdsa {
                    record = record.with_evm_address(public_key.evm_address()?);
                }
                record = record.with_key(key_ref_id, public_key);
            }

            if shared {
                ctx.aliases.register(&record)?;
            } else {
                ctx.aliases.register_exclusive(&record)?;
            }
            print_record(&record);
        }
        AliasCommand::List { entity_type, all } => {
            let mut filter = AliasFilter::new();
            if !all {
                filter = filter.network(network);
            }
            if let Some(entity_type) = entity_type {
                filter = filter.entity_type(entity_type);
            }
            for record in ctx.aliases.list(filter)? {
                print_record(&record);
            }
        }
        AliasCommand::Show { alias, entity_type } => {
            let record = ctx.aliases.resolve_or_throw(&alias, entity_type, network)?;
            print_record(&record);
        }
        AliasCommand::Remove { alias } => {
            let removed = ctx.aliases.remove(&alias, network)?;
            if removed.is_empty() {
                return Err(CliError::new(
                    ErrorKind::NotFound,
                    format!("alias '{}' not found on {}", alias, network),
                ));
            }
            for record in &removed {
                print_record(record);
            }
        }
    }
    Ok(())
}

fn run_key(ctx: &Context, command: KeyCommand) -> CommandResult {
    match command {
        KeyCommand::Generate { algorithm, storage } => {
            let created = ctx.kms.create_local_private_key(
                algorithm,
                &manager_name(ctx, &storage),
                &storage.tags,
            )?;
            println!("key ref:    {}", created.key_ref_id);
            println!("public key: {}", created.public_key);
        }
        KeyCommand::Import {
            algorithm,
            key,
            expect_public_key,
            storage,
        } => {
            let manager = manager_name(ctx, &storage);
            let key_ref_id = match expect_public_key {
                Some(expected) => ctx.kms.import_and_validate_private_key(
                    algorithm,
                    &key,
                    &expected,
                    &manager,
                    &storage.tags,
                )?,
                None => {
                    ctx.kms
                        .import_private_key(algorithm, &key, &manager, &storage.tags)?
                        .key_ref_id
                }
            };
            println!("key ref: {}", key_ref_id);
        }
        KeyCommand::List => {
            for handle in ctx.kms.list()? {
                println!(
                    "{:<28} {:<8} {:<16} {} [{}]",
                    handle.key_ref_id.to_string(),
                    handle.algorithm.to_string(),
                    handle.manager_name,
                    handle.public_key,
                    handle.tags.join(",")
                );
            }
        }
        KeyCommand::Show { key_ref } => {
            let key_ref_id = KeyRefId::new(key_ref);
            let handle = ctx
                .kms
                .get(&key_ref_id)?
                .ok_or_else(|| {
                    CliError::new(ErrorKind::NotFound, format!("key {} not found", key_ref_id))
                })?;
            println!("key ref:    {}", handle.key_ref_id);
            println!("algorithm:  {}", handle.algorithm);
            println!("manager:    {}", handle.manager_name);
            println!("public key: {}", handle.public_key);
            println!("der:        {}", handle.public_key.to_der_hex());
            if handle.algorithm == KeyAlgorithm::Ecdsa {
                println!("evm:        {}", ctx.kms.evm_address(&key_ref_id)?);
            }
            println!("tags:       {}", handle.tags.join(","));
            println!("created:    {}", handle.created_at);
        }
        KeyCommand::Remove { key_ref } => {
            if !ctx.kms.remove(&KeyRefId::new(key_ref.clone()))? {
                return Err(CliError::new(
                    ErrorKind::NotFound,
                    format!("key {} not found", key_ref),
                ));
            }
        }
    }
    Ok(())
}

fn run_operator(ctx: &Context, network: Network, command: OperatorCommand) -> CommandResult {
    match command {
        OperatorCommand::Set { reference, storage } => {
            let mut tags = storage.tags.clone();
            tags.push(format!("operator:{}", network));
            let signer = ctx.key_resolver(network).get_or_init_key(
                &reference,
                &manager_name(ctx, &storage),
                &tags,
            )?;
            ctx.operators.set_operator(
                network,
                &Operator {
                    account_id: signer.account_id,
                    key_ref_id: signer.key_ref_id,
                },
            )?;
            println!("operator for {}: {}", network, signer.account_id);
        }
        OperatorCommand::Show => match ctx.operators.operator(network)? {
            Some(operator) => {
                println!("account: {}", operator.account_id);
                println!("key ref: {}", operator.key_ref_id);
            }
            None => println!("no operator configured for {}", network),
        },
        OperatorCommand::Clear => {
            ctx.operators.clear_operator(network)?;
        }
    }
    Ok(())
}

//! `sgn-cli`: a thin harness for exercising the object store and signer
//! from a shell, matching the CLI surface spec §6 reserves for tests.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use sgn_core::Ku;
use sgn_crypto::KeyPair;
use sgn_storage::ObjectStore;

#[derive(Parser)]
#[command(name = "sgn-cli")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Publish a KU file into an object store.
    Publish {
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        db: PathBuf,
    },
    /// Fetch a KU by CID and print it.
    Fetch {
        cid: String,
        #[arg(long)]
        db: PathBuf,
    },
    /// Key/signature operations.
    #[command(subcommand)]
    Ku(KuCommand),
}

#[derive(Subcommand)]
enum KuCommand {
    /// Sign a KU file in place, writing the matching public key PEM.
    Sign {
        ku_file: PathBuf,
        priv_pem: PathBuf,
        pub_pem: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Publish { file, db } => publish(&file, &db).await,
        Command::Fetch { cid, db } => fetch(&cid, &db).await,
        Command::Ku(KuCommand::Sign {
            ku_file,
            priv_pem,
            pub_pem,
        }) => sign(&ku_file, &priv_pem, &pub_pem),
    }
}

fn blob_dir_for(db: &Path) -> PathBuf {
    db.parent().unwrap_or_else(|| Path::new(".")).join("kus")
}

async fn open_store(db: &Path) -> anyhow::Result<ObjectStore> {
    let url = format!("sqlite://{}?mode=rwc", db.display());
    Ok(ObjectStore::open(blob_dir_for(db), &url).await?)
}

async fn publish(file: &Path, db: &Path) -> anyhow::Result<()> {
    let bytes = std::fs::read(file)?;
    let ku: Ku = serde_json::from_slice(&bytes)?;
    let store = open_store(db).await?;
    let now_ms = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)?
        .as_millis() as i64;
    let outcome = store.store(&ku, now_ms).await?;
    println!("Published KU {}", outcome.cid);
    Ok(())
}

async fn fetch(cid: &str, db: &Path) -> anyhow::Result<()> {
    let store = open_store(db).await?;
    let now_ms = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)?
        .as_millis() as i64;
    match store.retrieve(cid, now_ms).await? {
        Some(ku) => {
            println!("{}", serde_json::to_string_pretty(&ku)?);
            Ok(())
        }
        None => anyhow::bail!("not_found: {cid}"),
    }
}

fn sign(ku_file: &Path, priv_pem_path: &Path, pub_pem_path: &Path) -> anyhow::Result<()> {
    let bytes = std::fs::read(ku_file)?;
    let ku: Ku = serde_json::from_slice(&bytes)?;

    let priv_pem = std::fs::read_to_string(priv_pem_path)?;
    let keypair = KeyPair::from_pkcs8_pem(&priv_pem)?;
    std::fs::write(pub_pem_path, keypair.public_key_pem()?)?;

    let signed = sgn_crypto::sign_ku(&ku, &keypair)?;
    std::fs::write(ku_file, serde_json::to_string_pretty(&signed)?)?;
    Ok(())
}

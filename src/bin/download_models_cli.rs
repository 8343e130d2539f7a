use anyhow::Result;
use qgen::downloader;
use qgen::models::{self, QgenModel};
use std::path::PathBuf;

// cargo run --bin download_models_cli

#[tokio::main]
pub async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let matches = clap::Command::new("Model Downloader")
        .version("1.0")
        .about("Downloads and extracts the pretrained question generation checkpoints")
        .arg(
            clap::Arg::new("models_dir")
                .help("Directory the models are stored under")
                .long("models_dir")
                .required(false),
        )
        .get_matches();

    let models_dir = matches
        .get_one::<String>("models_dir")
        .map(PathBuf::from)
        .unwrap_or_else(models::models_dir);

    for model in QgenModel::all() {
        downloader::ensure_downloaded(model, &models_dir).await?;
        log::info!("---");
    }

    Ok(())
}

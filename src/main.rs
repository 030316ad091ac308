//! # firma CLI
//!
//! Renders an email signature to a PNG file.
//!
//! ## Usage
//!
//! ```bash
//! # Render from flags
//! firma --brand samoo --name "Jane Doe" --job-title Engineer --phone "+34 600 000 000"
//!
//! # Render a JSON request into a directory
//! firma --request jane.json --out-dir signatures/
//!
//! # Retina output
//! firma --request jane.json --pixel-ratio 2
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use firma_renderer::{
    Brand, Error, ImageSource, RendererConfig, SignatureRenderer, SignatureRequest,
};

/// firma - email signature renderer
#[derive(Parser, Debug)]
#[command(name = "firma")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON request file; field flags override its values
    #[arg(long, value_name = "FILE")]
    request: Option<PathBuf>,

    /// JSON renderer configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[arg(long)]
    brand: Option<Brand>,

    #[arg(long)]
    name: Option<String>,

    #[arg(long)]
    job_title: Option<String>,

    #[arg(long)]
    department: Option<String>,

    #[arg(long)]
    phone: Option<String>,

    #[arg(long)]
    email: Option<String>,

    #[arg(long)]
    website: Option<String>,

    /// Profile photo: URL, data URI or file path
    #[arg(long, value_name = "SOURCE")]
    photo: Option<ImageSource>,

    /// Background template replacing the brand default
    #[arg(long, value_name = "SOURCE")]
    background: Option<ImageSource>,

    /// Directory holding the brand background templates
    #[arg(long, value_name = "DIR")]
    asset_dir: Option<PathBuf>,

    /// Output density (2 for retina)
    #[arg(long)]
    pixel_ratio: Option<f32>,

    /// Directory the PNG is written to
    #[arg(long, value_name = "DIR", default_value = ".")]
    out_dir: PathBuf,
}

impl Cli {
    fn build_request(&self) -> Result<SignatureRequest, Error> {
        let mut request = match &self.request {
            Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
            None => SignatureRequest::default(),
        };

        if let Some(brand) = self.brand {
            request.brand = brand;
        }
        let text_overrides = [
            (&self.name, &mut request.name),
            (&self.job_title, &mut request.job_title),
            (&self.department, &mut request.department_text),
            (&self.phone, &mut request.phone),
            (&self.email, &mut request.email),
            (&self.website, &mut request.website),
        ];
        for (flag, field) in text_overrides {
            if let Some(value) = flag {
                *field = value.clone();
            }
        }
        if let Some(photo) = &self.photo {
            request.photo_source = Some(photo.clone());
        }
        if let Some(background) = &self.background {
            request.background_override = Some(background.clone());
        }

        request.validate()?;
        Ok(request)
    }

    fn build_config(&self) -> Result<RendererConfig, Error> {
        let mut config = match &self.config {
            Some(path) => RendererConfig::from_file(path)?,
            None => RendererConfig::default(),
        };
        if let Some(dir) = &self.asset_dir {
            config.asset_dir = dir.clone();
        }
        if let Some(ratio) = self.pixel_ratio {
            config.pixel_ratio = ratio;
        }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("firma_renderer=info,warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Error> {
    let request = cli.build_request()?;
    let renderer = SignatureRenderer::new(cli.build_config()?)?;

    renderer.render(request).await;
    let export = renderer.export().await?;

    std::fs::create_dir_all(&cli.out_dir)?;
    let path = cli.out_dir.join(&export.file_name);
    std::fs::write(&path, &export.png)?;

    info!(path = %path.display(), bytes = export.png.len(), "signature written");
    println!("{}", path.display());
    Ok(())
}

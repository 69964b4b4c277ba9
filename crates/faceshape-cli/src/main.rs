use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use faceshape_core::{
    analyze, MeshLandmarker, MeshOptions, DETECTOR_MODEL_FILE, MESH_MODEL_FILE,
};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "faceshape", about = "Face-shape classification CLI")]
struct Cli {
    /// Directory containing the ONNX models
    #[arg(long, env = "FACESHAPE_MODEL_DIR", default_value = "models", global = true)]
    model_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify the face in a photo and print the result as JSON
    Classify {
        /// Path to the photo
        image: PathBuf,
        /// Print compact JSON on one line
        #[arg(long)]
        compact: bool,
    },
    /// Check that both models load
    Check,
}

fn load_landmarker(model_dir: &Path) -> Result<MeshLandmarker> {
    let detector = model_dir.join(DETECTOR_MODEL_FILE);
    let mesh = model_dir.join(MESH_MODEL_FILE);
    MeshLandmarker::load(&detector, &mesh, MeshOptions::default())
        .with_context(|| format!("loading models from {}", model_dir.display()))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Classify { image, compact } => {
            let mut landmarker = load_landmarker(&cli.model_dir)?;
            let photo = image::open(&image)
                .with_context(|| format!("reading {}", image.display()))?
                .to_rgb8();
            let result = analyze(&mut landmarker, &photo)?;
            tracing::info!(
                image = %image.display(),
                shape = result.face_shape.code(),
                "classified"
            );
            let json = if compact {
                serde_json::to_string(&result)?
            } else {
                serde_json::to_string_pretty(&result)?
            };
            println!("{json}");
        }
        Commands::Check => {
            load_landmarker(&cli.model_dir)?;
            println!("models OK: {}", cli.model_dir.display());
        }
    }

    Ok(())
}

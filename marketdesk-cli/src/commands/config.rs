use std::{fs, path::Path};

use anyhow::{Result, bail};
use shared::config::Config;

/// Writes a configuration file with default values in the current directory.
///
/// # Errors
/// Returns an error if the format is unsupported or if writing the file fails.
pub fn generate_config(format: &str) -> Result<()> {
    let path = write_default_config(Path::new("."), format)?;
    println!("Configuration file '{}' generated successfully.", path.display());
    Ok(())
}

fn write_default_config(dir: &Path, format: &str) -> Result<std::path::PathBuf> {
    let config = Config::with_defaults();
    let (file_name, serialized) = match format {
        "yaml" | "yml" => ("marketdesk.yaml", serde_yml::to_string(&config)?),
        "json" => ("marketdesk.json", serde_json::to_string_pretty(&config)?),
        other => bail!("unsupported format '{other}'; use 'yaml' or 'json'"),
    };

    let path = dir.join(file_name);
    fs::write(&path, serialized)?;
    Ok(path)
}

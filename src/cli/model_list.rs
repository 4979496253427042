//! Model listing functionality
//!
//! Lists the models installed on the local server, with sizes where the
//! server reports them.

use std::error::Error;

use crate::api::models::{fetch_models, sort_models};

pub async fn list_models(base_url: &str) -> Result<(), Box<dyn Error>> {
    let client = reqwest::Client::new();
    let mut models = fetch_models(&client, base_url).await?;
    sort_models(&mut models);

    if models.is_empty() {
        println!("No models installed. Download one with: charla pull <name>");
        return Ok(());
    }

    println!("Installed models at {base_url}:");
    for model in &models {
        match model.size {
            Some(size) => println!("  {}  ({})", model.name, human_size(size)),
            None => println!("  {}", model.name),
        }
    }
    Ok(())
}

fn human_size(bytes: u64) -> String {
    const GB: f64 = 1024.0 * 1024.0 * 1024.0;
    const MB: f64 = 1024.0 * 1024.0;
    let bytes = bytes as f64;
    if bytes >= GB {
        format!("{:.1} GB", bytes / GB)
    } else if bytes >= MB {
        format!("{:.0} MB", bytes / MB)
    } else {
        format!("{bytes:.0} B")
    }
}

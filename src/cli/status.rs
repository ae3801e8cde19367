//! `parley status`: which providers are configured and where config came from.

use crate::config::ParleyConfig;

/// Handle `parley status`.
pub fn handle_status(config: &ParleyConfig) -> Result<(), Box<dyn std::error::Error>> {
    println!("🔌 Providers\n");
    for (name, provider) in [
        ("OpenAI", "openai"),
        ("Anthropic", "anthropic"),
        ("Google", "google"),
    ] {
        let status = if config.has_credentials(provider) {
            match config.get_base_url(provider) {
                Some(url) => format!("✅ Configured ({url})"),
                None => "✅ Configured".to_string(),
            }
        } else {
            "❌ No API key".to_string()
        };
        println!("  {name}: {status}");
    }

    let registry = config.build_registry();
    println!("\n📌 Registered adapters: {}", registry.provider_names().join(", "));

    match ParleyConfig::default_config_path() {
        Some(path) if path.exists() => println!("📄 Config file: {}", path.display()),
        Some(path) => println!("📄 Config file: {} (not found)", path.display()),
        None => println!("📄 Config file: no config directory on this platform"),
    }
    let idle = match config.stream_idle_timeout() {
        Some(idle) => format!("{} ms", idle.as_millis()),
        None => "none".to_string(),
    };
    println!("⏱  Stream idle timeout: {idle}");
    println!("🔁 Max delegation depth: {}", config.max_delegation_depth());
    Ok(())
}

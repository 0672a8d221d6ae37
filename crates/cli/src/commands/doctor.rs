//! `docchat doctor`: check that every collaborator is configured.

use docchat_config::AppConfig;
use docchat_core::Provider;

fn report(label: &str, ok: bool, hint: &str, issues: &mut usize) {
    if ok {
        println!("  ✅ {label}");
    } else {
        println!("  ❌ {label}: {hint}");
        *issues += 1;
    }
}

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 DocChat Doctor: Configuration Check");
    println!("=======================================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("  ✅ Config file found at {}", config_path.display());
    } else {
        println!("  ⚠️  No config file at {} (environment only)", config_path.display());
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  ✅ Configuration valid");
            config
        }
        Err(e) => {
            println!("  ❌ Configuration invalid: {e}");
            return Ok(());
        }
    };

    println!("\n  Chat completions (deployment '{}')", config.chat.deployment);
    report("Endpoint set", config.chat.endpoint.is_some(), "set AZURE_OPENAI_ENDPOINT", &mut issues);
    report("API key set", config.chat.api_key.is_some(), "set AZURE_OPENAI_API_KEY", &mut issues);
    if config.chat.endpoint.is_some() && config.chat.api_key.is_some() {
        let reachable = match docchat_providers::build_from_config(&config) {
            Ok(provider) => provider.health_check().await.unwrap_or(false),
            Err(_) => false,
        };
        report(
            "Endpoint reachable",
            reachable,
            "check the endpoint URL and API key",
            &mut issues,
        );
    }

    println!("\n  Search index '{}'", config.search.index_name);
    report(
        "Service endpoint resolved",
        config.search.resolved_endpoint().is_some(),
        "set AZURE_SEARCH_SERVICE_NAME or AZURE_SEARCH_ENDPOINT",
        &mut issues,
    );
    report("API key set", config.search.api_key.is_some(), "set AZURE_SEARCH_KEY", &mut issues);

    println!("\n  Object storage (backend '{}')", config.storage.backend);
    if config.storage.backend == "azure" {
        report(
            "Account name set",
            config.storage.account_name.is_some(),
            "set AZURE_STORAGE_ACCOUNT_NAME",
            &mut issues,
        );
        report(
            "Account key set",
            config.storage.account_key.is_some(),
            "set AZURE_STORAGE_ACCOUNT_KEY",
            &mut issues,
        );
        report(
            "Container set",
            config.storage.container.is_some(),
            "set AZURE_STORAGE_CONTAINER_NAME",
            &mut issues,
        );
    } else {
        println!("  ✅ Local directory storage");
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
        if !config_path.exists() {
            println!("\n  Template for {}:\n", config_path.display());
            println!("{}", AppConfig::default_toml());
        }
    }

    Ok(())
}

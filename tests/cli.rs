//! Integration tests for the sidequest CLI

use std::process::{Command, Output};

/// Run the binary with an empty config and no cache so nothing touches the
/// user's files or the network
fn run_cli(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_sidequest"))
        .args(["--config", "/nonexistent/sidequest.toml"])
        .args(args)
        .env("SIDEQUEST_CACHE__ENABLED", "false")
        .env_remove("SIDEQUEST_PROVIDERS__GOOGLE_PLACES_API_KEY")
        .env_remove("SIDEQUEST_PROVIDERS__GEOAPIFY_API_KEY")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute command")
}

#[test]
fn test_cli_help() {
    let output = run_cli(&["--help"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("sidequest"));
    assert!(stdout.contains("generate"));
    assert!(stdout.contains("providers"));
}

#[test]
fn test_stats_command() {
    let output = run_cli(&["stats"]);

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stats: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let types = stats["types"].as_array().unwrap();
    assert!(types.iter().any(|t| t == "stargazing"));
    assert!(stats["total"].as_u64().unwrap() > 1);
}

#[test]
fn test_search_dark_sky_offline() {
    // Moab, UT
    let output = run_cli(&["search", "stargazing", "--lat", "38.57", "--lng", "-109.55"]);

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let candidates: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let candidates = candidates.as_array().unwrap();
    assert!(!candidates.is_empty());
    assert_eq!(candidates[0]["provider_type"], "stargazing");
}

#[test]
fn test_search_unconfigured_provider_fails() {
    let output = run_cli(&[
        "search",
        "google_cat_cafe",
        "--lat",
        "27.95",
        "--lng",
        "-82.46",
    ]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("google_cat_cafe"), "stderr: {}", stderr);
}

#[test]
fn test_generate_without_location() {
    let output = run_cli(&["generate", "--theme", "adventure"]);

    assert!(output.status.success());
    let outcome: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(outcome["success"], false);
    assert!(
        outcome["error"]
            .as_str()
            .unwrap()
            .contains("Location is required")
    );
}

#[test]
fn test_invalid_choice_rejected() {
    let output = run_cli(&["generate", "--theme", "mystery"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unsupported value"));
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Version information for the encrypted identity toolkit

/// Full version string with feature description
pub const VERSION: &str = "v1.0.0-confidential-identity-2025-10-20";

/// Semantic version number
pub const VERSION_NUMBER: &str = "1.0.0";

pub const VERSION_MAJOR: u32 = 1;
pub const VERSION_MINOR: u32 = 0;
pub const VERSION_PATCH: u32 = 0;

/// Build date
pub const BUILD_DATE: &str = "2025-10-20";

/// Supported features in this version
pub const FEATURES: &[&str] = &[
    "pbkdf2-address-keys",
    "aes-256-gcm-envelopes",
    "homomorphic-input-handles",
    "eip712-decryption-grants",
    "ephemeral-session-keys",
    "sealed-reveals",
    "registry-events",
    "per-holder-submit-lock",
];

/// Supported chain IDs
pub const SUPPORTED_CHAINS: &[u64] = &[
    11155111, // Sepolia
    31337,    // Localhost
];

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!("Encrypted Identity {} ({})", VERSION_NUMBER, BUILD_DATE)
}

/// Get full version info as JSON
pub fn get_version_info() -> serde_json::Value {
    serde_json::json!({
        "version": VERSION_NUMBER,
        "build": VERSION,
        "date": BUILD_DATE,
        "features": FEATURES,
        "chains": SUPPORTED_CHAINS,
    })
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Display labels for the country ids the submission form offers

use std::borrow::Cow;

/// Ids offered by the submission form, with their labels
pub const KNOWN_COUNTRIES: &[(u32, &str)] = &[
    (1, "USA"),
    (2, "China"),
    (3, "UK"),
    (4, "Germany"),
    (5, "France"),
    (86, "Other"),
];

/// Label for `id`, or the decimal id when it is not a known country
pub fn country_label(id: u32) -> Cow<'static, str> {
    KNOWN_COUNTRIES
        .iter()
        .find(|(known, _)| *known == id)
        .map(|(_, label)| Cow::Borrowed(*label))
        .unwrap_or_else(|| Cow::Owned(id.to_string()))
}

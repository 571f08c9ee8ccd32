// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// tests/grant_tests.rs - Include all grant protocol test modules

mod grant {
    mod test_grant_scope;
    mod test_reveal_session;
}

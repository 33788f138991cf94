// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Fuzz target for filter parsing and scope compilation.
// Run with: cargo +nightly fuzz run fuzz_filter_compile
//
// Input is read as a query string (`key=value&key=value`) and as a JSON
// filter object. Parsing, compiling and rendering must never panic.

#![no_main]

use std::sync::OnceLock;

use filterscope_core::{CompileOptions, CompilerConfig, FilterSet, ScopeCompiler};
use libfuzzer_sys::fuzz_target;

fn compiler() -> Option<&'static ScopeCompiler> {
    static COMPILER: OnceLock<Option<ScopeCompiler>> = OnceLock::new();
    COMPILER
        .get_or_init(|| ScopeCompiler::new(CompilerConfig::default()).ok())
        .as_ref()
}

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    if input.len() > 4096 {
        return;
    }
    let Some(compiler) = compiler() else {
        return;
    };

    let pairs: Vec<(&str, &str)> = input
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .collect();
    let filters = FilterSet::from_query_pairs(pairs.iter().copied());

    if let Ok(result) = compiler.compile(&filters, &CompileOptions::for_user(1)) {
        for (_, scope) in result.iter() {
            let _ = scope.to_sql();
        }
        let _ = result.fingerprint();
    }

    let _ = FilterSet::from_json(input);
});

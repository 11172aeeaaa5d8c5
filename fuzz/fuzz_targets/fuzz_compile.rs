#![no_main]

use libfuzzer_sys::fuzz_target;
use regrep::query::{CompilerLimits, QueryCompiler};

fuzz_target!(|data: &str| {
    // Any pattern the parser accepts must compile without panicking.
    if let Ok(hir) = regex_syntax::ParserBuilder::new().utf8(false).build().parse(data) {
        let query = QueryCompiler::new(CompilerLimits::default()).compile(&hir);
        let _ = query.to_string();
    }
});

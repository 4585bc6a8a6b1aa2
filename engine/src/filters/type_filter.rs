//! Drops any symbol whose upper-cased ticker contains a configured
//! fund-like substring (spec.md §4.6.1). The exact substring list is an
//! open question the source leaves to configuration (spec.md §9); the
//! checked-in default is `{ETF, FUND, INDEX, TRUST, REIT}`.

use super::SymbolSnapshot;
use crate::stage_tracer::StageTracer;

pub fn type_filter(
    input: Vec<SymbolSnapshot>,
    fund_substrings: &[String],
    tracer: &mut StageTracer,
) -> Vec<SymbolSnapshot> {
    tracer.enter("TypeFilter", input.len());
    let mut kept = Vec::with_capacity(input.len());

    for item in input {
        let upper = item.symbol.to_uppercase();
        if let Some(matched) = fund_substrings.iter().find(|s| upper.contains(s.as_str())) {
            tracer.reject(&item.symbol, "fund_like_ticker", Some(matched.clone()));
        } else {
            kept.push(item);
        }
    }

    tracer.exit(kept.len());
    kept
}

//! Trigger tracking across the two rule lifecycles.
//!
//! Symbol rules are consumed the first time they fire; scanner rules stay
//! in the document and record fired symbols in their `triggered` list.
//! Both ledgers, plus the run-scoped fired set, keep any `(rule, symbol)`
//! pair from dispatching twice.

use std::collections::HashSet;

use tickmon_common::types::{MetricsRow, RuleDocument, Trigger};

use crate::expr;

/// Per-run evaluation state, owned by the scan loop and passed explicitly
/// into every pass. A `(symbol, expression)` pair that has dispatched once
/// in this process does not dispatch again, even if an external edit puts
/// the rule back between passes.
#[derive(Debug, Default)]
pub struct EngineState {
    fired: HashSet<(String, String)>,
}

impl EngineState {
    pub fn new() -> Self {
        Self::default()
    }

    fn already_fired(&self, symbol: &str, expression: &str) -> bool {
        self.fired
            .contains(&(symbol.to_string(), expression.to_string()))
    }

    fn mark_fired(&mut self, symbol: &str, expression: &str) {
        self.fired
            .insert((symbol.to_string(), expression.to_string()));
    }
}

/// Evaluates every rule in `doc` against `table`, mutating the document in
/// place (symbol rules consumed, scanner `triggered` lists extended) and
/// returning the triggers to dispatch, in evaluation order.
///
/// Evaluation is sequential and deterministic for a fixed document and
/// table: symbols in stored order, rules within a symbol in stored order,
/// scanner rules in stored order over rows in table order.
pub fn run_pass(
    doc: &mut RuleDocument,
    table: &[MetricsRow],
    state: &mut EngineState,
) -> Vec<Trigger> {
    let mut triggers = Vec::new();
    run_symbol_rules(doc, table, state, &mut triggers);
    run_scanner_rules(doc, table, &mut triggers);
    triggers
}

fn run_symbol_rules(
    doc: &mut RuleDocument,
    table: &[MetricsRow],
    state: &mut EngineState,
    triggers: &mut Vec<Trigger>,
) {
    let symbols: Vec<String> = doc.tickers.keys().cloned().collect();

    for symbol in symbols {
        let Some(row) = table
            .iter()
            .find(|row| row.symbol() == Some(symbol.as_str()))
        else {
            // no quote for this symbol this pass; its rules stay put
            continue;
        };
        let Some(rules) = doc.tickers.get_mut(&symbol) else {
            continue;
        };

        let mut retained = Vec::with_capacity(rules.len());
        for rule in rules.drain(..) {
            match expr::evaluate(&rule.expression, row) {
                Ok(true) if !state.already_fired(&symbol, &rule.expression) => {
                    state.mark_fired(&symbol, &rule.expression);
                    tracing::info!(symbol = %symbol, rule = %rule.id, "Alert fired");
                    triggers.push(Trigger {
                        rule,
                        symbol: symbol.clone(),
                        row: row.clone(),
                    });
                }
                Ok(_) => retained.push(rule),
                Err(e) => {
                    tracing::warn!(rule = %rule.id, error = %e, "Alert expression failed");
                    retained.push(rule);
                }
            }
        }
        *rules = retained;
    }

    // a symbol whose last rule just fired disappears from the document
    doc.tickers.retain(|_, rules| !rules.is_empty());
}

fn run_scanner_rules(doc: &mut RuleDocument, table: &[MetricsRow], triggers: &mut Vec<Trigger>) {
    for rule in doc.scanners.iter_mut() {
        for row in table {
            let symbol = row.symbol().unwrap_or_default();
            match expr::evaluate(&rule.expression, row) {
                Ok(true) => {
                    let seen = rule.triggered.get_or_insert_with(Vec::new);
                    if !seen.iter().any(|s| s == symbol) {
                        seen.push(symbol.to_string());
                        tracing::info!(symbol = %symbol, rule = %rule.id, "Scanner alert fired");
                        triggers.push(Trigger {
                            rule: rule.clone(),
                            symbol: symbol.to_string(),
                            row: row.clone(),
                        });
                    }
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(rule = %rule.id, error = %e, "Scanner expression failed");
                }
            }
        }
    }
}

//! A grammar of hanging mobiles.
//!
//! A mobile hangs from a string. The end of every string holds either a
//! weight or a rod, and each rod holds two more strings. Strings have a
//! length, rods a length and a connection point (the fraction of the rod's
//! length at which its own string attaches), and weights a radius.

use super::priors::TruncatedNormalPrior;
use super::{Grammar, GrammarError, Prior, Production, SymbolKind, TerminalKind, VariableKind};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Settings for a truncated-normal parameter prior.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TruncatedNormalParams {
    pub mean: f64,
    pub std_dev: f64,
    pub lower: f64,
    pub upper: f64,
}

impl TruncatedNormalParams {
    fn prior(&self) -> Result<Box<dyn Prior>, GrammarError> {
        Ok(Box::new(TruncatedNormalPrior::new(
            self.mean,
            self.std_dev,
            self.lower,
            self.upper,
        )?))
    }
}

/// Parameters for a [`MobileGrammar`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MobileParams {
    pub string_length: TruncatedNormalParams,
    pub rod_length: TruncatedNormalParams,
    pub rod_connect: TruncatedNormalParams,
    pub weight_radius: TruncatedNormalParams,
    /// String endpoints at this depth always hold a weight.
    pub max_depth: usize,
}

impl Default for MobileParams {
    fn default() -> Self {
        MobileParams {
            string_length: TruncatedNormalParams {
                mean: 2.0,
                std_dev: 0.5,
                lower: 0.0,
                upper: 10.0,
            },
            rod_length: TruncatedNormalParams {
                mean: 3.0,
                std_dev: 1.0,
                lower: 0.0,
                upper: 10.0,
            },
            rod_connect: TruncatedNormalParams {
                mean: 0.5,
                std_dev: 0.15,
                lower: 0.0,
                upper: 1.0,
            },
            weight_radius: TruncatedNormalParams {
                mean: 0.5,
                std_dev: 0.25,
                lower: 0.0,
                upper: 10.0,
            },
            max_depth: 5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MobileGrammar {
    grammar: Arc<Grammar>,
    string: TerminalKind,
    rod: TerminalKind,
    weight: TerminalKind,
    endpoint: VariableKind,
}

impl MobileGrammar {
    pub fn new(params: &MobileParams) -> Result<Self, GrammarError> {
        let max_depth = params.max_depth.max(1);
        let mut grammar = Grammar::new().with_depth_limit(max_depth + 1);
        let string = grammar.add_terminal("String", vec![params.string_length.prior()?]);
        let rod = grammar.add_terminal(
            "Rod",
            vec![params.rod_length.prior()?, params.rod_connect.prior()?],
        );
        let weight = grammar.add_terminal("Weight", vec![params.weight_radius.prior()?]);
        let endpoint = grammar.add_variable("StringEnd");

        let depth_ratio = move |depth: usize| (depth as f64 / max_depth as f64).min(1.0);
        grammar.add_production(
            endpoint,
            Production::always(
                "weight",
                move |s| depth_ratio(s.depth),
                move |_| vec![weight.into()],
            ),
        );
        grammar.add_production(
            endpoint,
            Production::new(
                "rod",
                move |s| s.depth < max_depth,
                move |s| 1.0 - depth_ratio(s.depth),
                move |_| {
                    vec![
                        rod.into(),
                        string.into(),
                        endpoint.into(),
                        string.into(),
                        endpoint.into(),
                    ]
                },
            ),
        );

        Ok(MobileGrammar {
            grammar: Arc::new(grammar),
            string,
            rod,
            weight,
            endpoint,
        })
    }
    pub fn grammar(&self) -> Arc<Grammar> {
        Arc::clone(&self.grammar)
    }
    /// A string with an endpoint hanging from it.
    pub fn axiom(&self) -> Vec<SymbolKind> {
        vec![self.string.into(), self.endpoint.into()]
    }
    pub fn string(&self) -> TerminalKind {
        self.string
    }
    pub fn rod(&self) -> TerminalKind {
        self.rod
    }
    pub fn weight(&self) -> TerminalKind {
        self.weight
    }
    pub fn endpoint(&self) -> VariableKind {
        self.endpoint
    }
}
